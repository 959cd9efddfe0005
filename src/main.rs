use std::path::PathBuf;

use colored::Colorize;

use clap::{command, Parser};
use gh_activity_audit::config::{
    self, ConfigurationInputs, FileConfiguration, DEFAULT_OUTPUT_DIR, DEFAULT_PAGE_SIZE,
};
use gh_activity_audit::{diagnostics, engine, reconcile, Bootstrap};

/// Find out which organization members did anything on a slice of the org's repositories
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// The GitHub organization to audit. Falls back to the configuration file, then GH_ORG
    #[arg(long)]
    org: Option<String>,

    /// Activity on or after this date counts (YYYY-MM-DD)
    #[arg(long)]
    date: Option<String>,

    /// First repository row to scan, 1-based, as in repositories.csv
    #[arg(long)]
    start: Option<u32>,

    /// Last repository row to scan, included
    #[arg(long)]
    finish: Option<u32>,

    /// Look up every member's email. One extra request per member
    #[arg(long)]
    email: bool,

    /// Only check connectivity, token scopes and rate limit, then exit
    #[arg(long)]
    check: bool,

    /// Merge the active members reports given with --partitions into the inactive members report
    #[arg(long)]
    reconcile: bool,

    /// Active members reports to reconcile
    #[clap(long, value_delimiter = ',', num_args = 1..)]
    partitions: Option<Vec<PathBuf>>,

    /// Folder for all reports
    #[arg(long)]
    output: Option<PathBuf>,

    /// TOML configuration file with token, organization, output and page_size
    #[arg(long)]
    config: Option<String>,
}

fn fail(message: impl std::fmt::Display) -> ! {
    println!("{}", message.to_string().bold().red());
    std::process::exit(1);
}

fn main() {
    let args = Args::parse();

    let file = match &args.config {
        Some(path) => config::get_configuration(path).unwrap_or_else(|e| fail(e)),
        None => FileConfiguration::default(),
    };

    if args.reconcile {
        let partitions = args.partitions.unwrap_or_default();
        if partitions.is_empty() {
            fail("Please give the active members reports to reconcile with --partitions");
        }
        let output = args
            .output
            .or(file.output)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR));
        match reconcile::run_reconciliation(&output, &partitions) {
            Ok(path) => println!(
                "{} {}",
                "Inactive members written to".green(),
                path.display().to_string().white()
            ),
            Err(e) => fail(e),
        }
        return;
    }

    let inputs = ConfigurationInputs {
        organization: args.org,
        date: args.date,
        start: args.start,
        finish: args.finish,
        resolve_emails: args.email,
        output_dir: args.output,
    }
    .with_file(&file);

    // Configuration problems are reported before we talk to GitHub
    let run = if args.check {
        None
    } else {
        Some(inputs.clone().validate().unwrap_or_else(|e| fail(e)))
    };

    let bootstrap = match Bootstrap::new(
        file.token.clone(),
        file.page_size.unwrap_or(DEFAULT_PAGE_SIZE),
    ) {
        Ok(b) => b,
        Err(e) => fail(e),
    };

    match run {
        None => {
            if !diagnostics::run_check(&bootstrap, inputs.organization.as_deref()) {
                std::process::exit(1);
            }
        }
        Some(run) => {
            if let Err(e) = engine::run_activity_audit(&bootstrap, &run) {
                fail(format!("The audit stopped: {e}"));
            }
        }
    }
}
