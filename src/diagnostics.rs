use colored::Colorize;

use crate::{Bootstrap, GitHubApi};

/// Check what the token can do without running the audit.
/// Returns whether every check succeeded.
pub fn run_check(bootstrap: &Bootstrap, org: Option<&str>) -> bool {
    println!("{}", "GitHub Connectivity Check".white().bold());
    let mut ok = true;

    match bootstrap.token_scopes() {
        Ok(Some(scopes)) => println!("{} {}", "Token scopes:".green(), scopes.white()),
        Ok(None) => println!(
            "{}",
            "The token doesn't report any scopes (fine-grained token?)".yellow()
        ),
        Err(e) => {
            println!("{}: {}", "I couldn't reach GitHub".red(), e);
            ok = false;
        }
    }

    match bootstrap.rate_limit() {
        Ok(rate) => {
            println!(
                "{} {} {} {}",
                "Rate limit:".green(),
                rate.remaining.to_string().white(),
                "requests remaining out of".green(),
                rate.limit.to_string().white()
            );
            if rate.remaining == 0 {
                println!(
                    "{}",
                    "There are no requests left: wait for the limit to reset before running."
                        .red()
                );
            }
        }
        Err(e) => {
            println!("{}: {}", "I couldn't fetch the rate limit".red(), e);
            ok = false;
        }
    }

    let Some(org) = org else {
        println!(
            "{}",
            "No organization given, so I'm not checking access to it".yellow()
        );
        return ok;
    };

    for (what, url) in [
        ("members", format!("/orgs/{org}/members")),
        ("repositories", format!("/orgs/{org}/repos")),
    ] {
        match bootstrap.check_access(&url) {
            Ok(()) => println!(
                "{} {} {}",
                "I can read the".green(),
                what.white(),
                format!("of {org}").green()
            ),
            Err(e) => {
                println!(
                    "{} {} {}: {}",
                    "I can't read the".red(),
                    what.white(),
                    format!("of {org}").red(),
                    e
                );
                ok = false;
            }
        }
    }

    ok
}
