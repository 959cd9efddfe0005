use std::collections::BTreeMap;

use chrono::NaiveDate;
use colored::Colorize;

use crate::{
    config::{ConfigError, RunConfiguration},
    members::{Activation, Roster},
    report::{self, ReportError},
    repos::load_repositories,
    scanners::{self, ActivityEvent, Signal},
    ApiError, GitHubApi,
};

/// A commit author that doesn't map to any GitHub login
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnrecognizedAuthor {
    pub name: Option<String>,
    pub email: Option<String>,
}

/// What a classification pass found, on top of the roster updates
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Classification {
    /// In the order we met them, duplicates included
    pub unrecognized: Vec<UnrecognizedAuthor>,
    pub events: BTreeMap<Signal, usize>,
    pub newly_active: usize,
}

impl Classification {
    fn record(&mut self, signal: Signal, activation: Option<Activation>) {
        *self.events.entry(signal).or_default() += 1;
        if activation == Some(Activation::Activated) {
            self.newly_active += 1;
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Report(#[from] ReportError),
}

/// Commits without a linked login are kept as unrecognized authors
fn fold_commit(
    roster: &mut Roster,
    event: ActivityEvent,
    unrecognized: &mut Vec<UnrecognizedAuthor>,
) -> Option<Activation> {
    match event.actor_login {
        Some(login) => Some(roster.mark_active(&login)),
        None => {
            unrecognized.push(UnrecognizedAuthor {
                name: event.author_name,
                email: event.author_email,
            });
            None
        }
    }
}

/// Issues and comments without a login are dropped
fn fold_actor(roster: &mut Roster, event: ActivityEvent) -> Option<Activation> {
    event.actor_login.map(|login| roster.mark_active(&login))
}

/// Scan every repository of the slice, in order, and fold what we find
/// into the roster. Signals a repository doesn't expose count as empty;
/// anything else stops the run.
pub fn classify(
    api: &impl GitHubApi,
    roster: &mut Roster,
    repositories: &[String],
    since: NaiveDate,
) -> Result<Classification, ApiError> {
    let mut classification = Classification::default();
    let total = repositories.len();

    for (i, repo) in repositories.iter().enumerate() {
        println!(
            "{} {}",
            format!("[{}/{}]", i + 1, total).blue(),
            repo.white()
        );

        for signal in Signal::ALL {
            let before = classification.events.get(&signal).copied().unwrap_or(0);
            match signal {
                Signal::Commits => {
                    for event in scanners::scan_commits(api, repo, since)? {
                        let activation =
                            fold_commit(roster, event, &mut classification.unrecognized);
                        classification.record(signal, activation);
                    }
                }
                Signal::Issues => {
                    for event in scanners::scan_issues(api, repo, since)? {
                        let activation = fold_actor(roster, event);
                        classification.record(signal, activation);
                    }
                }
                Signal::IssueComments => {
                    for event in scanners::scan_issue_comments(api, repo, since)? {
                        let activation = fold_actor(roster, event);
                        classification.record(signal, activation);
                    }
                }
                Signal::PullRequestComments => {
                    for event in scanners::scan_pull_request_comments(api, repo, since)? {
                        let activation = fold_actor(roster, event);
                        classification.record(signal, activation);
                    }
                }
            }
            let after = classification.events.get(&signal).copied().unwrap_or(0);
            println!(
                "    {} {}",
                format!("{signal}:").yellow(),
                (after - before).to_string().white()
            );
        }
    }

    Ok(classification)
}

/// The numbers we print at the end of a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub repositories_scanned: usize,
    pub members: usize,
    pub active_members: usize,
    pub unrecognized_authors: usize,
    pub events: BTreeMap<Signal, usize>,
}

/// Load the roster and the repositories, snapshot both, then classify the
/// configured slice and write the range's reports.
///
/// The snapshots are written as soon as the data is fetched, so they
/// survive a run that fails later on. The active members and unrecognized
/// authors reports are only written once the whole slice is scanned.
pub fn run_activity_audit(
    api: &impl GitHubApi,
    config: &RunConfiguration,
) -> Result<RunSummary, AuditError> {
    println!("{}", "GitHub Member Activity Audit".white().bold());

    let mut roster = Roster::load(api, &config.organization, config.resolve_emails)?;
    report::write_members_snapshot(&config.output_dir, &roster)?;

    let repositories = load_repositories(api, &config.organization)?;
    report::write_repositories_snapshot(&config.output_dir, &repositories)?;

    let range = config.rows.resolve(repositories.len())?;
    let slice = range.slice(&repositories);

    println!(
        "{} {} {} {} {} {}",
        "I'm going to scan rows".yellow(),
        config.rows.start().to_string().white(),
        "to".yellow(),
        config.rows.finish().to_string().white(),
        "for activity since".yellow(),
        config.since.to_string().white()
    );

    let classification = classify(api, &mut roster, slice, config.since)?;

    report::write_active_members(&config.output_dir, config.rows, &roster)?;
    report::write_unrecognized_authors(&config.output_dir, &classification.unrecognized)?;

    let summary = RunSummary {
        repositories_scanned: slice.len(),
        members: roster.len(),
        active_members: roster.active_members().count(),
        unrecognized_authors: classification.unrecognized.len(),
        events: classification.events,
    };

    println!(
        "{} {} {} {} {} {} {}",
        "I'm done! I scanned".green(),
        summary.repositories_scanned.to_string().white(),
        "repositories and found".green(),
        summary.active_members.to_string().white(),
        "active members out of".green(),
        summary.members.to_string().white(),
        "members".green()
    );
    for (signal, count) in &summary.events {
        println!("    {} {}", format!("{signal}:").green(), count.to_string().white());
    }
    if summary.unrecognized_authors > 0 {
        println!(
            "{} {}",
            "Commit authors I couldn't match to a login:".yellow(),
            summary.unrecognized_authors.to_string().white()
        );
    }

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn commit_by(login: Option<&str>) -> ActivityEvent {
        ActivityEvent {
            actor_login: login.map(|l| l.to_string()),
            author_name: Some("Some Name".to_string()),
            author_email: Some("some@mail".to_string()),
            timestamp: None,
        }
    }

    #[test]
    fn commits_from_non_members_are_neither_active_nor_unrecognized() {
        let mut roster = Roster::from_logins(["alice"]);
        let mut unrecognized = Vec::new();

        let activation = fold_commit(&mut roster, commit_by(Some("mallory")), &mut unrecognized);

        assert_eq!(activation, Some(Activation::NotAMember));
        assert!(unrecognized.is_empty());
        assert!(roster.active_logins().is_empty());
    }

    #[test]
    fn commits_without_login_are_collected() {
        let mut roster = Roster::from_logins(["alice"]);
        let mut unrecognized = Vec::new();

        assert_eq!(fold_commit(&mut roster, commit_by(None), &mut unrecognized), None);
        assert_eq!(
            unrecognized,
            [UnrecognizedAuthor {
                name: Some("Some Name".to_string()),
                email: Some("some@mail".to_string()),
            }]
        );
    }

    #[test]
    fn issues_without_login_are_dropped() {
        let mut roster = Roster::from_logins(["alice"]);

        assert_eq!(fold_actor(&mut roster, commit_by(None)), None);
        assert!(roster.active_logins().is_empty());
    }

    #[test]
    fn counts_only_new_activations() {
        let mut classification = Classification::default();
        classification.record(Signal::Issues, Some(Activation::Activated));
        classification.record(Signal::Issues, Some(Activation::AlreadyActive));
        classification.record(Signal::Commits, None);

        assert_eq!(classification.newly_active, 1);
        assert_eq!(classification.events[&Signal::Issues], 2);
        assert_eq!(classification.events[&Signal::Commits], 1);
    }
}
