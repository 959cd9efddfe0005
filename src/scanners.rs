use std::fmt::Display;

use chrono::{DateTime, NaiveDate, Utc};
use colored::Colorize;

use crate::{ApiError, Comment, Commit, GitHubApi, Issue};

/// One of the four kinds of activity we look at in every repository.
/// Scanners only read GitHub; deciding what an event means for the roster
/// is left to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Signal {
    Commits,
    Issues,
    IssueComments,
    PullRequestComments,
}

impl Signal {
    /// The order in which the engine walks the signals of a repository
    pub const ALL: [Signal; 4] = [
        Signal::Commits,
        Signal::Issues,
        Signal::IssueComments,
        Signal::PullRequestComments,
    ];
}

impl Display for Signal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Signal::Commits => "commits",
            Signal::Issues => "issues",
            Signal::IssueComments => "issue comments",
            Signal::PullRequestComments => "pull request comments",
        };
        write!(f, "{name}")
    }
}

/// Something somebody did in a repository after the cutoff
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivityEvent {
    /// The GitHub login behind the activity, when GitHub could link one
    pub actor_login: Option<String>,
    /// Only commits carry the raw git identity
    pub author_name: Option<String>,
    pub author_email: Option<String>,
    pub timestamp: Option<DateTime<Utc>>,
}

impl ActivityEvent {
    fn from_commit(commit: Commit) -> Self {
        let identity = commit.commit.author.unwrap_or_default();
        Self {
            actor_login: commit
                .author
                .as_ref()
                .and_then(|u| u.resolved_login())
                .map(|l| l.to_string()),
            author_name: identity.name,
            author_email: identity.email,
            timestamp: identity.date,
        }
    }

    fn from_issue(issue: Issue) -> Self {
        Self {
            actor_login: issue
                .user
                .as_ref()
                .and_then(|u| u.resolved_login())
                .map(|l| l.to_string()),
            author_name: None,
            author_email: None,
            timestamp: Some(issue.created_at),
        }
    }

    fn from_comment(comment: Comment) -> Self {
        Self {
            actor_login: comment
                .user
                .as_ref()
                .and_then(|u| u.resolved_login())
                .map(|l| l.to_string()),
            author_name: None,
            author_email: None,
            timestamp: Some(comment.created_at),
        }
    }
}

/// Turn "there's nothing to see here" answers from GitHub into an empty
/// list, so the next signal of the repository still gets scanned.
fn tolerate<T>(
    repo: &str,
    signal: Signal,
    result: Result<Vec<T>, ApiError>,
) -> Result<Vec<T>, ApiError> {
    match result {
        Ok(items) => Ok(items),
        Err(e) if e.is_recoverable() => {
            println!(
                "{} {} {} {}",
                "No".yellow(),
                signal.to_string().yellow(),
                "available for".yellow(),
                format!("{repo}: {e}").white()
            );
            Ok(Vec::new())
        }
        Err(e) => Err(e),
    }
}

fn midnight(since: NaiveDate) -> DateTime<Utc> {
    since.and_time(chrono::NaiveTime::MIN).and_utc()
}

/// Commits on the default branch since the cutoff
pub fn scan_commits(
    api: &impl GitHubApi,
    repo: &str,
    since: NaiveDate,
) -> Result<impl Iterator<Item = ActivityEvent>, ApiError> {
    let commits = tolerate(repo, Signal::Commits, api.commits_since(repo, since))?;
    Ok(commits.into_iter().map(ActivityEvent::from_commit))
}

/// Issues opened since the cutoff. GitHub filters `since` on the last
/// update, so older issues that were touched recently are skipped here.
pub fn scan_issues(
    api: &impl GitHubApi,
    repo: &str,
    since: NaiveDate,
) -> Result<impl Iterator<Item = ActivityEvent>, ApiError> {
    let cutoff = midnight(since);
    let issues = tolerate(repo, Signal::Issues, api.issues_since(repo, since))?;
    Ok(issues
        .into_iter()
        .filter(move |issue| issue.created_at >= cutoff)
        .map(ActivityEvent::from_issue))
}

pub fn scan_issue_comments(
    api: &impl GitHubApi,
    repo: &str,
    since: NaiveDate,
) -> Result<impl Iterator<Item = ActivityEvent>, ApiError> {
    let comments = tolerate(
        repo,
        Signal::IssueComments,
        api.issue_comments_since(repo, since),
    )?;
    Ok(comments.into_iter().map(ActivityEvent::from_comment))
}

/// Review comments left on pull request diffs
pub fn scan_pull_request_comments(
    api: &impl GitHubApi,
    repo: &str,
    since: NaiveDate,
) -> Result<impl Iterator<Item = ActivityEvent>, ApiError> {
    let comments = tolerate(
        repo,
        Signal::PullRequestComments,
        api.pr_comments_since(repo, since),
    )?;
    Ok(comments.into_iter().map(ActivityEvent::from_comment))
}
