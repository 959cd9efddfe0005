#![allow(dead_code)]

use std::{cell::RefCell, collections::HashMap};

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use gh_activity_audit::{
    scanners::Signal, ApiError, Comment, Commit, CommitDetail, GitHubApi, GitIdentity, Issue,
    RateLimit, Repository, User,
};

/// How a canned signal should fail
#[derive(Debug, Clone, Copy)]
pub enum Failure {
    NotFound,
    Conflict,
    Forbidden,
    Transport,
    RateLimited,
    Unavailable,
}

impl Failure {
    fn to_error(self) -> ApiError {
        match self {
            Failure::NotFound => ApiError::NotFound("Not Found".to_string()),
            Failure::Conflict => ApiError::Conflict("Git Repository is empty.".to_string()),
            Failure::Forbidden => ApiError::Forbidden("Repository access blocked".to_string()),
            Failure::Transport => ApiError::Transport("connection reset".to_string()),
            Failure::RateLimited => ApiError::RateLimited("API rate limit exceeded".to_string()),
            Failure::Unavailable => {
                ApiError::Unavailable("Repository access blocked".to_string())
            }
        }
    }
}

pub fn cutoff() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
}

pub fn after_cutoff() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 2, 1, 12, 0, 0).unwrap()
}

pub fn before_cutoff() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2023, 12, 31, 23, 59, 59).unwrap()
}

fn user(login: Option<&str>) -> Option<User> {
    login.map(|login| User {
        login: login.to_string(),
    })
}

/// An in-memory organization
#[derive(Default)]
pub struct FakeGitHub {
    pub members: Vec<String>,
    pub emails: HashMap<String, String>,
    pub email_failures: HashMap<String, Failure>,
    pub repos: Vec<String>,
    pub commits: HashMap<String, Vec<Commit>>,
    pub issues: HashMap<String, Vec<Issue>>,
    pub issue_comments: HashMap<String, Vec<Comment>>,
    pub pr_comments: HashMap<String, Vec<Comment>>,
    pub failures: HashMap<(String, Signal), Failure>,
    pub calls: RefCell<Vec<(String, Signal)>>,
}

impl FakeGitHub {
    pub fn new(members: &[&str], repos: &[&str]) -> Self {
        Self {
            members: members.iter().map(|m| m.to_string()).collect(),
            repos: repos.iter().map(|r| r.to_string()).collect(),
            ..Default::default()
        }
    }

    pub fn commit(&mut self, repo: &str, login: Option<&str>, name: &str, email: &str) {
        self.commits
            .entry(repo.to_string())
            .or_default()
            .push(Commit {
                author: user(login),
                commit: CommitDetail {
                    author: Some(GitIdentity {
                        name: Some(name.to_string()),
                        email: Some(email.to_string()),
                        date: Some(after_cutoff()),
                    }),
                },
            });
    }

    pub fn issue(&mut self, repo: &str, login: Option<&str>, created_at: DateTime<Utc>) {
        self.issues.entry(repo.to_string()).or_default().push(Issue {
            user: user(login),
            created_at,
        });
    }

    pub fn issue_comment(&mut self, repo: &str, login: Option<&str>) {
        self.issue_comments
            .entry(repo.to_string())
            .or_default()
            .push(Comment {
                user: user(login),
                created_at: after_cutoff(),
            });
    }

    pub fn pr_comment(&mut self, repo: &str, login: Option<&str>) {
        self.pr_comments
            .entry(repo.to_string())
            .or_default()
            .push(Comment {
                user: user(login),
                created_at: after_cutoff(),
            });
    }

    pub fn fail(&mut self, repo: &str, signal: Signal, failure: Failure) {
        self.failures.insert((repo.to_string(), signal), failure);
    }

    pub fn fail_email(&mut self, login: &str, failure: Failure) {
        self.email_failures.insert(login.to_string(), failure);
    }

    /// Same organization, every list of events reversed
    pub fn reversed(&self) -> Self {
        fn rev<T: Clone>(map: &HashMap<String, Vec<T>>) -> HashMap<String, Vec<T>> {
            map.iter()
                .map(|(k, v)| (k.clone(), v.iter().rev().cloned().collect()))
                .collect()
        }
        Self {
            members: self.members.iter().rev().cloned().collect(),
            emails: self.emails.clone(),
            email_failures: self.email_failures.clone(),
            repos: self.repos.iter().rev().cloned().collect(),
            commits: rev(&self.commits),
            issues: rev(&self.issues),
            issue_comments: rev(&self.issue_comments),
            pr_comments: rev(&self.pr_comments),
            failures: self.failures.clone(),
            calls: RefCell::new(Vec::new()),
        }
    }

    fn canned<T: Clone>(
        &self,
        repo: &str,
        signal: Signal,
        data: &HashMap<String, Vec<T>>,
    ) -> Result<Vec<T>, ApiError> {
        self.calls.borrow_mut().push((repo.to_string(), signal));
        if let Some(failure) = self.failures.get(&(repo.to_string(), signal)) {
            return Err(failure.to_error());
        }
        Ok(data.get(repo).cloned().unwrap_or_default())
    }
}

impl GitHubApi for FakeGitHub {
    fn list_org_members(&self, _org: &str) -> Result<Vec<User>, ApiError> {
        Ok(self
            .members
            .iter()
            .map(|login| User {
                login: login.clone(),
            })
            .collect())
    }

    fn list_org_repos(&self, _org: &str) -> Result<Vec<Repository>, ApiError> {
        Ok(self
            .repos
            .iter()
            .map(|full_name| Repository {
                full_name: full_name.clone(),
            })
            .collect())
    }

    fn user_email(&self, _org: &str, login: &str) -> Result<Option<String>, ApiError> {
        if let Some(failure) = self.email_failures.get(login) {
            return Err(failure.to_error());
        }
        Ok(self.emails.get(login).cloned())
    }

    fn commits_since(&self, repo: &str, _since: NaiveDate) -> Result<Vec<Commit>, ApiError> {
        self.canned(repo, Signal::Commits, &self.commits)
    }

    fn issues_since(&self, repo: &str, _since: NaiveDate) -> Result<Vec<Issue>, ApiError> {
        self.canned(repo, Signal::Issues, &self.issues)
    }

    fn issue_comments_since(
        &self,
        repo: &str,
        _since: NaiveDate,
    ) -> Result<Vec<Comment>, ApiError> {
        self.canned(repo, Signal::IssueComments, &self.issue_comments)
    }

    fn pr_comments_since(&self, repo: &str, _since: NaiveDate) -> Result<Vec<Comment>, ApiError> {
        self.canned(repo, Signal::PullRequestComments, &self.pr_comments)
    }

    fn rate_limit(&self) -> Result<RateLimit, ApiError> {
        Ok(RateLimit {
            limit: 5000,
            remaining: 5000,
        })
    }
}
