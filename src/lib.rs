use std::{fmt::Display, thread::sleep, time::Duration};

use chrono::{DateTime, NaiveDate, Utc};
use colored::Colorize;
use reqwest::StatusCode;

pub mod config;
pub mod diagnostics;
pub mod engine;
mod gql_queries;
pub mod members;
pub mod reconcile;
pub mod report;
pub mod repos;
pub mod scanners;

const DEFAULT_API_URL: &str = "https://api.github.com";

/// Number of attempts for a single GitHub request before giving up
const RETRIES: u8 = 3;

/// Errors coming back from the GitHub transport
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("access denied: {0}")]
    Forbidden(String),
    #[error("unavailable for legal reasons: {0}")]
    Unavailable(String),
    #[error("API rate limit exhausted: {0}")]
    RateLimited(String),
    #[error("GitHub returned {status}: {message}")]
    GitHub { status: u16, message: String },
    #[error("couldn't talk to GitHub: {0}")]
    Transport(String),
    #[error("couldn't deserialize GitHub's response: {0}")]
    Deserialize(String),
}

impl ApiError {
    /// Whether a signal source failing with this error can be treated as
    /// "no events" for the repository being scanned.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            ApiError::NotFound(_)
                | ApiError::Conflict(_)
                | ApiError::Forbidden(_)
                | ApiError::Unavailable(_)
        )
    }
}

#[derive(Debug, serde::Deserialize, Hash, Eq, PartialEq)]
struct GitHubError {
    pub message: String,
    #[serde(default)]
    pub documentation_url: Option<String>,
}

impl Display for GitHubError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.documentation_url {
            Some(url) => write!(f, "{} ({})", self.message, url),
            None => write!(f, "{}", self.message),
        }
    }
}

/// Map an HTTP status and body to an error, or `None` when the response is usable
fn classify_response(status: u16, content: &str) -> Option<ApiError> {
    if (200..300).contains(&status) {
        return None;
    }

    let message = serde_json::from_str::<GitHubError>(content)
        .map(|e| e.to_string())
        .unwrap_or_else(|_| content.trim().to_string());

    let error = match status {
        403 | 429 if message.to_lowercase().contains("rate limit") => {
            ApiError::RateLimited(message)
        }
        403 => ApiError::Forbidden(message),
        404 => ApiError::NotFound(message),
        409 => ApiError::Conflict(message),
        451 => ApiError::Unavailable(message),
        _ => ApiError::GitHub { status, message },
    };
    Some(error)
}

/// A GitHub account as it appears inside other API objects.
/// Deleted accounts sometimes come back as an empty object.
#[derive(Debug, Clone, serde::Deserialize, Hash, Eq, PartialEq)]
pub struct User {
    #[serde(default)]
    pub login: String,
}

impl User {
    /// The login, if there is a usable one
    pub fn resolved_login(&self) -> Option<&str> {
        if self.login.is_empty() {
            None
        } else {
            Some(&self.login)
        }
    }
}

#[derive(Debug, Clone, serde::Deserialize, Hash, Eq, PartialEq)]
pub struct Repository {
    pub full_name: String,
}

/// The git-level identity recorded in a commit
#[derive(Debug, Clone, Default, serde::Deserialize, PartialEq)]
pub struct GitIdentity {
    pub name: Option<String>,
    pub email: Option<String>,
    pub date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, serde::Deserialize, PartialEq)]
pub struct CommitDetail {
    pub author: Option<GitIdentity>,
}

/// A commit as returned by `/repos/{repo}/commits`.
/// `author` is the GitHub account linked to the git identity, if any.
#[derive(Debug, Clone, serde::Deserialize, PartialEq)]
pub struct Commit {
    pub author: Option<User>,
    #[serde(default)]
    pub commit: CommitDetail,
}

#[derive(Debug, Clone, serde::Deserialize, PartialEq)]
pub struct Issue {
    pub user: Option<User>,
    pub created_at: DateTime<Utc>,
}

/// Issue comments and pull request review comments share this shape
#[derive(Debug, Clone, serde::Deserialize, PartialEq)]
pub struct Comment {
    pub user: Option<User>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, serde::Deserialize, Eq, PartialEq)]
pub struct RateLimit {
    pub limit: u64,
    pub remaining: u64,
}

#[derive(Debug, serde::Deserialize)]
struct RateLimitResponse {
    rate: RateLimit,
}

#[derive(Debug, serde::Deserialize)]
struct UserProfile {
    email: Option<String>,
}

/// Everything the audit needs from GitHub. Every list is fully paginated
/// and comes back in the order GitHub returned it.
pub trait GitHubApi {
    fn list_org_members(&self, org: &str) -> Result<Vec<User>, ApiError>;

    fn list_org_repos(&self, org: &str) -> Result<Vec<Repository>, ApiError>;

    /// Costs one or two extra requests per call
    fn user_email(&self, org: &str, login: &str) -> Result<Option<String>, ApiError>;

    fn commits_since(&self, repo: &str, since: NaiveDate) -> Result<Vec<Commit>, ApiError>;

    fn issues_since(&self, repo: &str, since: NaiveDate) -> Result<Vec<Issue>, ApiError>;

    fn issue_comments_since(&self, repo: &str, since: NaiveDate)
        -> Result<Vec<Comment>, ApiError>;

    fn pr_comments_since(&self, repo: &str, since: NaiveDate) -> Result<Vec<Comment>, ApiError>;

    fn rate_limit(&self) -> Result<RateLimit, ApiError>;
}

/// Format a cutoff date the way GitHub's `since` parameters expect it
pub fn since_param(since: NaiveDate) -> String {
    let timestamp = format!("{}T00:00:00Z", since.format("%Y-%m-%d"));
    format!("since={}", urlencoding::encode(&timestamp))
}

/// Enough of the token to tell which one is in use: the type marker
/// (`ghp_`, `github_pat_`...) and four more characters
fn token_preview(token: &str) -> String {
    const MARKERS: [&str; 6] = ["github_pat_", "ghp_", "gho_", "ghu_", "ghs_", "ghr_"];
    let marker = MARKERS
        .iter()
        .find(|m| token.starts_with(*m))
        .map(|m| m.len())
        .unwrap_or(0);
    let shown = marker + 4;
    if token.chars().count() <= shown * 2 {
        return "****".to_string();
    }
    let prefix: String = token.chars().take(shown).collect();
    format!("{prefix}...")
}

pub struct Bootstrap {
    token: String,
    api_url: String,
    page_size: u8,
    client: reqwest::blocking::Client,
}

impl Bootstrap {
    /// Build the GitHub client. When no token is given, it is read from `GH_TOKEN`.
    pub fn new(token: Option<String>, page_size: u8) -> Result<Self, String> {
        println!(
            "{}",
            "I'm checking there is a GitHub token to work with...".yellow()
        );

        let token = match token.or_else(|| std::env::var("GH_TOKEN").ok()) {
            Some(token) if !token.trim().is_empty() => token.trim().to_string(),
            _ => {
                return Err("GH_TOKEN not found".to_string());
            }
        };
        println!("{} {}", "I have token:".green(), token_preview(&token));

        let api_url = std::env::var("GH_API_URL")
            .unwrap_or_else(|_| DEFAULT_API_URL.to_string())
            .trim_end_matches('/')
            .to_string();
        if api_url != DEFAULT_API_URL {
            println!("{} {}", "I'm talking to:".green(), api_url.white());
        }

        let client = reqwest::blocking::Client::builder()
            .user_agent("GitHub Activity Audit")
            .build()
            .map_err(|e| format!("Could not build the HTTP client: {e}"))?;

        Ok(Self {
            token,
            api_url,
            page_size: page_size.clamp(1, 100),
            client,
        })
    }

    fn get(&self, url: &str) -> reqwest::blocking::RequestBuilder {
        self.client
            .get(url)
            .header("Accept", "application/vnd.github+json")
            .header("X-GitHub-Api-Version", "2022-11-28")
            .header("Authorization", format!("Bearer {}", self.token))
    }

    /// Send a request, retrying when GitHub can't be reached or we hit the
    /// rate limit. Returns the HTTP status, the headers and the body.
    fn send_with_retries(
        &self,
        request: impl Fn() -> reqwest::blocking::RequestBuilder,
        retries: u8,
    ) -> Result<(StatusCode, reqwest::header::HeaderMap, String), ApiError> {
        let mut tries = 0;
        loop {
            tries += 1;
            let response = request().send().and_then(|response| {
                let status = response.status();
                let headers = response.headers().clone();
                response.text().map(|content| (status, headers, content))
            });

            // Handle communication issues with GitHub
            let (status, headers, content) = match response {
                Ok(response) => response,
                Err(e) => {
                    if tries >= retries {
                        println!("{}", "Retries exhausted".red());
                        return Err(ApiError::Transport(e.to_string()));
                    }

                    println!(
                        "{}: {}",
                        "Going to retry because couldn't talk to GitHub:".yellow(),
                        e.to_string().red()
                    );

                    continue;
                }
            };

            match classify_response(status.as_u16(), &content) {
                None => return Ok((status, headers, content)),
                Some(ApiError::RateLimited(message)) => {
                    if tries >= retries {
                        println!("{}", "Retries exhausted".red());
                        return Err(ApiError::RateLimited(message));
                    }
                    println!(
                        "{} {}",
                        "I hit the rate limit, waiting a minute before retrying:".yellow(),
                        message.red()
                    );
                    sleep(Duration::from_secs(60));
                }
                Some(e) => return Err(e),
            }
        }
    }

    fn make_github_request(
        &self,
        url: &str,
        retries: u8,
        params: Option<&str>,
    ) -> Result<serde_json::Value, ApiError> {
        let params = match params {
            Some(params) => format!("?{params}"),
            None => String::new(),
        };
        let full_url = format!("{}{url}{params}", self.api_url);

        let (_, _, content) = self.send_with_retries(|| self.get(&full_url), retries)?;

        serde_json::from_str::<serde_json::Value>(&content)
            .map_err(|e| ApiError::Deserialize(e.to_string()))
    }

    fn make_paginated_github_request<T>(
        &self,
        url: &str,
        retries: u8,
        params: Option<&str>,
    ) -> Result<Vec<T>, ApiError>
    where
        T: serde::de::DeserializeOwned,
    {
        let params = match params {
            Some(params) => format!("&{params}"),
            None => String::new(),
        };

        let mut page = 1;
        let mut all_items = Vec::new();
        loop {
            let full_url = format!(
                "{}{url}?per_page={}&page={page}{params}",
                self.api_url, self.page_size
            );
            let (_, _, content) = self.send_with_retries(|| self.get(&full_url), retries)?;

            let data: Vec<T> = serde_json::from_str(&content)
                .map_err(|e| ApiError::Deserialize(format!("{url} page {page}: {e}")))?;

            // When we go past the end (an unneeded page), we'll get an empty response so we can break
            if data.is_empty() {
                break;
            }

            let full_page = data.len() >= self.page_size as usize;
            all_items.extend(data);
            if !full_page {
                break;
            }
            page += 1;
        }

        Ok(all_items)
    }

    /// Recover a member's email from the organization's SAML identity
    fn saml_email(&self, org: &str, login: &str) -> Result<Option<String>, ApiError> {
        let graphql_url = match self.api_url.strip_suffix("/v3") {
            // GitHub Enterprise Server exposes GraphQL next to the REST root
            Some(root) => format!("{root}/graphql"),
            None => format!("{}/graphql", self.api_url),
        };
        let body = serde_json::json!({
            "query": gql_queries::USER2EMAIL,
            "variables": { "org": org, "user": login },
        });

        let (_, _, content) = self.send_with_retries(
            || {
                self.client
                    .post(&graphql_url)
                    .header("Authorization", format!("Bearer {}", self.token))
                    .json(&body)
            },
            RETRIES,
        )?;

        let value = serde_json::from_str::<serde_json::Value>(&content)
            .map_err(|e| ApiError::Deserialize(e.to_string()))?;
        Ok(value
            .pointer(gql_queries::USER2EMAIL_NAME_ID)
            .and_then(|v| v.as_str())
            .filter(|email| !email.is_empty())
            .map(|email| email.to_string()))
    }

    /// The OAuth scopes granted to the token. Fine-grained tokens don't report any.
    pub fn token_scopes(&self) -> Result<Option<String>, ApiError> {
        let url = format!("{}/", self.api_url);
        let (_, headers, _) = self.send_with_retries(|| self.get(&url), RETRIES)?;
        Ok(headers
            .get("x-oauth-scopes")
            .and_then(|v| v.to_str().ok())
            .map(|v| v.to_string()))
    }

    /// Fetch a single page, only to see whether we can read it
    pub fn check_access(&self, url: &str) -> Result<(), ApiError> {
        self.make_github_request(url, RETRIES, Some("per_page=1"))
            .map(|_| ())
    }
}

impl GitHubApi for Bootstrap {
    fn list_org_members(&self, org: &str) -> Result<Vec<User>, ApiError> {
        self.make_paginated_github_request(&format!("/orgs/{org}/members"), RETRIES, None)
    }

    fn list_org_repos(&self, org: &str) -> Result<Vec<Repository>, ApiError> {
        self.make_paginated_github_request(
            &format!("/orgs/{org}/repos"),
            RETRIES,
            Some("type=all&sort=full_name"),
        )
    }

    fn user_email(&self, org: &str, login: &str) -> Result<Option<String>, ApiError> {
        // Orgs without SAML SSO answer with a GraphQL error: fall back to the profile
        match self.saml_email(org, login) {
            Ok(Some(email)) => return Ok(Some(email)),
            Ok(None) => (),
            Err(e) if e.is_recoverable() => (),
            Err(e) => return Err(e),
        }

        let profile = self.make_github_request(&format!("/users/{login}"), RETRIES, None)?;
        let profile: UserProfile =
            serde_json::from_value(profile).map_err(|e| ApiError::Deserialize(e.to_string()))?;
        Ok(profile.email.filter(|email| !email.is_empty()))
    }

    fn commits_since(&self, repo: &str, since: NaiveDate) -> Result<Vec<Commit>, ApiError> {
        self.make_paginated_github_request(
            &format!("/repos/{repo}/commits"),
            RETRIES,
            Some(&since_param(since)),
        )
    }

    fn issues_since(&self, repo: &str, since: NaiveDate) -> Result<Vec<Issue>, ApiError> {
        self.make_paginated_github_request(
            &format!("/repos/{repo}/issues"),
            RETRIES,
            Some(&format!("state=all&{}", since_param(since))),
        )
    }

    fn issue_comments_since(
        &self,
        repo: &str,
        since: NaiveDate,
    ) -> Result<Vec<Comment>, ApiError> {
        self.make_paginated_github_request(
            &format!("/repos/{repo}/issues/comments"),
            RETRIES,
            Some(&since_param(since)),
        )
    }

    fn pr_comments_since(&self, repo: &str, since: NaiveDate) -> Result<Vec<Comment>, ApiError> {
        self.make_paginated_github_request(
            &format!("/repos/{repo}/pulls/comments"),
            RETRIES,
            Some(&since_param(since)),
        )
    }

    fn rate_limit(&self) -> Result<RateLimit, ApiError> {
        let value = self.make_github_request("/rate_limit", RETRIES, None)?;
        let response: RateLimitResponse =
            serde_json::from_value(value).map_err(|e| ApiError::Deserialize(e.to_string()))?;
        Ok(response.rate)
    }
}
