use colored::Colorize;

use crate::{ApiError, GitHubApi};

/// Fetch the full names (`owner/name`) of every repository in the org,
/// in the order GitHub lists them. Row numbers in the snapshot refer to
/// this order, so it must stay stable between runs.
pub fn load_repositories(api: &impl GitHubApi, org: &str) -> Result<Vec<String>, ApiError> {
    println!(
        "{}",
        "I'm going to fetch all repositories from the org".yellow()
    );

    let repositories: Vec<String> = match api.list_org_repos(org) {
        Ok(repositories) => repositories.into_iter().map(|r| r.full_name).collect(),
        Err(e) => {
            println!("{}: {}", "I couldn't fetch the repositories".red(), e);
            return Err(e);
        }
    };

    println!("{} {}", "Success! I found: ".green(), repositories.len());
    if repositories.is_empty() {
        println!(
            "{}",
            "I didn't find any repositories. Make sure the token can read the organization."
                .red()
        );
    }

    Ok(repositories)
}
