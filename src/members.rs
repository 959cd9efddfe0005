use std::collections::{BTreeSet, HashMap};

use colored::Colorize;

use crate::{ApiError, GitHubApi};

/// An organization member and whether we've seen them do anything
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    pub login: String,
    pub email: Option<String>,
    active: bool,
}

impl Member {
    pub fn new(login: impl Into<String>, email: Option<String>) -> Self {
        Self {
            login: login.into(),
            email,
            active: false,
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Once active, a member stays active for the rest of the run
    pub fn mark_active(&mut self) {
        self.active = true;
    }
}

/// What happened when we tried to mark a login as active
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activation {
    Activated,
    AlreadyActive,
    NotAMember,
}

/// All members of the organization, in the order GitHub listed them,
/// indexed by login.
#[derive(Debug, Clone, Default)]
pub struct Roster {
    members: Vec<Member>,
    index: HashMap<String, usize>,
}

impl Roster {
    /// Duplicate logins keep their first occurrence
    pub fn new(members: impl IntoIterator<Item = Member>) -> Self {
        let mut roster = Roster::default();
        for member in members {
            if roster.index.contains_key(&member.login) {
                continue;
            }
            roster
                .index
                .insert(member.login.clone(), roster.members.len());
            roster.members.push(member);
        }
        roster
    }

    /// A roster with no emails, mostly useful for tests and reconciliation
    pub fn from_logins<S: Into<String>>(logins: impl IntoIterator<Item = S>) -> Self {
        Self::new(logins.into_iter().map(|login| Member::new(login, None)))
    }

    /// Fetch every member of the organization. Resolving emails costs one
    /// extra call per member, so it's opt-in.
    pub fn load(api: &impl GitHubApi, org: &str, resolve_emails: bool) -> Result<Self, ApiError> {
        println!(
            "{}",
            "I'm going to fetch all members from the org".yellow()
        );
        let users = api.list_org_members(org)?;
        println!("{} {}", "Success! I found: ".green(), users.len());

        if resolve_emails {
            println!(
                "{}",
                "I'm going to look up the email of every member. This is one request per member..."
                    .yellow()
            );
        }

        let mut members = Vec::with_capacity(users.len());
        for user in users {
            let Some(login) = user.resolved_login() else {
                continue;
            };
            let email = if resolve_emails {
                match api.user_email(org, login) {
                    Ok(email) => email,
                    Err(e) if e.is_recoverable() => {
                        println!(
                            "{} {}: {}",
                            "I couldn't look up the email of".yellow(),
                            login.white(),
                            e.to_string().red()
                        );
                        None
                    }
                    Err(e) => return Err(e),
                }
            } else {
                None
            };
            members.push(Member::new(login, email));
        }

        Ok(Self::new(members))
    }

    /// Exact, case-sensitive lookup
    pub fn find_by_login(&self, login: &str) -> Option<&Member> {
        self.index.get(login).map(|&i| &self.members[i])
    }

    pub fn mark_active(&mut self, login: &str) -> Activation {
        let Some(&i) = self.index.get(login) else {
            return Activation::NotAMember;
        };
        let member = &mut self.members[i];
        if member.is_active() {
            Activation::AlreadyActive
        } else {
            member.mark_active();
            Activation::Activated
        }
    }

    pub fn members(&self) -> &[Member] {
        &self.members
    }

    pub fn active_members(&self) -> impl Iterator<Item = &Member> {
        self.members.iter().filter(|m| m.is_active())
    }

    pub fn active_logins(&self) -> BTreeSet<String> {
        self.active_members().map(|m| m.login.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}
