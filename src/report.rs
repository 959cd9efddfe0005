use std::{
    fs::File,
    io::BufWriter,
    path::{Path, PathBuf},
};

use colored::Colorize;
use serde::{Deserialize, Serialize};

use crate::{config::RowBounds, engine::UnrecognizedAuthor, members::Roster};

pub const MEMBERS_FILE: &str = "members.csv";
pub const REPOSITORIES_FILE: &str = "repositories.csv";
pub const UNRECOGNIZED_AUTHORS_FILE: &str = "unrecognized_authors.csv";
pub const INACTIVE_MEMBERS_FILE: &str = "inactive_members.csv";

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("couldn't write {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("couldn't write CSV {path}: {source}")]
    Csv { path: PathBuf, source: csv::Error },
}

/// One row of the members, active members and inactive members reports
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberRow {
    pub login: String,
    #[serde(default)]
    pub email: String,
}

#[derive(Debug, Serialize)]
struct RepositoryRow<'a> {
    repositories: &'a str,
}

#[derive(Debug, Serialize)]
struct AuthorRow<'a> {
    name: &'a str,
    email: &'a str,
}

/// The active members report is named after its range, so runs over
/// different ranges never write to the same file.
pub fn active_members_file(rows: RowBounds) -> String {
    format!("active_members_{}_{}.csv", rows.start(), rows.finish())
}

/// Write a CSV file with the given header, even when there are no rows
fn write_csv<T: Serialize>(
    path: &Path,
    header: &[&str],
    rows: impl IntoIterator<Item = T>,
) -> Result<usize, ReportError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|source| ReportError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    let file = File::create(path).map_err(|source| ReportError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let csv_error = |source| ReportError::Csv {
        path: path.to_path_buf(),
        source,
    };

    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(BufWriter::new(file));
    writer.write_record(header).map_err(csv_error)?;

    let mut count_entries = 0;
    for row in rows {
        writer.serialize(row).map_err(csv_error)?;
        count_entries += 1;
    }
    writer.flush().map_err(|source| ReportError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    println!(
        "{} {}: {} {} {}",
        "Successfully written file".green(),
        path.display().to_string().white(),
        "There were".green(),
        count_entries.to_string().white(),
        "entries".green()
    );

    Ok(count_entries)
}

fn member_rows<'a>(
    members: impl Iterator<Item = &'a crate::members::Member> + 'a,
) -> impl Iterator<Item = MemberRow> + 'a {
    members.map(|m| MemberRow {
        login: m.login.clone(),
        email: m.email.clone().unwrap_or_default(),
    })
}

/// Snapshot of the whole roster, written before any classification starts
pub fn write_members_snapshot(dir: &Path, roster: &Roster) -> Result<PathBuf, ReportError> {
    let path = dir.join(MEMBERS_FILE);
    write_csv(&path, &["login", "email"], member_rows(roster.members().iter()))?;
    Ok(path)
}

/// Snapshot of every repository, so the operator can plan the next ranges
pub fn write_repositories_snapshot(
    dir: &Path,
    repositories: &[String],
) -> Result<PathBuf, ReportError> {
    let path = dir.join(REPOSITORIES_FILE);
    write_csv(
        &path,
        &["repositories"],
        repositories.iter().map(|r| RepositoryRow { repositories: r }),
    )?;
    Ok(path)
}

pub fn write_active_members(
    dir: &Path,
    rows: RowBounds,
    roster: &Roster,
) -> Result<PathBuf, ReportError> {
    let path = dir.join(active_members_file(rows));
    write_csv(&path, &["login", "email"], member_rows(roster.active_members()))?;
    Ok(path)
}

/// Every unrecognized author we ran into, duplicates included
pub fn write_unrecognized_authors(
    dir: &Path,
    authors: &[UnrecognizedAuthor],
) -> Result<PathBuf, ReportError> {
    let path = dir.join(UNRECOGNIZED_AUTHORS_FILE);
    write_csv(
        &path,
        &["name", "email"],
        authors.iter().map(|a| AuthorRow {
            name: a.name.as_deref().unwrap_or_default(),
            email: a.email.as_deref().unwrap_or_default(),
        }),
    )?;
    Ok(path)
}

pub fn write_member_rows(path: &Path, rows: &[MemberRow]) -> Result<usize, ReportError> {
    write_csv(path, &["login", "email"], rows.iter())
}

/// Read back a `login,email` report (members, active or inactive)
pub fn read_member_rows(path: &Path) -> Result<Vec<MemberRow>, ReportError> {
    let csv_error = |source| ReportError::Csv {
        path: path.to_path_buf(),
        source,
    };
    let mut reader = csv::Reader::from_path(path).map_err(csv_error)?;
    reader
        .deserialize()
        .collect::<Result<Vec<MemberRow>, _>>()
        .map_err(csv_error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::members::Member;

    fn roster() -> Roster {
        let mut roster = Roster::new([
            Member::new("alice", Some("alice@corp".to_string())),
            Member::new("bob", None),
            Member::new("carol", None),
        ]);
        roster.mark_active("alice");
        roster.mark_active("carol");
        roster
    }

    #[test]
    fn range_names_are_deterministic() {
        let rows = RowBounds::new(11, 20).unwrap();
        assert_eq!(active_members_file(rows), "active_members_11_20.csv");
        assert_ne!(
            active_members_file(rows),
            active_members_file(RowBounds::new(21, 30).unwrap())
        );
    }

    #[test]
    fn active_report_only_has_active_members() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_active_members(dir.path(), RowBounds::new(1, 5).unwrap(), &roster())
            .unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "login,email\nalice,alice@corp\ncarol,\n");
    }

    #[test]
    fn snapshots_cover_everything() {
        let dir = tempfile::tempdir().unwrap();
        let members = write_members_snapshot(dir.path(), &roster()).unwrap();
        let repositories = write_repositories_snapshot(
            dir.path(),
            &["acme/api".to_string(), "acme/web".to_string()],
        )
        .unwrap();

        assert_eq!(
            std::fs::read_to_string(members).unwrap(),
            "login,email\nalice,alice@corp\nbob,\ncarol,\n"
        );
        assert_eq!(
            std::fs::read_to_string(repositories).unwrap(),
            "repositories\nacme/api\nacme/web\n"
        );
    }

    #[test]
    fn empty_reports_still_have_a_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_unrecognized_authors(dir.path(), &[]).unwrap();
        assert_eq!(std::fs::read_to_string(path).unwrap(), "name,email\n");
    }

    #[test]
    fn unrecognized_authors_keep_duplicates() {
        let dir = tempfile::tempdir().unwrap();
        let ghost = UnrecognizedAuthor {
            name: Some("ghost".to_string()),
            email: Some("g@x".to_string()),
        };
        let path =
            write_unrecognized_authors(dir.path().join("nested").as_path(), &[ghost.clone(), ghost])
                .unwrap();

        assert_eq!(
            std::fs::read_to_string(path).unwrap(),
            "name,email\nghost,g@x\nghost,g@x\n"
        );
    }

    #[test]
    fn member_reports_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_members_snapshot(dir.path(), &roster()).unwrap();

        let rows = read_member_rows(&path).unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(
            rows[0],
            MemberRow {
                login: "alice".to_string(),
                email: "alice@corp".to_string()
            }
        );
        assert_eq!(rows[1].email, "");
    }
}
