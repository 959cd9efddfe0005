use std::{
    collections::HashSet,
    path::{Path, PathBuf},
};

use colored::Colorize;

use crate::report::{self, MemberRow, ReportError, INACTIVE_MEMBERS_FILE, MEMBERS_FILE};

/// Members of the roster that show up in none of the active sets.
/// Roster order is kept.
pub fn inactive_members<'a>(
    roster: &'a [MemberRow],
    active_sets: &[Vec<MemberRow>],
) -> Vec<&'a MemberRow> {
    let active: HashSet<&str> = active_sets
        .iter()
        .flatten()
        .map(|row| row.login.as_str())
        .collect();

    roster
        .iter()
        .filter(|row| !active.contains(row.login.as_str()))
        .collect()
}

/// Merge the active members reports of several runs and diff them against
/// the members snapshot in `dir`. Writes the inactive members report next
/// to the snapshot and returns its path.
///
/// This only makes sense once the partitions cover every repository; we
/// can't check that from here.
pub fn run_reconciliation(dir: &Path, partitions: &[PathBuf]) -> Result<PathBuf, ReportError> {
    println!(
        "{}",
        "I'm going to reconcile the active members of every partition".yellow()
    );

    let roster = report::read_member_rows(&dir.join(MEMBERS_FILE))?;
    println!(
        "{} {} {}",
        "I have".green(),
        roster.len().to_string().white(),
        "members in the snapshot".green()
    );

    let mut active_sets = Vec::with_capacity(partitions.len());
    for partition in partitions {
        let rows = report::read_member_rows(partition)?;
        println!(
            "{} {}: {} {}",
            "Partition".green(),
            partition.display().to_string().white(),
            rows.len().to_string().white(),
            "active members".green()
        );
        active_sets.push(rows);
    }

    let inactive: Vec<MemberRow> = inactive_members(&roster, &active_sets)
        .into_iter()
        .cloned()
        .collect();
    println!(
        "{} {} {}",
        "I found".yellow(),
        inactive.len().to_string().white(),
        "inactive members".yellow()
    );

    let path = dir.join(INACTIVE_MEMBERS_FILE);
    report::write_member_rows(&path, &inactive)?;
    Ok(path)
}
