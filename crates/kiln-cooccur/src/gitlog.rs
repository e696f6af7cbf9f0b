//! Parser for the git-log capture format.
//!
//! The graph is fed from
//! `git log --name-only --format='COMMIT %H %aI'`: a `COMMIT <hash>
//! <timestamp>` header per commit followed by the touched file paths, with
//! blank separator lines.

use crate::graph::CommitRecord;

/// Parse git-log output into commit records, newest first as git emits
/// them.
#[must_use]
pub fn parse_git_log(output: &str) -> Vec<CommitRecord> {
    let mut commits: Vec<CommitRecord> = Vec::new();

    for line in output.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        if let Some(header) = trimmed.strip_prefix("COMMIT ") {
            let mut parts = header.split_whitespace();
            let hash = parts.next().unwrap_or_default().to_string();
            let timestamp = parts.next().unwrap_or_default().to_string();
            commits.push(CommitRecord {
                hash,
                timestamp,
                files: Vec::new(),
            });
        } else if let Some(current) = commits.last_mut() {
            current.files.push(trimmed.to_string());
        }
        // A file line before any COMMIT header has no home; dropped.
    }

    commits
}
