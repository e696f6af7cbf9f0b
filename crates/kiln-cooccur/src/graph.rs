//! Graph construction, incremental update, and persistence.

use anyhow::{Context, Result};
use camino::Utf8Path;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use tracing::debug;

use crate::classify::{Classifier, ClassificationRules, FileClass};
use crate::GraphError;

/// One commit from history: hash, author timestamp, touched files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommitRecord {
    pub hash: String,
    pub timestamp: String,
    #[serde(default)]
    pub files: Vec<String>,
}

/// Per-commit file partition retained in the graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommitEntry {
    pub source_files: Vec<String>,
    pub test_files: Vec<String>,
    pub timestamp: String,
}

/// Graph bookkeeping, including the classification rules that built it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphMetadata {
    #[serde(default)]
    pub last_commit: Option<String>,
    #[serde(default)]
    pub total_commits_analyzed: u64,
    #[serde(flatten)]
    pub rules: ClassificationRules,
}

/// Bipartite file/commit co-occurrence graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoOccurrenceGraph {
    pub metadata: GraphMetadata,
    /// file path → commit hashes that touched it, duplicate-free.
    pub file_commits: BTreeMap<String, Vec<String>>,
    /// commit hash → retained file partition.
    pub commit_files: BTreeMap<String, CommitEntry>,
}

impl CoOccurrenceGraph {
    /// Empty graph with the given classification rules.
    #[must_use]
    pub fn empty(rules: ClassificationRules) -> Self {
        Self {
            metadata: GraphMetadata {
                last_commit: None,
                total_commits_analyzed: 0,
                rules,
            },
            file_commits: BTreeMap::new(),
            commit_files: BTreeMap::new(),
        }
    }

    /// Build a fresh graph from commit records.
    pub fn build(commits: &[CommitRecord], rules: ClassificationRules) -> Result<Self, GraphError> {
        let mut graph = Self::empty(rules);
        graph.update(commits)?;
        Ok(graph)
    }

    /// Ingest new commits incrementally.
    ///
    /// Commits whose hash is already present are skipped, as are commits
    /// with no source files. Existing entries are preserved untouched; an
    /// empty commit list is a no-op.
    pub fn update(&mut self, commits: &[CommitRecord]) -> Result<(), GraphError> {
        let classifier = Classifier::new(self.metadata.rules.clone())?;

        for commit in commits {
            if self.commit_files.contains_key(&commit.hash) {
                debug!(hash = %commit.hash, "commit already analyzed, skipping");
                continue;
            }

            let mut source_files = Vec::new();
            let mut test_files = Vec::new();
            for file in &commit.files {
                match classifier.classify(file) {
                    FileClass::Source if !source_files.contains(file) => {
                        source_files.push(file.clone());
                    }
                    FileClass::Test if !test_files.contains(file) => {
                        test_files.push(file.clone());
                    }
                    _ => {}
                }
            }

            // No source files means no coupling signal.
            if source_files.is_empty() {
                continue;
            }

            for file in source_files.iter().chain(test_files.iter()) {
                let hashes = self.file_commits.entry(file.clone()).or_default();
                if !hashes.contains(&commit.hash) {
                    hashes.push(commit.hash.clone());
                }
            }

            self.commit_files.insert(
                commit.hash.clone(),
                CommitEntry {
                    source_files,
                    test_files,
                    timestamp: commit.timestamp.clone(),
                },
            );
            self.metadata.last_commit = Some(commit.hash.clone());
            self.metadata.total_commits_analyzed += 1;
        }

        Ok(())
    }

    /// Test files historically co-modified with any of `changed_files`,
    /// in first-seen order. This is the graph half of impact prediction.
    #[must_use]
    pub fn impacted_test_files(&self, changed_files: &[String]) -> Vec<String> {
        let mut impacted: Vec<String> = Vec::new();
        for file in changed_files {
            let Some(hashes) = self.file_commits.get(file) else {
                continue;
            };
            for hash in hashes {
                let Some(entry) = self.commit_files.get(hash) else {
                    continue;
                };
                for test_file in &entry.test_files {
                    if !impacted.contains(test_file) {
                        impacted.push(test_file.clone());
                    }
                }
            }
        }
        impacted
    }

    /// Persist as JSON, creating parent directories.
    pub fn save(&self, path: &Utf8Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)
            .context("failed to serialize co-occurrence graph")?;
        kiln_utils::write_file_atomic(path, &json)
            .with_context(|| format!("failed to write co-occurrence graph: {path}"))
    }

    /// Load a previously saved graph.
    ///
    /// Returns `None` for a missing or malformed file; callers treat that
    /// as "no graph yet, rebuild".
    #[must_use]
    pub fn load(path: &Utf8Path) -> Option<Self> {
        let text = fs::read_to_string(path).ok()?;
        serde_json::from_str(&text).ok()
    }
}
