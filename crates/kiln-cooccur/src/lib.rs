//! File/commit co-occurrence graph.
//!
//! Historical co-modification is a usable proxy for semantic coupling:
//! when a source file changes, the test files that were repeatedly
//! committed together with it are likely to be affected. The graph is a
//! bipartite mapping between files and the commits that touched them,
//! built from git history once and refreshed incrementally.
//!
//! Commits with no source files (docs, config, pure-test churn) carry no
//! coupling signal and are skipped entirely.

mod classify;
mod gitlog;
mod graph;

pub use classify::{Classifier, ClassificationRules, FileClass};
pub use gitlog::parse_git_log;
pub use graph::{CommitEntry, CommitRecord, CoOccurrenceGraph, GraphMetadata};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum GraphError {
    #[error("invalid test pattern: {source}")]
    Pattern {
        #[from]
        source: globset::Error,
    },
}
