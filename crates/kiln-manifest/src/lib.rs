//! Manifest model and test dependency DAG.
//!
//! The manifest is consumed as given: a `test_set` tree for reporting plus
//! a `test_set_tests` table of executable targets with declared
//! dependencies. The DAG materialised from it is read-only for the sweep
//! loop; unknown dependency references are dropped at materialisation time,
//! never at runtime, and traversal is cycle-safe.

mod dag;
mod model;

pub use dag::{TestDag, TestNode};
pub use model::{Manifest, TestSetNode, TestTarget};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("failed to read manifest {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("failed to parse manifest {path}: {source}")]
    Parse {
        path: String,
        source: serde_json::Error,
    },
}

/// Normalize a target label for comparison across sources.
///
/// Strips the doubled-sigil prefix some toolchains add to canonical labels,
/// so `@@//pkg:target` compares equal to `//pkg:target`.
#[must_use]
pub fn normalize_label(label: &str) -> &str {
    label.strip_prefix("@@").unwrap_or(label)
}
