//! Durable per-test burn-in status store.
//!
//! One JSON document holds the store config (reliability thresholds shared
//! by every SPRT call) and a row per test label: lifecycle state, cumulative
//! run/pass counters, and a wall-clock `last_updated` stamp. The sweep loop
//! saves after every recorded outcome, so the document on disk is always
//! consistent with the most recent durable result.
//!
//! Opening a missing, empty, or corrupt file yields an empty store with
//! default config rather than an error: a fresh workspace boots without
//! ceremony, and a half-written document from a crashed process degrades to
//! a re-burn-in instead of a hard failure.

mod lock;
mod state;
mod store;

pub use lock::StatusLock;
pub use state::TestState;
pub use store::{DEFAULT_MIN_RELIABILITY, DEFAULT_SIGNIFICANCE, StatusFile, StoreConfig, TestEntry};

use thiserror::Error;

/// Domain errors for the status store.
#[derive(Debug, Error)]
pub enum StatusError {
    #[error("invalid test state: {value}")]
    InvalidState { value: String },

    #[error("invalid transition for {label}: {from} -> {to}")]
    InvalidTransition {
        label: String,
        from: &'static str,
        to: &'static str,
    },

    #[error("status store is locked by another process: {path}")]
    LockHeld { path: String },

    #[error("failed to access status lock {path}: {source}")]
    LockIo {
        path: String,
        source: std::io::Error,
    },
}
