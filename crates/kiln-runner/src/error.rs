//! Runner error types.

use thiserror::Error;

/// Process execution errors.
#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("failed to spawn process '{program}': {reason}")]
    SpawnFailed { program: String, reason: String },

    #[error("failed to wait for process: {reason}")]
    WaitFailed { reason: String },

    #[error("execution timed out after {timeout_seconds} seconds")]
    Timeout { timeout_seconds: u64 },
}
