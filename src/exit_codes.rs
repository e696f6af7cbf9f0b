//! Exit code constants and error mapping for the kiln CLI.

use kiln_manifest::ManifestError;
use kiln_status::StatusError;
use kiln_workspace::DiscoveryError;

/// Exit code constants.
pub mod codes {
    /// Operation completed; for a sweep, every scheduled test was decided
    /// or the iteration cap was reached cleanly.
    pub const SUCCESS: i32 = 0;

    /// Unclassified failure.
    pub const GENERAL: i32 = 1;

    /// Invalid arguments, config, manifest, or discovery input.
    pub const CLI_ARGS: i32 = 2;

    /// Another process holds the status store lock.
    pub const LOCK_HELD: i32 = 9;
}

/// Process exit code wrapper returned by `cli::run`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitCode(i32);

impl ExitCode {
    #[must_use]
    pub const fn new(code: i32) -> Self {
        Self(code)
    }

    #[must_use]
    pub const fn as_i32(self) -> i32 {
        self.0
    }
}

/// Map an error chain to an exit code.
///
/// Precondition failures (bad arguments, unreadable manifest or discovery
/// document, invalid state names) exit 2; a held lock exits 9; anything
/// else is a general failure.
#[must_use]
pub fn exit_code_for(err: &anyhow::Error) -> ExitCode {
    for cause in err.chain() {
        if let Some(status_err) = cause.downcast_ref::<StatusError>() {
            return match status_err {
                StatusError::LockHeld { .. } => ExitCode::new(codes::LOCK_HELD),
                StatusError::InvalidState { .. } | StatusError::InvalidTransition { .. } => {
                    ExitCode::new(codes::CLI_ARGS)
                }
                StatusError::LockIo { .. } => ExitCode::new(codes::GENERAL),
            };
        }
        if cause.downcast_ref::<ManifestError>().is_some()
            || cause.downcast_ref::<DiscoveryError>().is_some()
        {
            return ExitCode::new(codes::CLI_ARGS);
        }
    }
    ExitCode::new(codes::GENERAL)
}
