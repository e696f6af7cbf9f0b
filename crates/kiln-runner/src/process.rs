//! Process output and the runner seam.

use std::time::Duration;

use crate::{CommandSpec, RunnerError};

/// Output from a completed process execution.
#[derive(Debug, Clone)]
pub struct ProcessOutput {
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    /// None when the process was terminated by a signal.
    pub exit_code: Option<i32>,
}

impl ProcessOutput {
    #[must_use]
    pub fn new(stdout: Vec<u8>, stderr: Vec<u8>, exit_code: Option<i32>) -> Self {
        Self {
            stdout,
            stderr,
            exit_code,
        }
    }

    /// Stdout as a string, lossy conversion.
    #[must_use]
    pub fn stdout_string(&self) -> String {
        String::from_utf8_lossy(&self.stdout).to_string()
    }

    /// Stderr as a string, lossy conversion.
    #[must_use]
    pub fn stderr_string(&self) -> String {
        String::from_utf8_lossy(&self.stderr).to_string()
    }

    /// Whether the process exited with code 0.
    #[must_use]
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Synchronous process execution seam.
///
/// Implementations MUST use argv-style APIs only — no `sh -c`, no
/// `cmd /C`. The sweep loop depends on nothing beyond this trait, so tests
/// substitute scripted runners for real children.
pub trait ProcessRunner {
    /// Execute a command, blocking until exit or timeout.
    ///
    /// Returns `Ok` when the process completed (possibly with a non-zero
    /// exit code), `Err(RunnerError::Timeout)` when the wall clock expired,
    /// and other `RunnerError` variants for spawn/wait failures.
    fn run(&self, cmd: &CommandSpec, timeout: Duration) -> Result<ProcessOutput, RunnerError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_requires_zero_exit() {
        assert!(ProcessOutput::new(Vec::new(), Vec::new(), Some(0)).success());
        assert!(!ProcessOutput::new(Vec::new(), Vec::new(), Some(1)).success());
        assert!(!ProcessOutput::new(Vec::new(), Vec::new(), None).success());
    }

    #[test]
    fn test_lossy_utf8_conversion() {
        let invalid = vec![0xff, 0xfe, 0x00, 0x01];
        let output = ProcessOutput::new(invalid.clone(), invalid, Some(0));
        assert!(!output.stdout_string().is_empty());
        assert!(!output.stderr_string().is_empty());
    }

    struct ScriptedRunner {
        output: ProcessOutput,
    }

    impl ProcessRunner for ScriptedRunner {
        fn run(
            &self,
            _cmd: &CommandSpec,
            _timeout: Duration,
        ) -> Result<ProcessOutput, RunnerError> {
            Ok(self.output.clone())
        }
    }

    #[test]
    fn test_runner_seam_is_substitutable() {
        let runner = ScriptedRunner {
            output: ProcessOutput::new(b"out".to_vec(), b"err".to_vec(), Some(0)),
        };
        let cmd = CommandSpec::new("test");
        let output = runner.run(&cmd, Duration::from_secs(30)).unwrap();
        assert_eq!(output.stdout_string(), "out");
        assert!(output.success());
    }
}
