//! Single-test execution through the runner seam.

use kiln_manifest::TestNode;
use kiln_runner::{CommandSpec, ProcessRunner};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Outcome classification for one execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestStatus {
    Passed,
    Failed,
}

impl TestStatus {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Passed => "passed",
            Self::Failed => "failed",
        }
    }
}

/// One execution of a test target.
///
/// Exit code 0 is the only passing outcome; timeouts, spawn failures, and
/// OS errors all map to `Failed` with the error captured in `stderr` and
/// `-1` in `exit_code` (reserved for internal failures).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestResult {
    pub name: String,
    pub assertion: String,
    pub status: TestStatus,
    pub duration: Duration,
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

impl TestResult {
    #[must_use]
    pub fn passed(&self) -> bool {
        self.status == TestStatus::Passed
    }
}

/// Execute one test node and classify the outcome.
pub fn execute_target<R: ProcessRunner>(
    runner: &R,
    name: &str,
    node: &TestNode,
    timeout: Duration,
) -> TestResult {
    let cmd = CommandSpec::new(&node.executable);
    let start = Instant::now();

    match runner.run(&cmd, timeout) {
        Ok(output) => {
            let status = if output.success() {
                TestStatus::Passed
            } else {
                TestStatus::Failed
            };
            TestResult {
                name: name.to_string(),
                assertion: node.assertion.clone(),
                status,
                duration: start.elapsed(),
                stdout: output.stdout_string(),
                stderr: output.stderr_string(),
                exit_code: output.exit_code.unwrap_or(-1),
            }
        }
        Err(err) => TestResult {
            name: name.to_string(),
            assertion: node.assertion.clone(),
            status: TestStatus::Failed,
            duration: start.elapsed(),
            stdout: String::new(),
            stderr: err.to_string(),
            exit_code: -1,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kiln_runner::{ProcessOutput, RunnerError};

    struct OkRunner {
        exit_code: i32,
    }

    impl ProcessRunner for OkRunner {
        fn run(
            &self,
            _cmd: &CommandSpec,
            _timeout: Duration,
        ) -> Result<ProcessOutput, RunnerError> {
            Ok(ProcessOutput::new(
                b"out".to_vec(),
                b"err".to_vec(),
                Some(self.exit_code),
            ))
        }
    }

    struct ErrRunner {
        error: fn() -> RunnerError,
    }

    impl ProcessRunner for ErrRunner {
        fn run(
            &self,
            _cmd: &CommandSpec,
            _timeout: Duration,
        ) -> Result<ProcessOutput, RunnerError> {
            Err((self.error)())
        }
    }

    fn node() -> TestNode {
        TestNode {
            executable: "bin/sample_test".to_string(),
            assertion: "Sample works".to_string(),
            depends_on: Vec::new(),
        }
    }

    #[test]
    fn test_exit_zero_is_passed() {
        let result = execute_target(
            &OkRunner { exit_code: 0 },
            "//t:a",
            &node(),
            Duration::from_secs(5),
        );
        assert!(result.passed());
        assert_eq!(result.exit_code, 0);
        assert_eq!(result.stdout, "out");
    }

    #[test]
    fn test_nonzero_exit_is_failed() {
        let result = execute_target(
            &OkRunner { exit_code: 3 },
            "//t:a",
            &node(),
            Duration::from_secs(5),
        );
        assert!(!result.passed());
        assert_eq!(result.exit_code, 3);
    }

    #[test]
    fn test_timeout_maps_to_failed_with_internal_exit_code() {
        let result = execute_target(
            &ErrRunner {
                error: || RunnerError::Timeout { timeout_seconds: 5 },
            },
            "//t:a",
            &node(),
            Duration::from_secs(5),
        );
        assert!(!result.passed());
        assert_eq!(result.exit_code, -1);
        assert!(result.stderr.contains("timed out"));
    }

    #[test]
    fn test_spawn_failure_maps_to_failed() {
        let result = execute_target(
            &ErrRunner {
                error: || RunnerError::SpawnFailed {
                    program: "bin/missing".to_string(),
                    reason: "No such file or directory".to_string(),
                },
            },
            "//t:a",
            &node(),
            Duration::from_secs(5),
        );
        assert!(!result.passed());
        assert_eq!(result.exit_code, -1);
        assert!(result.stderr.contains("No such file"));
    }
}
