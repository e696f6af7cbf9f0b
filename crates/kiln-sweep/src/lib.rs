//! Burn-in sweep: drive undecided tests through SPRT to a decision.
//!
//! The sweep repeatedly executes every `burning_in` test, records each
//! outcome in the status store, and retires tests as SPRT decides them:
//! accept moves a test to `stable`, reject to `flaky`. The store is saved
//! after every recorded run and every transition, so an abrupt exit leaves
//! it consistent with the most recent durable outcome.
//!
//! [`handle_stable_failure`] is the independent demotion entry point: a
//! stable test that failed gets re-run, and a reverse-chronological SPRT
//! over the rerun outcomes decides whether it regressed.

mod executor;
mod sweep;

pub use executor::{TestResult, TestStatus, execute_target};
pub use sweep::{BurnInSweep, SweepResult, filter_tests_by_state, handle_stable_failure};

/// Default cap on full sweep iterations.
pub const DEFAULT_MAX_ITERATIONS: u32 = 200;

/// Default per-test wall-clock timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;
