//! kiln - test orchestration and burn-in engine.
//!
//! kiln executes declared test targets, repeatedly runs probationary tests
//! and classifies them by empirical reliability using a sequential
//! probability ratio test, and demotes previously-trusted tests when they
//! regress. Structured `[TST] ` telemetry emitted by test binaries feeds
//! setup-failure detection and advisory dependency inference.
//!
//! The workspace crates carry the engine; this crate wires them into the
//! `kiln` CLI and re-exports the core types for library consumers.

pub mod cli;
pub mod config;
pub mod exit_codes;

// Core types and operations used by external consumers
pub use kiln_cooccur::{ClassificationRules, CoOccurrenceGraph, CommitRecord, parse_git_log};
pub use kiln_inference::{InferredDependency, infer_rigging_dependencies, predict_impacted_targets};
pub use kiln_manifest::{Manifest, TestDag, normalize_label};
pub use kiln_runner::{CommandSpec, NativeRunner, ProcessRunner};
pub use kiln_sprt::{DemotionDecision, SprtDecision, demotion_evaluate, sprt_evaluate};
pub use kiln_status::{StatusFile, StatusLock, TestState};
pub use kiln_sweep::{BurnInSweep, SweepResult, filter_tests_by_state, handle_stable_failure};
pub use kiln_telemetry::{ParsedOutput, parse_output};
pub use kiln_workspace::{WorkspaceDiscovery, merge_discovered_tests};

/// kiln version string.
#[must_use]
pub fn kiln_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
