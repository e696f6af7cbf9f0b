//! Instrumentation SDK for the `[TST] ` telemetry protocol.
//!
//! Test programs declare phases, features, measurements, and assertions
//! through a [`Probe`]. Blocks and steps are scoped guards: the start event
//! is emitted when the guard is created and the end event when it drops, on
//! every exit path. While a guard is live it holds the only mutable borrow,
//! so the parent scope cannot emit — the borrow checker enforces what the
//! original protocol calls a "sealed" parent.
//!
//! A critical assertion failure surfaces as a [`CriticalFailure`] the test
//! propagates with `?`; guards still emit their end events as the error
//! unwinds to the outer scope.
//!
//! ```
//! use kiln_probe::{CriticalFailure, Probe};
//!
//! fn body(probe: &mut Probe<Vec<u8>>) -> Result<(), CriticalFailure> {
//!     {
//!         let mut rigging = probe.block("rigging");
//!         rigging.feature("user_auth", "initialize");
//!     }
//!     let mut verdict = probe.block("verdict");
//!     verdict.assert_critical("login_flow", true)?;
//!     Ok(())
//! }
//!
//! let mut probe = Probe::new(Vec::new());
//! let _ = body(&mut probe);
//! assert_eq!(probe.exit_code(), 0);
//! ```

use serde_json::{Value, json};
use std::io::{self, Write};
use thiserror::Error;

/// A critical assertion or error that aborts the current test body.
///
/// The event was already emitted when this is returned; the outer scope
/// only needs to stop and report the exit code.
#[derive(Debug, Clone, Error)]
#[error("critical failure: {name}: {message}")]
pub struct CriticalFailure {
    pub name: String,
    pub message: String,
}

/// Telemetry emitter for one test process.
pub struct Probe<W: Write> {
    sink: W,
    failures: Vec<String>,
}

impl Probe<io::Stdout> {
    /// Probe writing to stdout, where the orchestrator reads events.
    #[must_use]
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> Probe<W> {
    #[must_use]
    pub fn new(sink: W) -> Self {
        Self {
            sink,
            failures: Vec::new(),
        }
    }

    /// Open a top-level block; emits `block_start` now and `block_end` on
    /// drop.
    pub fn block(&mut self, name: &str) -> Scope<'_, W> {
        Scope::open(self, ScopeKind::Block, name)
    }

    /// Process exit code: 1 if any assertion failed, 0 otherwise.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        i32::from(!self.failures.is_empty())
    }

    /// Names of failed assertions and errors, in order.
    #[must_use]
    pub fn failures(&self) -> &[String] {
        &self.failures
    }

    fn emit(&mut self, event: Value) {
        // Telemetry is best-effort: a broken pipe must not turn a passing
        // test into a panic.
        let _ = writeln!(self.sink, "[TST] {event}");
    }
}

#[derive(Clone, Copy)]
enum ScopeKind {
    Block,
    Step,
}

impl ScopeKind {
    const fn start_type(self) -> &'static str {
        match self {
            Self::Block => "block_start",
            Self::Step => "step_start",
        }
    }

    const fn end_type(self) -> &'static str {
        match self {
            Self::Block => "block_end",
            Self::Step => "step_end",
        }
    }

    const fn name_key(self) -> &'static str {
        match self {
            Self::Block => "block",
            Self::Step => "step",
        }
    }
}

/// Live block or step; the exclusive emission handle while it exists.
pub struct Scope<'a, W: Write> {
    probe: &'a mut Probe<W>,
    kind: ScopeKind,
    name: String,
}

impl<'a, W: Write> Scope<'a, W> {
    fn open(probe: &'a mut Probe<W>, kind: ScopeKind, name: &str) -> Self {
        probe.emit(json!({"type": kind.start_type(), (kind.name_key()): name}));
        Self {
            probe,
            kind,
            name: name.to_string(),
        }
    }

    /// Open a nested step; the current scope is sealed until it drops.
    pub fn step(&mut self, name: &str) -> Scope<'_, W> {
        Scope::open(self.probe, ScopeKind::Step, name)
    }

    /// Declare that this test relies on a named feature.
    pub fn feature(&mut self, name: &str, action: &str) {
        self.probe
            .emit(json!({"type": "feature", "name": name, "action": action}));
    }

    /// Record a named measurement.
    pub fn measure(&mut self, name: &str, value: f64, unit: &str) {
        self.probe
            .emit(json!({"type": "measurement", "name": name, "value": value, "unit": unit}));
    }

    /// Record an assertion outcome. A failure marks the test failed but
    /// execution continues.
    pub fn assert_that(&mut self, name: &str, passed: bool) {
        self.probe
            .emit(json!({"type": "result", "name": name, "passed": passed}));
        if !passed {
            self.probe.failures.push(name.to_string());
        }
    }

    /// Record an assertion whose failure aborts the test body.
    pub fn assert_critical(&mut self, name: &str, passed: bool) -> Result<(), CriticalFailure> {
        self.assert_that(name, passed);
        if passed {
            Ok(())
        } else {
            Err(CriticalFailure {
                name: name.to_string(),
                message: "critical assertion failed".to_string(),
            })
        }
    }

    /// Emit an error event and abort the test body. In the rigging block
    /// this marks a setup failure rather than an assertion failure.
    pub fn fail(&mut self, name: &str, message: &str) -> Result<(), CriticalFailure> {
        self.probe
            .emit(json!({"type": "error", "name": name, "message": message}));
        self.probe.failures.push(name.to_string());
        Err(CriticalFailure {
            name: name.to_string(),
            message: message.to_string(),
        })
    }
}

impl<W: Write> Drop for Scope<'_, W> {
    fn drop(&mut self) {
        let event = json!({"type": self.kind.end_type(), (self.kind.name_key()): self.name.as_str()});
        self.probe.emit(event);
    }
}
