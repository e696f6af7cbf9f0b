//! The status document and its operations.

use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use tracing::warn;

use crate::{StatusError, TestState};

/// Default target pass rate.
pub const DEFAULT_MIN_RELIABILITY: f64 = 0.99;

/// Default required confidence for SPRT decisions.
pub const DEFAULT_SIGNIFICANCE: f64 = 0.95;

/// Store-wide thresholds; these override the SPRT call defaults.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_min_reliability")]
    pub min_reliability: f64,
    #[serde(default = "default_significance")]
    pub statistical_significance: f64,
}

fn default_min_reliability() -> f64 {
    DEFAULT_MIN_RELIABILITY
}

fn default_significance() -> f64 {
    DEFAULT_SIGNIFICANCE
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            min_reliability: DEFAULT_MIN_RELIABILITY,
            statistical_significance: DEFAULT_SIGNIFICANCE,
        }
    }
}

/// One row of the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestEntry {
    pub state: TestState,
    pub runs: u64,
    pub passes: u64,
    pub last_updated: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct StatusDocument {
    #[serde(default)]
    config: StoreConfig,
    #[serde(default)]
    tests: BTreeMap<String, TestEntry>,
}

/// Durable keyed store of test entries plus global thresholds.
#[derive(Debug)]
pub struct StatusFile {
    path: Utf8PathBuf,
    doc: StatusDocument,
}

impl StatusFile {
    /// Open the store at `path`.
    ///
    /// Missing, empty, or malformed files yield an empty store with default
    /// config; a malformed document is logged and will be overwritten on
    /// the next `save()`.
    #[must_use]
    pub fn open(path: impl Into<Utf8PathBuf>) -> Self {
        let path = path.into();
        let doc = match fs::read_to_string(&path) {
            Ok(text) if text.trim().is_empty() => StatusDocument::default(),
            Ok(text) => match serde_json::from_str(&text) {
                Ok(doc) => doc,
                Err(err) => {
                    warn!(path = %path, %err, "corrupt status file, starting fresh");
                    StatusDocument::default()
                }
            },
            Err(_) => StatusDocument::default(),
        };
        Self { path, doc }
    }

    #[must_use]
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    #[must_use]
    pub fn min_reliability(&self) -> f64 {
        self.doc.config.min_reliability
    }

    #[must_use]
    pub fn statistical_significance(&self) -> f64 {
        self.doc.config.statistical_significance
    }

    #[must_use]
    pub fn config(&self) -> &StoreConfig {
        &self.doc.config
    }

    /// Partially update the store config; `None` leaves a value unchanged.
    pub fn set_config(&mut self, min_reliability: Option<f64>, significance: Option<f64>) {
        if let Some(v) = min_reliability {
            self.doc.config.min_reliability = v;
        }
        if let Some(v) = significance {
            self.doc.config.statistical_significance = v;
        }
    }

    #[must_use]
    pub fn get_test_state(&self, label: &str) -> Option<TestState> {
        self.doc.tests.get(label).map(|e| e.state)
    }

    #[must_use]
    pub fn get_test_entry(&self, label: &str) -> Option<&TestEntry> {
        self.doc.tests.get(label)
    }

    /// Labels currently in `state`, in label order.
    #[must_use]
    pub fn get_tests_by_state(&self, state: TestState) -> Vec<String> {
        self.doc
            .tests
            .iter()
            .filter(|(_, e)| e.state == state)
            .map(|(label, _)| label.clone())
            .collect()
    }

    #[must_use]
    pub fn get_all_tests(&self) -> &BTreeMap<String, TestEntry> {
        &self.doc.tests
    }

    /// Set a test's state, creating the entry if needed.
    ///
    /// Omitted counters are preserved on an existing entry and start at
    /// zero for a fresh one. `passes` is capped at `runs` so the invariant
    /// `passes <= runs` holds for every stored entry.
    pub fn set_test_state(
        &mut self,
        label: &str,
        state: TestState,
        runs: Option<u64>,
        passes: Option<u64>,
    ) {
        let now = Utc::now();
        let entry = self
            .doc
            .tests
            .entry(label.to_string())
            .or_insert_with(|| TestEntry {
                state,
                runs: 0,
                passes: 0,
                last_updated: now,
            });
        entry.state = state;
        if let Some(runs) = runs {
            entry.runs = runs;
        }
        if let Some(passes) = passes {
            entry.passes = passes;
        }
        entry.passes = entry.passes.min(entry.runs);
        entry.last_updated = now;
    }

    /// Record one execution outcome.
    ///
    /// Unknown labels get a fresh entry in state `new`; counters only ever
    /// grow here.
    pub fn record_run(&mut self, label: &str, passed: bool) {
        let now = Utc::now();
        let entry = self
            .doc
            .tests
            .entry(label.to_string())
            .or_insert_with(|| TestEntry {
                state: TestState::New,
                runs: 0,
                passes: 0,
                last_updated: now,
            });
        entry.runs += 1;
        if passed {
            entry.passes += 1;
        }
        entry.last_updated = now;
    }

    /// Promote a test into burn-in.
    ///
    /// Valid from `new` or for labels not yet in the store (a target that
    /// just appeared is implicitly new).
    pub fn promote(&mut self, label: &str) -> Result<(), StatusError> {
        match self.get_test_state(label) {
            None | Some(TestState::New) => {
                self.set_test_state(label, TestState::BurningIn, None, None);
                Ok(())
            }
            Some(from) => Err(StatusError::InvalidTransition {
                label: label.to_string(),
                from: from.as_str(),
                to: TestState::BurningIn.as_str(),
            }),
        }
    }

    /// Reset a flaky test back into burn-in, clearing its counters.
    ///
    /// This is the only operation that resets counters; every other
    /// transition preserves them.
    pub fn deflake(&mut self, label: &str) -> Result<(), StatusError> {
        match self.get_test_state(label) {
            Some(TestState::Flaky) => {
                self.set_test_state(label, TestState::BurningIn, Some(0), Some(0));
                Ok(())
            }
            Some(from) => Err(StatusError::InvalidTransition {
                label: label.to_string(),
                from: from.as_str(),
                to: TestState::BurningIn.as_str(),
            }),
            None => Err(StatusError::InvalidTransition {
                label: label.to_string(),
                from: "absent",
                to: TestState::BurningIn.as_str(),
            }),
        }
    }

    /// Remove an entry; returns whether it existed.
    pub fn remove_test(&mut self, label: &str) -> bool {
        self.doc.tests.remove(label).is_some()
    }

    /// Persist the full document atomically, creating parent directories.
    pub fn save(&self) -> Result<()> {
        let json = serde_json::to_string_pretty(&self.doc)
            .context("failed to serialize status document")?;
        kiln_utils::write_file_atomic(&self.path, &json)
            .with_context(|| format!("failed to write status file: {}", self.path))
    }
}
