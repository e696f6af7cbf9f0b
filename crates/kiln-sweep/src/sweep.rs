//! The sweep loop, the stable-failure demotion handler, and state
//! filtering.

use anyhow::Result;
use kiln_manifest::TestDag;
use kiln_runner::ProcessRunner;
use kiln_sprt::{DemotionDecision, SprtDecision, demotion_evaluate_default, sprt_evaluate_default};
use kiln_status::{StatusFile, TestState};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::executor::execute_target;
use crate::{DEFAULT_MAX_ITERATIONS, DEFAULT_TIMEOUT_SECS};

/// Result of a burn-in sweep.
#[derive(Debug, Clone, Default)]
pub struct SweepResult {
    /// Tests decided this sweep and their final state.
    pub decided: BTreeMap<String, TestState>,
    /// Tests still burning in when the sweep stopped.
    pub undecided: Vec<String>,
    /// Total test executions performed.
    pub total_runs: u64,
}

/// Drives `burning_in` tests through SPRT until each is decided.
pub struct BurnInSweep<'a, R: ProcessRunner> {
    dag: &'a TestDag,
    status: &'a mut StatusFile,
    runner: R,
    max_iterations: u32,
    timeout: Duration,
}

impl<'a, R: ProcessRunner> BurnInSweep<'a, R> {
    pub fn new(dag: &'a TestDag, status: &'a mut StatusFile, runner: R) -> Self {
        Self {
            dag,
            status,
            runner,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    #[must_use]
    pub fn max_iterations(mut self, max_iterations: u32) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Execute the sweep.
    ///
    /// With explicit `test_names` only those currently `burning_in` are
    /// swept; otherwise every `burning_in` label in the store. Iteration
    /// works on a snapshot of the set, so in-iteration retirements do not
    /// disturb ordering. `max_iterations` bounds tests that never decide.
    pub fn run(&mut self, test_names: Option<&[String]>) -> Result<SweepResult> {
        let mut burning_in: Vec<String> = match test_names {
            Some(names) => names
                .iter()
                .filter(|t| self.status.get_test_state(t) == Some(TestState::BurningIn))
                .cloned()
                .collect(),
            None => self.status.get_tests_by_state(TestState::BurningIn),
        };

        let mut decided = BTreeMap::new();
        let mut total_runs: u64 = 0;
        let mut iteration: u32 = 0;

        while !burning_in.is_empty() && iteration < self.max_iterations {
            iteration += 1;

            for name in burning_in.clone() {
                // Manifest/store drift: a stored test may be gone from the
                // DAG.
                let Some(node) = self.dag.node(&name) else {
                    debug!(test = %name, "not in DAG, skipping");
                    continue;
                };

                let result = execute_target(&self.runner, &name, node, self.timeout);
                total_runs += 1;

                self.status.record_run(&name, result.passed());
                self.status.save()?;

                let Some(entry) = self.status.get_test_entry(&name) else {
                    continue;
                };
                let (runs, passes) = (entry.runs, entry.passes);

                let decision = sprt_evaluate_default(
                    runs,
                    passes,
                    self.status.min_reliability(),
                    self.status.statistical_significance(),
                );

                match decision {
                    SprtDecision::Accept => {
                        self.status
                            .set_test_state(&name, TestState::Stable, Some(runs), Some(passes));
                        self.status.save()?;
                        info!(test = %name, runs, passes, "burn-in accepted, now stable");
                        decided.insert(name.clone(), TestState::Stable);
                        burning_in.retain(|t| t != &name);
                    }
                    SprtDecision::Reject => {
                        self.status
                            .set_test_state(&name, TestState::Flaky, Some(runs), Some(passes));
                        self.status.save()?;
                        warn!(test = %name, runs, passes, "burn-in rejected, marked flaky");
                        decided.insert(name.clone(), TestState::Flaky);
                        burning_in.retain(|t| t != &name);
                    }
                    SprtDecision::Continue => {}
                }
            }
        }

        Ok(SweepResult {
            decided,
            undecided: burning_in,
            total_runs,
        })
    }
}

/// Evaluate whether a failed stable test should be demoted.
///
/// Re-runs the test up to `max_reruns` times, recording every outcome, and
/// feeds the rerun outcomes — newest first, and only the reruns, never
/// pre-existing history — to the demotion SPRT. On demote the test moves
/// `stable → flaky` with the store's current counters.
pub fn handle_stable_failure<R: ProcessRunner>(
    label: &str,
    dag: &TestDag,
    status: &mut StatusFile,
    runner: &R,
    max_reruns: u32,
    timeout: Duration,
) -> Result<DemotionDecision> {
    let Some(node) = dag.node(label) else {
        return Ok(DemotionDecision::Inconclusive);
    };

    let mut rerun_results: Vec<bool> = Vec::new();

    for _ in 0..max_reruns {
        let result = execute_target(runner, label, node, timeout);
        rerun_results.push(result.passed());
        status.record_run(label, result.passed());
        status.save()?;

        let history: Vec<bool> = rerun_results.iter().rev().copied().collect();
        let decision = demotion_evaluate_default(
            &history,
            status.min_reliability(),
            status.statistical_significance(),
        );

        match decision {
            DemotionDecision::Demote => {
                let (runs, passes) = status
                    .get_test_entry(label)
                    .map_or((0, 0), |e| (e.runs, e.passes));
                status.set_test_state(label, TestState::Flaky, Some(runs), Some(passes));
                status.save()?;
                warn!(test = %label, runs, passes, "stable test demoted to flaky");
                return Ok(DemotionDecision::Demote);
            }
            DemotionDecision::Retain => {
                info!(test = %label, "stable test retained after reruns");
                return Ok(DemotionDecision::Retain);
            }
            DemotionDecision::Inconclusive => {}
        }
    }

    Ok(DemotionDecision::Inconclusive)
}

/// DAG labels whose store state is in `include_states`.
///
/// Labels absent from the store are treated as `stable`: they appear iff
/// `stable` is included.
#[must_use]
pub fn filter_tests_by_state(
    dag: &TestDag,
    status: &StatusFile,
    include_states: &[TestState],
) -> Vec<String> {
    dag.labels()
        .filter(|label| match status.get_test_state(label) {
            Some(state) => include_states.contains(&state),
            None => include_states.contains(&TestState::Stable),
        })
        .map(ToString::to_string)
        .collect()
}
