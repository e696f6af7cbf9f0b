//! Lifecycle states of a test target.

use crate::StatusError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Burn-in lifecycle state.
///
/// Transitions: `new → burning_in` (promote), `burning_in → stable` (SPRT
/// accept), `burning_in → flaky` (SPRT reject), `stable → flaky`
/// (demotion), `flaky → burning_in` (deflake, counters reset). Labels
/// absent from the store are treated as `stable` by queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestState {
    New,
    BurningIn,
    Stable,
    Flaky,
}

impl TestState {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::New => "new",
            Self::BurningIn => "burning_in",
            Self::Stable => "stable",
            Self::Flaky => "flaky",
        }
    }
}

impl fmt::Display for TestState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TestState {
    type Err = StatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "new" => Ok(Self::New),
            "burning_in" => Ok(Self::BurningIn),
            "stable" => Ok(Self::Stable),
            "flaky" => Ok(Self::Flaky),
            other => Err(StatusError::InvalidState {
                value: other.to_string(),
            }),
        }
    }
}
