//! Event model for the telemetry protocol.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Raw wire event, tagged by the `type` field.
///
/// Every field is optional: emitters may omit fields, and extra keys (such
/// as the SDK's `_file`/`_line` source tags) are tolerated. Unknown tags
/// land on [`RawEvent::Unknown`] and are skipped by the parser.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub(crate) enum RawEvent {
    Phase {
        #[serde(default)]
        block: Option<String>,
    },
    BlockStart {
        #[serde(default)]
        block: Option<String>,
    },
    BlockEnd {},
    Feature {
        #[serde(default)]
        name: Option<String>,
    },
    Measurement {
        #[serde(default)]
        name: Option<String>,
        #[serde(default)]
        value: Option<Value>,
        #[serde(default)]
        unit: Option<String>,
    },
    Result {
        #[serde(default)]
        name: Option<String>,
        #[serde(default)]
        passed: Option<bool>,
        #[serde(default)]
        status: Option<String>,
        #[serde(default)]
        message: Option<String>,
    },
    Error {
        #[serde(default)]
        name: Option<String>,
        #[serde(default)]
        message: Option<String>,
    },
    StepStart {},
    StepEnd {},
    #[serde(other)]
    Unknown,
}

/// A feature declaration, tagged with the block current at emission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureRecord {
    pub name: String,
    pub block: Option<String>,
}

/// A named measurement with an optional value and unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasurementRecord {
    pub name: String,
    pub value: Option<Value>,
    pub unit: Option<String>,
    pub block: Option<String>,
}

/// An assertion outcome.
///
/// Emitters use either `{"status": "pass"|"fail", "message": ...}` or the
/// SDK form `{"name": ..., "passed": bool}`; both normalise into `status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultRecord {
    pub name: String,
    pub status: String,
    pub message: String,
    pub block: Option<String>,
}

/// An error event; errors in the rigging block mark setup failures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorRecord {
    pub name: String,
    pub message: String,
    pub block: Option<String>,
}
