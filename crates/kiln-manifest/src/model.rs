//! Serde model of the manifest document.

use camino::Utf8Path;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;

use crate::ManifestError;

/// A declared test target.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TestTarget {
    /// Path to the test binary; empty for report-only entries added by
    /// discovery.
    #[serde(default)]
    pub executable: String,
    /// Human description of what the test asserts.
    #[serde(default)]
    pub assertion: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub requirement_id: String,
    /// Declared dependencies, as target labels.
    #[serde(default)]
    pub depends_on: Vec<String>,
    /// Matrix-test parameters. These never enter store or inference
    /// identity; parameterizations of one target share a label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<BTreeMap<String, serde_json::Value>>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub disabled: bool,
}

/// A node of the hierarchical test-set tree used for reporting.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TestSetNode {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub assertion: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requirement_id: Option<String>,
    #[serde(default)]
    pub tests: Vec<String>,
    #[serde(default)]
    pub subsets: Vec<TestSetNode>,
}

/// The declared set of test targets plus their grouping tree.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub test_set: TestSetNode,
    #[serde(default)]
    pub test_set_tests: BTreeMap<String, TestTarget>,
}

impl Manifest {
    /// Load a manifest from a JSON file.
    pub fn load(path: &Utf8Path) -> Result<Self, ManifestError> {
        let text = fs::read_to_string(path).map_err(|source| ManifestError::Io {
            path: path.to_string(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| ManifestError::Parse {
            path: path.to_string(),
            source,
        })
    }

    /// Parse a manifest from a JSON string.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}
