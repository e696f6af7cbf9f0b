//! Merge workspace-discovered test targets into a manifest copy.
//!
//! Discovery hands over an already-parsed document: individual tests and
//! hierarchical test-set groupings found across the workspace. Merging
//! decorates a copy of the executing manifest so reports show the full
//! workspace DAG shape regardless of which test set ran — only statuses
//! differ. Merged-in tests carry an empty executable and are never
//! scheduled; the merge exists for reporting only.
//!
//! The input manifest is never mutated.

use camino::Utf8Path;
use kiln_manifest::{Manifest, TestSetNode, TestTarget, normalize_label};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("failed to read discovery document {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("failed to parse discovery document {path}: {source}")]
    Parse {
        path: String,
        source: serde_json::Error,
    },
}

/// One discovered individual test.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiscoveredTest {
    pub label: String,
    #[serde(default)]
    pub assertion: String,
    #[serde(default)]
    pub requirement_id: String,
    #[serde(default)]
    pub disabled: bool,
    /// Dependencies, already resolved to test labels.
    #[serde(default)]
    pub depends_on: Vec<String>,
}

/// One discovered test-set grouping.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiscoveredTestSet {
    /// Rule label of the set; subset references point at these (or at
    /// their aliases).
    pub label: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub assertion: String,
    #[serde(default)]
    pub requirement_id: String,
    /// Member test labels.
    #[serde(default)]
    pub tests: Vec<String>,
    /// Labels of child test sets.
    #[serde(default)]
    pub subsets: Vec<String>,
}

/// The full discovery document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkspaceDiscovery {
    #[serde(default)]
    pub tests: Vec<DiscoveredTest>,
    #[serde(default)]
    pub test_sets: Vec<DiscoveredTestSet>,
}

impl WorkspaceDiscovery {
    /// Load a discovery document from a JSON file.
    pub fn load(path: &Utf8Path) -> Result<Self, DiscoveryError> {
        let text = fs::read_to_string(path).map_err(|source| DiscoveryError::Io {
            path: path.to_string(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| DiscoveryError::Parse {
            path: path.to_string(),
            source,
        })
    }
}

/// Merge discovered tests and test sets into a copy of `manifest`.
///
/// Tests already present (matched by normalized label) are skipped; new
/// tests are added with an empty executable. Discovered root test sets
/// become peers of the manifest root under a synthetic `Workspace` node,
/// and tests placed in no discovered tree land in an "Other workspace
/// tests" bucket. When discovery adds nothing, the manifest structure is
/// returned untouched.
#[must_use]
pub fn merge_discovered_tests(manifest: &Manifest, discovery: &WorkspaceDiscovery) -> Manifest {
    let mut merged = manifest.clone();

    // Normalized lookup of existing labels, preserving the manifest's
    // sigil form as the canonical key.
    let existing_normalized: BTreeMap<String, String> = merged
        .test_set_tests
        .keys()
        .map(|key| (normalize_label(key).to_string(), key.clone()))
        .collect();
    let mut all_normalized: BTreeSet<String> = existing_normalized.keys().cloned().collect();

    let mut new_labels: Vec<String> = Vec::new();

    for entry in &discovery.tests {
        let norm = normalize_label(&entry.label);
        if existing_normalized.contains_key(norm) {
            continue;
        }
        all_normalized.insert(norm.to_string());
        new_labels.push(entry.label.clone());

        merged.test_set_tests.insert(
            entry.label.clone(),
            TestTarget {
                executable: String::new(), // not executed, report-only
                assertion: entry.assertion.clone(),
                requirement_id: entry.requirement_id.clone(),
                depends_on: Vec::new(), // populated once all labels are known
                parameters: None,
                disabled: entry.disabled,
            },
        );
    }

    if new_labels.is_empty() {
        return merged;
    }

    // Resolve depends_on for the new entries against the merged label
    // set, preferring the original manifest key for matches.
    let discovered_by_label: BTreeMap<&str, &DiscoveredTest> = discovery
        .tests
        .iter()
        .map(|t| (t.label.as_str(), t))
        .collect();
    for label in &new_labels {
        let Some(entry) = discovered_by_label.get(label.as_str()) else {
            continue;
        };
        let filtered: Vec<String> = entry
            .depends_on
            .iter()
            .filter_map(|dep| {
                let dep_norm = normalize_label(dep);
                if all_normalized.contains(dep_norm) {
                    Some(
                        existing_normalized
                            .get(dep_norm)
                            .cloned()
                            .unwrap_or_else(|| dep.clone()),
                    )
                } else {
                    None
                }
            })
            .collect();
        if let Some(target) = merged.test_set_tests.get_mut(label) {
            target.depends_on = filtered;
        }
    }

    // Build trees for discovered roots, excluding the manifest root.
    let manifest_root_name = merged.test_set.name.clone();
    let known_tests: BTreeSet<&str> = discovery.tests.iter().map(|t| t.label.as_str()).collect();
    let other_trees = build_workspace_trees(
        &discovery.test_sets,
        &known_tests,
        &BTreeSet::from([manifest_root_name]),
    );

    // Orphans: new tests placed in no discovered tree.
    let mut placed: BTreeSet<String> = BTreeSet::new();
    for tree in &other_trees {
        collect_test_labels(tree, &mut placed);
    }
    let unplaced: Vec<String> = new_labels
        .iter()
        .filter(|label| !placed.contains(*label))
        .cloned()
        .collect();

    let mut peer_subsets = other_trees;
    if !unplaced.is_empty() {
        peer_subsets.push(TestSetNode {
            name: "Other workspace tests".to_string(),
            assertion: "Tests discovered in workspace but not in any test set".to_string(),
            requirement_id: None,
            tests: unplaced,
            subsets: Vec::new(),
        });
    }

    if !peer_subsets.is_empty() {
        let original_root = std::mem::take(&mut merged.test_set);
        let mut subsets = vec![original_root];
        subsets.extend(peer_subsets);
        merged.test_set = TestSetNode {
            name: "Workspace".to_string(),
            assertion: "All test sets in workspace".to_string(),
            requirement_id: None,
            tests: Vec::new(),
            subsets,
        };
    }

    merged
}

/// Build trees for discovered root test sets not already in the manifest.
///
/// Roots are the sets referenced as a subset by no other set. Subset
/// references resolve through set labels, including the `_test`-stripped
/// alias a set macro registers when its name doesn't already end in
/// `_test`/`_tests`.
#[must_use]
pub fn build_workspace_trees(
    test_sets: &[DiscoveredTestSet],
    known_tests: &BTreeSet<&str>,
    existing_names: &BTreeSet<String>,
) -> Vec<TestSetNode> {
    if test_sets.is_empty() {
        return Vec::new();
    }

    let mut lookup: BTreeMap<String, &DiscoveredTestSet> = BTreeMap::new();
    for ts in test_sets {
        lookup.insert(ts.label.clone(), ts);
        if let Some(alias) = ts.label.strip_suffix("_test")
            && !ts.label.ends_with("_tests")
        {
            lookup.entry(alias.to_string()).or_insert(ts);
        }
    }

    let mut referenced: BTreeSet<String> = BTreeSet::new();
    for ts in test_sets {
        for sub_ref in &ts.subsets {
            if let Some(resolved) = lookup.get(sub_ref) {
                referenced.insert(resolved.label.clone());
            }
        }
    }

    let mut trees = Vec::new();
    for ts in test_sets {
        if referenced.contains(&ts.label) || existing_names.contains(&ts.name) {
            continue;
        }
        let mut visited = BTreeSet::new();
        trees.push(build_tree(ts, &lookup, known_tests, &mut visited));
    }
    trees
}

fn build_tree(
    ts: &DiscoveredTestSet,
    lookup: &BTreeMap<String, &DiscoveredTestSet>,
    known_tests: &BTreeSet<&str>,
    visited: &mut BTreeSet<String>,
) -> TestSetNode {
    if visited.contains(&ts.label) {
        // Circular subset reference: break the cycle with a stub.
        return TestSetNode {
            name: ts.name.clone(),
            assertion: ts.assertion.clone(),
            requirement_id: None,
            tests: Vec::new(),
            subsets: Vec::new(),
        };
    }
    visited.insert(ts.label.clone());

    let tests: Vec<String> = ts
        .tests
        .iter()
        .filter(|label| known_tests.contains(label.as_str()))
        .cloned()
        .collect();

    let subsets: Vec<TestSetNode> = ts
        .subsets
        .iter()
        .filter_map(|sub_ref| lookup.get(sub_ref))
        .map(|sub| build_tree(sub, lookup, known_tests, visited))
        .collect();

    TestSetNode {
        name: ts.name.clone(),
        assertion: ts.assertion.clone(),
        requirement_id: (!ts.requirement_id.is_empty()).then(|| ts.requirement_id.clone()),
        tests,
        subsets,
    }
}

fn collect_test_labels(tree: &TestSetNode, out: &mut BTreeSet<String>) {
    for label in &tree.tests {
        out.insert(label.clone());
    }
    for subset in &tree.subsets {
        collect_test_labels(subset, out);
    }
}
