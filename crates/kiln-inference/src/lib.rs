//! Advisory dependency inference.
//!
//! Tests declare the features they rely on during their rigging phase.
//! Mapping those feature names back to the test targets that verify them
//! yields advisory edges: they inform scheduling order and impact
//! prediction but never silently become hard dependencies, and every
//! inferred edge carries `inferred: true` through any persisted or
//! reported representation.

use camino::Utf8Path;
use kiln_cooccur::CoOccurrenceGraph;
use kiln_manifest::Manifest;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Explicit feature-name → target-labels mapping.
pub type FeatureMap = BTreeMap<String, Vec<String>>;

/// An advisory edge inferred from a rigging feature event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InferredDependency {
    /// The target this test appears to depend on.
    pub target: String,
    /// The feature that created the inference.
    pub feature: String,
    /// Always true; distinguishes advisory edges from declared ones in
    /// every serialized form.
    pub inferred: bool,
}

/// Load an explicit feature map from a JSON file.
///
/// Returns `None` when the file is missing, unreadable, or not an object
/// of string lists; inference then falls back to convention matching.
#[must_use]
pub fn load_feature_map(path: &Utf8Path) -> Option<FeatureMap> {
    let text = fs::read_to_string(path).ok()?;
    serde_json::from_str(&text).ok()
}

/// Find test targets verifying `feature`.
///
/// An explicit map entry is authoritative: when present its target list is
/// returned as-is with no convention fallback. Otherwise targets match by
/// case-insensitive substring, first against target names, then against
/// assertion text.
#[must_use]
pub fn find_targets_verifying_feature(
    feature: &str,
    manifest: &Manifest,
    feature_map: Option<&FeatureMap>,
) -> Vec<String> {
    if let Some(map) = feature_map
        && let Some(targets) = map.get(feature)
    {
        let mut matches = Vec::new();
        for target in targets {
            if !matches.contains(target) {
                matches.push(target.clone());
            }
        }
        return matches;
    }

    let feature_lower = feature.to_lowercase();
    let mut matches = Vec::new();

    for (label, target) in &manifest.test_set_tests {
        if label.to_lowercase().contains(&feature_lower) {
            if !matches.contains(label) {
                matches.push(label.clone());
            }
            continue;
        }
        if target.assertion.to_lowercase().contains(&feature_lower) && !matches.contains(label) {
            matches.push(label.clone());
        }
    }

    matches
}

/// Infer advisory edges for `test_label` from its rigging features.
///
/// Self-references and already-declared dependencies are dropped; targets
/// are deduplicated across features, preserving first-seen order.
#[must_use]
pub fn infer_rigging_dependencies(
    test_label: &str,
    rigging_features: &[String],
    manifest: &Manifest,
    feature_map: Option<&FeatureMap>,
) -> Vec<InferredDependency> {
    let declared: Vec<&str> = manifest
        .test_set_tests
        .get(test_label)
        .map(|t| t.depends_on.iter().map(String::as_str).collect())
        .unwrap_or_default();

    let mut inferred = Vec::new();
    let mut seen: Vec<String> = Vec::new();

    for feature in rigging_features {
        for target in find_targets_verifying_feature(feature, manifest, feature_map) {
            if target == test_label
                || declared.contains(&target.as_str())
                || seen.contains(&target)
            {
                continue;
            }
            seen.push(target.clone());
            inferred.push(InferredDependency {
                target,
                feature: feature.clone(),
                inferred: true,
            });
        }
    }

    inferred
}

/// Predict which manifest targets a set of changed files impacts.
///
/// The co-occurrence graph maps changed files to historically co-modified
/// test files; each test file's stem is then matched against target labels
/// by case-insensitive substring. Advisory, like everything inferred.
#[must_use]
pub fn predict_impacted_targets(
    graph: &CoOccurrenceGraph,
    manifest: &Manifest,
    changed_files: &[String],
) -> Vec<String> {
    let mut impacted = Vec::new();

    for test_file in graph.impacted_test_files(changed_files) {
        let stem = Path::new(&test_file)
            .file_stem()
            .map(|s| s.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        if stem.is_empty() {
            continue;
        }

        for label in manifest.test_set_tests.keys() {
            if label.to_lowercase().contains(&stem) && !impacted.contains(label) {
                impacted.push(label.clone());
            }
        }
    }

    impacted
}

#[cfg(test)]
mod tests {
    use super::*;
    use kiln_cooccur::{ClassificationRules, CommitRecord};

    fn sample_manifest() -> Manifest {
        Manifest::from_json(
            r#"{
            "test_set_tests": {
                "//shop:auth_test": {"assertion": "Users can log in"},
                "//shop:billing_test": {"assertion": "Billing charges correctly"},
                "//shop:notification_test": {"assertion": "Notifications are delivered"},
                "//shop:checkout_test": {
                    "assertion": "Checkout completes",
                    "depends_on": ["//shop:auth_test", "//shop:billing_test"]
                }
            }
        }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_match_by_target_name() {
        let manifest = sample_manifest();
        let matches = find_targets_verifying_feature("auth", &manifest, None);
        assert_eq!(matches, ["//shop:auth_test"]);
    }

    #[test]
    fn test_match_by_assertion_text() {
        let manifest = sample_manifest();
        let matches = find_targets_verifying_feature("delivered", &manifest, None);
        assert_eq!(matches, ["//shop:notification_test"]);
    }

    #[test]
    fn test_match_case_insensitive() {
        let manifest = sample_manifest();
        let matches = find_targets_verifying_feature("AUTH", &manifest, None);
        assert_eq!(matches, ["//shop:auth_test"]);
    }

    #[test]
    fn test_explicit_map_is_authoritative() {
        let manifest = sample_manifest();
        let mut map = FeatureMap::new();
        map.insert(
            "auth".to_string(),
            vec!["//custom:session_test".to_string()],
        );
        // No convention fallback: the conventional auth_test match is
        // suppressed by the explicit entry.
        let matches = find_targets_verifying_feature("auth", &manifest, Some(&map));
        assert_eq!(matches, ["//custom:session_test"]);
    }

    #[test]
    fn test_map_without_feature_falls_back() {
        let manifest = sample_manifest();
        let map = FeatureMap::new();
        let matches = find_targets_verifying_feature("auth", &manifest, Some(&map));
        assert_eq!(matches, ["//shop:auth_test"]);
    }

    #[test]
    fn test_no_match_returns_empty() {
        let manifest = sample_manifest();
        assert!(find_targets_verifying_feature("gravity", &manifest, None).is_empty());
    }

    #[test]
    fn test_infer_skips_declared_and_keeps_novel() {
        let manifest = sample_manifest();
        let features = ["notification".to_string(), "auth".to_string()];
        let inferred =
            infer_rigging_dependencies("//shop:checkout_test", &features, &manifest, None);
        assert_eq!(
            inferred,
            [InferredDependency {
                target: "//shop:notification_test".to_string(),
                feature: "notification".to_string(),
                inferred: true,
            }]
        );
    }

    #[test]
    fn test_infer_skips_self_reference() {
        let manifest = sample_manifest();
        let features = ["checkout".to_string()];
        let inferred =
            infer_rigging_dependencies("//shop:checkout_test", &features, &manifest, None);
        assert!(inferred.is_empty());
    }

    #[test]
    fn test_infer_dedups_across_features() {
        let manifest = sample_manifest();
        // Both features resolve to notification_test; only the first wins.
        let features = ["notification".to_string(), "delivered".to_string()];
        let inferred =
            infer_rigging_dependencies("//shop:checkout_test", &features, &manifest, None);
        assert_eq!(inferred.len(), 1);
        assert_eq!(inferred[0].feature, "notification");
    }

    #[test]
    fn test_infer_empty_features() {
        let manifest = sample_manifest();
        assert!(infer_rigging_dependencies("//shop:checkout_test", &[], &manifest, None).is_empty());
    }

    #[test]
    fn test_inferred_flag_serialized() {
        let dep = InferredDependency {
            target: "//t:a".to_string(),
            feature: "auth".to_string(),
            inferred: true,
        };
        let json = serde_json::to_string(&dep).unwrap();
        assert!(json.contains("\"inferred\":true"));
    }

    #[test]
    fn test_load_feature_map_missing_returns_none() {
        assert!(load_feature_map(Utf8Path::new("/nonexistent/map.json")).is_none());
    }

    #[test]
    fn test_load_feature_map_invalid_returns_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("map.json");
        fs::write(&path, "[1, 2, 3]").unwrap();
        assert!(load_feature_map(Utf8Path::from_path(&path).unwrap()).is_none());
    }

    #[test]
    fn test_load_feature_map_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("map.json");
        fs::write(&path, r#"{"auth": ["//t:auth_test", "//t:session_test"]}"#).unwrap();
        let map = load_feature_map(Utf8Path::from_path(&path).unwrap()).unwrap();
        assert_eq!(map["auth"], ["//t:auth_test", "//t:session_test"]);
    }

    #[test]
    fn test_predict_impacted_targets() {
        let manifest = sample_manifest();
        let commits = [
            CommitRecord {
                hash: "aaa".to_string(),
                timestamp: "2026-02-10T10:00:00Z".to_string(),
                files: vec!["src/auth.py".to_string(), "tests/auth_test.py".to_string()],
            },
            CommitRecord {
                hash: "bbb".to_string(),
                timestamp: "2026-02-09T10:00:00Z".to_string(),
                files: vec![
                    "src/billing.py".to_string(),
                    "tests/billing_test.py".to_string(),
                ],
            },
        ];
        let graph = CoOccurrenceGraph::build(&commits, ClassificationRules::default()).unwrap();

        let impacted =
            predict_impacted_targets(&graph, &manifest, &["src/auth.py".to_string()]);
        assert_eq!(impacted, ["//shop:auth_test"]);

        let none = predict_impacted_targets(&graph, &manifest, &["src/other.py".to_string()]);
        assert!(none.is_empty());
    }
}
