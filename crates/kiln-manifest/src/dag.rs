//! Dependency DAG materialised from a manifest.

use std::collections::BTreeMap;

use crate::{Manifest, normalize_label};

/// One executable test node.
#[derive(Debug, Clone, PartialEq)]
pub struct TestNode {
    pub executable: String,
    pub assertion: String,
    pub depends_on: Vec<String>,
}

/// Read-only dependency graph over test labels.
///
/// Unknown `depends_on` references and self-edges are dropped when the DAG
/// is materialised. The manifest producer owns acyclicity, but traversal is
/// cycle-safe regardless.
#[derive(Debug, Clone, Default)]
pub struct TestDag {
    nodes: BTreeMap<String, TestNode>,
}

impl TestDag {
    /// Build the DAG from a manifest.
    #[must_use]
    pub fn from_manifest(manifest: &Manifest) -> Self {
        let mut nodes = BTreeMap::new();
        for (label, target) in &manifest.test_set_tests {
            let depends_on = target
                .depends_on
                .iter()
                .filter(|dep| {
                    normalize_label(dep) != normalize_label(label)
                        && manifest.test_set_tests.contains_key(*dep)
                })
                .cloned()
                .collect();
            nodes.insert(
                label.clone(),
                TestNode {
                    executable: target.executable.clone(),
                    assertion: target.assertion.clone(),
                    depends_on,
                },
            );
        }
        Self { nodes }
    }

    #[must_use]
    pub fn contains(&self, label: &str) -> bool {
        self.nodes.contains_key(label)
    }

    #[must_use]
    pub fn node(&self, label: &str) -> Option<&TestNode> {
        self.nodes.get(label)
    }

    #[must_use]
    pub fn executable(&self, label: &str) -> Option<&str> {
        self.nodes.get(label).map(|n| n.executable.as_str())
    }

    #[must_use]
    pub fn assertion(&self, label: &str) -> Option<&str> {
        self.nodes.get(label).map(|n| n.assertion.as_str())
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.nodes.keys().map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Labels in dependency order: every dependency before its dependents.
    ///
    /// Depth-first with a visited set; a cycle in the input cannot loop the
    /// traversal, the back edge is simply not followed.
    #[must_use]
    pub fn topo_order(&self) -> Vec<String> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut visited = std::collections::BTreeSet::new();

        for label in self.nodes.keys() {
            self.visit(label, &mut visited, &mut order);
        }
        order
    }

    fn visit<'a>(
        &'a self,
        label: &'a str,
        visited: &mut std::collections::BTreeSet<&'a str>,
        order: &mut Vec<String>,
    ) {
        if !visited.insert(label) {
            return;
        }
        if let Some(node) = self.nodes.get(label) {
            for dep in &node.depends_on {
                self.visit(dep, visited, order);
            }
            order.push(label.to_string());
        }
    }
}
