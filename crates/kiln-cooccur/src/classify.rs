//! File classification for graph construction.

use globset::{Glob, GlobSet, GlobSetBuilder};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::GraphError;

/// Default extensions treated as source code.
pub const DEFAULT_SOURCE_EXTENSIONS: &[&str] = &[
    ".py", ".java", ".go", ".rs", ".ts", ".tsx", ".js", ".jsx", ".c", ".cc", ".cpp", ".h",
    ".hpp", ".kt", ".scala", ".cs", ".bzl",
];

/// Default basename patterns treated as tests.
pub const DEFAULT_TEST_PATTERNS: &[&str] =
    &["*_test.*", "test_*.*", "*_spec.*", "*.test.*", "*.spec.*"];

/// Classification outcome for one file path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileClass {
    Source,
    Test,
    Ignored,
}

/// Extension and pattern rules; persisted in the graph metadata so an
/// incremental update classifies exactly like the original build.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationRules {
    pub source_extensions: Vec<String>,
    pub test_patterns: Vec<String>,
}

impl Default for ClassificationRules {
    fn default() -> Self {
        Self {
            source_extensions: DEFAULT_SOURCE_EXTENSIONS
                .iter()
                .map(ToString::to_string)
                .collect(),
            test_patterns: DEFAULT_TEST_PATTERNS
                .iter()
                .map(ToString::to_string)
                .collect(),
        }
    }
}

/// Compiled classifier; patterns are validated once at construction.
#[derive(Debug)]
pub struct Classifier {
    rules: ClassificationRules,
    test_globs: GlobSet,
}

static DEFAULT_CLASSIFIER: Lazy<Classifier> = Lazy::new(|| {
    Classifier::new(ClassificationRules::default())
        .unwrap_or_else(|_| unreachable!("default test patterns are valid globs"))
});

impl Classifier {
    pub fn new(rules: ClassificationRules) -> Result<Self, GraphError> {
        let mut builder = GlobSetBuilder::new();
        for pattern in &rules.test_patterns {
            builder.add(Glob::new(pattern)?);
        }
        let test_globs = builder.build()?;
        Ok(Self { rules, test_globs })
    }

    #[must_use]
    pub fn rules(&self) -> &ClassificationRules {
        &self.rules
    }

    /// Classify a file path.
    ///
    /// Test patterns are checked against the basename first: a file named
    /// like a test is a test regardless of its extension.
    #[must_use]
    pub fn classify(&self, path: &str) -> FileClass {
        let basename = Path::new(path)
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_default();

        if self.test_globs.is_match(basename.as_ref()) {
            return FileClass::Test;
        }

        let extension = Path::new(path)
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy()));
        match extension {
            Some(ext) if self.rules.source_extensions.contains(&ext) => FileClass::Source,
            _ => FileClass::Ignored,
        }
    }
}

/// Classify with the default rules.
#[must_use]
pub fn classify_file(path: &str) -> FileClass {
    DEFAULT_CLASSIFIER.classify(path)
}
