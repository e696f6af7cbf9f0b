//! Layered configuration for the kiln CLI.
//!
//! Precedence: CLI flags > config file > built-in defaults. The config
//! file is `.kiln/config.toml`, discovered by searching upward from the
//! working directory; `--config` names one explicitly.

use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// Directory holding kiln's working files.
pub const KILN_DIR: &str = ".kiln";

/// Config file name inside [`KILN_DIR`].
pub const CONFIG_FILE: &str = "config.toml";

/// Default status store location.
pub const DEFAULT_STATUS_FILE: &str = ".kiln/status.json";

/// Values loadable from `.kiln/config.toml`; every field optional.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub status_file: Option<Utf8PathBuf>,
    pub manifest: Option<Utf8PathBuf>,
    pub min_reliability: Option<f64>,
    pub statistical_significance: Option<f64>,
    pub max_iterations: Option<u32>,
    pub timeout_secs: Option<u64>,
}

impl FileConfig {
    /// Load a config file.
    pub fn load(path: &Utf8Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {path}"))?;
        toml::from_str(&text).with_context(|| format!("failed to parse config file: {path}"))
    }

    /// Search upward from `start` for `.kiln/config.toml`.
    ///
    /// Returns the default (empty) config when no file exists anywhere up
    /// the tree.
    pub fn discover(start: &Path) -> Result<Self> {
        let mut dir = Some(start);
        while let Some(current) = dir {
            let candidate = current.join(KILN_DIR).join(CONFIG_FILE);
            if candidate.is_file() {
                let utf8 = Utf8PathBuf::from_path_buf(candidate)
                    .map_err(|p| anyhow::anyhow!("config path is not UTF-8: {}", p.display()))?;
                return Self::load(&utf8);
            }
            dir = current.parent();
        }
        Ok(Self::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_full_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            r#"
status_file = "ci/status.json"
min_reliability = 0.999
max_iterations = 50
"#,
        )
        .unwrap();

        let config = FileConfig::load(Utf8Path::from_path(&path).unwrap()).unwrap();
        assert_eq!(config.status_file.as_deref(), Some(Utf8Path::new("ci/status.json")));
        assert_eq!(config.min_reliability, Some(0.999));
        assert_eq!(config.max_iterations, Some(50));
        assert_eq!(config.timeout_secs, None);
    }

    #[test]
    fn test_unknown_key_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "unknown_key = true\n").unwrap();
        assert!(FileConfig::load(Utf8Path::from_path(&path).unwrap()).is_err());
    }

    #[test]
    fn test_discover_walks_upward() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a/b/c");
        fs::create_dir_all(&nested).unwrap();
        fs::create_dir_all(dir.path().join(KILN_DIR)).unwrap();
        fs::write(
            dir.path().join(KILN_DIR).join(CONFIG_FILE),
            "timeout_secs = 60\n",
        )
        .unwrap();

        let config = FileConfig::discover(&nested).unwrap();
        assert_eq!(config.timeout_secs, Some(60));
    }

    #[test]
    fn test_discover_without_config_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = FileConfig::discover(dir.path()).unwrap();
        assert_eq!(config, FileConfig::default());
    }
}
