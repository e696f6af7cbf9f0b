//! Atomic file writes: temp file + fsync + rename.
//!
//! The status store and the co-occurrence graph are whole-file JSON
//! documents that must survive an abrupt exit mid-sweep. Writes land in a
//! temporary file in the target directory, are fsynced, and are renamed
//! over the destination so readers only ever observe a complete document.

use anyhow::{Context, Result};
use camino::Utf8Path;
use std::fs;
use std::io::Write;
use tempfile::NamedTempFile;

/// Atomically replace `path` with `content`.
///
/// Parent directories are created on demand. The rename is atomic on the
/// same filesystem; the temp file is created next to the target to stay on
/// one filesystem.
pub fn write_file_atomic(path: &Utf8Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create parent directory: {parent}"))?;
    }

    let dir = path.parent().unwrap_or_else(|| Utf8Path::new("."));
    let mut temp = NamedTempFile::new_in(dir)
        .with_context(|| format!("failed to create temporary file in: {dir}"))?;

    temp.write_all(content.as_bytes())
        .with_context(|| format!("failed to write temporary file for: {path}"))?;
    temp.as_file()
        .sync_all()
        .with_context(|| format!("failed to fsync temporary file for: {path}"))?;

    temp.persist(path.as_std_path())
        .with_context(|| format!("failed to rename temporary file into place: {path}"))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino::Utf8PathBuf;

    fn temp_path(dir: &tempfile::TempDir, rel: &str) -> Utf8PathBuf {
        Utf8PathBuf::from_path_buf(dir.path().join(rel)).unwrap()
    }

    #[test]
    fn test_write_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = temp_path(&dir, "out.json");
        write_file_atomic(&path, "{}").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "{}");
    }

    #[test]
    fn test_write_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = temp_path(&dir, "a/b/c/out.json");
        write_file_atomic(&path, "deep").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "deep");
    }

    #[test]
    fn test_write_replaces_existing_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = temp_path(&dir, "out.json");
        write_file_atomic(&path, "first").unwrap();
        write_file_atomic(&path, "second").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "second");
    }

    #[test]
    fn test_no_temp_files_left_behind() {
        let dir = tempfile::tempdir().unwrap();
        let path = temp_path(&dir, "out.json");
        write_file_atomic(&path, "x").unwrap();
        let entries: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }
}
