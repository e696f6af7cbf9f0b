//! Single-writer guard for the status store.
//!
//! The sweep driver is the only writer of the status document. Commands
//! that drive a sweep take an exclusive advisory lock on a sidecar file so
//! two concurrent invocations cannot interleave whole-file replacements.

use camino::{Utf8Path, Utf8PathBuf};
use fd_lock::{RwLock, RwLockWriteGuard};
use std::fs::{File, OpenOptions};
use std::io::ErrorKind;

use crate::StatusError;

/// Advisory lock over `<status-file>.lock`.
#[derive(Debug)]
pub struct StatusLock {
    path: Utf8PathBuf,
    inner: RwLock<File>,
}

impl StatusLock {
    /// Prepare the lock file next to the status document.
    pub fn new(status_path: &Utf8Path) -> Result<Self, StatusError> {
        let path = Utf8PathBuf::from(format!("{status_path}.lock"));
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| StatusError::LockIo {
                path: path.to_string(),
                source,
            })?;
        }
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&path)
            .map_err(|source| StatusError::LockIo {
                path: path.to_string(),
                source,
            })?;
        Ok(Self {
            path,
            inner: RwLock::new(file),
        })
    }

    /// Try to take the exclusive lock; fails fast when another sweep holds
    /// it.
    pub fn try_exclusive(&mut self) -> Result<RwLockWriteGuard<'_, File>, StatusError> {
        let path = self.path.clone();
        self.inner.try_write().map_err(|err| {
            if err.kind() == ErrorKind::WouldBlock {
                StatusError::LockHeld {
                    path: path.to_string(),
                }
            } else {
                StatusError::LockIo {
                    path: path.to_string(),
                    source: err,
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lock_target(dir: &tempfile::TempDir) -> Utf8PathBuf {
        Utf8PathBuf::from_path_buf(dir.path().join("status.json")).unwrap()
    }

    #[test]
    fn test_lock_acquires_and_releases() {
        let dir = tempfile::tempdir().unwrap();
        let path = lock_target(&dir);

        let mut lock = StatusLock::new(&path).unwrap();
        {
            let _guard = lock.try_exclusive().unwrap();
        }
        // Released on drop; a second acquisition succeeds.
        let _guard = lock.try_exclusive().unwrap();
    }

    #[test]
    fn test_second_holder_fails_fast() {
        let dir = tempfile::tempdir().unwrap();
        let path = lock_target(&dir);

        let mut first = StatusLock::new(&path).unwrap();
        let _held = first.try_exclusive().unwrap();

        let mut second = StatusLock::new(&path).unwrap();
        let err = second.try_exclusive().unwrap_err();
        assert!(matches!(err, StatusError::LockHeld { .. }));
    }

    #[test]
    fn test_lock_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = Utf8PathBuf::from_path_buf(dir.path().join("a/b/status.json")).unwrap();
        let mut lock = StatusLock::new(&path).unwrap();
        let _guard = lock.try_exclusive().unwrap();
    }
}
