//! File-backed lock store shared by every process on the host.
//!
//! Layout under the locks directory:
//!
//! ```text
//! locks/<kind>/<id>.json          the row, pretty JSON
//! locks/<kind>/.<id>.json.guard   held while a process rewrites the row
//! locks/<kind>/.<id>.json.tmp     temporary file of an atomic write
//! ```

use super::guard::StoreGuard;
use super::store::LockStore;
use super::types::{Lock, ObjectRef};
use crate::config::Config;
use crate::error::{LockingError, Result};
use crate::fs::atomic_write_file;
use chrono::Duration;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// One JSON file per object.
#[derive(Debug, Clone)]
pub struct FileStore {
    locks_dir: PathBuf,
    guard_wait: std::time::Duration,
    guard_stale: Duration,
}

impl FileStore {
    /// Open a store rooted at `locks_dir` with default guard timings.
    pub fn new(locks_dir: impl Into<PathBuf>) -> Self {
        Self::with_config(locks_dir, &Config::default())
    }

    /// Open a store using the guard timings from `config`.
    pub fn with_config(locks_dir: impl Into<PathBuf>, config: &Config) -> Self {
        Self {
            locks_dir: locks_dir.into(),
            guard_wait: config.guard_wait(),
            guard_stale: config.guard_stale(),
        }
    }

    pub fn locks_dir(&self) -> &Path {
        &self.locks_dir
    }

    /// Path of the row file for `object`.
    pub fn row_path(&self, object: &ObjectRef) -> PathBuf {
        self.locks_dir
            .join(&object.kind)
            .join(format!("{}.json", object.id))
    }

    fn guard_path(&self, object: &ObjectRef) -> PathBuf {
        self.locks_dir
            .join(&object.kind)
            .join(format!(".{}.json.guard", object.id))
    }

    fn guard(&self, object: &ObjectRef) -> Result<StoreGuard> {
        StoreGuard::acquire(&self.guard_path(object), self.guard_wait, self.guard_stale)
    }

    fn read_row(path: &Path) -> Result<Lock> {
        let content = fs::read_to_string(path).map_err(|e| {
            LockingError::StoreError(format!(
                "failed to read lock row '{}': {}",
                path.display(),
                e
            ))
        })?;
        serde_json::from_str(&content).map_err(|e| {
            LockingError::StoreError(format!(
                "failed to parse lock row '{}': {}",
                path.display(),
                e
            ))
        })
    }
}

impl LockStore for FileStore {
    fn load(&self, object: &ObjectRef) -> Result<Option<Lock>> {
        let path = self.row_path(object);
        if !path.exists() {
            return Ok(None);
        }

        let lock = Self::read_row(&path)?;
        if &lock.object != object {
            return Err(LockingError::StoreError(format!(
                "lock row '{}' belongs to {}, expected {}",
                path.display(),
                lock.object,
                object
            )));
        }
        Ok(Some(lock))
    }

    fn compare_and_swap(&self, expected: Option<u64>, next: &Lock) -> Result<bool> {
        let _guard = self.guard(&next.object)?;

        let current = self.load(&next.object)?.map(|row| row.version);
        if current != expected {
            debug!(
                object = %next.object,
                ?expected,
                ?current,
                "lock row version moved, swap rejected"
            );
            return Ok(false);
        }

        let json = serde_json::to_string_pretty(next).map_err(|e| {
            LockingError::StoreError(format!("failed to serialize lock row: {}", e))
        })?;
        atomic_write_file(self.row_path(&next.object), &format!("{}\n", json))?;
        Ok(true)
    }

    fn compare_and_delete(&self, object: &ObjectRef, expected: u64) -> Result<bool> {
        let _guard = self.guard(object)?;

        match self.load(object)? {
            Some(row) if row.version == expected => {
                let path = self.row_path(object);
                fs::remove_file(&path).map_err(|e| {
                    LockingError::StoreError(format!(
                        "failed to delete lock row '{}': {}",
                        path.display(),
                        e
                    ))
                })?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    fn list(&self) -> Result<Vec<Lock>> {
        let mut rows = Vec::new();
        if !self.locks_dir.exists() {
            return Ok(rows);
        }

        let read_dir = |dir: &Path| {
            fs::read_dir(dir).map_err(|e| {
                LockingError::StoreError(format!(
                    "failed to read lock directory '{}': {}",
                    dir.display(),
                    e
                ))
            })
        };

        for kind_entry in read_dir(self.locks_dir.as_path())? {
            let kind_dir = match kind_entry {
                Ok(entry) => entry.path(),
                Err(e) => {
                    warn!(error = %e, "skipping unreadable lock directory entry");
                    continue;
                }
            };
            if !kind_dir.is_dir() {
                continue;
            }

            for entry in read_dir(kind_dir.as_path())?.flatten() {
                let path = entry.path();
                let is_row = path.extension().and_then(|e| e.to_str()) == Some("json")
                    && !path
                        .file_name()
                        .and_then(|n| n.to_str())
                        .is_some_and(|n| n.starts_with('.'));
                if !is_row {
                    continue;
                }

                match Self::read_row(&path) {
                    Ok(lock) => rows.push(lock),
                    Err(e) => warn!(row = %path.display(), error = %e, "skipping unreadable lock row"),
                }
            }
        }

        rows.sort_by(|a, b| a.object.cmp(&b.object));
        Ok(rows)
    }
}
