//! Per-row guard files for the file store.
//!
//! A guard file (`.{row}.guard`) is created with create_new semantics while a
//! process compares and rewrites one lock row. It is held for the span of one
//! store call, not for the life of the soft lock.

use crate::error::{LockingError, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, warn};

/// Pause between attempts on a busy guard.
const RETRY_INTERVAL: std::time::Duration = std::time::Duration::from_millis(10);

/// Metadata written into a guard file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuardMetadata {
    /// Process owner (e.g., `user@HOST`).
    pub owner: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub pid: Option<u32>,

    pub created_at: DateTime<Utc>,
}

impl GuardMetadata {
    pub fn new() -> Self {
        Self {
            owner: owner_string(),
            pid: Some(std::process::id()),
            created_at: Utc::now(),
        }
    }

    fn from_file(path: &Path) -> Option<Self> {
        let content = fs::read_to_string(path).ok()?;
        serde_json::from_str(&content).ok()
    }
}

impl Default for GuardMetadata {
    fn default() -> Self {
        Self::new()
    }
}

/// RAII guard for a row guard file. The file is removed on drop.
#[derive(Debug)]
pub struct StoreGuard {
    path: PathBuf,
}

impl StoreGuard {
    /// Take the guard at `path`, waiting up to `wait` for a busy guard.
    ///
    /// A guard older than `stale_after` is assumed to belong to a process that
    /// died mid-write and is removed.
    pub fn acquire(path: &Path, wait: std::time::Duration, stale_after: Duration) -> Result<Self> {
        if let Some(parent) = path.parent()
            && !parent.exists()
        {
            fs::create_dir_all(parent).map_err(|e| {
                LockingError::StoreError(format!(
                    "failed to create lock directory '{}': {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let started = Instant::now();
        loop {
            match OpenOptions::new().write(true).create_new(true).open(path) {
                Ok(mut file) => {
                    let json = serde_json::to_string(&GuardMetadata::new()).map_err(|e| {
                        LockingError::StoreError(format!("failed to serialize guard metadata: {}", e))
                    })?;
                    if let Err(e) = file.write_all(json.as_bytes()) {
                        let _ = fs::remove_file(path);
                        return Err(LockingError::StoreError(format!(
                            "failed to write guard '{}': {}",
                            path.display(),
                            e
                        )));
                    }
                    return Ok(Self {
                        path: path.to_path_buf(),
                    });
                }
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                    if guard_age(path).is_some_and(|age| age > stale_after) {
                        warn!(guard = %path.display(), "removing stale store guard");
                        let _ = fs::remove_file(path);
                        continue;
                    }
                    if started.elapsed() >= wait {
                        let holder = GuardMetadata::from_file(path)
                            .map(|m| format!(" (held by {})", m.owner))
                            .unwrap_or_default();
                        return Err(LockingError::StoreError(format!(
                            "lock store busy: '{}'{}",
                            path.display(),
                            holder
                        )));
                    }
                    debug!(guard = %path.display(), "store guard busy, retrying");
                    std::thread::sleep(RETRY_INTERVAL);
                }
                Err(e) => {
                    return Err(LockingError::StoreError(format!(
                        "failed to create guard '{}': {}",
                        path.display(),
                        e
                    )));
                }
            }
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for StoreGuard {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            warn!(guard = %self.path.display(), error = %e, "failed to remove store guard");
        }
    }
}

/// Age of an existing guard, from its metadata or, while a fresh guard is
/// still empty, from the file's modification time.
fn guard_age(path: &Path) -> Option<Duration> {
    if let Some(meta) = GuardMetadata::from_file(path) {
        return Some(Utc::now().signed_duration_since(meta.created_at));
    }
    let modified = fs::metadata(path).ok()?.modified().ok()?;
    let modified: DateTime<Utc> = modified.into();
    Some(Utc::now().signed_duration_since(modified))
}

/// `user@HOST` for the current process.
pub(crate) fn owner_string() -> String {
    let user = std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "unknown".to_string());

    let host = hostname::get()
        .map(|h| h.to_string_lossy().to_string())
        .unwrap_or_else(|_| "unknown".to_string());

    format!("{}@{}", user, host)
}
