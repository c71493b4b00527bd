//! Lock store location resolution.
//!
//! Every command works against one store root. The root comes from `--root`,
//! else `$SOFTLOCK_HOME`, else `.softlock/` under the current directory.

use crate::config::Config;
use crate::error::{LockingError, Result};
use crate::locks::FileStore;
use std::env;
use std::path::{Path, PathBuf};

/// Environment variable naming the store root.
pub const STORE_ROOT_ENV: &str = "SOFTLOCK_HOME";

/// Default store directory relative to the working directory.
pub const DEFAULT_STORE_DIR: &str = ".softlock";

/// Resolved paths of a lock store. All paths are absolute.
#[derive(Debug, Clone)]
pub struct StoreContext {
    /// Store root (holds `config.yaml`).
    pub root: PathBuf,

    /// One subdirectory per object kind, one JSON row per object.
    pub locks_dir: PathBuf,

    /// Audit log directory.
    pub events_dir: PathBuf,
}

impl StoreContext {
    /// Resolve the store root from an explicit path, the environment, or the
    /// current working directory, in that order.
    pub fn resolve(root: Option<&Path>) -> Result<Self> {
        if let Some(root) = root {
            return Self::at(root);
        }

        if let Some(root) = env::var_os(STORE_ROOT_ENV).filter(|v| !v.is_empty()) {
            return Self::at(PathBuf::from(root));
        }

        let cwd = env::current_dir().map_err(|e| {
            LockingError::UserError(format!("failed to get current working directory: {}", e))
        })?;
        Self::at(cwd.join(DEFAULT_STORE_DIR))
    }

    /// Context for a store rooted at `root`.
    pub fn at<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref();
        let root = if root.is_absolute() {
            root.to_path_buf()
        } else {
            env::current_dir()
                .map_err(|e| {
                    LockingError::UserError(format!(
                        "failed to get current working directory: {}",
                        e
                    ))
                })?
                .join(root)
        };

        Ok(Self {
            locks_dir: root.join("locks"),
            events_dir: root.join("events"),
            root,
        })
    }

    pub fn config_path(&self) -> PathBuf {
        self.root.join("config.yaml")
    }

    pub fn events_file(&self) -> PathBuf {
        self.events_dir.join("events.ndjson")
    }

    /// Whether `softlock init` has run here.
    pub fn is_initialized(&self) -> bool {
        self.locks_dir.is_dir()
    }

    /// Fail with a user-actionable message unless the store exists.
    pub fn ensure_initialized(&self) -> Result<()> {
        if self.is_initialized() {
            return Ok(());
        }
        Err(LockingError::UserError(format!(
            "no lock store at '{}'. Run `softlock init` first, or pass --root / set {}.",
            self.root.display(),
            STORE_ROOT_ENV
        )))
    }

    /// Load the store's config (defaults when `config.yaml` is absent).
    pub fn load_config(&self) -> Result<Config> {
        Config::load_or_default(self.config_path())
    }

    /// The file store rooted at this context.
    pub fn file_store(&self, config: &Config) -> FileStore {
        FileStore::with_config(&self.locks_dir, config)
    }
}
