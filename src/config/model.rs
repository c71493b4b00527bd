//! Config struct definition and defaults.

use serde::{Deserialize, Serialize};

/// Default lock duration: ten minutes.
pub const DEFAULT_LOCK_DURATION_SECS: u64 = 600;

/// Longest lock a caller may ask for: one week.
pub const MAX_LOCK_DURATION_SECS: u64 = 7 * 24 * 60 * 60;

/// Configuration for a lock store.
///
/// This struct represents the contents of `config.yaml` at the store root.
/// Unknown fields in the YAML are ignored for forward compatibility.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    // =========================================================================
    // Lock settings
    // =========================================================================
    /// How long an acquired or renewed lock lasts, in seconds.
    #[serde(default = "default_lock_duration_secs")]
    pub lock_duration_secs: u64,

    /// Remaining time, in seconds, below which a status is "expiring soon".
    #[serde(default = "default_warning_secs")]
    pub warning_secs: u64,

    /// User ids allowed to release other users' locks.
    #[serde(default)]
    pub admin_users: Vec<String>,

    // =========================================================================
    // Store maintenance
    // =========================================================================
    /// How long an expired row is kept before `sweep` may delete it, in seconds.
    #[serde(default = "default_sweep_grace_secs")]
    pub sweep_grace_secs: u64,

    /// How long to wait for a busy row guard, in milliseconds.
    #[serde(default = "default_guard_wait_ms")]
    pub guard_wait_ms: u64,

    /// Age in seconds after which a row guard is considered abandoned.
    #[serde(default = "default_guard_stale_secs")]
    pub guard_stale_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            lock_duration_secs: default_lock_duration_secs(),
            warning_secs: default_warning_secs(),
            admin_users: Vec::new(),
            sweep_grace_secs: default_sweep_grace_secs(),
            guard_wait_ms: default_guard_wait_ms(),
            guard_stale_secs: default_guard_stale_secs(),
        }
    }
}

pub fn default_lock_duration_secs() -> u64 {
    DEFAULT_LOCK_DURATION_SECS
}

pub fn default_warning_secs() -> u64 {
    60
}

pub fn default_sweep_grace_secs() -> u64 {
    24 * 60 * 60
}

pub fn default_guard_wait_ms() -> u64 {
    2_000
}

pub fn default_guard_stale_secs() -> u64 {
    30
}
