//! Config loading, validation, and conversions.

use super::model::{Config, MAX_LOCK_DURATION_SECS};
use crate::error::{LockingError, Result};
use chrono::Duration;
use std::path::Path;

/// Template written by `softlock init`.
pub const CONFIG_TEMPLATE: &str = r#"# softlock configuration
#
# How long a lock lasts after it is acquired or renewed (seconds).
lock_duration_secs: 600

# Statuses report `expiring_soon` once this little time is left (seconds).
warning_secs: 60

# Users allowed to force-release other users' locks.
admin_users: []

# Expired rows older than this may be deleted by `softlock sweep` (seconds).
sweep_grace_secs: 86400

# Waiting for a busy row guard (milliseconds) and abandoning stale ones (seconds).
guard_wait_ms: 2000
guard_stale_secs: 30
"#;

impl Config {
    /// Load config from a YAML file.
    ///
    /// Unknown fields in the YAML are silently ignored for forward compatibility.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the config file
    ///
    /// # Returns
    ///
    /// * `Ok(Config)` - Parsed and validated config
    /// * `Err(LockingError::UserError)` - If the file cannot be read, parsed or validated
    ///
    /// # Example
    ///
    /// ```no_run
    /// use softlock::config::Config;
    ///
    /// let config = Config::load(".softlock/config.yaml")?;
    /// println!("locks last {}s", config.lock_duration_secs);
    /// # Ok::<(), softlock::error::LockingError>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path).map_err(|e| {
            LockingError::UserError(format!(
                "failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;

        Self::from_yaml(&content)
    }

    /// Load config from `path`, or use defaults when the file does not exist.
    ///
    /// A file that exists but does not parse or validate is still an error.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Parse config from a YAML string.
    ///
    /// An empty document yields the defaults. The result is validated before
    /// it is returned.
    ///
    /// # Example
    ///
    /// ```
    /// use softlock::config::Config;
    ///
    /// let config = Config::from_yaml("lock_duration_secs: 900\n")?;
    /// assert_eq!(config.lock_duration_secs, 900);
    /// # Ok::<(), softlock::error::LockingError>(())
    /// ```
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        // An empty document deserializes to unit, not to a map.
        let config: Config = if yaml.trim().is_empty() {
            Config::default()
        } else {
            serde_yaml::from_str(yaml).map_err(|e| {
                LockingError::UserError(format!("failed to parse config YAML: {}", e))
            })?
        };

        config.validate()?;
        Ok(config)
    }

    /// Serialize config to YAML string.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(|e| {
            LockingError::UserError(format!("failed to serialize config to YAML: {}", e))
        })
    }

    /// Validate config values.
    ///
    /// Validation rules:
    /// - `lock_duration_secs` must be positive and at most one week
    /// - `warning_secs` must be shorter than `lock_duration_secs`
    /// - `guard_stale_secs` must be positive
    /// - `admin_users` entries must be non-empty
    pub fn validate(&self) -> Result<()> {
        validate_lock_duration(self.lock_duration_secs)?;

        if self.warning_secs >= self.lock_duration_secs {
            return Err(LockingError::UserError(format!(
                "config validation failed: warning_secs ({}) must be less than lock_duration_secs ({})",
                self.warning_secs, self.lock_duration_secs
            )));
        }

        if self.guard_stale_secs == 0 {
            return Err(LockingError::UserError(
                "config validation failed: guard_stale_secs must be greater than 0".to_string(),
            ));
        }

        if self.admin_users.iter().any(|u| u.trim().is_empty()) {
            return Err(LockingError::UserError(
                "config validation failed: admin_users entries must be non-empty".to_string(),
            ));
        }

        Ok(())
    }

    pub fn lock_duration(&self) -> Duration {
        Duration::seconds(self.lock_duration_secs as i64)
    }

    pub fn sweep_grace(&self) -> Duration {
        Duration::seconds(self.sweep_grace_secs.min(i64::MAX as u64 / 1_000) as i64)
    }

    pub fn guard_wait(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.guard_wait_ms)
    }

    pub fn guard_stale(&self) -> Duration {
        Duration::seconds(self.guard_stale_secs.min(i64::MAX as u64 / 1_000) as i64)
    }
}

/// Check a requested lock duration in seconds.
pub fn validate_lock_duration(secs: u64) -> Result<()> {
    if secs == 0 {
        return Err(LockingError::UserError(
            "lock duration must be at least 1 second".to_string(),
        ));
    }
    if secs > MAX_LOCK_DURATION_SECS {
        return Err(LockingError::UserError(format!(
            "lock duration must be at most {} seconds, got {}",
            MAX_LOCK_DURATION_SECS, secs
        )));
    }
    Ok(())
}
