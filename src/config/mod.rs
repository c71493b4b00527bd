//! Configuration model for softlock.
//!
//! This module defines the Config struct that represents `config.yaml` at the
//! lock store root. It supports forward-compatible YAML parsing (unknown
//! fields are ignored), sensible defaults for optional fields, and validation
//! of config values.

mod model;
mod operations;


// Re-export public API
pub use model::{Config, DEFAULT_LOCK_DURATION_SECS, MAX_LOCK_DURATION_SECS};
pub use operations::{CONFIG_TEMPLATE, validate_lock_duration};
