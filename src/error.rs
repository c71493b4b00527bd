//! Error types for softlock.
//!
//! Uses thiserror for derive macros. Lock-model outcomes (`NotFound`,
//! `AlreadyLocked`, `UnauthorizedRelease`) are errors here; the boundary API
//! decides which of them the user ever sees.

use crate::exit_codes;
use crate::locks::{ObjectRef, User};
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Main error type for softlock operations.
#[derive(Error, Debug)]
pub enum LockingError {
    /// No lock row exists for the object. Callers treat this as unlocked.
    #[error("no lock exists for {0}")]
    NotFound(ObjectRef),

    /// Another user holds an unexpired lock.
    #[error("{object} is locked by {holder} until {expires_at}")]
    AlreadyLocked {
        object: ObjectRef,
        holder: User,
        expires_at: DateTime<Utc>,
    },

    /// Release attempted by someone who does not hold the lock.
    #[error("{user} may not release the lock on {object}")]
    UnauthorizedRelease { object: ObjectRef, user: String },

    /// Bad arguments, bad configuration, or an uninitialized store.
    #[error("{0}")]
    UserError(String),

    /// The lock store could not be read or written.
    #[error("Lock store failure: {0}")]
    StoreError(String),
}

impl LockingError {
    /// Returns the appropriate exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            LockingError::UserError(_) => exit_codes::USER_ERROR,
            LockingError::StoreError(_) => exit_codes::STORE_FAILURE,
            LockingError::NotFound(_) => exit_codes::NOT_PERMITTED,
            LockingError::UnauthorizedRelease { .. } => exit_codes::NOT_PERMITTED,
            LockingError::AlreadyLocked { .. } => exit_codes::LOCK_FAILURE,
        }
    }
}

/// Result type alias for softlock operations.
pub type Result<T> = std::result::Result<T, LockingError>;
