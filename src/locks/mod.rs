//! Soft-lock model.
//!
//! A lock row maps one object to the user editing it and an expiration time.
//! Locks are advisory: they keep two admin users from editing the same record
//! at once, but nothing below the UI enforces them.
//!
//! # Rows
//!
//! - `object`: `kind:id` of the locked record
//! - `locked_by`: the holder, cleared on release
//! - `lock_expiration_time`: after this the row counts as unlocked (lazy expiry)
//! - `version`: compare-and-swap token, bumped on every write
//!
//! # Stores
//!
//! [`MemoryStore`] keeps rows in process memory. [`FileStore`] keeps one JSON
//! file per object and is safe to share between processes on one host. Both
//! implement [`LockStore`], whose only write primitive is a conditional swap.

mod clock;
mod file_store;
mod guard;
mod manager;
mod status;
mod store;
mod types;


pub use clock::{Clock, ManualClock, SystemClock};
pub use file_store::FileStore;
pub use guard::{GuardMetadata, StoreGuard};
pub(crate) use guard::owner_string;
pub use manager::{Acquired, LockManager, MAX_CAS_ATTEMPTS};
pub use status::{CSS_FOREIGN_LOCK, CSS_OWN_LOCK, LockStatus, render_admin_status, status_message};
pub use store::{LockStore, MemoryStore};
pub use types::{Lock, ObjectRef, User};
