//! Lock manager: acquire, release, query and sweep soft locks.
//!
//! Every mutation reads the current row, computes the next row with the pure
//! transitions on [`Lock`], and writes it back with a compare-and-swap on the
//! row version. When the swap loses a race the whole decision is re-made from
//! a fresh read, so a competing holder is always seen before a write lands.

use super::clock::{Clock, SystemClock};
use super::store::LockStore;
use super::types::{Lock, ObjectRef, User};
use crate::config::Config;
use crate::error::{LockingError, Result};
use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info};

/// Attempts at a conditional write before giving up.
pub const MAX_CAS_ATTEMPTS: usize = 8;

/// Outcome of a successful [`LockManager::lock_for`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Acquired {
    /// The row as stored.
    pub lock: Lock,

    /// The caller already held the lock and only extended it.
    pub renewed: bool,
}

/// Coordinates soft locks over a [`LockStore`].
#[derive(Debug)]
pub struct LockManager<S, C = SystemClock> {
    store: S,
    clock: C,
    default_duration: Duration,
    admin_users: Vec<String>,
}

impl<S: LockStore> LockManager<S, SystemClock> {
    /// Manager on the wall clock with settings from `config`.
    pub fn new(store: S, config: &Config) -> Self {
        Self::with_clock(store, SystemClock, config)
    }
}

impl<S: LockStore, C: Clock> LockManager<S, C> {
    pub fn with_clock(store: S, clock: C, config: &Config) -> Self {
        Self {
            store,
            clock,
            default_duration: config.lock_duration(),
            admin_users: config.admin_users.clone(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn default_duration(&self) -> Duration {
        self.default_duration
    }

    /// Whether `user_id` may override other users' locks.
    pub fn is_admin(&self, user_id: &str) -> bool {
        self.admin_users.iter().any(|admin| admin == user_id)
    }

    /// Fetch the row for `object`; `NotFound` if it was never locked.
    pub fn get_lock_for_object(&self, object: &ObjectRef) -> Result<Lock> {
        self.store
            .load(object)?
            .ok_or_else(|| LockingError::NotFound(object.clone()))
    }

    /// True iff someone holds an unexpired lock on `object`.
    pub fn is_locked(&self, object: &ObjectRef) -> Result<bool> {
        let now = self.now();
        Ok(self
            .store
            .load(object)?
            .is_some_and(|lock| lock.is_locked_at(now)))
    }

    /// True iff `user_id` holds an unexpired lock on `object`.
    pub fn is_locked_by(&self, object: &ObjectRef, user_id: &str) -> Result<bool> {
        let now = self.now();
        Ok(self
            .store
            .load(object)?
            .is_some_and(|lock| lock.is_locked_by_at(user_id, now)))
    }

    /// Acquire or renew the lock on `object` for `user`.
    ///
    /// `duration` defaults to the configured lock duration. Fails with
    /// `AlreadyLocked` while another user's lock is active.
    pub fn lock_for(
        &self,
        object: &ObjectRef,
        user: &User,
        duration: Option<Duration>,
    ) -> Result<Acquired> {
        let duration = duration.unwrap_or(self.default_duration);
        let mut renewed = false;

        let lock = self.update(object, |current, now| {
            let base = current
                .cloned()
                .unwrap_or_else(|| Lock::new(object.clone()));
            renewed = base.is_locked_by_at(&user.id, now);
            base.lock_for(user, duration, now).map(Some)
        })?;

        info!(
            object = %object,
            user = %user.id,
            renewed,
            expires_at = ?lock.lock_expiration_time,
            "lock acquired"
        );
        Ok(Acquired { lock, renewed })
    }

    /// Release `user`'s lock on `object`.
    ///
    /// Returns `true` when a holder was cleared and `false` when there was
    /// nothing to release. Another user's active lock is never cleared here:
    /// that is an `UnauthorizedRelease`. A missing row is `NotFound`.
    pub fn unlock_for(&self, object: &ObjectRef, user: &User) -> Result<bool> {
        let mut released = false;

        self.update(object, |current, now| {
            let current = current.ok_or_else(|| LockingError::NotFound(object.clone()))?;
            let next = current.unlock_for(user, now)?;
            released = next.is_some();
            Ok(next)
        })?;

        if released {
            info!(object = %object, user = %user.id, "lock released");
        }
        Ok(released)
    }

    /// Release the lock held by the saving user, as the save path does before
    /// writing the object.
    ///
    /// Only an active lock held by `user` is released. Missing rows, expired
    /// locks and locks of other users leave the store untouched and yield
    /// `false`.
    pub fn release_on_save(&self, object: &ObjectRef, user: &User) -> Result<bool> {
        let lock = match self.get_lock_for_object(object) {
            Ok(lock) => lock,
            Err(LockingError::NotFound(_)) => return Ok(false),
            Err(e) => return Err(e),
        };

        if !lock.is_locked_by_at(&user.id, self.now()) {
            debug!(object = %object, user = %user.id, "save by non-holder, lock left alone");
            return Ok(false);
        }

        match self.unlock_for(object, user) {
            Ok(released) => Ok(released),
            // Lost the lock between the check and the release.
            Err(LockingError::NotFound(_)) | Err(LockingError::UnauthorizedRelease { .. }) => {
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    /// Administrator override: clear whoever holds the lock on `object`.
    pub fn force_unlock(&self, object: &ObjectRef, admin: &User) -> Result<bool> {
        if !self.is_admin(&admin.id) {
            return Err(LockingError::UnauthorizedRelease {
                object: object.clone(),
                user: admin.id.clone(),
            });
        }

        let mut previous = None;
        self.update(object, |current, _now| {
            let current = current.ok_or_else(|| LockingError::NotFound(object.clone()))?;
            previous = current.locked_by.clone();
            Ok(current.locked_by.as_ref().map(|_| current.released()))
        })?;

        if let Some(holder) = &previous {
            info!(object = %object, admin = %admin.id, holder = %holder.id, "lock force-released");
        }
        Ok(previous.is_some())
    }

    /// All rows, sorted by object.
    pub fn list(&self) -> Result<Vec<Lock>> {
        self.store.list()
    }

    /// Delete rows that are unlocked, or expired for longer than `grace`.
    ///
    /// Returns how many rows were removed. A row that changes while the sweep
    /// runs is kept.
    pub fn sweep(&self, grace: Duration) -> Result<usize> {
        let now = self.now();
        let mut removed = 0;

        for lock in self.store.list()? {
            let removable = match (&lock.locked_by, lock.lock_expiration_time) {
                (None, _) | (Some(_), None) => true,
                (Some(_), Some(expires)) => expires
                    .checked_add_signed(grace)
                    .is_some_and(|limit| limit <= now),
            };
            if removable && self.store.compare_and_delete(&lock.object, lock.version)? {
                debug!(object = %lock.object, "swept lock row");
                removed += 1;
            }
        }

        info!(removed, "lock sweep finished");
        Ok(removed)
    }

    /// Read, decide, compare-and-swap; retried from a fresh read on conflict.
    ///
    /// `transition` returns the row to write, or `None` to leave the store
    /// as it is (the current row is then returned).
    fn update<F>(&self, object: &ObjectRef, mut transition: F) -> Result<Lock>
    where
        F: FnMut(Option<&Lock>, DateTime<Utc>) -> Result<Option<Lock>>,
    {
        for attempt in 1..=MAX_CAS_ATTEMPTS {
            let current = self.store.load(object)?;
            let now = self.clock.now();

            let Some(next) = transition(current.as_ref(), now)? else {
                return current.ok_or_else(|| LockingError::NotFound(object.clone()));
            };

            let expected = current.as_ref().map(|row| row.version);
            if self.store.compare_and_swap(expected, &next)? {
                return Ok(next);
            }
            debug!(object = %object, attempt, "lock row changed concurrently, retrying");
        }

        Err(LockingError::StoreError(format!(
            "gave up updating lock for {} after {} conflicting writes",
            object, MAX_CAS_ATTEMPTS
        )))
    }
}
