//! Lock rows and the identities they refer to.

use crate::error::{LockingError, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Identifies a lockable object: its kind (content type) and primary key.
///
/// The textual form is `kind:id`, e.g. `article:42`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ObjectRef {
    /// Object kind, lowercase (e.g. `article`, `blog.entry`).
    pub kind: String,

    /// Primary key of the object within its kind.
    pub id: String,
}

impl ObjectRef {
    /// Build a validated object reference.
    ///
    /// The kind is lowercased. Both parts become path components of the file
    /// store, so separators, whitespace and leading dots are rejected.
    pub fn new(kind: impl Into<String>, id: impl Into<String>) -> Result<Self> {
        let kind = kind.into().trim().to_lowercase();
        let id = id.into().trim().to_string();

        if kind.is_empty() || id.is_empty() {
            return Err(LockingError::UserError(
                "object reference needs both a kind and an id (e.g. 'article:42')".to_string(),
            ));
        }

        if kind.starts_with('.')
            || !kind
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '_' | '-' | '.'))
        {
            return Err(LockingError::UserError(format!(
                "invalid object kind '{}': use lowercase letters, digits, '_', '-' or '.'",
                kind
            )));
        }

        if id.starts_with('.')
            || id
                .chars()
                .any(|c| c.is_whitespace() || c.is_control() || matches!(c, '/' | '\\' | ':'))
        {
            return Err(LockingError::UserError(format!(
                "invalid object id '{}': separators, whitespace and leading dots are not allowed",
                id
            )));
        }

        Ok(Self { kind, id })
    }

    /// Parse the `kind:id` form.
    pub fn parse(s: &str) -> Result<Self> {
        let (kind, id) = s.split_once(':').ok_or_else(|| {
            LockingError::UserError(format!(
                "invalid object reference '{}': expected 'kind:id'",
                s
            ))
        })?;
        Self::new(kind, id)
    }
}

impl FromStr for ObjectRef {
    type Err = LockingError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}

/// A user of the admin interface, as seen by the lock model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Stable user identifier (primary key or username).
    pub id: String,

    /// Full name shown to other users. May be empty.
    #[serde(default)]
    pub full_name: String,
}

impl User {
    pub fn new(id: impl Into<String>, full_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            full_name: full_name.into(),
        }
    }

    /// Build a user from caller input, rejecting a blank id.
    pub fn try_new(id: impl Into<String>, full_name: impl Into<String>) -> Result<Self> {
        let id: String = id.into();
        let user = Self::new(id.trim(), full_name);
        user.validate()?;
        Ok(user)
    }

    /// A blank id would match any other blank viewer, so it cannot hold locks.
    pub fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(LockingError::UserError(
                "user id must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Name to show in lock messages; falls back to the id.
    pub fn display_name(&self) -> &str {
        if self.full_name.trim().is_empty() {
            &self.id
        } else {
            &self.full_name
        }
    }
}

impl fmt::Display for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// One lock row per lockable object.
///
/// A row whose holder is set but whose expiration has passed is logically
/// unlocked (lazy expiry). Rows are never deleted by expiry itself, only by
/// an explicit sweep.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lock {
    /// The locked object.
    pub object: ObjectRef,

    /// The user holding the lock, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locked_by: Option<User>,

    /// When the current holder first acquired the lock.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locked_at: Option<DateTime<Utc>>,

    /// After this instant the lock no longer counts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lock_expiration_time: Option<DateTime<Utc>>,

    /// Bumped on every write; stores compare it before swapping rows.
    #[serde(default)]
    pub version: u64,
}

impl Lock {
    /// An unlocked row that has not been stored yet.
    pub fn new(object: ObjectRef) -> Self {
        Self {
            object,
            locked_by: None,
            locked_at: None,
            lock_expiration_time: None,
            version: 0,
        }
    }

    /// The recorded holder, whether or not the lock is still active.
    pub fn holder(&self) -> Option<&User> {
        self.locked_by.as_ref()
    }

    /// True iff a holder is set and `now` is before the expiration time.
    pub fn is_locked_at(&self, now: DateTime<Utc>) -> bool {
        match (&self.locked_by, self.lock_expiration_time) {
            (Some(_), Some(expires)) => now < expires,
            _ => false,
        }
    }

    /// True iff the lock is active and held by `user_id`.
    pub fn is_locked_by_at(&self, user_id: &str, now: DateTime<Utc>) -> bool {
        self.is_locked_at(now) && self.locked_by.as_ref().is_some_and(|u| u.id == user_id)
    }

    /// A holder is recorded but the lock has run out.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.locked_by.is_some() && !self.is_locked_at(now)
    }

    /// Time left on an active lock.
    pub fn remaining_at(&self, now: DateTime<Utc>) -> Option<Duration> {
        if !self.is_locked_at(now) {
            return None;
        }
        self.lock_expiration_time.map(|expires| expires - now)
    }

    /// The row that results from `user` acquiring (or renewing) this lock.
    ///
    /// Succeeds when the row is unlocked, expired, or already held by `user`;
    /// the expiration becomes `now + duration`. A renewal keeps `locked_at`.
    pub fn lock_for(&self, user: &User, duration: Duration, now: DateTime<Utc>) -> Result<Lock> {
        user.validate()?;
        if duration <= Duration::zero() {
            return Err(LockingError::UserError(format!(
                "lock duration must be positive, got {}s",
                duration.num_seconds()
            )));
        }

        let expires = now.checked_add_signed(duration).ok_or_else(|| {
            LockingError::UserError(format!(
                "lock duration of {}s is out of range",
                duration.num_seconds()
            ))
        })?;

        let renewing = self.is_locked_by_at(&user.id, now);
        if self.is_locked_at(now) && !renewing {
            return Err(self.already_locked());
        }

        Ok(Lock {
            object: self.object.clone(),
            locked_by: Some(user.clone()),
            locked_at: if renewing { self.locked_at.or(Some(now)) } else { Some(now) },
            lock_expiration_time: Some(expires),
            version: self.version + 1,
        })
    }

    /// The row that results from `user` releasing this lock.
    ///
    /// Returns `Ok(None)` when there is nothing to release: no holder, or an
    /// expired lock, whoever held it. An active lock of another user is an
    /// `UnauthorizedRelease` and must be left untouched.
    pub fn unlock_for(&self, user: &User, now: DateTime<Utc>) -> Result<Option<Lock>> {
        match &self.locked_by {
            Some(_) if !self.is_locked_at(now) => Ok(None),
            None => Ok(None),
            Some(holder) if holder.id == user.id => Ok(Some(self.released())),
            Some(_) => Err(LockingError::UnauthorizedRelease {
                object: self.object.clone(),
                user: user.id.clone(),
            }),
        }
    }

    /// The row with its holder cleared, whoever held it.
    pub fn released(&self) -> Lock {
        Lock {
            object: self.object.clone(),
            locked_by: None,
            locked_at: None,
            lock_expiration_time: None,
            version: self.version + 1,
        }
    }

    fn already_locked(&self) -> LockingError {
        LockingError::AlreadyLocked {
            object: self.object.clone(),
            holder: self
                .locked_by
                .clone()
                .unwrap_or_else(|| User::new("unknown", "")),
            expires_at: self.lock_expiration_time.unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap()
    }

    fn held_by(user: &User) -> Lock {
        Lock::new(ObjectRef::new("article", "42").unwrap())
            .lock_for(user, Duration::seconds(60), now())
            .unwrap()
    }

    #[test]
    fn holder_releases_active_lock() {
        let ada = User::new("ada", "Ada Lovelace");
        let lock = held_by(&ada);

        let released = lock.unlock_for(&ada, now()).unwrap().unwrap();
        assert_eq!(released.locked_by, None);
        assert_eq!(released.version, lock.version + 1);
    }

    #[test]
    fn expired_lock_has_nothing_to_release_even_for_holder() {
        let ada = User::new("ada", "Ada Lovelace");
        let lock = held_by(&ada);
        let later = now() + Duration::seconds(61);

        assert_eq!(lock.unlock_for(&ada, later).unwrap(), None);
        assert_eq!(lock.unlock_for(&User::new("bob", ""), later).unwrap(), None);
    }

    #[test]
    fn active_lock_of_other_user_is_refused() {
        let lock = held_by(&User::new("ada", ""));
        let err = lock.unlock_for(&User::new("bob", ""), now()).unwrap_err();
        assert!(matches!(err, LockingError::UnauthorizedRelease { .. }));
    }

    #[test]
    fn blank_user_ids_are_rejected() {
        assert!(User::try_new("", "Nobody").is_err());
        assert!(User::try_new("   ", "").is_err());
        assert_eq!(User::try_new(" ada ", "").unwrap().id, "ada");

        let object = ObjectRef::new("article", "42").unwrap();
        let err = Lock::new(object)
            .lock_for(&User::new("", ""), Duration::seconds(60), now())
            .unwrap_err();
        assert!(matches!(err, LockingError::UserError(_)));
    }
}
