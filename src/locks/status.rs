//! Lock status as shown to a viewing user.

use super::types::{Lock, ObjectRef, User};
use crate::humanize;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// CSS class for a lock the viewer holds.
pub const CSS_OWN_LOCK: &str = "locking-edit";

/// CSS class for a lock held by someone else.
pub const CSS_FOREIGN_LOCK: &str = "locking-locked";

/// Status reply for polling clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockStatus {
    /// `kind:id` of the object.
    pub object: String,

    pub locked: bool,

    /// Display name of the holder.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<String>,

    /// The viewer holds the lock.
    pub is_owner: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locked_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,

    /// Whole seconds left on the lock.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<i64>,

    /// Locked, with no more than the warning window left.
    pub expiring_soon: bool,

    /// Human-readable summary; empty when unlocked.
    pub message: String,
}

impl LockStatus {
    /// Status of an object that has no active lock.
    pub fn unlocked(object: &ObjectRef) -> Self {
        Self {
            object: object.to_string(),
            locked: false,
            owner: None,
            owner_id: None,
            is_owner: false,
            locked_at: None,
            expires_at: None,
            expires_in: None,
            expiring_soon: false,
            message: String::new(),
        }
    }

    /// Describe `lock` for `viewer` at `now`. With no viewer nobody is the
    /// owner.
    pub fn describe(
        lock: &Lock,
        viewer: Option<&str>,
        now: DateTime<Utc>,
        warning_secs: i64,
    ) -> Self {
        let (Some(holder), Some(expires_at)) = (lock.holder(), lock.lock_expiration_time) else {
            return Self::unlocked(&lock.object);
        };
        if !lock.is_locked_at(now) {
            return Self::unlocked(&lock.object);
        }

        let mut status = Self::held(&lock.object, holder, expires_at, viewer, now, warning_secs);
        status.locked_at = lock.locked_at;
        status
    }

    /// Status of a lock known to be held by `holder` until `expires_at`.
    ///
    /// Used when acquisition was refused: the reply reports the holder seen
    /// at that moment even if the lock has run out since.
    pub fn held(
        object: &ObjectRef,
        holder: &User,
        expires_at: DateTime<Utc>,
        viewer: Option<&str>,
        now: DateTime<Utc>,
        warning_secs: i64,
    ) -> Self {
        let expires_in = (expires_at - now).num_seconds().max(0);
        let is_owner = viewer == Some(holder.id.as_str());
        Self {
            object: object.to_string(),
            locked: true,
            owner: Some(holder.display_name().to_string()),
            owner_id: Some(holder.id.clone()),
            is_owner,
            locked_at: None,
            expires_at: Some(expires_at),
            expires_in: Some(expires_in),
            expiring_soon: expires_in <= warning_secs,
            message: holder_message(holder, is_owner, now, expires_at),
        }
    }
}

/// `"You own this lock for T longer"`, `"Locked by NAME for T longer"`, or
/// empty when the lock is not active.
pub fn status_message(lock: &Lock, viewer: Option<&str>, now: DateTime<Utc>) -> String {
    let (Some(holder), Some(expires)) = (lock.holder(), lock.lock_expiration_time) else {
        return String::new();
    };
    if !lock.is_locked_at(now) {
        return String::new();
    }
    holder_message(holder, viewer == Some(holder.id.as_str()), now, expires)
}

fn holder_message(
    holder: &User,
    is_owner: bool,
    now: DateTime<Utc>,
    expires: DateTime<Utc>,
) -> String {
    let until = humanize::time_until(now, expires);
    if is_owner {
        format!("You own this lock for {} longer", until)
    } else {
        format!("Locked by {} for {} longer", holder.display_name(), until)
    }
}

/// Markup for an admin change-list cell.
///
/// Empty when there is no active lock. Otherwise an empty anchor carrying the
/// status message as its title and a CSS class telling the viewer's own lock
/// apart from someone else's. Attribute values are entity-encoded.
pub fn render_admin_status(lock: Option<&Lock>, viewer_id: &str, now: DateTime<Utc>) -> String {
    let Some(lock) = lock.filter(|lock| lock.is_locked_at(now)) else {
        return String::new();
    };
    let Some(holder) = lock.holder() else {
        return String::new();
    };

    let css_class = if holder.id == viewer_id {
        CSS_OWN_LOCK
    } else {
        CSS_FOREIGN_LOCK
    };

    format!(
        r##"<a href="#" title="{}" data-lock-id="{}" data-locked-by="{}" class="locking-status {}"></a>"##,
        htmlescape::encode_minimal(&status_message(lock, Some(viewer_id), now)),
        htmlescape::encode_minimal(&lock.object.to_string()),
        htmlescape::encode_minimal(holder.display_name()),
        css_class
    )
}
