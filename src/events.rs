//! Append-only audit log of lock transitions.
//!
//! Events are stored in NDJSON format (one JSON object per line) in
//! `events/events.ndjson` under the store root.
//!
//! # Event Format
//!
//! - `ts`: RFC3339 timestamp
//! - `action`: acquire, renew, deny, release, save_release, force_release, sweep, init
//! - `actor`: the user id behind the action, or `user@HOST` for maintenance
//! - `object`: `kind:id` for object-specific events
//! - `details`: freeform object with action-specific details

use crate::error::{LockingError, Result};
use crate::locks::ObjectRef;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Actions that can be logged as events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventAction {
    /// Store initialized
    Init,
    /// Lock taken by a new holder
    Acquire,
    /// Holder extended its lock
    Renew,
    /// Acquisition refused because another user holds the lock
    Deny,
    /// Holder released its lock
    Release,
    /// Lock released by the holder's save
    SaveRelease,
    /// Administrator cleared another user's lock
    ForceRelease,
    /// Stale rows deleted
    Sweep,
}

impl std::fmt::Display for EventAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            EventAction::Init => "init",
            EventAction::Acquire => "acquire",
            EventAction::Renew => "renew",
            EventAction::Deny => "deny",
            EventAction::Release => "release",
            EventAction::SaveRelease => "save_release",
            EventAction::ForceRelease => "force_release",
            EventAction::Sweep => "sweep",
        };
        f.write_str(name)
    }
}

/// An event record for the audit log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub ts: DateTime<Utc>,

    pub action: EventAction,

    pub actor: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub object: Option<String>,

    pub details: Value,
}

impl Event {
    /// Create an event stamped with the current time. The actor defaults to
    /// `user@HOST` of this process.
    pub fn new(action: EventAction) -> Self {
        Self {
            ts: Utc::now(),
            action,
            actor: crate::locks::owner_string(),
            object: None,
            details: Value::Object(serde_json::Map::new()),
        }
    }

    pub fn at(mut self, ts: DateTime<Utc>) -> Self {
        self.ts = ts;
        self
    }

    pub fn by(mut self, actor: impl Into<String>) -> Self {
        self.actor = actor.into();
        self
    }

    pub fn with_object(mut self, object: &ObjectRef) -> Self {
        self.object = Some(object.to_string());
        self
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = details;
        self
    }

    /// Serialize the event to a single-line JSON string.
    pub fn to_ndjson_line(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| {
            LockingError::StoreError(format!("failed to serialize event to JSON: {}", e))
        })
    }
}

/// Handle on an events file.
#[derive(Debug, Clone)]
pub struct EventLog {
    path: PathBuf,
}

impl EventLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one event as a JSON line.
    ///
    /// The file and its directory are created if needed, and the file is
    /// synced before returning.
    ///
    /// # Arguments
    ///
    /// * `event` - The event to record
    ///
    /// # Returns
    ///
    /// * `Ok(())` - Once the line is written
    /// * `Err(LockingError::StoreError)` - If the file cannot be opened or written
    ///
    /// # Example
    ///
    /// ```no_run
    /// use softlock::events::{Event, EventAction, EventLog};
    ///
    /// let log = EventLog::new(".softlock/events/events.ndjson");
    /// log.append(&Event::new(EventAction::Init))?;
    /// # Ok::<(), softlock::error::LockingError>(())
    /// ```
    pub fn append(&self, event: &Event) -> Result<()> {
        let json_line = event.to_ndjson_line()?;

        if let Some(dir) = self.path.parent()
            && !dir.exists()
        {
            fs::create_dir_all(dir).map_err(|e| {
                LockingError::StoreError(format!(
                    "failed to create events directory '{}': {}",
                    dir.display(),
                    e
                ))
            })?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| {
                LockingError::StoreError(format!(
                    "failed to open events file '{}': {}",
                    self.path.display(),
                    e
                ))
            })?;

        writeln!(file, "{}", json_line).map_err(|e| {
            LockingError::StoreError(format!(
                "failed to write event to '{}': {}",
                self.path.display(),
                e
            ))
        })?;

        file.sync_all().map_err(|e| {
            LockingError::StoreError(format!(
                "failed to sync events file '{}': {}",
                self.path.display(),
                e
            ))
        })
    }

    /// Read every event back, oldest first.
    ///
    /// # Returns
    ///
    /// * `Ok(events)` - All recorded events; empty if the file does not exist
    /// * `Err(LockingError::StoreError)` - If the file cannot be read or a line
    ///   is not a valid event
    pub fn read_all(&self) -> Result<Vec<Event>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let content = fs::read_to_string(&self.path).map_err(|e| {
            LockingError::StoreError(format!(
                "failed to read events file '{}': {}",
                self.path.display(),
                e
            ))
        })?;

        content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| {
                serde_json::from_str(line).map_err(|e| {
                    LockingError::StoreError(format!("failed to parse event line: {}", e))
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_event_creation() {
        let event = Event::new(EventAction::Init);

        assert_eq!(event.action, EventAction::Init);
        assert!(event.actor.contains('@'));
        assert!(event.object.is_none());
        let age = Utc::now().signed_duration_since(event.ts);
        assert!(age.num_minutes() < 1);
    }

    #[test]
    fn test_event_line_shape() {
        let object = ObjectRef::new("article", "42").unwrap();
        let event = Event::new(EventAction::SaveRelease)
            .by("ada")
            .with_object(&object)
            .with_details(json!({"released": true}));

        let line = event.to_ndjson_line().unwrap();
        assert!(!line.contains('\n'));
        assert!(line.contains(r#""action":"save_release""#));
        assert!(line.contains(r#""object":"article:42""#));
        assert!(line.contains(r#""actor":"ada""#));
    }

    #[test]
    fn test_object_is_omitted_when_absent() {
        let line = Event::new(EventAction::Sweep).to_ndjson_line().unwrap();
        assert!(!line.contains("\"object\""));
    }

    #[test]
    fn test_append_creates_file_and_keeps_order() {
        let dir = TempDir::new().unwrap();
        let log = EventLog::new(dir.path().join("events").join("events.ndjson"));

        log.append(&Event::new(EventAction::Acquire).by("ada")).unwrap();
        log.append(&Event::new(EventAction::Release).by("ada")).unwrap();

        let content = fs::read_to_string(log.path()).unwrap();
        assert_eq!(content.lines().count(), 2);

        let actions: Vec<_> = log.read_all().unwrap().into_iter().map(|e| e.action).collect();
        assert_eq!(actions, vec![EventAction::Acquire, EventAction::Release]);
    }

    #[test]
    fn test_missing_log_reads_empty() {
        let dir = TempDir::new().unwrap();
        let log = EventLog::new(dir.path().join("events.ndjson"));
        assert!(log.read_all().unwrap().is_empty());
    }

    #[test]
    fn test_action_display_matches_serde_name() {
        for action in [
            EventAction::Init,
            EventAction::Acquire,
            EventAction::Renew,
            EventAction::Deny,
            EventAction::Release,
            EventAction::SaveRelease,
            EventAction::ForceRelease,
            EventAction::Sweep,
        ] {
            let json = serde_json::to_string(&action).unwrap();
            assert_eq!(json, format!("\"{}\"", action));
        }
    }
}
