use crate::config::Config;
use crate::context::StoreContext;
use crate::locks::{LockManager, ManualClock, MemoryStore, ObjectRef, User};
use chrono::{DateTime, TimeZone, Utc};
use std::sync::Arc;
use tempfile::TempDir;

/// Fixed start time for clock-driven tests.
pub(crate) fn epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap()
}

pub(crate) fn article(id: &str) -> ObjectRef {
    ObjectRef::new("article", id).unwrap()
}

pub(crate) fn ada() -> User {
    User::new("ada", "Ada Lovelace")
}

pub(crate) fn bob() -> User {
    User::new("bob", "Bob Builder")
}

/// Config used by in-memory tests: defaults plus `root` as administrator.
pub(crate) fn test_config() -> Config {
    Config {
        admin_users: vec!["root".to_string()],
        ..Config::default()
    }
}

/// A manager over a fresh in-memory store, on a manual clock set to [`epoch`].
pub(crate) fn memory_manager() -> (ManualClock, LockManager<Arc<MemoryStore>, ManualClock>) {
    let clock = ManualClock::new(epoch());
    let manager = LockManager::with_clock(
        Arc::new(MemoryStore::new()),
        clock.clone(),
        &test_config(),
    );
    (clock, manager)
}

/// An initialized lock store in a temporary directory.
pub(crate) fn temp_store() -> (TempDir, StoreContext) {
    let dir = TempDir::new().unwrap();
    let ctx = StoreContext::at(dir.path()).unwrap();
    std::fs::create_dir_all(&ctx.locks_dir).unwrap();
    std::fs::create_dir_all(&ctx.events_dir).unwrap();
    (dir, ctx)
}
