//! Lock storage: the `LockStore` trait and the in-process `MemoryStore`.
//!
//! Stores never decide lock policy. They load rows and apply conditional
//! writes: a write only lands if the stored row still carries the version the
//! caller read. That single compare-and-swap is what keeps two users from both
//! winning an acquisition.

use super::types::{Lock, ObjectRef};
use crate::error::{LockingError, Result};
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

/// Persistence for lock rows, keyed by object.
pub trait LockStore: Send + Sync {
    /// Load the row for `object`, if one exists.
    fn load(&self, object: &ObjectRef) -> Result<Option<Lock>>;

    /// Store `next` if the current row's version equals `expected`.
    ///
    /// `expected == None` means the row must not exist yet. Returns `false`
    /// when the stored row changed since it was read.
    fn compare_and_swap(&self, expected: Option<u64>, next: &Lock) -> Result<bool>;

    /// Delete the row for `object` if its version still equals `expected`.
    fn compare_and_delete(&self, object: &ObjectRef, expected: u64) -> Result<bool>;

    /// All rows, sorted by object.
    fn list(&self) -> Result<Vec<Lock>>;
}

impl<T: LockStore + ?Sized> LockStore for Arc<T> {
    fn load(&self, object: &ObjectRef) -> Result<Option<Lock>> {
        (**self).load(object)
    }

    fn compare_and_swap(&self, expected: Option<u64>, next: &Lock) -> Result<bool> {
        (**self).compare_and_swap(expected, next)
    }

    fn compare_and_delete(&self, object: &ObjectRef, expected: u64) -> Result<bool> {
        (**self).compare_and_delete(object, expected)
    }

    fn list(&self) -> Result<Vec<Lock>> {
        (**self).list()
    }
}

/// Rows held in process memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    rows: RwLock<BTreeMap<ObjectRef, Lock>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned() -> LockingError {
    LockingError::StoreError("memory store lock poisoned".to_string())
}

impl LockStore for MemoryStore {
    fn load(&self, object: &ObjectRef) -> Result<Option<Lock>> {
        let rows = self.rows.read().map_err(|_| poisoned())?;
        Ok(rows.get(object).cloned())
    }

    fn compare_and_swap(&self, expected: Option<u64>, next: &Lock) -> Result<bool> {
        let mut rows = self.rows.write().map_err(|_| poisoned())?;
        let current = rows.get(&next.object).map(|row| row.version);
        if current != expected {
            return Ok(false);
        }
        rows.insert(next.object.clone(), next.clone());
        Ok(true)
    }

    fn compare_and_delete(&self, object: &ObjectRef, expected: u64) -> Result<bool> {
        let mut rows = self.rows.write().map_err(|_| poisoned())?;
        match rows.get(object) {
            Some(row) if row.version == expected => {
                rows.remove(object);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    fn list(&self) -> Result<Vec<Lock>> {
        let rows = self.rows.read().map_err(|_| poisoned())?;
        Ok(rows.values().cloned().collect())
    }
}
