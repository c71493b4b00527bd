//! Boundary API used by an admin front end.
//!
//! [`LockService`] turns lock-model outcomes into replies a UI can show:
//! contention becomes `acquired: false` with a "Locked by ..." status, and
//! releases by non-holders become `released: false`. Every transition is
//! recorded in the audit log when one is attached.

use crate::config::Config;
use crate::error::{LockingError, Result};
use crate::events::{Event, EventAction, EventLog};
use crate::locks::{
    Clock, Lock, LockManager, LockStatus, LockStore, ObjectRef, SystemClock, User,
    render_admin_status,
};
use chrono::Duration;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, warn};

/// Reply to a lock request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockReply {
    /// The caller holds the lock now.
    pub acquired: bool,

    /// The caller already held it and the expiration was pushed out.
    pub renewed: bool,

    /// The lock as the caller now sees it.
    pub status: LockStatus,
}

/// Reply to a release.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ack {
    pub object: String,
    pub released: bool,
}

impl Ack {
    fn new(object: &ObjectRef, released: bool) -> Self {
        Self {
            object: object.to_string(),
            released,
        }
    }
}

/// Lock operations as exposed to the admin UI.
#[derive(Debug)]
pub struct LockService<S, C = SystemClock> {
    manager: LockManager<S, C>,
    warning_secs: i64,
    sweep_grace: Duration,
    events: Option<EventLog>,
}

impl<S: LockStore> LockService<S, SystemClock> {
    pub fn new(store: S, config: &Config) -> Self {
        Self::with_clock(store, SystemClock, config)
    }
}

impl<S: LockStore, C: Clock> LockService<S, C> {
    pub fn with_clock(store: S, clock: C, config: &Config) -> Self {
        Self {
            manager: LockManager::with_clock(store, clock, config),
            warning_secs: i64::try_from(config.warning_secs).unwrap_or(i64::MAX),
            sweep_grace: config.sweep_grace(),
            events: None,
        }
    }

    /// Record transitions to `log`.
    pub fn with_events(mut self, log: EventLog) -> Self {
        self.events = Some(log);
        self
    }

    pub fn manager(&self) -> &LockManager<S, C> {
        &self.manager
    }

    /// Acquire or renew `user`'s lock on `object`.
    ///
    /// A lock held by someone else is not an error: the reply has
    /// `acquired: false` and a status naming the holder.
    pub fn lock(
        &self,
        object: &ObjectRef,
        user: &User,
        duration: Option<Duration>,
    ) -> Result<LockReply> {
        user.validate()?;
        match self.manager.lock_for(object, user, duration) {
            Ok(acquired) => {
                let action = if acquired.renewed {
                    EventAction::Renew
                } else {
                    EventAction::Acquire
                };
                self.record(
                    Event::new(action)
                        .by(&user.id)
                        .with_object(object)
                        .with_details(json!({
                            "expires_at": acquired.lock.lock_expiration_time,
                        })),
                );

                Ok(LockReply {
                    acquired: true,
                    renewed: acquired.renewed,
                    status: self.describe(&acquired.lock, Some(user.id.as_str())),
                })
            }
            Err(LockingError::AlreadyLocked {
                holder, expires_at, ..
            }) => {
                debug!(object = %object, user = %user.id, holder = %holder.id, "lock denied");
                self.record(
                    Event::new(EventAction::Deny)
                        .by(&user.id)
                        .with_object(object)
                        .with_details(json!({
                            "holder": holder.id,
                            "expires_at": expires_at,
                        })),
                );

                // Report the holder that refused us, even if its lock ran out
                // or was released after the decision.
                let current = self.manager.store().load(object)?;
                let status = match current {
                    Some(lock) if lock.is_locked_by_at(&holder.id, self.manager.now()) => {
                        self.describe(&lock, Some(user.id.as_str()))
                    }
                    _ => LockStatus::held(
                        object,
                        &holder,
                        expires_at,
                        Some(user.id.as_str()),
                        self.manager.now(),
                        self.warning_secs,
                    ),
                };

                Ok(LockReply {
                    acquired: false,
                    renewed: false,
                    status,
                })
            }
            Err(e) => Err(e),
        }
    }

    /// Release `user`'s lock. Missing rows and other users' locks give
    /// `released: false`.
    pub fn unlock(&self, object: &ObjectRef, user: &User) -> Result<Ack> {
        user.validate()?;
        let released = match self.manager.unlock_for(object, user) {
            Ok(released) => released,
            Err(LockingError::NotFound(_)) | Err(LockingError::UnauthorizedRelease { .. }) => false,
            Err(e) => return Err(e),
        };

        if released {
            self.record(
                Event::new(EventAction::Release)
                    .by(&user.id)
                    .with_object(object),
            );
        }
        Ok(Ack::new(object, released))
    }

    /// Current status of `object` for `viewer_id`. Objects never locked read
    /// as unlocked.
    pub fn lock_status(&self, object: &ObjectRef, viewer_id: &str) -> Result<LockStatus> {
        Ok(match self.manager.store().load(object)? {
            Some(lock) => self.describe(&lock, Some(viewer_id)),
            None => LockStatus::unlocked(object),
        })
    }

    /// Drop `user`'s lock ahead of saving the object.
    pub fn release_on_save(&self, object: &ObjectRef, user: &User) -> Result<Ack> {
        user.validate()?;
        let released = self.manager.release_on_save(object, user)?;
        if released {
            self.record(
                Event::new(EventAction::SaveRelease)
                    .by(&user.id)
                    .with_object(object),
            );
        }
        Ok(Ack::new(object, released))
    }

    /// Admin change-list markup for `object`; empty when unlocked.
    pub fn render_admin_status(&self, object: &ObjectRef, viewer_id: &str) -> Result<String> {
        let lock = self.manager.store().load(object)?;
        Ok(render_admin_status(
            lock.as_ref(),
            viewer_id,
            self.manager.now(),
        ))
    }

    /// Clear any holder's lock. Only configured administrators may do this.
    pub fn force_unlock(&self, object: &ObjectRef, admin: &User) -> Result<Ack> {
        admin.validate()?;
        let previous = self
            .manager
            .store()
            .load(object)?
            .and_then(|lock| lock.locked_by);

        let released = match self.manager.force_unlock(object, admin) {
            Ok(released) => released,
            Err(LockingError::NotFound(_)) => false,
            Err(e) => return Err(e),
        };

        if released {
            self.record(
                Event::new(EventAction::ForceRelease)
                    .by(&admin.id)
                    .with_object(object)
                    .with_details(json!({
                        "holder": previous.map(|user| user.id),
                    })),
            );
        }
        Ok(Ack::new(object, released))
    }

    /// Status of every stored row, as seen by no particular viewer.
    pub fn list(&self) -> Result<Vec<LockStatus>> {
        Ok(self
            .manager
            .list()?
            .iter()
            .map(|lock| self.describe(lock, None))
            .collect())
    }

    /// Delete stale rows. `grace` defaults to the configured sweep grace.
    pub fn sweep(&self, grace: Option<Duration>) -> Result<usize> {
        let grace = grace.unwrap_or(self.sweep_grace);
        let removed = self.manager.sweep(grace)?;
        self.record(Event::new(EventAction::Sweep).with_details(json!({
            "removed": removed,
            "grace_secs": grace.num_seconds(),
        })));
        Ok(removed)
    }

    fn describe(&self, lock: &Lock, viewer: Option<&str>) -> LockStatus {
        LockStatus::describe(lock, viewer, self.manager.now(), self.warning_secs)
    }

    /// Append to the audit log. A failed append never fails the operation.
    fn record(&self, event: Event) {
        let Some(log) = &self.events else {
            return;
        };
        let event = event.at(self.manager.now());
        if let Err(e) = log.append(&event) {
            warn!(action = %event.action, error = %e, "failed to record lock event");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locks::{ManualClock, MemoryStore};
    use crate::test_support::{ada, article, bob, epoch, temp_store, test_config};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn service() -> (ManualClock, LockService<Arc<MemoryStore>, ManualClock>) {
        let clock = ManualClock::new(epoch());
        let service =
            LockService::with_clock(Arc::new(MemoryStore::new()), clock.clone(), &test_config());
        (clock, service)
    }

    #[test]
    fn lock_reply_for_new_holder() {
        let (_clock, service) = service();
        let reply = service.lock(&article("42"), &ada(), None).unwrap();

        assert!(reply.acquired);
        assert!(!reply.renewed);
        assert!(reply.status.is_owner);
        assert_eq!(reply.status.expires_in, Some(600));
        assert_eq!(reply.status.message, "You own this lock for 10 minutes longer");
    }

    #[test]
    fn contention_is_a_reply_not_an_error() {
        let (clock, service) = service();
        let object = article("42");
        service.lock(&object, &ada(), None).unwrap();

        clock.advance(Duration::seconds(100));
        let reply = service.lock(&object, &bob(), None).unwrap();

        assert!(!reply.acquired);
        assert!(reply.status.locked);
        assert!(!reply.status.is_owner);
        assert_eq!(reply.status.owner.as_deref(), Some("Ada Lovelace"));
        assert_eq!(reply.status.message, "Locked by Ada Lovelace for 8 minutes longer");
    }

    #[test]
    fn second_lock_by_holder_renews() {
        let (clock, service) = service();
        let object = article("42");
        service.lock(&object, &ada(), None).unwrap();

        clock.advance(Duration::seconds(300));
        let reply = service.lock(&object, &ada(), None).unwrap();
        assert!(reply.acquired);
        assert!(reply.renewed);
        assert_eq!(reply.status.expires_in, Some(600));
    }

    #[test]
    fn invalid_duration_is_still_an_error() {
        let (_clock, service) = service();
        let err = service
            .lock(&article("42"), &ada(), Some(Duration::zero()))
            .unwrap_err();
        assert!(matches!(err, LockingError::UserError(_)));
    }

    #[test]
    fn unlock_by_non_holder_is_a_no_op() {
        let (_clock, service) = service();
        let object = article("42");

        assert!(!service.unlock(&object, &ada()).unwrap().released);

        service.lock(&object, &ada(), None).unwrap();
        let ack = service.unlock(&object, &bob()).unwrap();
        assert!(!ack.released);
        assert!(service.manager().is_locked_by(&object, "ada").unwrap());

        let ack = service.unlock(&object, &ada()).unwrap();
        assert_eq!(ack.object, "article:42");
        assert!(ack.released);
        assert!(!service.manager().is_locked(&object).unwrap());
    }

    #[test]
    fn status_of_unknown_object_is_unlocked() {
        let (_clock, service) = service();
        let status = service.lock_status(&article("7"), "ada").unwrap();
        assert!(!status.locked);
        assert_eq!(status.object, "article:7");
    }

    #[test]
    fn late_save_keeps_new_holders_lock() {
        let (clock, service) = service();
        let object = article("42");
        service.lock(&object, &ada(), None).unwrap();

        clock.advance(Duration::seconds(700));
        assert!(service.lock(&object, &bob(), None).unwrap().acquired);

        let ack = service.release_on_save(&object, &ada()).unwrap();
        assert!(!ack.released);
        assert!(service.lock_status(&object, "bob").unwrap().is_owner);

        assert!(service.release_on_save(&object, &bob()).unwrap().released);
    }

    #[test]
    fn render_uses_viewer_class() {
        let (_clock, service) = service();
        let object = article("42");
        assert_eq!(service.render_admin_status(&object, "ada").unwrap(), "");

        service.lock(&object, &ada(), None).unwrap();
        assert!(
            service
                .render_admin_status(&object, "ada")
                .unwrap()
                .contains("locking-edit")
        );
        assert!(
            service
                .render_admin_status(&object, "bob")
                .unwrap()
                .contains("locking-locked")
        );
    }

    #[test]
    fn force_unlock_requires_admin() {
        let (_clock, service) = service();
        let object = article("42");
        service.lock(&object, &ada(), None).unwrap();

        let err = service.force_unlock(&object, &bob()).unwrap_err();
        assert!(matches!(err, LockingError::UnauthorizedRelease { .. }));

        let root = User::new("root", "Site Admin");
        assert!(service.force_unlock(&object, &root).unwrap().released);
        assert!(!service.force_unlock(&object, &root).unwrap().released);
        assert!(!service.force_unlock(&article("missing"), &root).unwrap().released);
    }

    #[test]
    fn list_and_sweep() {
        let (clock, service) = service();
        service.lock(&article("1"), &ada(), None).unwrap();
        service.lock(&article("2"), &bob(), None).unwrap();
        service.unlock(&article("2"), &bob()).unwrap();

        let listed = service.list().unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].object, "article:1");
        assert!(listed[0].locked);
        assert!(!listed[1].locked);

        assert_eq!(service.sweep(None).unwrap(), 1);
        clock.advance(Duration::days(2));
        assert_eq!(service.sweep(None).unwrap(), 1);
        assert!(service.list().unwrap().is_empty());
    }

    #[test]
    fn transitions_are_recorded() {
        let (_dir, ctx) = temp_store();
        let clock = ManualClock::new(epoch());
        let config = test_config();
        let service = LockService::with_clock(ctx.file_store(&config), clock.clone(), &config)
            .with_events(EventLog::new(ctx.events_file()));
        let object = article("42");

        service.lock(&object, &ada(), None).unwrap();
        service.lock(&object, &ada(), None).unwrap();
        service.lock(&object, &bob(), None).unwrap();
        service.unlock(&object, &bob()).unwrap();
        service.release_on_save(&object, &ada()).unwrap();
        service.sweep(Some(Duration::zero())).unwrap();

        let events = EventLog::new(ctx.events_file()).read_all().unwrap();
        let actions: Vec<_> = events.iter().map(|e| e.action).collect();
        assert_eq!(
            actions,
            vec![
                EventAction::Acquire,
                EventAction::Renew,
                EventAction::Deny,
                EventAction::SaveRelease,
                EventAction::Sweep,
            ]
        );
        assert_eq!(events[2].actor, "bob");
        assert_eq!(events[2].object.as_deref(), Some("article:42"));
        assert_eq!(events[2].details["holder"], "ada");
        assert!(events.iter().all(|e| e.ts == epoch()));
    }

    #[test]
    fn unlock_after_own_lock_expired_releases_nothing() {
        let (_dir, ctx) = temp_store();
        let clock = ManualClock::new(epoch());
        let config = test_config();
        let service = LockService::with_clock(ctx.file_store(&config), clock.clone(), &config)
            .with_events(EventLog::new(ctx.events_file()));
        let object = article("42");

        service.lock(&object, &ada(), Some(Duration::seconds(60))).unwrap();
        clock.advance(Duration::seconds(61));

        let ack = service.unlock(&object, &ada()).unwrap();
        assert!(!ack.released);

        let actions: Vec<_> = EventLog::new(ctx.events_file())
            .read_all()
            .unwrap()
            .into_iter()
            .map(|e| e.action)
            .collect();
        assert_eq!(actions, vec![EventAction::Acquire]);
    }

    #[test]
    fn blank_user_ids_are_refused() {
        let (_clock, service) = service();
        let object = article("1");
        let nobody = User::new("", "");

        let err = service.lock(&object, &nobody, None).unwrap_err();
        assert!(matches!(err, LockingError::UserError(_)));
        assert!(matches!(
            service.unlock(&object, &nobody),
            Err(LockingError::UserError(_))
        ));
        assert!(matches!(
            service.release_on_save(&object, &User::new("  ", "")),
            Err(LockingError::UserError(_))
        ));
        assert!(service.list().unwrap().is_empty());
    }

    #[test]
    fn listed_locks_have_no_owner() {
        let (_clock, service) = service();
        service.lock(&article("1"), &ada(), None).unwrap();

        let listed = service.list().unwrap();
        assert!(listed[0].locked);
        assert!(!listed[0].is_owner);
        assert_eq!(listed[0].message, "Locked by Ada Lovelace for 10 minutes longer");
    }

    /// Store whose clock jumps past every expiration on the second read, as
    /// if the holder's lock ran out right after acquisition was refused.
    struct ExpiringStore {
        inner: MemoryStore,
        clock: ManualClock,
        loads: AtomicUsize,
    }

    impl LockStore for ExpiringStore {
        fn load(&self, object: &ObjectRef) -> Result<Option<Lock>> {
            if self.loads.fetch_add(1, Ordering::SeqCst) == 2 {
                self.clock.advance(Duration::hours(1));
            }
            self.inner.load(object)
        }

        fn compare_and_swap(&self, expected: Option<u64>, next: &Lock) -> Result<bool> {
            self.inner.compare_and_swap(expected, next)
        }

        fn compare_and_delete(&self, object: &ObjectRef, expected: u64) -> Result<bool> {
            self.inner.compare_and_delete(object, expected)
        }

        fn list(&self) -> Result<Vec<Lock>> {
            self.inner.list()
        }
    }

    #[test]
    fn denied_reply_names_holder_even_if_lock_ran_out() {
        let clock = ManualClock::new(epoch());
        let store = ExpiringStore {
            inner: MemoryStore::new(),
            clock: clock.clone(),
            loads: AtomicUsize::new(0),
        };
        let service = LockService::with_clock(store, clock.clone(), &test_config());
        let object = article("42");

        // Load 0 is ada's acquisition, load 1 refuses bob, load 2 re-reads.
        service.lock(&object, &ada(), None).unwrap();
        let reply = service.lock(&object, &bob(), None).unwrap();

        assert!(!reply.acquired);
        assert!(reply.status.locked);
        assert_eq!(reply.status.owner_id.as_deref(), Some("ada"));
        assert_eq!(reply.status.expires_at, Some(epoch() + Duration::seconds(600)));
        assert_eq!(reply.status.expires_in, Some(0));
    }
}
