//! Commands that take or give up locks: `lock`, `unlock`, `save` and
//! `force-unlock`.

use super::{open_service, parse_object, print_json};
use crate::cli::{LockArgs, UserObjectArgs};
use crate::config::validate_lock_duration;
use crate::context::StoreContext;
use crate::error::{LockingError, Result};
use crate::locks::{ObjectRef, User};
use crate::service::{Ack, LockReply};
use chrono::Duration;

/// Execute `softlock lock`.
///
/// The reply is printed either way; a lock held by someone else then fails
/// the command with `AlreadyLocked` so scripts can branch on the exit code.
pub fn cmd_lock(ctx: &StoreContext, args: &LockArgs) -> Result<()> {
    let reply = run_lock(ctx, args)?;
    print_json(&reply)?;
    denied_error(&reply).map_or(Ok(()), Err)
}

pub fn cmd_unlock(ctx: &StoreContext, args: &UserObjectArgs) -> Result<()> {
    print_json(&run_unlock(ctx, args)?)
}

pub fn cmd_save(ctx: &StoreContext, args: &UserObjectArgs) -> Result<()> {
    print_json(&run_save(ctx, args)?)
}

pub fn cmd_force_unlock(ctx: &StoreContext, args: &UserObjectArgs) -> Result<()> {
    print_json(&run_force_unlock(ctx, args)?)
}

pub(super) fn run_lock(ctx: &StoreContext, args: &LockArgs) -> Result<LockReply> {
    let object = parse_object(&args.object)?;
    let user = User::try_new(args.user.as_str(), args.name.as_str())?;
    let duration = args.duration.map(lock_duration).transpose()?;

    open_service(ctx)?.lock(&object, &user, duration)
}

pub(super) fn run_unlock(ctx: &StoreContext, args: &UserObjectArgs) -> Result<Ack> {
    let object = parse_object(&args.object)?;
    let user = User::try_new(args.user.as_str(), "")?;
    open_service(ctx)?.unlock(&object, &user)
}

pub(super) fn run_save(ctx: &StoreContext, args: &UserObjectArgs) -> Result<Ack> {
    let object = parse_object(&args.object)?;
    let user = User::try_new(args.user.as_str(), "")?;
    open_service(ctx)?.release_on_save(&object, &user)
}

pub(super) fn run_force_unlock(ctx: &StoreContext, args: &UserObjectArgs) -> Result<Ack> {
    let object = parse_object(&args.object)?;
    let user = User::try_new(args.user.as_str(), "")?;
    open_service(ctx)?.force_unlock(&object, &user)
}

fn lock_duration(secs: u64) -> Result<Duration> {
    validate_lock_duration(secs)?;
    // Bounded by validation, so the cast cannot truncate.
    Ok(Duration::seconds(secs as i64))
}

/// The `AlreadyLocked` error matching a denied reply.
fn denied_error(reply: &LockReply) -> Option<LockingError> {
    if reply.acquired {
        return None;
    }
    let status = &reply.status;
    let (Some(owner_id), Some(expires_at)) = (&status.owner_id, status.expires_at) else {
        return None;
    };

    Some(LockingError::AlreadyLocked {
        object: ObjectRef::parse(&status.object).ok()?,
        holder: User::new(owner_id.as_str(), status.owner.as_deref().unwrap_or_default()),
        expires_at,
    })
}
