//! Command implementations for softlock.
//!
//! This module provides the dispatcher that routes CLI commands to their
//! implementations. Commands that change locks live in `edit`, read-only
//! and maintenance commands in `inspect`.

mod edit;
mod init;
mod inspect;

use crate::cli::Command;
use crate::context::StoreContext;
use crate::error::{LockingError, Result};
use crate::events::EventLog;
use crate::locks::{FileStore, ObjectRef};
use crate::service::LockService;
use serde::Serialize;
use std::path::Path;

/// Dispatch a command to its implementation.
///
/// `root` is the `--root` override; every command resolves the store from it.
pub fn dispatch(root: Option<&Path>, command: Command) -> Result<()> {
    let ctx = StoreContext::resolve(root)?;

    match command {
        Command::Init => init::cmd_init(&ctx),
        Command::Lock(args) => edit::cmd_lock(&ctx, &args),
        Command::Unlock(args) => edit::cmd_unlock(&ctx, &args),
        Command::Save(args) => edit::cmd_save(&ctx, &args),
        Command::ForceUnlock(args) => edit::cmd_force_unlock(&ctx, &args),
        Command::Status(args) => inspect::cmd_status(&ctx, &args),
        Command::Show(args) => inspect::cmd_show(&ctx, &args),
        Command::List => inspect::cmd_list(&ctx),
        Command::Render(args) => inspect::cmd_render(&ctx, &args),
        Command::Sweep(args) => inspect::cmd_sweep(&ctx, &args),
    }
}

/// Open the lock service over an initialized store, with auditing.
fn open_service(ctx: &StoreContext) -> Result<LockService<FileStore>> {
    ctx.ensure_initialized()?;
    let config = ctx.load_config()?;
    Ok(LockService::new(ctx.file_store(&config), &config)
        .with_events(EventLog::new(ctx.events_file())))
}

fn parse_object(raw: &str) -> Result<ObjectRef> {
    ObjectRef::parse(raw)
}

/// Print a reply as pretty JSON on stdout.
fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| LockingError::StoreError(format!("failed to serialize reply: {}", e)))?;
    println!("{}", json);
    Ok(())
}
