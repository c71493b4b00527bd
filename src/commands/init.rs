//! Implementation of the `softlock init` command.
//!
//! # What `softlock init` does
//!
//! 1. Creates the store root with `locks/` and `events/`
//! 2. Creates `config.yaml` from the template (if missing)
//! 3. Records an `init` event
//!
//! Existing rows and an existing config are never touched.

use crate::config::CONFIG_TEMPLATE;
use crate::context::StoreContext;
use crate::error::{LockingError, Result};
use crate::events::{Event, EventAction, EventLog};
use crate::fs::atomic_write_file;
use serde_json::json;
use std::fs;
use std::path::Path;
use tracing::warn;

/// What `init` did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitReport {
    pub created_store: bool,
    pub created_config: bool,
}

/// Execute the `softlock init` command.
///
/// This command is **idempotent**: running it again reports what already
/// exists and leaves it alone.
pub fn cmd_init(ctx: &StoreContext) -> Result<()> {
    let report = run_init(ctx)?;

    if report.created_store {
        println!("Initialized lock store.");
    } else {
        println!("Lock store already initialized.");
    }
    println!();
    println!("Store root: {}", ctx.root.display());
    println!("Locks:      {}", ctx.locks_dir.display());
    println!("Events:     {}", ctx.events_file().display());
    if report.created_config {
        println!("Config:     {} (created)", ctx.config_path().display());
    } else {
        println!("Config:     {}", ctx.config_path().display());
    }

    Ok(())
}

pub(super) fn run_init(ctx: &StoreContext) -> Result<InitReport> {
    let created_store = !ctx.is_initialized();

    create_dir(&ctx.locks_dir)?;
    create_dir(&ctx.events_dir)?;

    let config_path = ctx.config_path();
    let created_config = !config_path.exists();
    if created_config {
        atomic_write_file(&config_path, CONFIG_TEMPLATE)?;
    } else {
        // Surface a broken config now rather than on the first lock.
        ctx.load_config()?;
    }

    let event = Event::new(EventAction::Init).with_details(json!({
        "root": ctx.root.display().to_string(),
        "created_config": created_config,
    }));
    if let Err(e) = EventLog::new(ctx.events_file()).append(&event) {
        warn!(error = %e, "failed to record init event");
    }

    Ok(InitReport {
        created_store,
        created_config,
    })
}

fn create_dir(path: &Path) -> Result<()> {
    fs::create_dir_all(path).map_err(|e| {
        LockingError::StoreError(format!(
            "failed to create directory '{}': {}",
            path.display(),
            e
        ))
    })
}
