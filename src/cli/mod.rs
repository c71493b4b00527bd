//! CLI argument parsing for softlock.
//!
//! Uses clap derive macros for declarative argument definitions.
//! This module defines the command structure; actual implementations
//! are in the `commands` module.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Softlock: soft record locks for admin editing sessions.
///
/// A lock marks one record as being edited by one user until it expires:
/// - Objects are addressed as `kind:id` (e.g. `article:42`)
/// - Locks expire on their own; nothing needs to clean up after a closed tab
/// - Replies are printed as JSON on stdout
#[derive(Parser, Debug)]
#[command(name = "softlock")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Lock store root. Defaults to $SOFTLOCK_HOME, then ./.softlock.
    #[arg(long, global = true, value_name = "DIR")]
    pub root: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands for softlock.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Initialize a lock store.
    ///
    /// Creates the locks/ and events/ directories and a config.yaml
    /// template. Safe to run more than once.
    Init,

    /// Acquire or renew a lock for a user.
    ///
    /// Prints the lock status. Exits 4 if another user holds the lock.
    Lock(LockArgs),

    /// Release a user's lock.
    Unlock(UserObjectArgs),

    /// Show the lock status of an object as a user sees it.
    Status(UserObjectArgs),

    /// Release a user's lock ahead of saving the object.
    ///
    /// Leaves the lock alone if the user no longer holds it.
    Save(UserObjectArgs),

    /// Print the raw lock row of an object.
    Show(ObjectArgs),

    /// List all lock rows.
    List,

    /// Render the admin change-list markup for an object.
    Render(RenderArgs),

    /// Delete unlocked rows and rows expired for longer than the grace period.
    Sweep(SweepArgs),

    /// Clear another user's lock (administrators only).
    ForceUnlock(UserObjectArgs),
}

/// Arguments for the `lock` command.
#[derive(Args, Debug)]
pub struct LockArgs {
    /// Object to lock, as `kind:id`.
    pub object: String,

    /// Id of the user taking the lock.
    #[arg(short, long)]
    pub user: String,

    /// Display name of the user.
    #[arg(short, long, default_value = "")]
    pub name: String,

    /// Lock duration in seconds. Defaults to `lock_duration_secs`.
    #[arg(short, long)]
    pub duration: Option<u64>,
}

/// Arguments for commands acting on one object for one user.
#[derive(Args, Debug)]
pub struct UserObjectArgs {
    /// Object, as `kind:id`.
    pub object: String,

    /// Id of the acting user.
    #[arg(short, long)]
    pub user: String,
}

/// Arguments for the `show` command.
#[derive(Args, Debug)]
pub struct ObjectArgs {
    /// Object, as `kind:id`.
    pub object: String,
}

/// Arguments for the `render` command.
#[derive(Args, Debug)]
pub struct RenderArgs {
    /// Object, as `kind:id`.
    pub object: String,

    /// Id of the user viewing the change list.
    #[arg(long)]
    pub viewer: String,
}

/// Arguments for the `sweep` command.
#[derive(Args, Debug)]
pub struct SweepArgs {
    /// Seconds an expired lock is kept before removal. Defaults to
    /// `sweep_grace_secs`.
    #[arg(long)]
    pub grace: Option<u64>,
}

impl Cli {
    /// Parse command line arguments.
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
