//! Softlock: soft record locks for admin editing sessions.
//!
//! An editor takes a time-limited lock on the record it opens; other users
//! see who holds it and for how long, and are refused the lock until it is
//! released or runs out. Locks are advisory and expire lazily.
//!
//! [`service::LockService`] is the entry point for embedding. The `softlock`
//! binary drives the same service over a file store.

pub mod cli;
pub mod commands;
pub mod config;
pub mod context;
pub mod error;
pub mod events;
pub mod exit_codes;
pub mod fs;
pub mod humanize;
pub mod locks;
pub mod service;

#[cfg(test)]
mod test_support;
