//! Filesystem helpers for the on-disk lock store.

pub mod atomic;

pub use atomic::{atomic_write, atomic_write_file};
