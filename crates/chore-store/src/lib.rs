//! # chore-store
//!
//! SQLite-backed persistence for ChoreHub, plus the per-household snapshot
//! cache that sits in front of it.

pub mod cache;
pub mod store;

pub use cache::SnapshotCache;
pub use store::{week_key, Completion, Store};
