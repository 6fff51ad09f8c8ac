//! Mapping Table Module
//!
//! The in-memory key → value table served to lookups.
//!
//! ## Responsibilities
//! - Point lookups with unlimited read concurrency
//! - Whole-table replacement, never incremental merges
//! - Consistent snapshots for multi-key reads
//!
//! ## Concurrency
//! The map lives behind an `Arc` inside a `RwLock`. Replacement builds the
//! new map without holding the lock and only takes the write lock for the
//! pointer swap, so readers see the old table or the new one, never a mix.

mod mapping;

pub use mapping::{MappingTable, Snapshot};
