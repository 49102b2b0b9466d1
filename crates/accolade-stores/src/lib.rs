//! accolade-stores - Snapshot store implementations for accolade.
//!
//! Backends for the [`accolade_core::SnapshotStore`] trait:
//!
//! - [`MemoryStore`]: in-process map, for tests and embedded use.
//! - [`SqliteStore`]: rusqlite-backed persistent store.

mod memory;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
