//! Trait definitions for external collaborators.

mod snapshot_store;

pub use snapshot_store::SnapshotStore;
