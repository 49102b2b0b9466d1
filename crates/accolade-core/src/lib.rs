//! accolade-core - Core library for accolade.
//!
//! This crate provides the criteria tree definitions, condition matcher,
//! progress store, timed-criteria tracker, and the aggregation engine that
//! turns discrete game events into goal completions.
//!
//! # Example
//!
//! ```ignore
//! use accolade_core::{DefinitionStore, Engine, EngineConfig};
//! use accolade_core::types::{EventKind, GameEvent, SubjectId};
//! use std::sync::Arc;
//!
//! let defs = Arc::new(DefinitionStore::from_file("definitions.toml")?);
//! let engine = Engine::new(defs, EngineConfig::default());
//!
//! engine.attach_subject(SubjectId::Player(1), None).await?;
//! let completions = engine.handle_event(&event);
//! ```

pub mod config;
pub mod defs;
pub mod engine;
pub mod error;
pub mod events;
pub mod matcher;
pub mod progress;
pub mod timed;
pub mod traits;
pub mod types;

// Re-export commonly used types
pub use config::EngineConfig;
pub use defs::{DefinitionSet, DefinitionStore};
pub use engine::{Engine, SweeperConfig, TimedSweeper};
pub use error::{AccoladeError, AccoladeResult, ErrorCode};
pub use events::{CompletionEvent, EventBus};
pub use traits::SnapshotStore;
pub use types::{
    Achievement, AchievementId, CriteriaType, Criterion, CriterionId, Faction, GameEvent, NodeId,
    ProgressMode, SubjectId, SubjectSnapshot, TreeNode, TreeOperator,
};
