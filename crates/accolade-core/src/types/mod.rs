//! Core type definitions.

mod criterion;
mod event;
mod ids;
mod progress;
mod tree;

pub use criterion::{
    Cmp, Condition, CriteriaType, Criterion, CriterionFlags, CriterionScopes, FailCondition,
    TimedType, TimedWindow,
};
pub use event::{
    ActorInfo, AuraInfo, EventKind, GameEvent, MoneySink, PlayerProfile, WorldContext,
};
pub use ids::{AchievementId, CriterionId, Faction, NodeId, SubjectId};
pub use progress::{
    CompletionUpdate, ProgressMode, ProgressRecord, ProgressUpdate, SubjectSnapshot,
    TimedChallenge,
};
pub use tree::{
    Achievement, AchievementFlags, FactionRestriction, TreeFlags, TreeNode, TreeOperator,
};
