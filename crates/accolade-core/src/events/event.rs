//! Completion event payloads.
//!
//! Emitted when tree nodes and achievements complete or timed windows change
//! state. The rewards/notification collaborator consumes these; this core
//! has no knowledge of reward contents.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{AchievementId, CriterionId, NodeId, SubjectId};

/// Events emitted by the engine.
///
/// Engine entry points return the events they produced; subscribing to the
/// [`super::EventBus`] delivers the same events asynchronously.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CompletionEvent {
    /// A criteria tree node transitioned incomplete -> complete.
    NodeCompleted(NodeCompletedEvent),
    /// The root of an achievement's tree completed for an eligible subject.
    AchievementCompleted(AchievementCompletedEvent),
    /// A timed window opened.
    TimedStarted(TimedChallengeEvent),
    /// A timed criterion was satisfied before its deadline.
    TimedSucceeded(TimedChallengeEvent),
    /// A timed window passed its deadline unsatisfied.
    TimedExpired(TimedChallengeEvent),
    /// A fail event terminated a timed criterion.
    TimedFailed(TimedChallengeEvent),
}

impl CompletionEvent {
    /// Get the event type as a string for filtering.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::NodeCompleted(_) => "node.completed",
            Self::AchievementCompleted(_) => "achievement.completed",
            Self::TimedStarted(_) => "timed.started",
            Self::TimedSucceeded(_) => "timed.succeeded",
            Self::TimedExpired(_) => "timed.expired",
            Self::TimedFailed(_) => "timed.failed",
        }
    }

    /// The subject this event relates to.
    pub fn subject(&self) -> SubjectId {
        match self {
            Self::NodeCompleted(e) => e.subject,
            Self::AchievementCompleted(e) => e.subject,
            Self::TimedStarted(e)
            | Self::TimedSucceeded(e)
            | Self::TimedExpired(e)
            | Self::TimedFailed(e) => e.subject,
        }
    }

    /// When the event occurred.
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            Self::NodeCompleted(e) => e.timestamp,
            Self::AchievementCompleted(e) => e.timestamp,
            Self::TimedStarted(e)
            | Self::TimedSucceeded(e)
            | Self::TimedExpired(e)
            | Self::TimedFailed(e) => e.timestamp,
        }
    }
}

/// Payload for a node completion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeCompletedEvent {
    /// Unique event ID.
    pub event_id: String,
    /// Subject that completed the node.
    pub subject: SubjectId,
    /// The node that completed.
    pub node: NodeId,
    /// Achievement rooted at this node, when it is a root.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub achievement: Option<AchievementId>,
    /// When the completion happened.
    pub timestamp: DateTime<Utc>,
}

impl NodeCompletedEvent {
    pub fn new(subject: SubjectId, node: NodeId, timestamp: DateTime<Utc>) -> Self {
        Self {
            event_id: uuid::Uuid::new_v4().to_string(),
            subject,
            node,
            achievement: None,
            timestamp,
        }
    }

    pub fn with_achievement(mut self, achievement: AchievementId) -> Self {
        self.achievement = Some(achievement);
        self
    }
}

/// Payload for an achievement completion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AchievementCompletedEvent {
    /// Unique event ID.
    pub event_id: String,
    /// Subject that earned the achievement.
    pub subject: SubjectId,
    /// The achievement earned.
    pub achievement: AchievementId,
    /// When it was earned.
    pub timestamp: DateTime<Utc>,
}

impl AchievementCompletedEvent {
    pub fn new(
        subject: SubjectId,
        achievement: AchievementId,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            event_id: uuid::Uuid::new_v4().to_string(),
            subject,
            achievement,
            timestamp,
        }
    }
}

/// Payload for timed-window state changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimedChallengeEvent {
    /// Unique event ID.
    pub event_id: String,
    /// Subject the window belongs to.
    pub subject: SubjectId,
    /// Criterion under the countdown.
    pub criterion: CriterionId,
    /// Deadline of the window instance.
    pub deadline: DateTime<Utc>,
    /// When the transition happened.
    pub timestamp: DateTime<Utc>,
}

impl TimedChallengeEvent {
    pub fn new(
        subject: SubjectId,
        criterion: CriterionId,
        deadline: DateTime<Utc>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            event_id: uuid::Uuid::new_v4().to_string(),
            subject,
            criterion,
            deadline,
            timestamp,
        }
    }
}
