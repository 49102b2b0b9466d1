//! Identifier newtypes and subject addressing.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a criterion definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CriterionId(pub u32);

/// Identifier of a criteria tree node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub u32);

/// Identifier of an achievement (goal) definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AchievementId(pub u32);

impl fmt::Display for CriterionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "criterion:{}", self.0)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node:{}", self.0)
    }
}

impl fmt::Display for AchievementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "achievement:{}", self.0)
    }
}

/// The entity whose progress is tracked.
///
/// Players, accounts, and guilds are all subjects; a single game event may
/// advance progress on several of them depending on criterion scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum SubjectId {
    Player(u64),
    Account(u64),
    Guild(u64),
}

impl SubjectId {
    /// Whether this subject is a guild.
    pub fn is_guild(&self) -> bool {
        matches!(self, SubjectId::Guild(_))
    }

    /// Whether this subject is an account.
    pub fn is_account(&self) -> bool {
        matches!(self, SubjectId::Account(_))
    }
}

impl fmt::Display for SubjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubjectId::Player(id) => write!(f, "player:{}", id),
            SubjectId::Account(id) => write!(f, "account:{}", id),
            SubjectId::Guild(id) => write!(f, "guild:{}", id),
        }
    }
}

/// Faction a player subject belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Faction {
    Horde,
    Alliance,
}
