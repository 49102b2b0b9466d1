//! Criteria tree nodes and achievement definitions.
//!
//! Trees form a forest: each node is either a leaf referencing one criterion
//! or an internal node aggregating its children through an operator. Nodes
//! never own each other; children are referenced by id and the definition
//! store derives parent back-references for propagation.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use super::ids::{AchievementId, CriterionId, Faction, NodeId};

/// How a node combines its criterion / children into a completion predicate.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TreeOperator {
    /// Complete when the referenced criterion's counter reaches the amount.
    Single,
    /// Inverted `Single`: complete while the counter is below the amount.
    SingleNotCompleted,
    /// Complete when every eligible child is complete.
    All,
    /// Complete when the sum of child effective values reaches the amount.
    SumChildren,
    /// Complete when the best single child value reaches the amount.
    MaxChild,
    /// Complete when enough direct children are complete.
    CountDirectChildren,
    /// Complete when at least one child is complete.
    Any,
    /// Complete when the weighted sum of child values reaches the amount.
    /// Each child's own `amount` acts as its weight.
    SumChildrenWeight,
}

impl TreeOperator {
    /// Whether this operator references a criterion directly (leaf node).
    pub fn is_leaf(&self) -> bool {
        matches!(self, TreeOperator::Single | TreeOperator::SingleNotCompleted)
    }
}

/// Display / restriction flags on a tree node.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TreeFlags {
    /// Render progress as a bar.
    pub progress_bar: bool,
    /// Progress counter is a date.
    pub progress_is_date: bool,
    /// Show a currency icon next to the counter.
    pub show_currency_icon: bool,
    /// Only evaluated for Alliance subjects.
    pub alliance_only: bool,
    /// Only evaluated for Horde subjects.
    pub horde_only: bool,
    /// Show the required count in the UI.
    pub show_required_count: bool,
}

impl TreeFlags {
    /// Whether a subject of the given faction may progress this node.
    ///
    /// A subject with no faction (accounts, guilds) passes unless the node is
    /// restricted to either side.
    pub fn allows_faction(&self, faction: Option<Faction>) -> bool {
        match faction {
            Some(Faction::Alliance) => !self.horde_only,
            Some(Faction::Horde) => !self.alliance_only,
            None => !self.alliance_only && !self.horde_only,
        }
    }
}

/// A node in the criteria forest. Immutable after load.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeNode {
    /// Unique identifier.
    pub id: NodeId,
    /// Aggregation operator.
    pub operator: TreeOperator,
    /// Node threshold. Required amount for this node's own predicate, and the
    /// node's weight when its parent aggregates by `SumChildrenWeight`.
    #[serde(default)]
    pub amount: u64,
    /// Referenced criterion (leaf operators only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub criterion: Option<CriterionId>,
    /// Ordered child node ids (internal operators only).
    #[serde(default)]
    pub children: Vec<NodeId>,
    /// Display / restriction flags.
    #[serde(default)]
    pub flags: TreeFlags,
}

impl TreeNode {
    /// Create a leaf node tracking a criterion.
    pub fn leaf(id: NodeId, criterion: CriterionId, amount: u64) -> Self {
        Self {
            id,
            operator: TreeOperator::Single,
            amount,
            criterion: Some(criterion),
            children: Vec::new(),
            flags: TreeFlags::default(),
        }
    }

    /// Create an internal node aggregating children.
    pub fn internal(id: NodeId, operator: TreeOperator, amount: u64, children: Vec<NodeId>) -> Self {
        Self {
            id,
            operator,
            amount,
            criterion: None,
            children,
            flags: TreeFlags::default(),
        }
    }

    /// Set the operator.
    pub fn with_operator(mut self, operator: TreeOperator) -> Self {
        self.operator = operator;
        self
    }

    /// Set the flags.
    pub fn with_flags(mut self, flags: TreeFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Required amount, never below one. A threshold of zero would complete
    /// vacuously on first evaluation, so it is floored.
    pub fn required_amount(&self) -> u64 {
        self.amount.max(1)
    }
}

/// Faction restriction on an achievement.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FactionRestriction {
    #[default]
    Any,
    Alliance,
    Horde,
}

impl FactionRestriction {
    /// Whether a subject of the given faction is eligible.
    pub fn allows(&self, faction: Option<Faction>) -> bool {
        match self {
            FactionRestriction::Any => true,
            FactionRestriction::Alliance => faction == Some(Faction::Alliance),
            FactionRestriction::Horde => faction == Some(Faction::Horde),
        }
    }
}

/// Achievement behavior flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AchievementFlags {
    /// Pure statistic: the tree accumulates but never emits completion.
    pub counter: bool,
    /// Earned once per account rather than per character.
    pub account_wide: bool,
    /// Earned by a guild subject.
    pub guild: bool,
}

/// An achievement (goal) definition: a named root of the criteria forest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Achievement {
    /// Unique identifier.
    pub id: AchievementId,
    /// Root node of the criteria tree that gates this achievement.
    pub root: NodeId,
    /// Faction restriction.
    #[serde(default)]
    pub faction: FactionRestriction,
    /// Behavior flags.
    #[serde(default)]
    pub flags: AchievementFlags,
}

impl Achievement {
    /// Create an unrestricted achievement rooted at `root`.
    pub fn new(id: AchievementId, root: NodeId) -> Self {
        Self {
            id,
            root,
            faction: FactionRestriction::Any,
            flags: AchievementFlags::default(),
        }
    }

    /// Set the faction restriction.
    pub fn with_faction(mut self, faction: FactionRestriction) -> Self {
        self.faction = faction;
        self
    }

    /// Set the flags.
    pub fn with_flags(mut self, flags: AchievementFlags) -> Self {
        self.flags = flags;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_leaf_required_amount_floor() {
        let node = TreeNode::leaf(NodeId(1), CriterionId(1), 0);
        assert_eq!(node.required_amount(), 1);

        let node = TreeNode::leaf(NodeId(1), CriterionId(1), 4);
        assert_eq!(node.required_amount(), 4);
    }

    #[test]
    fn test_internal_amount_floored() {
        let node = TreeNode::internal(NodeId(1), TreeOperator::SumChildren, 0, vec![]);
        assert_eq!(node.required_amount(), 1);
    }

    #[test]
    fn test_tree_flags_faction_gate() {
        let flags = TreeFlags {
            alliance_only: true,
            ..Default::default()
        };
        assert!(flags.allows_faction(Some(Faction::Alliance)));
        assert!(!flags.allows_faction(Some(Faction::Horde)));
        assert!(!flags.allows_faction(None));

        assert!(TreeFlags::default().allows_faction(None));
    }

    #[test]
    fn test_faction_restriction() {
        assert!(FactionRestriction::Any.allows(None));
        assert!(FactionRestriction::Horde.allows(Some(Faction::Horde)));
        assert!(!FactionRestriction::Horde.allows(Some(Faction::Alliance)));
        assert!(!FactionRestriction::Alliance.allows(None));
    }

    #[test]
    fn test_operator_leaf_classification() {
        assert!(TreeOperator::Single.is_leaf());
        assert!(TreeOperator::SingleNotCompleted.is_leaf());
        assert!(!TreeOperator::All.is_leaf());
        assert!(!TreeOperator::SumChildrenWeight.is_leaf());
    }
}
