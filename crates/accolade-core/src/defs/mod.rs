//! Definition tables: criteria, the criteria-tree forest, achievements.
//!
//! Loaded once at startup and immutable afterwards. Loading validates the
//! forest shape: cycles, dangling references, malformed nodes and shared
//! children are fatal configuration errors, and the engine refuses to start
//! on any of them.

use std::collections::HashMap;
use std::path::Path;

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{AccoladeError, AccoladeResult};
use crate::types::{
    Achievement, AchievementId, Criterion, CriterionId, NodeId, TimedType, TreeNode,
};

/// The raw definition payload as authored/exported. Only used for loading;
/// the engine works against the indexed [`DefinitionStore`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DefinitionSet {
    pub criteria: Vec<Criterion>,
    pub nodes: Vec<TreeNode>,
    pub achievements: Vec<Achievement>,
}

impl DefinitionSet {
    /// Load a definition set from a file (TOML, JSON, or YAML).
    pub fn from_file(path: impl AsRef<Path>) -> AccoladeResult<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let ext = path.as_ref().extension().and_then(|e| e.to_str());

        match ext {
            Some("toml") => toml::from_str(&content)
                .map_err(|e| AccoladeError::Configuration(e.to_string())),
            Some("json") => serde_json::from_str(&content)
                .map_err(|e| AccoladeError::Configuration(e.to_string())),
            Some("yaml" | "yml") => serde_yaml::from_str(&content)
                .map_err(|e| AccoladeError::Configuration(e.to_string())),
            _ => Err(AccoladeError::Configuration(
                "Unsupported definition file format. Use .toml, .json, or .yaml".to_string(),
            )),
        }
    }
}

/// Indexed, validated, immutable definition tables.
#[derive(Debug)]
pub struct DefinitionStore {
    criteria: HashMap<CriterionId, Criterion>,
    nodes: HashMap<NodeId, TreeNode>,
    achievements: HashMap<AchievementId, Achievement>,

    /// Parent back-references; roots are absent.
    parent: HashMap<NodeId, NodeId>,
    /// Distance from the node to its root (root = 0).
    depth: HashMap<NodeId, usize>,
    /// Leaf nodes referencing each criterion. A criterion may appear in
    /// several trees.
    leaves_by_criterion: HashMap<CriterionId, Vec<NodeId>>,
    /// Achievement owning each root node.
    achievement_by_root: HashMap<NodeId, AchievementId>,
    /// Timed criteria grouped by start-event kind.
    timed_by_type: HashMap<TimedType, Vec<CriterionId>>,
    /// Criteria carrying a fail condition.
    fail_criteria: Vec<CriterionId>,
    /// All criterion ids in ascending order, for deterministic evaluation.
    criterion_order: Vec<CriterionId>,
}

impl DefinitionStore {
    /// Build and validate the store from a definition set.
    pub fn new(set: DefinitionSet) -> AccoladeResult<Self> {
        let criteria: HashMap<_, _> = set.criteria.into_iter().map(|c| (c.id, c)).collect();
        let nodes: HashMap<_, _> = set.nodes.into_iter().map(|n| (n.id, n)).collect();
        let achievements: HashMap<_, _> =
            set.achievements.into_iter().map(|a| (a.id, a)).collect();

        // Shape checks per node.
        for node in nodes.values() {
            if node.operator.is_leaf() {
                if node.criterion.is_none() {
                    return Err(AccoladeError::malformed_node(
                        node.id,
                        "leaf operator without criterion reference",
                    ));
                }
                if !node.children.is_empty() {
                    return Err(AccoladeError::malformed_node(
                        node.id,
                        "leaf operator with children",
                    ));
                }
            } else if node.criterion.is_some() {
                return Err(AccoladeError::malformed_node(
                    node.id,
                    "internal operator with criterion reference",
                ));
            }
        }

        // Reference checks and parent derivation.
        let mut parent: HashMap<NodeId, NodeId> = HashMap::new();
        for node in nodes.values() {
            for &child in &node.children {
                if !nodes.contains_key(&child) {
                    return Err(AccoladeError::dangling_child(node.id, child));
                }
                if let Some(&first) = parent.get(&child) {
                    return Err(AccoladeError::SharedChild {
                        node: child,
                        first,
                        second: node.id,
                        code: crate::error::ErrorCode::DefSharedChild,
                    });
                }
                parent.insert(child, node.id);
            }
            if let Some(criterion) = node.criterion {
                if !criteria.contains_key(&criterion) {
                    return Err(AccoladeError::dangling_criterion(node.id, criterion));
                }
            }
        }

        for achievement in achievements.values() {
            if !nodes.contains_key(&achievement.root) {
                return Err(AccoladeError::DanglingRoot {
                    achievement: achievement.id.0,
                    node: achievement.root,
                    code: crate::error::ErrorCode::DefDanglingRoot,
                });
            }
        }

        // Cycle check over the whole forest.
        let mut graph: DiGraphMap<u32, ()> = DiGraphMap::new();
        for node in nodes.values() {
            graph.add_node(node.id.0);
            for &child in &node.children {
                graph.add_edge(node.id.0, child.0, ());
            }
        }
        if let Err(cycle) = toposort(&graph, None) {
            return Err(AccoladeError::cyclic_tree(NodeId(cycle.node_id())));
        }

        // Depth from each root, walking down.
        let mut depth: HashMap<NodeId, usize> = HashMap::new();
        let mut stack: Vec<(NodeId, usize)> = nodes
            .keys()
            .filter(|id| !parent.contains_key(id))
            .map(|&id| (id, 0))
            .collect();
        while let Some((id, d)) = stack.pop() {
            depth.insert(id, d);
            for &child in &nodes[&id].children {
                stack.push((child, d + 1));
            }
        }

        let mut leaves_by_criterion: HashMap<CriterionId, Vec<NodeId>> = HashMap::new();
        for node in nodes.values() {
            if let Some(criterion) = node.criterion {
                leaves_by_criterion.entry(criterion).or_default().push(node.id);
            }
        }
        // Deterministic propagation order when a criterion has several leaves.
        for leaves in leaves_by_criterion.values_mut() {
            leaves.sort();
        }

        let achievement_by_root = achievements
            .values()
            .map(|a| (a.root, a.id))
            .collect::<HashMap<_, _>>();

        let mut timed_by_type: HashMap<TimedType, Vec<CriterionId>> = HashMap::new();
        let mut fail_criteria = Vec::new();
        for criterion in criteria.values() {
            if let Some(timed) = &criterion.timed {
                timed_by_type
                    .entry(timed.timed_type)
                    .or_default()
                    .push(criterion.id);
            }
            if criterion.fail_condition.is_some() {
                fail_criteria.push(criterion.id);
            }
        }
        for ids in timed_by_type.values_mut() {
            ids.sort();
        }
        fail_criteria.sort();

        let mut criterion_order: Vec<CriterionId> = criteria.keys().copied().collect();
        criterion_order.sort();

        info!(
            criteria = criteria.len(),
            nodes = nodes.len(),
            achievements = achievements.len(),
            "definition store loaded"
        );

        Ok(Self {
            criteria,
            nodes,
            achievements,
            parent,
            depth,
            leaves_by_criterion,
            achievement_by_root,
            timed_by_type,
            fail_criteria,
            criterion_order,
        })
    }

    /// Load and validate a store straight from a file.
    pub fn from_file(path: impl AsRef<Path>) -> AccoladeResult<Self> {
        Self::new(DefinitionSet::from_file(path)?)
    }

    /// Look up a criterion definition.
    pub fn criterion(&self, id: CriterionId) -> Option<&Criterion> {
        self.criteria.get(&id)
    }

    /// Look up a tree node.
    pub fn node(&self, id: NodeId) -> Option<&TreeNode> {
        self.nodes.get(&id)
    }

    /// Look up an achievement definition.
    pub fn achievement(&self, id: AchievementId) -> Option<&Achievement> {
        self.achievements.get(&id)
    }

    /// The achievement rooted at `node`, if any.
    pub fn achievement_for_root(&self, node: NodeId) -> Option<&Achievement> {
        self.achievement_by_root
            .get(&node)
            .and_then(|id| self.achievements.get(id))
    }

    /// All criterion definitions.
    pub fn criteria(&self) -> impl Iterator<Item = &Criterion> {
        self.criteria.values()
    }

    /// All criterion ids in ascending order.
    pub fn criterion_ids(&self) -> &[CriterionId] {
        &self.criterion_order
    }

    /// Leaf nodes referencing a criterion, across all trees.
    pub fn leaves_for(&self, criterion: CriterionId) -> &[NodeId] {
        self.leaves_by_criterion
            .get(&criterion)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Parent of a node; `None` for roots.
    pub fn parent_of(&self, node: NodeId) -> Option<NodeId> {
        self.parent.get(&node).copied()
    }

    /// Depth of a node below its root (root = 0).
    pub fn depth_of(&self, node: NodeId) -> usize {
        self.depth.get(&node).copied().unwrap_or(0)
    }

    /// The chain from `leaf` up to and including its root.
    pub fn path_to_root(&self, leaf: NodeId) -> Vec<NodeId> {
        let mut path = vec![leaf];
        let mut current = leaf;
        while let Some(parent) = self.parent_of(current) {
            path.push(parent);
            current = parent;
        }
        path
    }

    /// Timed criteria whose window is opened by the given start-event kind.
    pub fn timed_criteria(&self, timed_type: TimedType) -> &[CriterionId] {
        self.timed_by_type
            .get(&timed_type)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Criteria carrying a fail condition.
    pub fn fail_criteria(&self) -> &[CriterionId] {
        &self.fail_criteria
    }

    /// Shortest configured timed window, in seconds. The sweep interval must
    /// stay well below this (see `EngineConfig::sweep_interval_ok`).
    pub fn shortest_timed_window_secs(&self) -> Option<u64> {
        self.criteria
            .values()
            .filter_map(|c| c.timed.as_ref())
            .map(|t| t.window_secs)
            .min()
    }

    /// Log the forest outline at debug level.
    pub fn trace_forest(&self) {
        for (root, achievement) in &self.achievement_by_root {
            debug!(%root, %achievement, "criteria tree root");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CriteriaType, TreeOperator};

    fn kill_criterion(id: u32, entry: u64) -> Criterion {
        Criterion::new(CriterionId(id), CriteriaType::KillCreature).with_asset(entry)
    }

    #[test]
    fn test_valid_forest_loads() {
        let set = DefinitionSet {
            criteria: vec![kill_criterion(1, 42), kill_criterion(2, 43)],
            nodes: vec![
                TreeNode::leaf(NodeId(10), CriterionId(1), 4),
                TreeNode::leaf(NodeId(11), CriterionId(2), 1),
                TreeNode::internal(NodeId(12), TreeOperator::All, 0, vec![NodeId(10), NodeId(11)]),
            ],
            achievements: vec![Achievement::new(AchievementId(100), NodeId(12))],
        };

        let store = DefinitionStore::new(set).unwrap();
        assert_eq!(store.leaves_for(CriterionId(1)), &[NodeId(10)]);
        assert_eq!(store.parent_of(NodeId(10)), Some(NodeId(12)));
        assert_eq!(store.parent_of(NodeId(12)), None);
        assert_eq!(store.depth_of(NodeId(12)), 0);
        assert_eq!(store.depth_of(NodeId(10)), 1);
        assert_eq!(store.path_to_root(NodeId(10)), vec![NodeId(10), NodeId(12)]);
        assert_eq!(
            store.achievement_for_root(NodeId(12)).unwrap().id,
            AchievementId(100)
        );
    }

    #[test]
    fn test_cycle_is_fatal() {
        // 12 -> 13 -> 12
        let set = DefinitionSet {
            criteria: vec![],
            nodes: vec![
                TreeNode::internal(NodeId(12), TreeOperator::All, 0, vec![NodeId(13)]),
                TreeNode::internal(NodeId(13), TreeOperator::All, 0, vec![NodeId(12)]),
            ],
            achievements: vec![],
        };

        let err = DefinitionStore::new(set).unwrap_err();
        assert!(err.is_definition_error());
        assert!(matches!(err, AccoladeError::CyclicTree { .. }));
    }

    #[test]
    fn test_dangling_child_is_fatal() {
        let set = DefinitionSet {
            criteria: vec![],
            nodes: vec![TreeNode::internal(
                NodeId(12),
                TreeOperator::Any,
                0,
                vec![NodeId(99)],
            )],
            achievements: vec![],
        };

        let err = DefinitionStore::new(set).unwrap_err();
        assert!(matches!(err, AccoladeError::DanglingChild { .. }));
    }

    #[test]
    fn test_dangling_criterion_is_fatal() {
        let set = DefinitionSet {
            criteria: vec![],
            nodes: vec![TreeNode::leaf(NodeId(10), CriterionId(1), 1)],
            achievements: vec![],
        };

        let err = DefinitionStore::new(set).unwrap_err();
        assert!(matches!(err, AccoladeError::DanglingCriterion { .. }));
    }

    #[test]
    fn test_shared_child_is_fatal() {
        let set = DefinitionSet {
            criteria: vec![kill_criterion(1, 42)],
            nodes: vec![
                TreeNode::leaf(NodeId(10), CriterionId(1), 1),
                TreeNode::internal(NodeId(11), TreeOperator::Any, 0, vec![NodeId(10)]),
                TreeNode::internal(NodeId(12), TreeOperator::All, 0, vec![NodeId(10)]),
            ],
            achievements: vec![],
        };

        let err = DefinitionStore::new(set).unwrap_err();
        assert!(matches!(err, AccoladeError::SharedChild { .. }));
    }

    #[test]
    fn test_leaf_with_children_is_fatal() {
        let set = DefinitionSet {
            criteria: vec![kill_criterion(1, 42)],
            nodes: vec![
                TreeNode::leaf(NodeId(9), CriterionId(1), 1),
                TreeNode {
                    children: vec![NodeId(9)],
                    ..TreeNode::leaf(NodeId(10), CriterionId(1), 1)
                },
            ],
            achievements: vec![],
        };

        let err = DefinitionStore::new(set).unwrap_err();
        assert!(matches!(err, AccoladeError::MalformedNode { .. }));
    }

    #[test]
    fn test_dangling_achievement_root_is_fatal() {
        let set = DefinitionSet {
            criteria: vec![],
            nodes: vec![],
            achievements: vec![Achievement::new(AchievementId(1), NodeId(5))],
        };

        let err = DefinitionStore::new(set).unwrap_err();
        assert!(matches!(err, AccoladeError::DanglingRoot { .. }));
    }
}
