//! Integration tests for the aggregation engine.
//!
//! Exercises the full path: event -> matcher -> counter update -> bottom-up
//! tree propagation -> completion emission.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use accolade_core::types::{
    Achievement, AchievementId, ActorInfo, CriteriaType, Criterion, CriterionFlags,
    CriterionId, CriterionScopes, EventKind, Faction, FactionRestriction, FailCondition,
    GameEvent, NodeId, SubjectId, TimedType, TimedWindow, TreeFlags, TreeNode, TreeOperator,
};
use accolade_core::{CompletionEvent, DefinitionSet, DefinitionStore, Engine, EngineConfig};

const P1: SubjectId = SubjectId::Player(1);

fn engine_with(set: DefinitionSet) -> Engine {
    let defs = Arc::new(DefinitionStore::new(set).unwrap());
    Engine::new(defs, EngineConfig::default())
}

async fn attach(engine: &Engine, subject: SubjectId) {
    engine.attach_subject(subject, None).await.unwrap();
}

fn kill(subject: SubjectId, entry: u32, at: DateTime<Utc>) -> GameEvent {
    GameEvent::new(subject, EventKind::KillCreature { entry }, at)
        .with_target(ActorInfo::creature(entry))
}

fn node_completions(events: &[CompletionEvent], node: NodeId) -> usize {
    events
        .iter()
        .filter(|e| matches!(e, CompletionEvent::NodeCompleted(payload) if payload.node == node))
        .count()
}

fn has_event(events: &[CompletionEvent], event_type: &str) -> bool {
    events.iter().any(|e| e.event_type() == event_type)
}

/// Scenario A: four kills on a Single node with required-amount 4 complete
/// the node exactly on the fourth event, with one NodeCompleted emission.
#[tokio::test]
async fn test_single_node_completes_on_exact_count() {
    let set = DefinitionSet {
        criteria: vec![Criterion::new(CriterionId(1), CriteriaType::KillCreature).with_asset(42)],
        nodes: vec![TreeNode::leaf(NodeId(10), CriterionId(1), 4)],
        achievements: vec![Achievement::new(AchievementId(100), NodeId(10))],
    };
    let engine = engine_with(set);
    attach(&engine, P1).await;

    let t0 = Utc::now();
    let mut all_completions = 0;
    for i in 0..4 {
        let events = engine.handle_event(&kill(P1, 42, t0 + Duration::seconds(i)));
        all_completions += node_completions(&events, NodeId(10));

        if i < 3 {
            assert!(!engine.node_complete(P1, NodeId(10)), "complete after {} kills", i + 1);
        }
    }

    assert_eq!(all_completions, 1);
    assert!(engine.node_complete(P1, NodeId(10)));
    assert_eq!(engine.criterion_progress(P1, CriterionId(1)), Some(4));

    // A fifth kill accrues but does not re-emit.
    let events = engine.handle_event(&kill(P1, 42, t0 + Duration::seconds(10)));
    assert_eq!(node_completions(&events, NodeId(10)), 0);
    assert_eq!(engine.criterion_progress(P1, CriterionId(1)), Some(5));
}

/// Scenario B: SumChildrenWeight with children weighted 2 and 3, required
/// amount 10: 3*2 + 1*3 = 9 is incomplete, 3*2 + 2*3 = 12 completes.
#[tokio::test]
async fn test_sum_children_weight() {
    let set = DefinitionSet {
        criteria: vec![
            Criterion::new(CriterionId(1), CriteriaType::KillCreature).with_asset(1),
            Criterion::new(CriterionId(2), CriteriaType::KillCreature).with_asset(2),
        ],
        nodes: vec![
            TreeNode::leaf(NodeId(10), CriterionId(1), 2), // weight 2
            TreeNode::leaf(NodeId(11), CriterionId(2), 3), // weight 3
            TreeNode::internal(
                NodeId(12),
                TreeOperator::SumChildrenWeight,
                10,
                vec![NodeId(10), NodeId(11)],
            ),
        ],
        achievements: vec![],
    };
    let engine = engine_with(set);
    attach(&engine, P1).await;

    let t0 = Utc::now();
    for _ in 0..3 {
        engine.handle_event(&kill(P1, 1, t0));
    }
    engine.handle_event(&kill(P1, 2, t0));
    assert!(!engine.node_complete(P1, NodeId(12)), "weighted sum 9 must not complete");

    let events = engine.handle_event(&kill(P1, 2, t0));
    assert_eq!(node_completions(&events, NodeId(12)), 1);
    assert!(engine.node_complete(P1, NodeId(12)));
}

/// SumChildren completes on the update that makes the sum reach the
/// required amount, not before.
#[tokio::test]
async fn test_sum_children_exact_threshold() {
    let set = DefinitionSet {
        criteria: vec![
            Criterion::new(CriterionId(1), CriteriaType::KillCreature).with_asset(1),
            Criterion::new(CriterionId(2), CriteriaType::KillCreature).with_asset(2),
        ],
        nodes: vec![
            TreeNode::leaf(NodeId(10), CriterionId(1), 1),
            TreeNode::leaf(NodeId(11), CriterionId(2), 1),
            TreeNode::internal(
                NodeId(12),
                TreeOperator::SumChildren,
                10,
                vec![NodeId(10), NodeId(11)],
            ),
        ],
        achievements: vec![],
    };
    let engine = engine_with(set);
    attach(&engine, P1).await;

    let t0 = Utc::now();
    for _ in 0..4 {
        engine.handle_event(&kill(P1, 1, t0));
    }
    for _ in 0..5 {
        engine.handle_event(&kill(P1, 2, t0));
    }
    assert!(!engine.node_complete(P1, NodeId(12)), "sum 9 must not complete");

    let events = engine.handle_event(&kill(P1, 1, t0));
    assert_eq!(node_completions(&events, NodeId(12)), 1);
}

/// Scenario C: a 5-minute timed window. Satisfaction at t+301 finds the
/// window expired (no completion); satisfaction at t+299 succeeds. A
/// re-issued start event opens a fresh window.
#[tokio::test]
async fn test_timed_window_expiry_and_success() {
    let timed_criterion = || {
        Criterion::new(CriterionId(1), CriteriaType::KillCreature)
            .with_asset(42)
            .with_timed(TimedWindow {
                timed_type: TimedType::AcceptQuest,
                start_asset: 500,
                window_secs: 300,
            })
    };
    let set = || DefinitionSet {
        criteria: vec![timed_criterion()],
        nodes: vec![TreeNode::leaf(NodeId(10), CriterionId(1), 1)],
        achievements: vec![],
    };
    let start_event = |at| GameEvent::new(P1, EventKind::AcceptQuest { quest: 500 }, at);

    // Expiry path.
    let engine = engine_with(set());
    attach(&engine, P1).await;
    let t0 = Utc::now();

    let events = engine.handle_event(&start_event(t0));
    assert!(has_event(&events, "timed.started"));

    let events = engine.handle_event(&kill(P1, 42, t0 + Duration::seconds(301)));
    assert!(has_event(&events, "timed.expired"));
    assert!(!has_event(&events, "node.completed"));
    assert!(!engine.node_complete(P1, NodeId(10)));
    assert_eq!(engine.criterion_progress(P1, CriterionId(1)), Some(0));

    // Expiry is terminal; a sweep afterwards finds nothing left.
    assert!(engine.sweep_timed(t0 + Duration::seconds(400)).is_empty());

    // Re-issuing the start event opens a fresh window with a fresh deadline.
    let t1 = t0 + Duration::seconds(500);
    let events = engine.handle_event(&start_event(t1));
    assert!(has_event(&events, "timed.started"));
    let open = engine.active_timed(P1);
    assert_eq!(open.len(), 1);
    assert_eq!(open[0].deadline, t1 + Duration::seconds(300));

    // Success path on a fresh engine.
    let engine = engine_with(set());
    attach(&engine, P1).await;
    let t0 = Utc::now();

    engine.handle_event(&start_event(t0));
    let events = engine.handle_event(&kill(P1, 42, t0 + Duration::seconds(299)));
    assert!(has_event(&events, "timed.succeeded"));
    assert!(engine.node_complete(P1, NodeId(10)));
    assert!(engine.active_timed(P1).is_empty());
}

/// A timed criterion accrues nothing outside an open window.
#[tokio::test]
async fn test_timed_criterion_ignores_events_without_window() {
    let set = DefinitionSet {
        criteria: vec![Criterion::new(CriterionId(1), CriteriaType::KillCreature)
            .with_asset(42)
            .with_timed(TimedWindow {
                timed_type: TimedType::AcceptQuest,
                start_asset: 500,
                window_secs: 300,
            })],
        nodes: vec![TreeNode::leaf(NodeId(10), CriterionId(1), 1)],
        achievements: vec![],
    };
    let engine = engine_with(set);
    attach(&engine, P1).await;

    let events = engine.handle_event(&kill(P1, 42, Utc::now()));
    assert!(events.is_empty());
    assert_eq!(engine.criterion_progress(P1, CriterionId(1)), Some(0));
}

/// Timed sweep expires a window exactly once and resets progress when the
/// criterion is flagged reset-on-start.
#[tokio::test]
async fn test_sweep_resets_flagged_progress() {
    let set = DefinitionSet {
        criteria: vec![Criterion::new(CriterionId(1), CriteriaType::KillCreature)
            .with_asset(42)
            .with_flags(CriterionFlags {
                reset_on_start: true,
                ..Default::default()
            })
            .with_timed(TimedWindow {
                timed_type: TimedType::AcceptQuest,
                start_asset: 500,
                window_secs: 300,
            })],
        nodes: vec![TreeNode::leaf(NodeId(10), CriterionId(1), 5)],
        achievements: vec![],
    };
    let engine = engine_with(set);
    attach(&engine, P1).await;
    let t0 = Utc::now();

    engine.handle_event(&GameEvent::new(P1, EventKind::AcceptQuest { quest: 500 }, t0));
    engine.handle_event(&kill(P1, 42, t0 + Duration::seconds(10)));
    engine.handle_event(&kill(P1, 42, t0 + Duration::seconds(20)));
    assert_eq!(engine.criterion_progress(P1, CriterionId(1)), Some(2));

    let events = engine.sweep_timed(t0 + Duration::seconds(301));
    assert!(has_event(&events, "timed.expired"));
    assert_eq!(engine.criterion_progress(P1, CriterionId(1)), Some(0));

    // Exactly once.
    assert!(engine.sweep_timed(t0 + Duration::seconds(302)).is_empty());
}

/// All-operator: complete iff every child is complete, and a reset of one
/// child revokes the parent while the untouched sibling stays complete.
#[tokio::test]
async fn test_all_operator_and_reset_cascade() {
    let set = DefinitionSet {
        criteria: vec![
            Criterion::new(CriterionId(1), CriteriaType::KillCreature)
                .with_asset(1)
                .with_flags(CriterionFlags {
                    fail_on_condition: true,
                    reset_on_start: true,
                    ..Default::default()
                })
                .with_fail_condition(FailCondition::NoDeath),
            Criterion::new(CriterionId(2), CriteriaType::KillCreature).with_asset(2),
        ],
        nodes: vec![
            TreeNode::leaf(NodeId(10), CriterionId(1), 1),
            TreeNode::leaf(NodeId(11), CriterionId(2), 1),
            TreeNode::internal(
                NodeId(12),
                TreeOperator::All,
                0,
                vec![NodeId(10), NodeId(11)],
            ),
        ],
        achievements: vec![],
    };
    let engine = engine_with(set);
    attach(&engine, P1).await;
    let t0 = Utc::now();

    engine.handle_event(&kill(P1, 1, t0));
    assert!(!engine.node_complete(P1, NodeId(12)), "one child is not all children");

    let events = engine.handle_event(&kill(P1, 2, t0));
    assert_eq!(node_completions(&events, NodeId(12)), 1);
    assert!(engine.node_complete(P1, NodeId(12)));

    // Death fails criterion 1: its progress resets, the leaf and the All
    // parent are revoked, the sibling keeps its completion.
    engine.handle_event(&GameEvent::new(P1, EventKind::Death, t0 + Duration::seconds(1)));
    assert_eq!(engine.criterion_progress(P1, CriterionId(1)), Some(0));
    assert!(!engine.node_complete(P1, NodeId(10)));
    assert!(!engine.node_complete(P1, NodeId(12)));
    assert!(engine.node_complete(P1, NodeId(11)));

    // Completing again is a new transition and emits again.
    let events = engine.handle_event(&kill(P1, 1, t0 + Duration::seconds(2)));
    assert_eq!(node_completions(&events, NodeId(12)), 1);
}

/// Any-operator: the parent stays complete through a reset of the
/// triggering child when a different child is complete (re-derivation
/// checks across all children).
#[tokio::test]
async fn test_any_operator_rederives_across_children() {
    let set = DefinitionSet {
        criteria: vec![
            Criterion::new(CriterionId(1), CriteriaType::KillCreature)
                .with_asset(1)
                .with_flags(CriterionFlags {
                    fail_on_condition: true,
                    reset_on_start: true,
                    ..Default::default()
                })
                .with_fail_condition(FailCondition::NoDeath),
            Criterion::new(CriterionId(2), CriteriaType::KillCreature).with_asset(2),
        ],
        nodes: vec![
            TreeNode::leaf(NodeId(10), CriterionId(1), 1),
            TreeNode::leaf(NodeId(11), CriterionId(2), 1),
            TreeNode::internal(
                NodeId(12),
                TreeOperator::Any,
                0,
                vec![NodeId(10), NodeId(11)],
            ),
        ],
        achievements: vec![],
    };
    let engine = engine_with(set);
    attach(&engine, P1).await;
    let t0 = Utc::now();

    engine.handle_event(&kill(P1, 1, t0));
    assert!(engine.node_complete(P1, NodeId(12)));
    engine.handle_event(&kill(P1, 2, t0));

    engine.handle_event(&GameEvent::new(P1, EventKind::Death, t0 + Duration::seconds(1)));
    assert!(!engine.node_complete(P1, NodeId(10)));
    assert!(engine.node_complete(P1, NodeId(12)), "other child still satisfies Any");
}

/// A criterion referenced by two trees advances both independently.
#[tokio::test]
async fn test_criterion_shared_across_trees() {
    let set = DefinitionSet {
        criteria: vec![Criterion::new(CriterionId(1), CriteriaType::KillCreature).with_asset(42)],
        nodes: vec![
            TreeNode::leaf(NodeId(10), CriterionId(1), 1),
            TreeNode::leaf(NodeId(20), CriterionId(1), 3),
        ],
        achievements: vec![
            Achievement::new(AchievementId(100), NodeId(10)),
            Achievement::new(AchievementId(200), NodeId(20)),
        ],
    };
    let engine = engine_with(set);
    attach(&engine, P1).await;
    let t0 = Utc::now();

    engine.handle_event(&kill(P1, 42, t0));
    assert!(engine.node_complete(P1, NodeId(10)));
    assert!(!engine.node_complete(P1, NodeId(20)));

    engine.handle_event(&kill(P1, 42, t0));
    let events = engine.handle_event(&kill(P1, 42, t0));
    assert_eq!(node_completions(&events, NodeId(20)), 1);
}

/// CountDirectChildren completes when enough direct children are complete.
#[tokio::test]
async fn test_count_direct_children() {
    let set = DefinitionSet {
        criteria: vec![
            Criterion::new(CriterionId(1), CriteriaType::KillCreature).with_asset(1),
            Criterion::new(CriterionId(2), CriteriaType::KillCreature).with_asset(2),
            Criterion::new(CriterionId(3), CriteriaType::KillCreature).with_asset(3),
        ],
        nodes: vec![
            TreeNode::leaf(NodeId(10), CriterionId(1), 1),
            TreeNode::leaf(NodeId(11), CriterionId(2), 1),
            TreeNode::leaf(NodeId(12), CriterionId(3), 1),
            TreeNode::internal(
                NodeId(13),
                TreeOperator::CountDirectChildren,
                2,
                vec![NodeId(10), NodeId(11), NodeId(12)],
            ),
        ],
        achievements: vec![],
    };
    let engine = engine_with(set);
    attach(&engine, P1).await;
    let t0 = Utc::now();

    engine.handle_event(&kill(P1, 1, t0));
    assert!(!engine.node_complete(P1, NodeId(13)));

    let events = engine.handle_event(&kill(P1, 3, t0));
    assert_eq!(node_completions(&events, NodeId(13)), 1);
}

/// MaxChild: best single child reaching the threshold completes the parent.
#[tokio::test]
async fn test_max_child() {
    let set = DefinitionSet {
        criteria: vec![
            Criterion::new(CriterionId(1), CriteriaType::KillCreature).with_asset(1),
            Criterion::new(CriterionId(2), CriteriaType::KillCreature).with_asset(2),
        ],
        nodes: vec![
            TreeNode::leaf(NodeId(10), CriterionId(1), 1),
            TreeNode::leaf(NodeId(11), CriterionId(2), 1),
            TreeNode::internal(
                NodeId(12),
                TreeOperator::MaxChild,
                3,
                vec![NodeId(10), NodeId(11)],
            ),
        ],
        achievements: vec![],
    };
    let engine = engine_with(set);
    attach(&engine, P1).await;
    let t0 = Utc::now();

    engine.handle_event(&kill(P1, 1, t0));
    engine.handle_event(&kill(P1, 2, t0));
    engine.handle_event(&kill(P1, 2, t0));
    assert!(!engine.node_complete(P1, NodeId(12)), "best child at 2 of 3");

    let events = engine.handle_event(&kill(P1, 2, t0));
    assert_eq!(node_completions(&events, NodeId(12)), 1);
}

/// SingleNotCompleted is the inverted predicate: it completes while the
/// counter is still below the threshold.
#[tokio::test]
async fn test_single_not_completed() {
    let set = DefinitionSet {
        criteria: vec![Criterion::new(CriterionId(1), CriteriaType::LoseDuel)],
        nodes: vec![TreeNode {
            id: NodeId(10),
            operator: TreeOperator::SingleNotCompleted,
            amount: 5,
            criterion: Some(CriterionId(1)),
            children: vec![],
            flags: TreeFlags::default(),
        }],
        achievements: vec![],
    };
    let engine = engine_with(set);
    attach(&engine, P1).await;

    let events = engine.handle_event(&GameEvent::new(P1, EventKind::LoseDuel, Utc::now()));
    assert_eq!(node_completions(&events, NodeId(10)), 1);
}

/// Achievement layer: root completion emits AchievementCompleted for an
/// eligible subject and only NodeCompleted for the wrong faction.
#[tokio::test]
async fn test_achievement_faction_gate() {
    let set = || DefinitionSet {
        criteria: vec![Criterion::new(CriterionId(1), CriteriaType::KillCreature).with_asset(42)],
        nodes: vec![TreeNode::leaf(NodeId(10), CriterionId(1), 1)],
        achievements: vec![
            Achievement::new(AchievementId(100), NodeId(10))
                .with_faction(FactionRestriction::Horde),
        ],
    };

    let engine = engine_with(set());
    engine.attach_subject(P1, Some(Faction::Horde)).await.unwrap();
    let events = engine.handle_event(&kill(P1, 42, Utc::now()));
    assert!(has_event(&events, "achievement.completed"));

    let engine = engine_with(set());
    engine.attach_subject(P1, Some(Faction::Alliance)).await.unwrap();
    let events = engine.handle_event(&kill(P1, 42, Utc::now()));
    assert!(has_event(&events, "node.completed"));
    assert!(!has_event(&events, "achievement.completed"));
}

/// Faction-restricted tree nodes never progress for the other side.
#[tokio::test]
async fn test_tree_faction_restriction() {
    let set = DefinitionSet {
        criteria: vec![Criterion::new(CriterionId(1), CriteriaType::KillCreature).with_asset(42)],
        nodes: vec![TreeNode::leaf(NodeId(10), CriterionId(1), 1).with_flags(TreeFlags {
            alliance_only: true,
            ..Default::default()
        })],
        achievements: vec![],
    };
    let engine = engine_with(set);
    engine.attach_subject(P1, Some(Faction::Horde)).await.unwrap();

    let events = engine.handle_event(&kill(P1, 42, Utc::now()));
    assert!(!has_event(&events, "node.completed"));
    assert!(!engine.node_complete(P1, NodeId(10)));
    // The counter still accrues; only the node is gated.
    assert_eq!(engine.criterion_progress(P1, CriterionId(1)), Some(1));
}

/// Guild-scoped criteria advance the guild subject, not the player.
#[tokio::test]
async fn test_guild_scope_routing() {
    let guild = SubjectId::Guild(9);
    let set = DefinitionSet {
        criteria: vec![Criterion::new(CriterionId(1), CriteriaType::KillCreature)
            .with_asset(42)
            .with_scopes(CriterionScopes::guild_only())],
        nodes: vec![TreeNode::leaf(NodeId(10), CriterionId(1), 2)],
        achievements: vec![],
    };
    let engine = engine_with(set);
    attach(&engine, P1).await;
    attach(&engine, guild).await;
    let t0 = Utc::now();

    let event = kill(P1, 42, t0).with_guild(guild);
    engine.handle_event(&event);
    assert_eq!(engine.criterion_progress(guild, CriterionId(1)), Some(1));
    assert_eq!(engine.criterion_progress(P1, CriterionId(1)), Some(0));

    let events = engine.handle_event(&kill(P1, 42, t0).with_guild(guild));
    assert!(events
        .iter()
        .any(|e| matches!(e, CompletionEvent::NodeCompleted(p) if p.subject == guild)));
}

/// Events for unattached subjects are dropped, not errors.
#[tokio::test]
async fn test_unattached_subject_ignored() {
    let set = DefinitionSet {
        criteria: vec![Criterion::new(CriterionId(1), CriteriaType::KillCreature).with_asset(42)],
        nodes: vec![TreeNode::leaf(NodeId(10), CriterionId(1), 1)],
        achievements: vec![],
    };
    let engine = engine_with(set);

    let events = engine.handle_event(&kill(P1, 42, Utc::now()));
    assert!(events.is_empty());
}

/// Detach cancels open timed windows through the normal discard path.
#[tokio::test]
async fn test_detach_cancels_timed() {
    let set = DefinitionSet {
        criteria: vec![Criterion::new(CriterionId(1), CriteriaType::KillCreature)
            .with_asset(42)
            .with_timed(TimedWindow {
                timed_type: TimedType::AcceptQuest,
                start_asset: 500,
                window_secs: 300,
            })],
        nodes: vec![TreeNode::leaf(NodeId(10), CriterionId(1), 1)],
        achievements: vec![],
    };
    let engine = engine_with(set);
    attach(&engine, P1).await;

    engine.handle_event(&GameEvent::new(
        P1,
        EventKind::AcceptQuest { quest: 500 },
        Utc::now(),
    ));
    assert_eq!(engine.active_timed(P1).len(), 1);

    engine.detach_subject(P1).await.unwrap();
    assert!(!engine.is_attached(P1));

    // Detaching an unknown subject is an error.
    assert!(engine.detach_subject(P1).await.is_err());
}

/// The event bus mirrors the synchronous return value.
#[tokio::test]
async fn test_event_bus_delivery() {
    let set = DefinitionSet {
        criteria: vec![Criterion::new(CriterionId(1), CriteriaType::KillCreature).with_asset(42)],
        nodes: vec![TreeNode::leaf(NodeId(10), CriterionId(1), 1)],
        achievements: vec![],
    };
    let defs = Arc::new(DefinitionStore::new(set).unwrap());
    let engine = Engine::new(defs, EngineConfig::default())
        .with_event_bus(accolade_core::EventBus::new());
    attach(&engine, P1).await;

    let mut subscriber = engine.event_bus().unwrap().subscribe();
    let events = engine.handle_event(&kill(P1, 42, Utc::now()));
    assert_eq!(events.len(), 1);

    let delivered = subscriber.recv().await.unwrap();
    assert_eq!(delivered.event_type(), "node.completed");
}
