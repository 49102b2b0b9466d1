//! The aggregation engine.
//!
//! Receives game events, updates matching criterion counters, and walks the
//! affected criteria trees bottom-up, emitting a completion event exactly
//! once per incomplete -> complete transition. Entry points are synchronous
//! and return the events they produced; the optional [`EventBus`] delivers
//! the same events asynchronously.
//!
//! Concurrency: subjects are independent serialization domains. Each subject
//! sits behind its own mutex; an event routed to a player and its guild
//! locks the two subjects sequentially, never nested, so cross-subject
//! updates cannot deadlock or observe a torn sibling snapshot.

mod sweeper;

pub use sweeper::{SweeperConfig, TimedSweeper};

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::defs::DefinitionStore;
use crate::error::{AccoladeError, AccoladeResult};
use crate::events::{
    AchievementCompletedEvent, CompletionEvent, EventBus, NodeCompletedEvent, TimedChallengeEvent,
};
use crate::matcher;
use crate::progress::SubjectProgress;
use crate::timed::TimedTracker;
use crate::types::{
    CriterionId, CriterionScopes, Faction, GameEvent, NodeId, SubjectId, SubjectSnapshot,
    TimedChallenge, TreeNode, TreeOperator,
};

/// Per-subject mutable state. One lock guards the whole struct, so a
/// subject's counter updates and tree propagation form a critical section.
struct SubjectState {
    progress: SubjectProgress,
    timed: TimedTracker,
    faction: Option<Faction>,
}

/// Criteria tree evaluation and progress aggregation engine.
pub struct Engine {
    defs: Arc<DefinitionStore>,
    config: EngineConfig,
    store: Option<Arc<dyn crate::traits::SnapshotStore>>,
    event_bus: Option<EventBus>,
    subjects: RwLock<HashMap<SubjectId, Arc<Mutex<SubjectState>>>>,
}

impl Engine {
    /// Create an engine over validated definitions.
    pub fn new(defs: Arc<DefinitionStore>, config: EngineConfig) -> Self {
        Self {
            defs,
            config,
            store: None,
            event_bus: None,
            subjects: RwLock::new(HashMap::new()),
        }
    }

    /// Set the snapshot store used at attach/flush/detach time.
    pub fn with_store(mut self, store: Arc<dyn crate::traits::SnapshotStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Set the event bus for asynchronous completion delivery.
    pub fn with_event_bus(mut self, event_bus: EventBus) -> Self {
        self.event_bus = Some(event_bus);
        self
    }

    /// Attach a fresh event bus sized from the configuration.
    pub fn with_default_event_bus(self) -> Self {
        let capacity = self.config.bus_capacity;
        self.with_event_bus(EventBus::with_capacity(capacity))
    }

    /// The engine configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The definition store this engine evaluates against.
    pub fn defs(&self) -> &Arc<DefinitionStore> {
        &self.defs
    }

    /// The event bus, when configured.
    pub fn event_bus(&self) -> Option<&EventBus> {
        self.event_bus.as_ref()
    }

    /// Attach a subject, loading its persisted snapshot. Idempotent: a
    /// second attach of a live subject is a warning, not an error.
    pub async fn attach_subject(
        &self,
        subject: SubjectId,
        faction: Option<Faction>,
    ) -> AccoladeResult<()> {
        if self.subject_handle(subject).is_some() {
            warn!(%subject, "subject already attached");
            return Ok(());
        }

        let snapshot = match &self.store {
            Some(store) => store.load_snapshot(subject).await?,
            None => SubjectSnapshot::empty(),
        };

        let state = SubjectState {
            progress: SubjectProgress::from_snapshot(subject, &snapshot),
            timed: TimedTracker::hydrate(snapshot.timed),
            faction,
        };

        let mut map = self.subjects.write().unwrap();
        if map.contains_key(&subject) {
            warn!(%subject, "subject attached concurrently");
            return Ok(());
        }
        map.insert(subject, Arc::new(Mutex::new(state)));
        info!(%subject, "subject attached");
        Ok(())
    }

    /// Detach a subject: flush its pending updates, drop its open timed
    /// windows (the normal discard path), and release its state.
    pub async fn detach_subject(&self, subject: SubjectId) -> AccoladeResult<()> {
        let removed = {
            let mut map = self.subjects.write().unwrap();
            map.remove(&subject)
        };
        let Some(state_arc) = removed else {
            return Err(AccoladeError::subject_not_attached(subject));
        };

        let (progress_updates, completion_updates, dropped) = {
            let mut state = state_arc.lock().unwrap();
            let dropped = state.timed.clear();
            let (progress, completions) = state.progress.take_pending();
            (progress, completions, dropped)
        };
        if dropped > 0 {
            debug!(%subject, dropped, "discarded open timed windows on detach");
        }

        if let Some(store) = &self.store {
            if !progress_updates.is_empty() {
                store.upsert_progress(&progress_updates).await?;
            }
            if !completion_updates.is_empty() {
                store.upsert_completions(&completion_updates).await?;
            }
            store.save_timed(subject, &[]).await?;
        }

        info!(%subject, "subject detached");
        Ok(())
    }

    /// Whether a subject is currently attached.
    pub fn is_attached(&self, subject: SubjectId) -> bool {
        self.subject_handle(subject).is_some()
    }

    /// Currently attached subjects.
    pub fn attached_subjects(&self) -> Vec<SubjectId> {
        self.subjects.read().unwrap().keys().copied().collect()
    }

    /// Current counter for a criterion on a subject.
    pub fn criterion_progress(&self, subject: SubjectId, criterion: CriterionId) -> Option<u64> {
        let state_arc = self.subject_handle(subject)?;
        let state = state_arc.lock().unwrap();
        Some(state.progress.counter(criterion))
    }

    /// Whether a tree node is complete for a subject.
    pub fn node_complete(&self, subject: SubjectId, node: NodeId) -> bool {
        self.subject_handle(subject)
            .map(|arc| arc.lock().unwrap().progress.is_complete(node))
            .unwrap_or(false)
    }

    /// Open timed windows for a subject.
    pub fn active_timed(&self, subject: SubjectId) -> Vec<TimedChallenge> {
        self.subject_handle(subject)
            .map(|arc| arc.lock().unwrap().timed.to_vec())
            .unwrap_or_default()
    }

    /// Process one game event.
    ///
    /// Events must arrive in order per subject; ordering across subjects is
    /// not required. Events naming unattached subjects are dropped (worst
    /// case is missing progress, recoverable via snapshot reload).
    pub fn handle_event(&self, event: &GameEvent) -> Vec<CompletionEvent> {
        let mut out = Vec::new();

        let mut targets: Vec<SubjectId> = vec![event.subject];
        for linked in [event.account, event.guild].into_iter().flatten() {
            if !targets.contains(&linked) {
                targets.push(linked);
            }
        }

        for subject in targets {
            let Some(state_arc) = self.subject_handle(subject) else {
                debug!(%subject, "event for unattached subject ignored");
                continue;
            };
            let mut state = state_arc.lock().unwrap();
            self.process_for_subject(&mut state, subject, event, &mut out);

            if state.progress.pending_len() > self.config.journal_high_water {
                debug!(
                    %subject,
                    pending = state.progress.pending_len(),
                    "journal past high-water mark; flush overdue"
                );
            }
        }

        self.emit_all(&out);
        out
    }

    /// Poll open timed windows and expire the overdue ones.
    ///
    /// Called on a coarse periodic tick; expiry is routine business logic,
    /// never an error. Returns the transitions it produced.
    pub fn sweep_timed(&self, now: DateTime<Utc>) -> Vec<CompletionEvent> {
        let mut out = Vec::new();

        for (subject, state_arc) in self.subject_handles() {
            let mut state = state_arc.lock().unwrap();
            self.expire_overdue(&mut state, subject, now, &mut out);
        }

        self.emit_all(&out);
        out
    }

    /// Expire every overdue window for one subject. Shared by the periodic
    /// sweep and the lazy check on event arrival, so a window transitions to
    /// expired exactly once whichever path sees it first.
    fn expire_overdue(
        &self,
        state: &mut SubjectState,
        subject: SubjectId,
        now: DateTime<Utc>,
        out: &mut Vec<CompletionEvent>,
    ) {
        for challenge in state.timed.collect_expired(now) {
            let criterion = challenge.criterion;
            if let Some(def) = self.defs.criterion(criterion) {
                if def.flags.reset_on_start {
                    self.reset_criterion(state, criterion, now);
                }
            }
            debug!(%subject, %criterion, "timed window expired");
            out.push(CompletionEvent::TimedExpired(TimedChallengeEvent::new(
                subject,
                criterion,
                challenge.deadline,
                now,
            )));
        }
    }

    /// Hand pending progress, completions, and timed windows to the
    /// snapshot store. In-memory state stays authoritative; a failed write
    /// surfaces as an error for the caller to log and retry.
    pub async fn flush(&self) -> AccoladeResult<()> {
        let Some(store) = &self.store else {
            return Ok(());
        };

        for (subject, state_arc) in self.subject_handles() {
            let (progress_updates, completion_updates, timed) = {
                let mut state = state_arc.lock().unwrap();
                let (progress, completions) = state.progress.take_pending();
                (progress, completions, state.timed.to_vec())
            };

            if !progress_updates.is_empty() {
                store.upsert_progress(&progress_updates).await?;
            }
            if !completion_updates.is_empty() {
                store.upsert_completions(&completion_updates).await?;
            }
            store.save_timed(subject, &timed).await?;
        }

        Ok(())
    }

    fn subject_handle(&self, subject: SubjectId) -> Option<Arc<Mutex<SubjectState>>> {
        self.subjects.read().unwrap().get(&subject).cloned()
    }

    fn subject_handles(&self) -> Vec<(SubjectId, Arc<Mutex<SubjectState>>)> {
        self.subjects
            .read()
            .unwrap()
            .iter()
            .map(|(&id, arc)| (id, arc.clone()))
            .collect()
    }

    fn emit_all(&self, events: &[CompletionEvent]) {
        if let Some(bus) = &self.event_bus {
            for event in events {
                bus.emit(event.clone());
            }
        }
    }

    /// Everything one event does to one subject, under that subject's lock:
    /// fail conditions, timed starts, then counter updates with propagation.
    fn process_for_subject(
        &self,
        state: &mut SubjectState,
        subject: SubjectId,
        event: &GameEvent,
        out: &mut Vec<CompletionEvent>,
    ) {
        let now = event.timestamp;

        // Windows past their deadline are already expired even if the sweep
        // has not run yet; a satisfying event must not land in them.
        self.expire_overdue(state, subject, now, out);

        // Fail conditions terminate before anything else accrues.
        for &criterion_id in self.defs.fail_criteria() {
            let Some(criterion) = self.defs.criterion(criterion_id) else {
                continue;
            };
            if !scope_allows(&criterion.scopes, subject) {
                continue;
            }
            let Some(fail) = &criterion.fail_condition else {
                continue;
            };
            if !matcher::fail_matches(fail, event) {
                continue;
            }
            if !criterion.flags.fail_on_condition && !state.timed.is_active(criterion_id) {
                continue;
            }

            let open_window = state.timed.remove(criterion_id);
            if criterion.flags.reset_on_start {
                self.reset_criterion(state, criterion_id, now);
            }
            if let Some(challenge) = open_window {
                out.push(CompletionEvent::TimedFailed(TimedChallengeEvent::new(
                    subject,
                    criterion_id,
                    challenge.deadline,
                    now,
                )));
            }
        }

        // Start events open (or re-open) timed windows.
        if let Some(timed_type) = matcher::timed_type_for(&event.kind) {
            for &criterion_id in self.defs.timed_criteria(timed_type) {
                let Some(criterion) = self.defs.criterion(criterion_id) else {
                    continue;
                };
                if !scope_allows(&criterion.scopes, subject) {
                    continue;
                }
                let Some(timed) = &criterion.timed else {
                    continue;
                };
                if !matcher::start_matches(timed, event) {
                    continue;
                }

                if criterion.flags.reset_on_start {
                    self.reset_criterion(state, criterion_id, now);
                }
                let deadline = state
                    .timed
                    .start(criterion_id, timed.window_secs, timed.start_asset, now)
                    .deadline;
                out.push(CompletionEvent::TimedStarted(TimedChallengeEvent::new(
                    subject,
                    criterion_id,
                    deadline,
                    now,
                )));
            }
        }

        // Counter updates and tree propagation.
        for &criterion_id in self.defs.criterion_ids() {
            let Some(criterion) = self.defs.criterion(criterion_id) else {
                continue;
            };
            if !scope_allows(&criterion.scopes, subject) {
                continue;
            }
            let Some(delta) = matcher::evaluate(criterion, event) else {
                continue;
            };
            // Timed criteria only accrue while their window is open.
            if criterion.is_timed() && !state.timed.is_active(criterion_id) {
                continue;
            }

            let change = state
                .progress
                .record(criterion_id, delta.amount, delta.mode, now);
            if !change.changed {
                continue;
            }

            self.propagate(state, subject, criterion_id, now, out);

            // A satisfied leaf inside an open window closes it as succeeded.
            if state.timed.is_active(criterion_id) {
                let satisfied = self
                    .defs
                    .leaves_for(criterion_id)
                    .iter()
                    .any(|&leaf| state.progress.is_complete(leaf));
                if satisfied {
                    if let Some(challenge) = state.timed.remove(criterion_id) {
                        out.push(CompletionEvent::TimedSucceeded(TimedChallengeEvent::new(
                            subject,
                            criterion_id,
                            challenge.deadline,
                            now,
                        )));
                    }
                }
            }
        }
    }

    /// Re-evaluate every tree that references the criterion, bottom-up.
    ///
    /// Each affected path is walked leaf to root so a node is evaluated only
    /// after its updated child settled. Completion is monotonic: an already
    /// complete node is skipped, except that a leaf whose stored flag is not
    /// supported by its counter is re-derived rather than trusted.
    fn propagate(
        &self,
        state: &mut SubjectState,
        subject: SubjectId,
        criterion: CriterionId,
        now: DateTime<Utc>,
        out: &mut Vec<CompletionEvent>,
    ) {
        let leaves: Vec<NodeId> = self.defs.leaves_for(criterion).to_vec();
        for leaf in leaves {
            for node_id in self.defs.path_to_root(leaf) {
                let Some(node) = self.defs.node(node_id) else {
                    continue;
                };

                let satisfied = self.node_satisfied(state, node);

                if state.progress.is_complete(node_id) {
                    if !satisfied && node.operator == TreeOperator::Single {
                        debug!(
                            %subject,
                            node = %node_id,
                            "stored completion not supported by counter; re-deriving"
                        );
                        state.progress.clear_completion(node_id);
                    }
                    continue;
                }

                if satisfied && state.progress.mark_complete(node_id, now) {
                    self.emit_node_completed(state, subject, node_id, now, out);
                }
            }
        }
    }

    fn emit_node_completed(
        &self,
        state: &SubjectState,
        subject: SubjectId,
        node: NodeId,
        now: DateTime<Utc>,
        out: &mut Vec<CompletionEvent>,
    ) {
        let mut payload = NodeCompletedEvent::new(subject, node, now);
        let achievement = self.defs.achievement_for_root(node);
        if let Some(achievement) = achievement {
            payload = payload.with_achievement(achievement.id);
        }
        out.push(CompletionEvent::NodeCompleted(payload));

        if let Some(achievement) = achievement {
            if achievement.faction.allows(state.faction) && !achievement.flags.counter {
                info!(%subject, achievement = %achievement.id, "achievement completed");
                out.push(CompletionEvent::AchievementCompleted(
                    AchievementCompletedEvent::new(subject, achievement.id, now),
                ));
            }
        }
    }

    /// Zero a criterion's counter and revoke completions that no longer
    /// hold, bottom-up, before normal propagation resumes. Re-derivation
    /// checks across all children: an `Any` parent with another complete
    /// child keeps its completion.
    fn reset_criterion(
        &self,
        state: &mut SubjectState,
        criterion: CriterionId,
        now: DateTime<Utc>,
    ) {
        state.progress.reset(criterion, now);

        let leaves: Vec<NodeId> = self.defs.leaves_for(criterion).to_vec();
        for leaf in leaves {
            for node_id in self.defs.path_to_root(leaf) {
                let Some(node) = self.defs.node(node_id) else {
                    continue;
                };
                if state.progress.is_complete(node_id) && !self.node_satisfied(state, node) {
                    state.progress.clear_completion(node_id);
                }
            }
        }
    }

    /// A node's completion predicate over its criterion / children.
    ///
    /// Faction-restricted nodes never satisfy for the other side, and
    /// internal nodes with no eligible children are vacuously incomplete.
    fn node_satisfied(&self, state: &SubjectState, node: &TreeNode) -> bool {
        if !node.flags.allows_faction(state.faction) {
            return false;
        }

        let required = node.required_amount();
        match node.operator {
            TreeOperator::Single => {
                let counter = node
                    .criterion
                    .map(|c| state.progress.counter(c))
                    .unwrap_or(0);
                counter >= required
            }
            TreeOperator::SingleNotCompleted => {
                let counter = node
                    .criterion
                    .map(|c| state.progress.counter(c))
                    .unwrap_or(0);
                counter < required
            }
            TreeOperator::All => {
                let eligible = self.eligible_children(state, node);
                !eligible.is_empty()
                    && eligible.iter().all(|&c| state.progress.is_complete(c))
            }
            TreeOperator::Any => self
                .eligible_children(state, node)
                .iter()
                .any(|&c| state.progress.is_complete(c)),
            TreeOperator::CountDirectChildren => {
                let complete = self
                    .eligible_children(state, node)
                    .iter()
                    .filter(|&&c| state.progress.is_complete(c))
                    .count() as u64;
                complete >= required
            }
            TreeOperator::SumChildren | TreeOperator::SumChildrenWeight | TreeOperator::MaxChild => {
                self.node_value(state, node) >= required
            }
        }
    }

    /// A node's effective value for aggregation by its parent.
    fn node_value(&self, state: &SubjectState, node: &TreeNode) -> u64 {
        if !node.flags.allows_faction(state.faction) {
            return 0;
        }

        match node.operator {
            TreeOperator::Single | TreeOperator::SingleNotCompleted => node
                .criterion
                .map(|c| state.progress.counter(c))
                .unwrap_or(0),
            TreeOperator::All => self
                .child_values(state, node)
                .into_iter()
                .min()
                .unwrap_or(0),
            TreeOperator::Any | TreeOperator::MaxChild => self
                .child_values(state, node)
                .into_iter()
                .max()
                .unwrap_or(0),
            TreeOperator::SumChildren => self
                .child_values(state, node)
                .into_iter()
                .fold(0u64, u64::saturating_add),
            TreeOperator::SumChildrenWeight => {
                let mut sum = 0u64;
                for &child_id in &node.children {
                    let Some(child) = self.defs.node(child_id) else {
                        continue;
                    };
                    let weighted = self.node_value(state, child).saturating_mul(child.amount);
                    sum = sum.saturating_add(weighted);
                }
                sum
            }
            TreeOperator::CountDirectChildren => self
                .eligible_children(state, node)
                .iter()
                .filter(|&&c| state.progress.is_complete(c))
                .count() as u64,
        }
    }

    fn child_values(&self, state: &SubjectState, node: &TreeNode) -> Vec<u64> {
        node.children
            .iter()
            .filter_map(|&child_id| self.defs.node(child_id))
            .map(|child| self.node_value(state, child))
            .collect()
    }

    fn eligible_children(&self, state: &SubjectState, node: &TreeNode) -> Vec<NodeId> {
        node.children
            .iter()
            .filter(|&&child_id| {
                self.defs
                    .node(child_id)
                    .map(|child| child.flags.allows_faction(state.faction))
                    .unwrap_or(false)
            })
            .copied()
            .collect()
    }
}

fn scope_allows(scopes: &CriterionScopes, subject: SubjectId) -> bool {
    match subject {
        SubjectId::Player(_) => scopes.player,
        SubjectId::Account(_) => scopes.account,
        SubjectId::Guild(_) => scopes.guild,
    }
}
