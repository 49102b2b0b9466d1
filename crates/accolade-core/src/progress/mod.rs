//! Per-subject progress state.
//!
//! Counters only move through [`SubjectProgress::record`]; every change is
//! appended to a write-ahead change list the persistence collaborator drains
//! asynchronously. Replays are deduplicated by sequence number, so the
//! at-least-once delivery of the store never double-counts an accumulation.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::types::{
    CompletionUpdate, CriterionId, NodeId, ProgressMode, ProgressRecord, ProgressUpdate,
    SubjectId, SubjectSnapshot,
};

/// Outcome of folding one matched event into a counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressChange {
    /// The counter value after the update.
    pub value: u64,
    /// False when the update was a no-op (e.g. `Highest` with a smaller
    /// value); the engine skips tree walks for unchanged counters.
    pub changed: bool,
}

/// Mutable progress state for one subject.
pub struct SubjectProgress {
    subject: SubjectId,
    records: HashMap<CriterionId, ProgressRecord>,
    completed: HashMap<NodeId, DateTime<Utc>>,
    pending_progress: Vec<ProgressUpdate>,
    pending_completions: Vec<CompletionUpdate>,
    next_seq: u64,
}

impl SubjectProgress {
    /// Fresh state for a never-seen subject.
    pub fn new(subject: SubjectId) -> Self {
        Self {
            subject,
            records: HashMap::new(),
            completed: HashMap::new(),
            pending_progress: Vec::new(),
            pending_completions: Vec::new(),
            next_seq: 1,
        }
    }

    /// Hydrate state from a persisted snapshot.
    pub fn from_snapshot(subject: SubjectId, snapshot: &SubjectSnapshot) -> Self {
        let next_seq = snapshot.max_seq() + 1;
        let records = snapshot
            .progress
            .iter()
            .map(|r| (r.criterion, r.clone()))
            .collect();
        let completed = snapshot.completions.iter().copied().collect();

        Self {
            subject,
            records,
            completed,
            pending_progress: Vec::new(),
            pending_completions: Vec::new(),
            next_seq,
        }
    }

    /// The subject this state belongs to.
    pub fn subject(&self) -> SubjectId {
        self.subject
    }

    /// Current counter for a criterion; zero when never touched.
    pub fn counter(&self, criterion: CriterionId) -> u64 {
        self.records.get(&criterion).map(|r| r.counter).unwrap_or(0)
    }

    /// Fold a value into the counter under the given mode.
    pub fn record(
        &mut self,
        criterion: CriterionId,
        amount: u64,
        mode: ProgressMode,
        now: DateTime<Utc>,
    ) -> ProgressChange {
        let record = self
            .records
            .entry(criterion)
            .or_insert_with(|| ProgressRecord::new(criterion, now));

        let new_value = match mode {
            ProgressMode::Set => amount,
            ProgressMode::Accumulate => record.counter.saturating_add(amount),
            ProgressMode::Highest => record.counter.max(amount),
        };

        if new_value == record.counter {
            return ProgressChange {
                value: record.counter,
                changed: false,
            };
        }

        let seq = self.next_seq;
        self.next_seq += 1;
        record.counter = new_value;
        record.updated_at = now;
        record.last_seq = seq;

        self.pending_progress.push(ProgressUpdate {
            seq,
            subject: self.subject,
            criterion,
            counter: new_value,
            updated_at: now,
        });

        ProgressChange {
            value: new_value,
            changed: true,
        }
    }

    /// Zero a counter (explicit reset semantics). No-op when already zero.
    pub fn reset(&mut self, criterion: CriterionId, now: DateTime<Utc>) -> bool {
        let Some(record) = self.records.get_mut(&criterion) else {
            return false;
        };
        if record.counter == 0 {
            return false;
        }

        let seq = self.next_seq;
        self.next_seq += 1;
        record.counter = 0;
        record.updated_at = now;
        record.last_seq = seq;

        self.pending_progress.push(ProgressUpdate {
            seq,
            subject: self.subject,
            criterion,
            counter: 0,
            updated_at: now,
        });
        true
    }

    /// Replay a persisted update. Idempotent: entries at or below the
    /// record's applied sequence number are skipped.
    pub fn replay(&mut self, update: &ProgressUpdate) -> bool {
        let record = self
            .records
            .entry(update.criterion)
            .or_insert_with(|| ProgressRecord::new(update.criterion, update.updated_at));

        if update.seq <= record.last_seq {
            return false;
        }

        record.counter = update.counter;
        record.updated_at = update.updated_at;
        record.last_seq = update.seq;
        self.next_seq = self.next_seq.max(update.seq + 1);
        true
    }

    /// Whether a tree node is recorded complete.
    pub fn is_complete(&self, node: NodeId) -> bool {
        self.completed.contains_key(&node)
    }

    /// Completion timestamp of a node, if complete.
    pub fn completed_at(&self, node: NodeId) -> Option<DateTime<Utc>> {
        self.completed.get(&node).copied()
    }

    /// Record a node completion. Returns false when already complete, so the
    /// caller emits the completion notification exactly once per transition.
    pub fn mark_complete(&mut self, node: NodeId, now: DateTime<Utc>) -> bool {
        if self.completed.contains_key(&node) {
            return false;
        }
        self.completed.insert(node, now);
        self.pending_completions.push(CompletionUpdate {
            subject: self.subject,
            node,
            completed_at: Some(now),
        });
        true
    }

    /// Clear a node completion (reset cascade). Returns false when the node
    /// was not complete.
    pub fn clear_completion(&mut self, node: NodeId) -> bool {
        if self.completed.remove(&node).is_none() {
            return false;
        }
        self.pending_completions.push(CompletionUpdate {
            subject: self.subject,
            node,
            completed_at: None,
        });
        true
    }

    /// Number of updates waiting for the persistence collaborator.
    pub fn pending_len(&self) -> usize {
        self.pending_progress.len() + self.pending_completions.len()
    }

    /// Drain the write-ahead change list.
    pub fn take_pending(&mut self) -> (Vec<ProgressUpdate>, Vec<CompletionUpdate>) {
        (
            std::mem::take(&mut self.pending_progress),
            std::mem::take(&mut self.pending_completions),
        )
    }

    /// Snapshot progress and completions. Open timed windows are tracked
    /// separately; the caller merges them in.
    pub fn to_snapshot(&self) -> SubjectSnapshot {
        SubjectSnapshot {
            progress: self.records.values().cloned().collect(),
            completions: self.completed.iter().map(|(&n, &t)| (n, t)).collect(),
            timed: Vec::new(),
        }
    }
}
