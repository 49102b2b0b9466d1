//! Progress records and persistence payloads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::{CriterionId, NodeId, SubjectId};

/// How a matched event folds into the stored counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressMode {
    /// Overwrite the counter unconditionally.
    Set,
    /// Add to the counter, saturating at the top of the range.
    Accumulate,
    /// Keep the larger of the stored counter and the new value.
    Highest,
}

/// Accumulated progress for one criterion on one subject.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressRecord {
    /// Criterion this record tracks.
    pub criterion: CriterionId,
    /// 64-bit unsigned accumulator. Never decreases except on explicit reset.
    pub counter: u64,
    /// Timestamp of the last update.
    pub updated_at: DateTime<Utc>,
    /// Sequence number of the last applied update, for replay deduplication.
    #[serde(default)]
    pub last_seq: u64,
}

impl ProgressRecord {
    /// A fresh zero record.
    pub fn new(criterion: CriterionId, now: DateTime<Utc>) -> Self {
        Self {
            criterion,
            counter: 0,
            updated_at: now,
            last_seq: 0,
        }
    }
}

/// One entry of the write-ahead change list handed to the persistence
/// collaborator. Upserts are idempotent per (subject, criterion, seq).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressUpdate {
    /// Monotonic sequence number, unique per subject.
    pub seq: u64,
    /// Subject the update belongs to.
    pub subject: SubjectId,
    /// Criterion updated.
    pub criterion: CriterionId,
    /// Resulting counter value (not the delta).
    pub counter: u64,
    /// When the update was applied.
    pub updated_at: DateTime<Utc>,
}

/// A recorded tree-node completion handed to the persistence collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionUpdate {
    /// Subject the completion belongs to.
    pub subject: SubjectId,
    /// Node that completed, or was un-completed by a reset.
    pub node: NodeId,
    /// Completion timestamp; `None` records a reset.
    pub completed_at: Option<DateTime<Utc>>,
}

/// An in-flight timed challenge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimedChallenge {
    /// Criterion under the countdown.
    pub criterion: CriterionId,
    /// When the window opened.
    pub started_at: DateTime<Utc>,
    /// When the window closes.
    pub deadline: DateTime<Utc>,
    /// Asset of the start event that opened the window.
    pub start_asset: u64,
}

impl TimedChallenge {
    /// Whether the window has passed at `now`.
    pub fn expired(&self, now: DateTime<Utc>) -> bool {
        now > self.deadline
    }

    /// Remaining time in seconds, zero once expired.
    pub fn remaining_secs(&self, now: DateTime<Utc>) -> u64 {
        (self.deadline - now).num_seconds().max(0) as u64
    }
}

/// Everything the persistence collaborator returns for one subject at
/// attach time.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SubjectSnapshot {
    /// Per-criterion progress.
    pub progress: Vec<ProgressRecord>,
    /// Completed tree nodes with their timestamps.
    pub completions: Vec<(NodeId, DateTime<Utc>)>,
    /// Timed challenges still open when the subject detached.
    pub timed: Vec<TimedChallenge>,
}

impl SubjectSnapshot {
    /// An empty snapshot for a never-seen subject.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Highest update sequence number present in the snapshot.
    pub fn max_seq(&self) -> u64 {
        self.progress.iter().map(|p| p.last_seq).max().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_timed_challenge_expiry() {
        let start = Utc::now();
        let challenge = TimedChallenge {
            criterion: CriterionId(1),
            started_at: start,
            deadline: start + Duration::seconds(300),
            start_asset: 0,
        };

        assert!(!challenge.expired(start + Duration::seconds(299)));
        assert!(!challenge.expired(start + Duration::seconds(300)));
        assert!(challenge.expired(start + Duration::seconds(301)));
        assert_eq!(challenge.remaining_secs(start + Duration::seconds(100)), 200);
        assert_eq!(challenge.remaining_secs(start + Duration::seconds(400)), 0);
    }

    #[test]
    fn test_snapshot_max_seq() {
        let now = Utc::now();
        let mut snapshot = SubjectSnapshot::empty();
        assert_eq!(snapshot.max_seq(), 0);

        let mut a = ProgressRecord::new(CriterionId(1), now);
        a.last_seq = 4;
        let mut b = ProgressRecord::new(CriterionId(2), now);
        b.last_seq = 9;
        snapshot.progress = vec![a, b];
        assert_eq!(snapshot.max_seq(), 9);
    }
}
