//! In-memory snapshot store.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use accolade_core::error::AccoladeResult;
use accolade_core::traits::SnapshotStore;
use accolade_core::types::{
    CompletionUpdate, CriterionId, NodeId, ProgressRecord, ProgressUpdate, SubjectId,
    SubjectSnapshot, TimedChallenge,
};

#[derive(Default)]
struct StoredSubject {
    progress: HashMap<CriterionId, ProgressRecord>,
    completions: HashMap<NodeId, DateTime<Utc>>,
    timed: Vec<TimedChallenge>,
}

/// In-process snapshot store.
///
/// Keeps everything in a map behind a mutex. Used in tests as the store
/// double and in embedded setups that do their own persistence elsewhere.
#[derive(Default)]
pub struct MemoryStore {
    subjects: Mutex<HashMap<SubjectId, StoredSubject>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of subjects with any stored state.
    pub fn subject_count(&self) -> usize {
        self.subjects.lock().unwrap().len()
    }

    /// The stored counter for one (subject, criterion), if any.
    pub fn stored_counter(&self, subject: SubjectId, criterion: CriterionId) -> Option<u64> {
        self.subjects
            .lock()
            .unwrap()
            .get(&subject)
            .and_then(|s| s.progress.get(&criterion))
            .map(|r| r.counter)
    }
}

#[async_trait]
impl SnapshotStore for MemoryStore {
    async fn load_snapshot(&self, subject: SubjectId) -> AccoladeResult<SubjectSnapshot> {
        let subjects = self.subjects.lock().unwrap();
        let Some(stored) = subjects.get(&subject) else {
            return Ok(SubjectSnapshot::empty());
        };

        Ok(SubjectSnapshot {
            progress: stored.progress.values().cloned().collect(),
            completions: stored.completions.iter().map(|(&n, &t)| (n, t)).collect(),
            timed: stored.timed.clone(),
        })
    }

    async fn upsert_progress(&self, updates: &[ProgressUpdate]) -> AccoladeResult<()> {
        let mut subjects = self.subjects.lock().unwrap();
        for update in updates {
            let stored = subjects.entry(update.subject).or_default();
            let record = stored
                .progress
                .entry(update.criterion)
                .or_insert_with(|| ProgressRecord::new(update.criterion, update.updated_at));

            // At-least-once delivery: replays at or below the stored
            // sequence number are no-ops.
            if update.seq <= record.last_seq {
                continue;
            }
            record.counter = update.counter;
            record.updated_at = update.updated_at;
            record.last_seq = update.seq;
        }
        Ok(())
    }

    async fn upsert_completions(&self, updates: &[CompletionUpdate]) -> AccoladeResult<()> {
        let mut subjects = self.subjects.lock().unwrap();
        for update in updates {
            let stored = subjects.entry(update.subject).or_default();
            match update.completed_at {
                Some(at) => {
                    stored.completions.insert(update.node, at);
                }
                None => {
                    stored.completions.remove(&update.node);
                }
            }
        }
        Ok(())
    }

    async fn save_timed(
        &self,
        subject: SubjectId,
        challenges: &[TimedChallenge],
    ) -> AccoladeResult<()> {
        let mut subjects = self.subjects.lock().unwrap();
        subjects.entry(subject).or_default().timed = challenges.to_vec();
        Ok(())
    }

    async fn clear_subject(&self, subject: SubjectId) -> AccoladeResult<()> {
        self.subjects.lock().unwrap().remove(&subject);
        Ok(())
    }
}
