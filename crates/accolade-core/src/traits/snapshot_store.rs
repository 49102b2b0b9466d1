//! Snapshot store trait: the persistence boundary.
//!
//! The engine hands updates off asynchronously and never blocks evaluation
//! on an acknowledgment; in-memory state stays authoritative for the
//! process lifetime. Backends guarantee at-least-once durability of the
//! most recent counter per (subject, criterion); replays are deduplicated
//! by update sequence number.

use async_trait::async_trait;

use crate::error::AccoladeResult;
use crate::types::{CompletionUpdate, ProgressUpdate, SubjectId, SubjectSnapshot, TimedChallenge};

/// Core persistence trait - all snapshot store backends implement this.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Load everything persisted for a subject. Returns an empty snapshot
    /// for a never-seen subject. Consumed once at subject-attach time.
    async fn load_snapshot(&self, subject: SubjectId) -> AccoladeResult<SubjectSnapshot>;

    /// Upsert a batch of progress counter updates.
    async fn upsert_progress(&self, updates: &[ProgressUpdate]) -> AccoladeResult<()>;

    /// Upsert a batch of tree-completion records. An entry with no
    /// timestamp deletes the stored completion (reset).
    async fn upsert_completions(&self, updates: &[CompletionUpdate]) -> AccoladeResult<()>;

    /// Replace the stored set of open timed challenges for a subject.
    async fn save_timed(
        &self,
        subject: SubjectId,
        challenges: &[TimedChallenge],
    ) -> AccoladeResult<()>;

    /// Remove everything persisted for a subject.
    async fn clear_subject(&self, subject: SubjectId) -> AccoladeResult<()>;
}
