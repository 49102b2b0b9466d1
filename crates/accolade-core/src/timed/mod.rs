//! Timed criteria tracking.
//!
//! One countdown window per (subject, criterion). The tracker only does
//! bookkeeping; deciding what opens, satisfies, or fails a window is the
//! engine's job. A missed deadline is routine business logic, not an error.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use tracing::debug;

use crate::types::{CriterionId, TimedChallenge};

/// Active timed challenges for one subject.
#[derive(Debug, Default)]
pub struct TimedTracker {
    active: HashMap<CriterionId, TimedChallenge>,
}

impl TimedTracker {
    /// Empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Hydrate from persisted challenges (subject attach).
    pub fn hydrate(challenges: Vec<TimedChallenge>) -> Self {
        Self {
            active: challenges.into_iter().map(|c| (c.criterion, c)).collect(),
        }
    }

    /// Open (or re-open) a window. A start event while a window is already
    /// active begins a fresh instance with a fresh deadline.
    pub fn start(
        &mut self,
        criterion: CriterionId,
        window_secs: u64,
        start_asset: u64,
        now: DateTime<Utc>,
    ) -> &TimedChallenge {
        let challenge = TimedChallenge {
            criterion,
            started_at: now,
            deadline: now + Duration::seconds(window_secs as i64),
            start_asset,
        };
        debug!(%criterion, window_secs, "timed window opened");
        self.active.insert(criterion, challenge);
        &self.active[&criterion]
    }

    /// Whether a window is open for the criterion.
    pub fn is_active(&self, criterion: CriterionId) -> bool {
        self.active.contains_key(&criterion)
    }

    /// The open window for the criterion, if any.
    pub fn get(&self, criterion: CriterionId) -> Option<&TimedChallenge> {
        self.active.get(&criterion)
    }

    /// Close a window (success or failure). Terminal for that instance; a
    /// later start event re-enters a fresh one.
    pub fn remove(&mut self, criterion: CriterionId) -> Option<TimedChallenge> {
        self.active.remove(&criterion)
    }

    /// Remove and return every window whose deadline has passed at `now`.
    pub fn collect_expired(&mut self, now: DateTime<Utc>) -> Vec<TimedChallenge> {
        let expired_ids: Vec<CriterionId> = self
            .active
            .values()
            .filter(|c| c.expired(now))
            .map(|c| c.criterion)
            .collect();

        let mut expired: Vec<TimedChallenge> = expired_ids
            .into_iter()
            .filter_map(|id| self.active.remove(&id))
            .collect();
        expired.sort_by_key(|c| c.criterion);
        expired
    }

    /// Drop every window without side effects (subject logout).
    pub fn clear(&mut self) -> usize {
        let count = self.active.len();
        self.active.clear();
        count
    }

    /// Number of open windows.
    pub fn len(&self) -> usize {
        self.active.len()
    }

    /// Whether no window is open.
    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    /// Snapshot the open windows for persistence.
    pub fn to_vec(&self) -> Vec<TimedChallenge> {
        let mut challenges: Vec<TimedChallenge> = self.active.values().cloned().collect();
        challenges.sort_by_key(|c| c.criterion);
        challenges
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_and_expire() {
        let mut tracker = TimedTracker::new();
        let t0 = Utc::now();

        tracker.start(CriterionId(1), 300, 99, t0);
        assert!(tracker.is_active(CriterionId(1)));

        // Not expired inside the window.
        assert!(tracker.collect_expired(t0 + Duration::seconds(299)).is_empty());

        // Expired exactly once after the deadline.
        let expired = tracker.collect_expired(t0 + Duration::seconds(301));
        assert_eq!(expired.len(), 1);
        assert_eq!(expired[0].criterion, CriterionId(1));
        assert!(!tracker.is_active(CriterionId(1)));
        assert!(tracker.collect_expired(t0 + Duration::seconds(400)).is_empty());
    }

    #[test]
    fn test_reentrant_start() {
        let mut tracker = TimedTracker::new();
        let t0 = Utc::now();

        tracker.start(CriterionId(1), 300, 0, t0);
        let expired = tracker.collect_expired(t0 + Duration::seconds(301));
        assert_eq!(expired.len(), 1);

        // A new start after expiry opens a fresh instance with a fresh
        // deadline.
        let t1 = t0 + Duration::seconds(400);
        tracker.start(CriterionId(1), 300, 0, t1);
        let challenge = tracker.get(CriterionId(1)).unwrap();
        assert_eq!(challenge.deadline, t1 + Duration::seconds(300));
    }

    #[test]
    fn test_restart_while_active_refreshes_deadline() {
        let mut tracker = TimedTracker::new();
        let t0 = Utc::now();

        tracker.start(CriterionId(1), 300, 0, t0);
        tracker.start(CriterionId(1), 300, 0, t0 + Duration::seconds(100));

        let challenge = tracker.get(CriterionId(1)).unwrap();
        assert_eq!(
            challenge.deadline,
            t0 + Duration::seconds(400),
        );
        assert_eq!(tracker.len(), 1);
    }

    #[test]
    fn test_clear_drops_everything() {
        let mut tracker = TimedTracker::new();
        let t0 = Utc::now();

        tracker.start(CriterionId(1), 300, 0, t0);
        tracker.start(CriterionId(2), 600, 0, t0);
        assert_eq!(tracker.clear(), 2);
        assert!(tracker.is_empty());
    }

    #[test]
    fn test_hydrate_roundtrip() {
        let mut tracker = TimedTracker::new();
        let t0 = Utc::now();
        tracker.start(CriterionId(1), 300, 7, t0);

        let restored = TimedTracker::hydrate(tracker.to_vec());
        assert!(restored.is_active(CriterionId(1)));
        assert_eq!(restored.get(CriterionId(1)).unwrap().start_asset, 7);
    }
}
