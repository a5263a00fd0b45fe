//! Idempotency Tracker: per-job-id ledger of `{InProgress, Completed,
//! Failed}` that prevents a duplicate envelope delivery from running a
//! handler's side effects twice. Grounded on
//! `r2e_rate_limit::RateLimiter`'s `Arc<DashMap<K, _>>` per-key state
//! pattern; durability matches the queue's — in-memory here, since the
//! queue (`queue::channel`) is in-memory too.

use std::sync::Arc;

use dashmap::DashMap;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    InProgress,
    Completed,
    Failed,
}

#[derive(Clone, Default)]
pub struct IdempotencyTracker {
    ledger: Arc<DashMap<Uuid, JobState>>,
}

impl IdempotencyTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Atomically transitions `absent -> InProgress`. Returns `false`
    /// (duplicate) if the job is already `InProgress` or `Completed`; a
    /// job that previously ended `Failed` is allowed to retry.
    pub fn try_mark_as_processing(&self, job_id: Uuid) -> bool {
        match self.ledger.entry(job_id) {
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(JobState::InProgress);
                true
            }
            dashmap::mapref::entry::Entry::Occupied(mut slot) => match slot.get() {
                JobState::InProgress | JobState::Completed => false,
                JobState::Failed => {
                    slot.insert(JobState::InProgress);
                    true
                }
            },
        }
    }

    /// `InProgress -> Completed`; permanent thereafter.
    pub fn mark_as_completed(&self, job_id: Uuid) {
        self.ledger.insert(job_id, JobState::Completed);
    }

    /// `InProgress -> Failed`; a subsequent `try_mark_as_processing` for
    /// the same id is allowed to succeed (retries allowed).
    pub fn mark_as_failed(&self, job_id: Uuid) {
        self.ledger.insert(job_id, JobState::Failed);
    }

    pub fn is_completed(&self, job_id: Uuid) -> bool {
        matches!(self.ledger.get(&job_id).map(|s| *s), Some(JobState::Completed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_claim_on_same_job_fails_while_in_progress() {
        let tracker = IdempotencyTracker::new();
        let job_id = Uuid::new_v4();
        assert!(tracker.try_mark_as_processing(job_id));
        assert!(!tracker.try_mark_as_processing(job_id));
    }

    #[test]
    fn completed_job_never_reprocesses() {
        let tracker = IdempotencyTracker::new();
        let job_id = Uuid::new_v4();
        assert!(tracker.try_mark_as_processing(job_id));
        tracker.mark_as_completed(job_id);
        assert!(tracker.is_completed(job_id));
        assert!(!tracker.try_mark_as_processing(job_id));
    }

    #[test]
    fn failed_job_may_retry() {
        let tracker = IdempotencyTracker::new();
        let job_id = Uuid::new_v4();
        assert!(tracker.try_mark_as_processing(job_id));
        tracker.mark_as_failed(job_id);
        assert!(!tracker.is_completed(job_id));
        assert!(tracker.try_mark_as_processing(job_id));
    }
}
