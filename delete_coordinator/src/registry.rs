//! The process-wide registry of in-flight and recently finished delete jobs.

use std::sync::Arc;
use std::time::Duration;

use data_types::transaction::TransactionId;
use hashbrown::HashMap;
use parking_lot::RwLock;
use time::Time;

use crate::job::{DeleteJob, DeleteJobSummary};

/// Maps transaction ids to their delete jobs so that acknowledgement
/// reporting flows and status queries can find a job independently of the
/// coordinating flow that owns it.
///
/// Entries are inserted when a delete transaction begins and removed only
/// by explicit cleanup: terminal jobs stay queryable until [`reap`] decides
/// they are old enough to drop. In-flight jobs are never reaped.
///
/// [`reap`]: JobRegistry::reap
#[derive(Debug, Default)]
pub struct JobRegistry {
    jobs: RwLock<HashMap<TransactionId, Arc<DeleteJob>>>,
}

impl JobRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Default::default()
    }

    /// Register `job` under its transaction id.
    pub fn insert(&self, job: Arc<DeleteJob>) {
        self.jobs.write().insert(job.transaction_id(), job);
    }

    /// Look up the job for `transaction_id`.
    pub fn get(&self, transaction_id: TransactionId) -> Option<Arc<DeleteJob>> {
        self.jobs.read().get(&transaction_id).map(Arc::clone)
    }

    /// Remove and return the job for `transaction_id`.
    pub fn remove(&self, transaction_id: TransactionId) -> Option<Arc<DeleteJob>> {
        self.jobs.write().remove(&transaction_id)
    }

    /// The number of registered jobs.
    pub fn len(&self) -> usize {
        self.jobs.read().len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.jobs.read().is_empty()
    }

    /// Drop terminal jobs created more than `retention` before `now`.
    /// Returns how many were removed.
    pub fn reap(&self, now: Time, retention: Duration) -> usize {
        let mut jobs = self.jobs.write();
        let before = jobs.len();

        jobs.retain(|_, job| {
            if !job.state().is_terminal() {
                return true;
            }
            match now.checked_duration_since(job.created_at()) {
                Some(age) => age < retention,
                // A job created "in the future" (clock adjustment) is kept.
                None => true,
            }
        });

        before - jobs.len()
    }

    /// Snapshot of every registered job, ordered by transaction id.
    pub fn summaries(&self) -> Vec<DeleteJobSummary> {
        let mut summaries: Vec<_> = self
            .jobs
            .read()
            .values()
            .map(|job| job.summary())
            .collect();
        summaries.sort_by_key(|summary| summary.transaction_id);
        summaries
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use data_types::node_id::NodeId;
    use data_types::tablet_metadata::{
        PartitionId, ReplicaId, ReplicaInfo, ReplicaState, TableId, TabletId, TabletLocation,
    };
    use crate::job::DeleteState;

    fn job(transaction_id: u64, created_at: Time) -> Arc<DeleteJob> {
        let location = TabletLocation::new(
            TabletId::new(60000),
            PartitionId::new(40000),
            vec![ReplicaInfo {
                replica_id: ReplicaId::new(70000),
                node_id: NodeId::try_from(10000).unwrap(),
                state: ReplicaState::Normal,
            }],
        );

        Arc::new(DeleteJob::new(
            TransactionId::new(transaction_id),
            TableId::new(30000),
            &[location],
            created_at,
            created_at + Duration::from_secs(30),
        ))
    }

    #[test]
    fn insert_get_remove() {
        let registry = JobRegistry::new();
        assert!(registry.is_empty());

        registry.insert(job(1, Time::from_timestamp_nanos(0)));
        assert_eq!(registry.len(), 1);

        let got = registry.get(TransactionId::new(1)).unwrap();
        assert_eq!(got.transaction_id(), TransactionId::new(1));
        assert!(registry.get(TransactionId::new(2)).is_none());

        assert!(registry.remove(TransactionId::new(1)).is_some());
        assert!(registry.is_empty());
    }

    #[test]
    fn reap_removes_only_old_terminal_jobs() {
        let registry = JobRegistry::new();
        let t0 = Time::from_timestamp_nanos(0);
        let retention = Duration::from_secs(3600);

        // Old and cancelled: reaped.
        let cancelled = job(1, t0);
        cancelled.cancel();
        registry.insert(cancelled);

        // Old but still pending: kept.
        registry.insert(job(2, t0));

        // Finished but recent: kept.
        let recent = job(3, t0 + Duration::from_secs(3000));
        recent.record_ack(TabletId::new(60000), ReplicaId::new(70000));
        assert_eq!(recent.state(), DeleteState::Finished);
        registry.insert(recent);

        let now = t0 + Duration::from_secs(3601);
        assert_eq!(registry.reap(now, retention), 1);

        assert!(registry.get(TransactionId::new(1)).is_none());
        assert!(registry.get(TransactionId::new(2)).is_some());
        assert!(registry.get(TransactionId::new(3)).is_some());
    }

    #[test]
    fn summaries_are_ordered_by_transaction() {
        let registry = JobRegistry::new();
        let t0 = Time::from_timestamp_nanos(0);

        registry.insert(job(7, t0));
        registry.insert(job(3, t0));
        registry.insert(job(5, t0));

        let ids: Vec<_> = registry
            .summaries()
            .into_iter()
            .map(|summary| summary.transaction_id.get())
            .collect();
        assert_eq!(ids, vec![3, 5, 7]);
    }
}
