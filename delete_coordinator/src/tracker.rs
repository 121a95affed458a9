//! Per-tablet bookkeeping of which replicas acknowledged the delete push.

use data_types::tablet_metadata::{PartitionId, ReplicaId, TabletId, TabletLocation};
use hashbrown::HashSet;
use parking_lot::Mutex;

use crate::quorum::{self, TabletCompletion};

/// Tracks acknowledgements for one tablet of a delete job.
///
/// The known replica set and the expected count are fixed at construction
/// (a snapshot of the replica directory at job creation); only the
/// acknowledged set grows. Acknowledgements arrive from concurrent reporting
/// flows, so the acknowledged set sits behind a mutex while the rest of the
/// struct is immutable and lock-free to read.
#[derive(Debug)]
pub struct TabletDeleteInfo {
    tablet_id: TabletId,
    partition_id: PartitionId,
    replicas: HashSet<ReplicaId>,
    finished: Mutex<HashSet<ReplicaId>>,
}

impl TabletDeleteInfo {
    /// Start tracking the tablet described by `location`.
    pub fn new(location: &TabletLocation) -> Self {
        let replicas = location
            .replicas
            .iter()
            .map(|replica| replica.replica_id)
            .collect();

        Self {
            tablet_id: location.tablet_id,
            partition_id: location.partition_id,
            replicas,
            finished: Default::default(),
        }
    }

    /// The tablet being tracked.
    pub fn tablet_id(&self) -> TabletId {
        self.tablet_id
    }

    /// The partition the tablet belongs to.
    pub fn partition_id(&self) -> PartitionId {
        self.partition_id
    }

    /// The replica count captured at job creation, fixed for the job's
    /// lifetime even if cluster membership later changes.
    pub fn expected_count(&self) -> usize {
        self.replicas.len()
    }

    /// Whether `replica_id` was part of the tablet's replica set at job
    /// creation.
    pub fn knows_replica(&self, replica_id: ReplicaId) -> bool {
        self.replicas.contains(&replica_id)
    }

    /// Record an acknowledgement from `replica_id`.
    ///
    /// Idempotent: returns `true` only the first time a known replica is
    /// recorded. Replicas outside the creation-time snapshot are never
    /// recorded, which keeps the acknowledged set a subset of the known
    /// set.
    pub fn record_ack(&self, replica_id: ReplicaId) -> bool {
        if !self.knows_replica(replica_id) {
            return false;
        }
        self.finished.lock().insert(replica_id)
    }

    /// The number of distinct replicas that have acknowledged.
    pub fn finished_count(&self) -> usize {
        self.finished.lock().len()
    }

    /// Snapshot of the acknowledged replica ids.
    pub fn finished_replicas(&self) -> Vec<ReplicaId> {
        self.finished.lock().iter().copied().collect()
    }

    /// This tablet's completion level right now.
    pub fn completion(&self) -> TabletCompletion {
        quorum::classify(self.finished_count(), self.expected_count())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use data_types::node_id::NodeId;
    use data_types::tablet_metadata::{ReplicaInfo, ReplicaState};

    fn location() -> TabletLocation {
        let replicas = (1..=3)
            .map(|id| ReplicaInfo {
                replica_id: ReplicaId::new(70000 + id),
                node_id: NodeId::try_from(10000 + id as u32).unwrap(),
                state: ReplicaState::Normal,
            })
            .collect();

        TabletLocation::new(TabletId::new(60000), PartitionId::new(40000), replicas)
    }

    #[test]
    fn record_ack_is_idempotent() {
        let tracker = TabletDeleteInfo::new(&location());
        let replica = ReplicaId::new(70001);

        assert!(tracker.record_ack(replica));
        assert!(!tracker.record_ack(replica));
        assert_eq!(tracker.finished_count(), 1);
    }

    #[test]
    fn unknown_replicas_are_never_recorded() {
        let tracker = TabletDeleteInfo::new(&location());

        assert!(!tracker.record_ack(ReplicaId::new(99999)));
        assert_eq!(tracker.finished_count(), 0);
    }

    #[test]
    fn finished_never_exceeds_expected() {
        let tracker = TabletDeleteInfo::new(&location());

        for id in 70001..=70003 {
            tracker.record_ack(ReplicaId::new(id));
            tracker.record_ack(ReplicaId::new(id));
        }

        assert_eq!(tracker.finished_count(), tracker.expected_count());
    }

    #[test]
    fn completion_advances_with_acks() {
        let tracker = TabletDeleteInfo::new(&location());
        assert_eq!(tracker.completion(), TabletCompletion::Insufficient);

        tracker.record_ack(ReplicaId::new(70001));
        assert_eq!(tracker.completion(), TabletCompletion::Insufficient);

        tracker.record_ack(ReplicaId::new(70002));
        assert_eq!(tracker.completion(), TabletCompletion::Quorum);

        tracker.record_ack(ReplicaId::new(70003));
        assert_eq!(tracker.completion(), TabletCompletion::Full);
    }
}
