//! The state machine owning one distributed delete operation.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use data_types::tablet_metadata::{PartitionId, ReplicaId, TableId, TabletId, TabletLocation};
use data_types::transaction::{TabletCommitInfo, TransactionId};
use hashbrown::HashMap;
use time::Time;

use crate::latch::CountdownLatch;
use crate::quorum;
use crate::tracker::TabletDeleteInfo;

/// The push-completion state of a delete job.
///
/// This dimension is deliberately decoupled from whether the surrounding
/// transaction later committed: it describes replica-side work, and a job
/// that reached `QuorumFinished`/`Finished` keeps that state even if the
/// commit step fails afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteState {
    /// Waiting for acknowledgements; at least one tablet is short of
    /// quorum.
    Pending,
    /// Every tablet reached at least quorum, at least one is not full.
    QuorumFinished,
    /// Every replica of every tablet acknowledged.
    Finished,
    /// The coordinator gave up waiting while still `Pending`; the
    /// transaction was aborted. Terminal.
    Cancelled,
}

impl DeleteState {
    /// Whether the job has left `Pending`. Terminal jobs are eligible for
    /// registry reaping.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

impl fmt::Display for DeleteState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "PENDING"),
            Self::QuorumFinished => write!(f, "QUORUM_FINISHED"),
            Self::Finished => write!(f, "FINISHED"),
            Self::Cancelled => write!(f, "CANCELLED"),
        }
    }
}

/// What became of one reported acknowledgement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckOutcome {
    /// First acknowledgement from this replica; it counted.
    Recorded,
    /// The replica had already acknowledged; nothing changed.
    Duplicate,
    /// Recorded in the tracker, but the job was already cancelled; the
    /// acknowledgement no longer influences any decision.
    Late,
    /// The tablet is not part of this job.
    UnknownTablet,
    /// The replica was not in the tablet's replica set at job creation.
    UnknownReplica,
}

/// One delete operation: its transaction, its target tablets and their
/// acknowledgement trackers.
///
/// Everything except the cancelled flag and the per-tablet acknowledged
/// sets is immutable after construction. [`DeleteJob::state`] is recomputed
/// from tracker snapshots on every call rather than cached, which avoids
/// ordering races between acknowledgement arrival and state transitions.
#[derive(Debug)]
pub struct DeleteJob {
    transaction_id: TransactionId,
    table_id: TableId,
    tablets: HashMap<TabletId, TabletDeleteInfo>,
    latch: CountdownLatch,
    cancelled: AtomicBool,
    created_at: Time,
    deadline: Time,
}

impl DeleteJob {
    /// Create a job in `Pending` state tracking one tablet per entry of
    /// `locations`, with the expected replica counts frozen from that
    /// snapshot.
    pub fn new(
        transaction_id: TransactionId,
        table_id: TableId,
        locations: &[TabletLocation],
        created_at: Time,
        deadline: Time,
    ) -> Self {
        let tablets: HashMap<_, _> = locations
            .iter()
            .map(|location| (location.tablet_id, TabletDeleteInfo::new(location)))
            .collect();

        let expected_total = tablets.values().map(|t| t.expected_count()).sum();

        Self {
            transaction_id,
            table_id,
            tablets,
            latch: CountdownLatch::new(expected_total),
            cancelled: AtomicBool::new(false),
            created_at,
            deadline,
        }
    }

    /// The transaction this job runs under.
    pub fn transaction_id(&self) -> TransactionId {
        self.transaction_id
    }

    /// The table being deleted from.
    pub fn table_id(&self) -> TableId {
        self.table_id
    }

    /// When the job was created.
    pub fn created_at(&self) -> Time {
        self.created_at
    }

    /// The instant after which the coordinator stops waiting for
    /// acknowledgements.
    pub fn deadline(&self) -> Time {
        self.deadline
    }

    /// The job's current state, recomputed from all tablet trackers.
    pub fn state(&self) -> DeleteState {
        if self.cancelled.load(Ordering::Acquire) {
            return DeleteState::Cancelled;
        }
        quorum::aggregate(self.tablets.values().map(|tablet| tablet.completion()))
    }

    /// Route a replica acknowledgement to the owning tablet tracker.
    ///
    /// The first acknowledgement of each known replica also counts down the
    /// wait latch, exactly once. Acknowledgements arriving after
    /// cancellation still land in the tracker (the replica did apply the
    /// delete) but are reported as [`AckOutcome::Late`].
    pub fn record_ack(&self, tablet_id: TabletId, replica_id: ReplicaId) -> AckOutcome {
        let tablet = match self.tablets.get(&tablet_id) {
            Some(tablet) => tablet,
            None => return AckOutcome::UnknownTablet,
        };

        if !tablet.knows_replica(replica_id) {
            return AckOutcome::UnknownReplica;
        }

        if !tablet.record_ack(replica_id) {
            return AckOutcome::Duplicate;
        }

        self.latch.count_down();

        if self.cancelled.load(Ordering::Acquire) {
            AckOutcome::Late
        } else {
            AckOutcome::Recorded
        }
    }

    /// Transition to `Cancelled`. One-way; returns whether this call was
    /// the one that cancelled the job.
    pub fn cancel(&self) -> bool {
        !self.cancelled.swap(true, Ordering::AcqRel)
    }

    /// Wait until every expected acknowledgement has arrived or `timeout`
    /// elapses.
    ///
    /// The return value says whether the latch drained and is only a hint:
    /// callers must consult [`DeleteJob::state`] for the authoritative
    /// answer.
    pub async fn wait_for_acks(&self, timeout: Duration) -> bool {
        self.latch.wait_timeout(timeout).await
    }

    /// Distinct acknowledgements still outstanding.
    pub fn remaining_acks(&self) -> usize {
        self.latch.remaining()
    }

    /// The per-replica completion records accumulated so far, the payload
    /// for the ledger's commit.
    pub fn tablet_commit_info(&self) -> Vec<TabletCommitInfo> {
        self.tablets
            .values()
            .flat_map(|tablet| {
                let tablet_id = tablet.tablet_id();
                tablet
                    .finished_replicas()
                    .into_iter()
                    .map(move |replica_id| TabletCommitInfo::new(tablet_id, replica_id))
            })
            .collect()
    }

    /// A point-in-time snapshot for diagnostic listings.
    pub fn summary(&self) -> DeleteJobSummary {
        let mut tablets: Vec<_> = self
            .tablets
            .values()
            .map(|tablet| TabletProgress {
                tablet_id: tablet.tablet_id(),
                partition_id: tablet.partition_id(),
                finished: tablet.finished_count(),
                expected: tablet.expected_count(),
            })
            .collect();
        tablets.sort_by_key(|progress| progress.tablet_id);

        DeleteJobSummary {
            transaction_id: self.transaction_id,
            table_id: self.table_id,
            state: self.state(),
            created_at: self.created_at,
            deadline: self.deadline,
            tablets,
        }
    }
}

/// A diagnostic snapshot of one job, as shown in administrative views.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteJobSummary {
    /// The job's transaction.
    pub transaction_id: TransactionId,
    /// The table being deleted from.
    pub table_id: TableId,
    /// The push-completion state at snapshot time.
    pub state: DeleteState,
    /// When the job was created.
    pub created_at: Time,
    /// The acknowledgement-wait deadline.
    pub deadline: Time,
    /// Per-tablet progress, ordered by tablet id.
    pub tablets: Vec<TabletProgress>,
}

/// Acknowledgement progress of one tablet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TabletProgress {
    /// The tablet.
    pub tablet_id: TabletId,
    /// The partition that owns it.
    pub partition_id: PartitionId,
    /// Distinct replicas acknowledged so far.
    pub finished: usize,
    /// The replica count frozen at job creation.
    pub expected: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use data_types::node_id::NodeId;
    use data_types::tablet_metadata::{ReplicaInfo, ReplicaState};

    const TABLET_1: u64 = 60000;
    const TABLET_2: u64 = 60001;

    fn replica(id: u64, node: u32) -> ReplicaInfo {
        ReplicaInfo {
            replica_id: ReplicaId::new(id),
            node_id: NodeId::try_from(node).unwrap(),
            state: ReplicaState::Normal,
        }
    }

    fn tablet(tablet_id: u64, replica_ids: &[u64]) -> TabletLocation {
        let replicas = replica_ids
            .iter()
            .map(|&id| replica(id, (10000 + id % 100) as u32))
            .collect();
        TabletLocation::new(TabletId::new(tablet_id), PartitionId::new(40000), replicas)
    }

    fn job(locations: &[TabletLocation]) -> DeleteJob {
        let created_at = Time::from_timestamp_nanos(0);
        DeleteJob::new(
            TransactionId::new(100),
            TableId::new(30000),
            locations,
            created_at,
            created_at + Duration::from_secs(30),
        )
    }

    #[test]
    fn state_advances_monotonically_with_acks() {
        let job = job(&[tablet(TABLET_1, &[1, 2, 3])]);
        let tablet_id = TabletId::new(TABLET_1);

        assert_eq!(job.state(), DeleteState::Pending);
        assert_eq!(job.remaining_acks(), 3);

        assert_eq!(job.record_ack(tablet_id, ReplicaId::new(1)), AckOutcome::Recorded);
        assert_eq!(job.state(), DeleteState::Pending);

        assert_eq!(job.record_ack(tablet_id, ReplicaId::new(2)), AckOutcome::Recorded);
        assert_eq!(job.state(), DeleteState::QuorumFinished);

        assert_eq!(job.record_ack(tablet_id, ReplicaId::new(3)), AckOutcome::Recorded);
        assert_eq!(job.state(), DeleteState::Finished);
        assert_eq!(job.remaining_acks(), 0);
    }

    #[test]
    fn single_replica_tablet_is_full_at_first_ack() {
        let job = job(&[tablet(TABLET_1, &[1])]);

        job.record_ack(TabletId::new(TABLET_1), ReplicaId::new(1));
        assert_eq!(job.state(), DeleteState::Finished);
    }

    #[test]
    fn job_state_is_the_weakest_tablet() {
        let job = job(&[tablet(TABLET_1, &[1, 2, 3]), tablet(TABLET_2, &[4, 5, 6])]);
        let first = TabletId::new(TABLET_1);
        let second = TabletId::new(TABLET_2);

        // First tablet full, second untouched: still pending.
        for id in [1, 2, 3] {
            job.record_ack(first, ReplicaId::new(id));
        }
        assert_eq!(job.state(), DeleteState::Pending);

        // Second tablet at quorum: job at quorum.
        job.record_ack(second, ReplicaId::new(4));
        job.record_ack(second, ReplicaId::new(5));
        assert_eq!(job.state(), DeleteState::QuorumFinished);

        // Second tablet full: job finished.
        job.record_ack(second, ReplicaId::new(6));
        assert_eq!(job.state(), DeleteState::Finished);
    }

    #[test]
    fn duplicate_acks_count_down_the_latch_once() {
        let job = job(&[tablet(TABLET_1, &[1, 2, 3])]);
        let tablet_id = TabletId::new(TABLET_1);

        assert_eq!(job.record_ack(tablet_id, ReplicaId::new(1)), AckOutcome::Recorded);
        assert_eq!(job.record_ack(tablet_id, ReplicaId::new(1)), AckOutcome::Duplicate);

        assert_eq!(job.remaining_acks(), 2);
    }

    #[test]
    fn unknown_tablets_and_replicas_are_rejected() {
        let job = job(&[tablet(TABLET_1, &[1, 2, 3])]);

        assert_eq!(
            job.record_ack(TabletId::new(99999), ReplicaId::new(1)),
            AckOutcome::UnknownTablet
        );
        assert_eq!(
            job.record_ack(TabletId::new(TABLET_1), ReplicaId::new(99999)),
            AckOutcome::UnknownReplica
        );
        assert_eq!(job.remaining_acks(), 3);
        assert_eq!(job.state(), DeleteState::Pending);
    }

    #[test]
    fn cancel_is_terminal_and_late_acks_do_not_resurrect() {
        let job = job(&[tablet(TABLET_1, &[1, 2, 3])]);
        let tablet_id = TabletId::new(TABLET_1);

        assert!(job.cancel());
        assert!(!job.cancel());
        assert_eq!(job.state(), DeleteState::Cancelled);

        for id in [1, 2, 3] {
            assert_eq!(job.record_ack(tablet_id, ReplicaId::new(id)), AckOutcome::Late);
        }

        // The trackers keep the record of replica-side work, but the job
        // stays cancelled.
        assert_eq!(job.state(), DeleteState::Cancelled);
        assert_eq!(job.tablet_commit_info().len(), 3);
    }

    #[test]
    fn commit_info_covers_every_acknowledged_replica() {
        let job = job(&[tablet(TABLET_1, &[1, 2, 3]), tablet(TABLET_2, &[4])]);

        job.record_ack(TabletId::new(TABLET_1), ReplicaId::new(1));
        job.record_ack(TabletId::new(TABLET_1), ReplicaId::new(3));
        job.record_ack(TabletId::new(TABLET_2), ReplicaId::new(4));

        let mut got = job.tablet_commit_info();
        got.sort_by_key(|info| (info.tablet_id, info.replica_id));

        assert_eq!(
            got,
            vec![
                TabletCommitInfo::new(TabletId::new(TABLET_1), ReplicaId::new(1)),
                TabletCommitInfo::new(TabletId::new(TABLET_1), ReplicaId::new(3)),
                TabletCommitInfo::new(TabletId::new(TABLET_2), ReplicaId::new(4)),
            ]
        );
    }

    #[test]
    fn summary_reports_per_tablet_progress() {
        let job = job(&[tablet(TABLET_1, &[1, 2, 3]), tablet(TABLET_2, &[4, 5])]);
        job.record_ack(TabletId::new(TABLET_1), ReplicaId::new(1));

        let summary = job.summary();
        assert_eq!(summary.transaction_id, TransactionId::new(100));
        assert_eq!(summary.state, DeleteState::Pending);
        assert_eq!(
            summary
                .tablets
                .iter()
                .map(|t| (t.finished, t.expected))
                .collect::<Vec<_>>(),
            vec![(1, 3), (0, 2)]
        );
    }

    #[tokio::test]
    async fn wait_returns_early_once_all_acks_arrive() {
        let job = std::sync::Arc::new(job(&[tablet(TABLET_1, &[1, 2])]));

        let waiter = {
            let job = std::sync::Arc::clone(&job);
            tokio::spawn(async move { job.wait_for_acks(Duration::from_secs(5)).await })
        };

        job.record_ack(TabletId::new(TABLET_1), ReplicaId::new(1));
        job.record_ack(TabletId::new(TABLET_1), ReplicaId::new(2));

        assert!(waiter.await.unwrap());
    }

    #[tokio::test]
    async fn wait_times_out_when_acks_are_missing() {
        let job = job(&[tablet(TABLET_1, &[1, 2, 3])]);
        job.record_ack(TabletId::new(TABLET_1), ReplicaId::new(1));

        assert!(!job.wait_for_acks(Duration::from_millis(10)).await);
        // The hint says "not drained" but the authoritative state is
        // whatever the trackers hold.
        assert_eq!(job.state(), DeleteState::Pending);
    }
}
