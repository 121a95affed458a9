//! Trait seams to the coordinator's collaborators.
//!
//! The coordinator drives three external components: the replica directory
//! (where are the tablets and their replicas), the transaction ledger
//! (durable begin/commit/abort with conflict detection) and the task
//! dispatcher (delivery of per-replica push commands). Each is a trait so
//! the protocol can be exercised against in-memory implementations; see
//! [`crate::mock`].

use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;
use data_types::delete_predicate::DeletePredicate;
use data_types::node_id::NodeId;
use data_types::tablet_metadata::{PartitionId, ReplicaId, TableId, TabletId, TabletLocation};
use data_types::transaction::{CommitStatus, TabletCommitInfo, TransactionId};
use thiserror::Error;

/// An error raised by the replica directory.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DirectoryError {
    /// The requested partitions resolved to no tablets at all.
    #[error("table {table_id} has no tablets in the requested partitions")]
    NoTablets {
        /// The table named by the request.
        table_id: TableId,
    },

    /// A requested partition is unknown to the directory.
    #[error("partition {partition_id} is not present in the replica directory")]
    UnknownPartition {
        /// The partition that failed to resolve.
        partition_id: PartitionId,
    },
}

/// An error raised by the transaction ledger.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// The ledger refused to begin or commit the transaction, typically
    /// because of a concurrent conflicting operation.
    #[error("transaction rejected by the ledger: {reason}")]
    Rejected {
        /// The ledger's explanation.
        reason: String,
    },

    /// The transaction id is not known to the ledger.
    #[error("transaction {transaction_id} is not known to the ledger")]
    UnknownTransaction {
        /// The unknown id.
        transaction_id: TransactionId,
    },
}

/// An error raised when a push task could not be handed to a storage node.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DispatchError {
    /// The hosting node could not be reached.
    #[error("node {node_id} is unreachable")]
    NodeUnavailable {
        /// The unreachable node.
        node_id: NodeId,
    },
}

/// The per-replica command instructing a storage node to apply the delete
/// locally and acknowledge back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushTask {
    /// The node hosting the target replica.
    pub node_id: NodeId,
    /// The tablet the replica belongs to.
    pub tablet_id: TabletId,
    /// The target replica.
    pub replica_id: ReplicaId,
    /// The transaction the delete runs under.
    pub transaction_id: TransactionId,
    /// The rows to delete; shared across all tasks of one job.
    pub predicate: Arc<DeletePredicate>,
}

/// Resolves partitions to tablets and tablets to replica sets.
#[async_trait]
pub trait ReplicaDirectory: Debug + Send + Sync {
    /// Return one [`TabletLocation`] per tablet backing `partitions` of
    /// `table_id`, with the replica sets observed at call time.
    async fn tablets_for_partitions(
        &self,
        table_id: TableId,
        partitions: &[PartitionId],
    ) -> Result<Vec<TabletLocation>, DirectoryError>;
}

/// The durable transaction ledger; owns transaction identity and visibility
/// advancement.
#[async_trait]
pub trait TransactionLedger: Debug + Send + Sync {
    /// Begin a transaction against `table_id` and return its id.
    async fn begin(&self, table_id: TableId) -> Result<TransactionId, LedgerError>;

    /// Commit `transaction_id`, supplying the per-replica completion
    /// records collected so far. After a successful return the visibility
    /// propagator advances the transaction in the background.
    async fn commit(
        &self,
        transaction_id: TransactionId,
        tablets: Vec<TabletCommitInfo>,
    ) -> Result<CommitStatus, LedgerError>;

    /// Abort `transaction_id`, recording `reason`.
    async fn abort(&self, transaction_id: TransactionId, reason: &str) -> Result<(), LedgerError>;
}

/// Delivers push tasks to storage nodes. Fire-and-forget: completion is
/// reported asynchronously through the coordinator's acknowledgement path,
/// not through this call.
pub trait TaskDispatcher: Debug + Send + Sync {
    /// Hand `task` to the owning storage node.
    fn dispatch_push(&self, task: PushTask) -> Result<(), DispatchError>;
}

#[async_trait]
impl<T: ReplicaDirectory> ReplicaDirectory for Arc<T> {
    async fn tablets_for_partitions(
        &self,
        table_id: TableId,
        partitions: &[PartitionId],
    ) -> Result<Vec<TabletLocation>, DirectoryError> {
        (**self).tablets_for_partitions(table_id, partitions).await
    }
}

#[async_trait]
impl<T: TransactionLedger> TransactionLedger for Arc<T> {
    async fn begin(&self, table_id: TableId) -> Result<TransactionId, LedgerError> {
        (**self).begin(table_id).await
    }

    async fn commit(
        &self,
        transaction_id: TransactionId,
        tablets: Vec<TabletCommitInfo>,
    ) -> Result<CommitStatus, LedgerError> {
        (**self).commit(transaction_id, tablets).await
    }

    async fn abort(&self, transaction_id: TransactionId, reason: &str) -> Result<(), LedgerError> {
        (**self).abort(transaction_id, reason).await
    }
}

impl<T: TaskDispatcher> TaskDispatcher for Arc<T> {
    fn dispatch_push(&self, task: PushTask) -> Result<(), DispatchError> {
        (**self).dispatch_push(task)
    }
}
