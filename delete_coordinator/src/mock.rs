//! Mock collaborator implementations that record their calls and return
//! programmed results.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use data_types::node_id::NodeId;
use data_types::tablet_metadata::{PartitionId, TableId, TabletLocation};
use data_types::transaction::{CommitStatus, TabletCommitInfo, TransactionId};
use hashbrown::HashSet;
use parking_lot::Mutex;

use crate::interface::{
    DirectoryError, DispatchError, LedgerError, PushTask, ReplicaDirectory, TaskDispatcher,
    TransactionLedger,
};
use crate::registry::JobRegistry;

/// A [`ReplicaDirectory`] returning programmed resolutions in order.
#[derive(Debug, Default)]
pub struct MockReplicaDirectory {
    returns: Mutex<VecDeque<Result<Vec<TabletLocation>, DirectoryError>>>,
    calls: Mutex<Vec<(TableId, Vec<PartitionId>)>>,
}

impl MockReplicaDirectory {
    /// Queue a successful resolution.
    pub fn with_tablets(self, tablets: impl IntoIterator<Item = TabletLocation>) -> Self {
        self.returns
            .lock()
            .push_back(Ok(tablets.into_iter().collect()));
        self
    }

    /// Queue a failed resolution.
    pub fn with_error(self, error: DirectoryError) -> Self {
        self.returns.lock().push_back(Err(error));
        self
    }

    /// The lookups observed so far.
    pub fn calls(&self) -> Vec<(TableId, Vec<PartitionId>)> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl ReplicaDirectory for MockReplicaDirectory {
    async fn tablets_for_partitions(
        &self,
        table_id: TableId,
        partitions: &[PartitionId],
    ) -> Result<Vec<TabletLocation>, DirectoryError> {
        self.calls.lock().push((table_id, partitions.to_vec()));
        self.returns
            .lock()
            .pop_front()
            .expect("no mock directory resolution configured")
    }
}

/// A call observed by [`MockTransactionLedger`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerCall {
    /// A `begin` call.
    Begin {
        /// The table the transaction targets.
        table_id: TableId,
    },
    /// A `commit` call.
    Commit {
        /// The committed transaction.
        transaction_id: TransactionId,
        /// The completion records supplied.
        tablets: Vec<TabletCommitInfo>,
    },
    /// An `abort` call.
    Abort {
        /// The aborted transaction.
        transaction_id: TransactionId,
        /// The reason given.
        reason: String,
    },
}

/// A [`TransactionLedger`] handing out sequential transaction ids.
///
/// `begin` returns ids counting up from 100 unless an error is queued;
/// `commit` returns [`CommitStatus::Committed`] unless programmed
/// otherwise. Committing or aborting a transaction this ledger never
/// began fails with [`LedgerError::UnknownTransaction`]. Every call is
/// recorded.
#[derive(Debug)]
pub struct MockTransactionLedger {
    next_id: AtomicU64,
    begun: Mutex<HashSet<TransactionId>>,
    begin_errors: Mutex<VecDeque<LedgerError>>,
    commit_returns: Mutex<VecDeque<Result<CommitStatus, LedgerError>>>,
    calls: Mutex<Vec<LedgerCall>>,
}

impl Default for MockTransactionLedger {
    fn default() -> Self {
        Self {
            next_id: AtomicU64::new(100),
            begun: Default::default(),
            begin_errors: Default::default(),
            commit_returns: Default::default(),
            calls: Default::default(),
        }
    }
}

impl MockTransactionLedger {
    /// Queue a `begin` rejection.
    pub fn with_begin_error(self, error: LedgerError) -> Self {
        self.begin_errors.lock().push_back(error);
        self
    }

    /// Queue `commit` results, returned in order.
    pub fn with_commit_return(
        self,
        returns: impl IntoIterator<Item = Result<CommitStatus, LedgerError>>,
    ) -> Self {
        self.commit_returns.lock().extend(returns);
        self
    }

    /// The ledger operations observed so far.
    pub fn calls(&self) -> Vec<LedgerCall> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl TransactionLedger for MockTransactionLedger {
    async fn begin(&self, table_id: TableId) -> Result<TransactionId, LedgerError> {
        self.calls.lock().push(LedgerCall::Begin { table_id });
        if let Some(error) = self.begin_errors.lock().pop_front() {
            return Err(error);
        }
        let transaction_id = TransactionId::new(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.begun.lock().insert(transaction_id);
        Ok(transaction_id)
    }

    async fn commit(
        &self,
        transaction_id: TransactionId,
        tablets: Vec<TabletCommitInfo>,
    ) -> Result<CommitStatus, LedgerError> {
        self.calls.lock().push(LedgerCall::Commit {
            transaction_id,
            tablets,
        });
        if !self.begun.lock().contains(&transaction_id) {
            return Err(LedgerError::UnknownTransaction { transaction_id });
        }
        self.commit_returns
            .lock()
            .pop_front()
            .unwrap_or(Ok(CommitStatus::Committed))
    }

    async fn abort(&self, transaction_id: TransactionId, reason: &str) -> Result<(), LedgerError> {
        self.calls.lock().push(LedgerCall::Abort {
            transaction_id,
            reason: reason.to_string(),
        });
        if !self.begun.lock().contains(&transaction_id) {
            return Err(LedgerError::UnknownTransaction { transaction_id });
        }
        Ok(())
    }
}

/// A [`TaskDispatcher`] recording dispatched tasks.
///
/// Nodes registered via [`with_failed_node`] reject dispatches with
/// [`DispatchError::NodeUnavailable`]. With [`with_auto_ack`] the mock acts
/// as an instant storage node: every successfully dispatched task is
/// acknowledged into the job registry before `dispatch_push` returns.
///
/// [`with_failed_node`]: MockTaskDispatcher::with_failed_node
/// [`with_auto_ack`]: MockTaskDispatcher::with_auto_ack
#[derive(Debug, Default)]
pub struct MockTaskDispatcher {
    tasks: Mutex<Vec<PushTask>>,
    failed_nodes: HashSet<NodeId>,
    auto_ack: Option<Arc<JobRegistry>>,
}

impl MockTaskDispatcher {
    /// Make dispatches to `node_id` fail.
    pub fn with_failed_node(mut self, node_id: NodeId) -> Self {
        self.failed_nodes.insert(node_id);
        self
    }

    /// Acknowledge every dispatched task into `registry` immediately.
    pub fn with_auto_ack(mut self, registry: Arc<JobRegistry>) -> Self {
        self.auto_ack = Some(registry);
        self
    }

    /// The tasks accepted so far.
    pub fn tasks(&self) -> Vec<PushTask> {
        self.tasks.lock().clone()
    }
}

impl TaskDispatcher for MockTaskDispatcher {
    fn dispatch_push(&self, task: PushTask) -> Result<(), DispatchError> {
        if self.failed_nodes.contains(&task.node_id) {
            return Err(DispatchError::NodeUnavailable {
                node_id: task.node_id,
            });
        }

        self.tasks.lock().push(task.clone());

        if let Some(registry) = &self.auto_ack {
            if let Some(job) = registry.get(task.transaction_id) {
                let _ = job.record_ack(task.tablet_id, task.replica_id);
            }
        }

        Ok(())
    }
}
