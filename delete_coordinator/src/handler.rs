//! The delete coordinator: turns a validated row-predicate delete request
//! into a distributed transaction across all replicas of the affected
//! tablets and decides, under a bounded waiting window, whether enough
//! replicas confirmed the delete to commit.

use std::sync::Arc;
use std::time::Duration;

use data_types::delete_predicate::DeletePredicate;
use data_types::delete_request::DeleteRequest;
use data_types::tablet_metadata::{ReplicaId, TabletId, TabletLocation};
use data_types::transaction::TransactionId;
use observability_deps::tracing::{debug, info, warn};
use thiserror::Error;
use time::TimeProvider;

use crate::interface::{
    DirectoryError, LedgerError, PushTask, ReplicaDirectory, TaskDispatcher, TransactionLedger,
};
use crate::job::{AckOutcome, DeleteJob, DeleteJobSummary, DeleteState};
use crate::registry::JobRegistry;

/// Tunables for delete processing.
#[derive(Debug, Clone, Copy)]
pub struct DeleteConfig {
    /// How long [`DeleteCoordinator::process`] waits for replica
    /// acknowledgements before giving up on quorum and aborting.
    pub push_timeout: Duration,

    /// How long terminal jobs stay queryable before
    /// [`DeleteCoordinator::reap_terminal_jobs`] removes them.
    pub job_retention: Duration,
}

impl Default for DeleteConfig {
    fn default() -> Self {
        Self {
            push_timeout: Duration::from_secs(30),
            job_retention: Duration::from_secs(24 * 3600),
        }
    }
}

/// An error raised by [`DeleteCoordinator::process`].
///
/// Callers always receive exactly one definite failure reason; partial
/// dispatch failures are absorbed by the quorum policy and never surface
/// here.
#[derive(Debug, Error)]
pub enum DeleteError {
    /// The replica directory could not resolve the delete targets. Raised
    /// before any transaction exists, so there is nothing to roll back.
    #[error("failed to resolve delete targets: {source}")]
    Directory {
        /// The underlying directory error.
        #[from]
        source: DirectoryError,
    },

    /// The ledger rejected the transaction at begin or commit time. Any
    /// begun transaction has been aborted before this was returned.
    #[error("transaction ledger rejected the delete: {source}")]
    Ledger {
        /// The underlying ledger error.
        #[from]
        source: LedgerError,
    },

    /// The acknowledgement wait elapsed with the job still short of
    /// quorum. The transaction has been aborted; the caller may retry.
    #[error(
        "delete transaction {transaction_id} failed to reach replica quorum within {waited:?}"
    )]
    Timeout {
        /// The aborted transaction.
        transaction_id: TransactionId,
        /// The wait budget that was exhausted.
        waited: Duration,
    },
}

/// The successful outcome of a delete: the transaction durably committed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeleteOutcome {
    /// True when cluster-wide visibility is still being propagated in the
    /// background, i.e. the delete is committed but may not yet be
    /// observable on every replica.
    pub visibility_pending: bool,
}

/// Coordinates the end-to-end delete flow: begins the transaction, builds
/// the job, dispatches push tasks, waits with a deadline, evaluates quorum
/// and drives commit/abort.
///
/// One `process` call coordinates one delete; concurrent deletes share
/// nothing but the job registry, which acknowledgement-reporting services
/// can also reach via [`DeleteCoordinator::registry`].
#[derive(Debug)]
pub struct DeleteCoordinator<D, L, T> {
    directory: D,
    ledger: L,
    dispatcher: T,
    registry: Arc<JobRegistry>,
    time_provider: Arc<dyn TimeProvider>,
    config: DeleteConfig,
}

impl<D, L, T> DeleteCoordinator<D, L, T>
where
    D: ReplicaDirectory,
    L: TransactionLedger,
    T: TaskDispatcher,
{
    /// Create a coordinator with default configuration and a fresh job
    /// registry.
    pub fn new(
        directory: D,
        ledger: L,
        dispatcher: T,
        time_provider: Arc<dyn TimeProvider>,
    ) -> Self {
        Self {
            directory,
            ledger,
            dispatcher,
            registry: Arc::new(JobRegistry::new()),
            time_provider,
            config: Default::default(),
        }
    }

    /// Override the configuration.
    pub fn with_config(mut self, config: DeleteConfig) -> Self {
        self.config = config;
        self
    }

    /// Share an externally owned job registry, e.g. one also wired into
    /// the acknowledgement-reporting service.
    pub fn with_registry(mut self, registry: Arc<JobRegistry>) -> Self {
        self.registry = registry;
        self
    }

    /// The job registry backing this coordinator.
    pub fn registry(&self) -> &Arc<JobRegistry> {
        &self.registry
    }

    /// Process `request` with the configured acknowledgement timeout.
    pub async fn process(&self, request: DeleteRequest) -> Result<DeleteOutcome, DeleteError> {
        self.process_with_timeout(request, self.config.push_timeout)
            .await
    }

    /// Process `request`, waiting at most `timeout` for replica
    /// acknowledgements.
    pub async fn process_with_timeout(
        &self,
        request: DeleteRequest,
        timeout: Duration,
    ) -> Result<DeleteOutcome, DeleteError> {
        let DeleteRequest {
            table_id,
            partitions,
            predicate,
        } = request;

        // Resolve targets first; failures here happen before any
        // transaction exists.
        let tablets = self
            .directory
            .tablets_for_partitions(table_id, &partitions)
            .await?;
        if tablets.is_empty() {
            return Err(DirectoryError::NoTablets { table_id }.into());
        }

        // A begin rejection means no job is created at all.
        let transaction_id = self.ledger.begin(table_id).await?;

        let created_at = self.time_provider.now();
        let deadline = created_at.checked_add(timeout).unwrap_or(created_at);
        let job = Arc::new(DeleteJob::new(
            transaction_id,
            table_id,
            &tablets,
            created_at,
            deadline,
        ));
        self.registry.insert(Arc::clone(&job));

        self.dispatch_pushes(transaction_id, &tablets, Arc::new(predicate));

        // The only suspension point. Early return and timeout are both
        // non-error outcomes, and the drained flag is only a hint: the
        // authoritative status is the recomputation below.
        let drained = job.wait_for_acks(timeout).await;
        debug!(
            %transaction_id,
            drained,
            remaining = job.remaining_acks(),
            "acknowledgement wait finished"
        );

        match job.state() {
            DeleteState::Pending | DeleteState::Cancelled => {
                job.cancel();
                warn!(
                    %transaction_id,
                    ?timeout,
                    "delete failed to reach replica quorum in time; aborting"
                );
                self.abort_best_effort(transaction_id, "timeout waiting for replica quorum")
                    .await;
                Err(DeleteError::Timeout {
                    transaction_id,
                    waited: timeout,
                })
            }
            state => {
                match self.ledger.commit(transaction_id, job.tablet_commit_info()).await {
                    Ok(status) => {
                        info!(
                            %transaction_id,
                            push_state = %state,
                            visibility_pending = status.visibility_pending(),
                            "delete transaction committed"
                        );
                        Ok(DeleteOutcome {
                            visibility_pending: status.visibility_pending(),
                        })
                    }
                    Err(error) => {
                        // The job keeps its push-completion state: the
                        // replica-side work happened even though the
                        // transaction could not be finalised, and status
                        // queries must keep reporting that work.
                        warn!(
                            %transaction_id,
                            %error,
                            "commit rejected after push completion; aborting"
                        );
                        self.abort_best_effort(transaction_id, "commit rejected")
                            .await;
                        Err(error.into())
                    }
                }
            }
        }
    }

    /// Report a replica's push acknowledgement; the dispatcher's
    /// completion callback path.
    ///
    /// Acknowledgements for unknown transactions and acknowledgements
    /// arriving after cancellation are harmless and dropped.
    pub fn report_push_ack(
        &self,
        transaction_id: TransactionId,
        tablet_id: TabletId,
        replica_id: ReplicaId,
    ) {
        let job = match self.registry.get(transaction_id) {
            Some(job) => job,
            None => {
                debug!(
                    %transaction_id,
                    %tablet_id,
                    %replica_id,
                    "acknowledgement for unknown delete transaction dropped"
                );
                return;
            }
        };

        match job.record_ack(tablet_id, replica_id) {
            AckOutcome::Recorded => {
                debug!(%transaction_id, %tablet_id, %replica_id, "replica acknowledged delete push")
            }
            AckOutcome::Duplicate => {
                debug!(%transaction_id, %tablet_id, %replica_id, "duplicate acknowledgement ignored")
            }
            AckOutcome::Late => {
                debug!(
                    %transaction_id,
                    %tablet_id,
                    %replica_id,
                    "acknowledgement arrived after cancellation"
                )
            }
            AckOutcome::UnknownTablet => {
                warn!(
                    %transaction_id,
                    %tablet_id,
                    "acknowledgement for tablet that is not part of the job"
                )
            }
            AckOutcome::UnknownReplica => {
                warn!(
                    %transaction_id,
                    %tablet_id,
                    %replica_id,
                    "acknowledgement from replica that is not part of the tablet"
                )
            }
        }
    }

    /// The push-completion state of the job for `transaction_id`, if the
    /// registry still holds it. Read-only.
    pub fn job_state(&self, transaction_id: TransactionId) -> Option<DeleteState> {
        self.registry.get(transaction_id).map(|job| job.state())
    }

    /// Diagnostic snapshot of every registered job.
    pub fn job_summaries(&self) -> Vec<DeleteJobSummary> {
        self.registry.summaries()
    }

    /// Remove terminal jobs older than the configured retention. Returns
    /// how many were removed.
    pub fn reap_terminal_jobs(&self) -> usize {
        let removed = self
            .registry
            .reap(self.time_provider.now(), self.config.job_retention);
        if removed > 0 {
            info!(removed, "reaped terminal delete jobs");
        }
        removed
    }

    fn dispatch_pushes(
        &self,
        transaction_id: TransactionId,
        tablets: &[TabletLocation],
        predicate: Arc<DeletePredicate>,
    ) {
        let mut dispatched = 0;
        for location in tablets {
            for replica in &location.replicas {
                if !replica.state.is_push_eligible() {
                    debug!(
                        %transaction_id,
                        tablet_id = %location.tablet_id,
                        replica_id = %replica.replica_id,
                        state = ?replica.state,
                        "skipping push to replica not in a pushable state"
                    );
                    continue;
                }

                let task = PushTask {
                    node_id: replica.node_id,
                    tablet_id: location.tablet_id,
                    replica_id: replica.replica_id,
                    transaction_id,
                    predicate: Arc::clone(&predicate),
                };

                // A failed dispatch just means this replica never
                // acknowledges; the quorum policy absorbs it.
                if let Err(error) = self.dispatcher.dispatch_push(task) {
                    warn!(
                        %transaction_id,
                        tablet_id = %location.tablet_id,
                        replica_id = %replica.replica_id,
                        %error,
                        "failed to dispatch delete push"
                    );
                } else {
                    dispatched += 1;
                }
            }
        }

        info!(
            %transaction_id,
            tablet_count = tablets.len(),
            dispatched,
            "delete push tasks dispatched"
        );
    }

    async fn abort_best_effort(&self, transaction_id: TransactionId, reason: &str) {
        if let Err(error) = self.ledger.abort(transaction_id, reason).await {
            warn!(%transaction_id, %error, "transaction abort failed");
        }
    }
}
