//! Types describing a delete transaction as seen by the transaction ledger.

use std::fmt;

use crate::tablet_metadata::{ReplicaId, TabletId};

/// The identifier of a transaction, assigned once by the ledger at `begin`
/// and immutable thereafter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TransactionId(u64);

impl TransactionId {
    /// Wrap a raw transaction id.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// The id as a plain integer.
    pub fn get(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// One replica's confirmation that it applied the delete, handed to the
/// ledger as part of the commit request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TabletCommitInfo {
    /// The tablet the confirmation is for.
    pub tablet_id: TabletId,
    /// The replica that acknowledged the push.
    pub replica_id: ReplicaId,
}

impl TabletCommitInfo {
    /// Record that `replica_id` of `tablet_id` acknowledged the delete.
    pub fn new(tablet_id: TabletId, replica_id: ReplicaId) -> Self {
        Self {
            tablet_id,
            replica_id,
        }
    }
}

/// How far a transaction had advanced when the ledger returned from a
/// successful commit.
///
/// Commit durability and cluster-wide visibility are separate steps: the
/// visibility propagator advances a committed transaction in the background,
/// so a caller observing [`CommitStatus::Committed`] must treat the result
/// as "committed, becoming visible".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitStatus {
    /// Durably committed; visibility propagation still in progress.
    Committed,
    /// Committed and already observable on all replicas.
    Visible,
}

impl CommitStatus {
    /// Whether the caller should expect a delay before the delete is
    /// observable everywhere.
    pub fn visibility_pending(&self) -> bool {
        matches!(self, Self::Committed)
    }
}
