//! Catalog identifiers and replica placement metadata for tablets.

use std::fmt;

use crate::node_id::NodeId;

macro_rules! catalog_id {
    ($(#[doc = $doc:expr] $name:ident),+ $(,)?) => {
        $(
            #[doc = $doc]
            #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
            pub struct $name(u64);

            impl $name {
                /// Wrap a raw catalog id.
                pub fn new(id: u64) -> Self {
                    Self(id)
                }

                /// The id as a plain integer.
                pub fn get(&self) -> u64 {
                    self.0
                }
            }

            impl fmt::Display for $name {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    self.0.fmt(f)
                }
            }
        )+
    };
}

catalog_id! {
    #[doc = "The identifier of a table in the catalog."]
    TableId,
    #[doc = "The identifier of one partition of a table."]
    PartitionId,
    #[doc = "The identifier of a tablet, a replicated shard of a partition."]
    TabletId,
    #[doc = "The identifier of a single replica of a tablet."]
    ReplicaId,
}

/// The health state of a replica as reported by the replica directory.
///
/// Only [`ReplicaState::Normal`] replicas are eligible targets for delete
/// pushes, but every replica counts toward its tablet's expected total.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReplicaState {
    /// Healthy and serving.
    Normal,
    /// Being cloned onto a new node; not yet a full copy.
    Clone,
    /// Scheduled for removal from its node.
    Decommission,
}

impl ReplicaState {
    /// Whether a push task may be sent to a replica in this state.
    pub fn is_push_eligible(&self) -> bool {
        matches!(self, Self::Normal)
    }
}

/// One replica of a tablet and where it lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplicaInfo {
    /// The replica's identifier.
    pub replica_id: ReplicaId,
    /// The storage node hosting this replica.
    pub node_id: NodeId,
    /// The replica's health state at lookup time.
    pub state: ReplicaState,
}

/// A tablet, the partition that owns it, and its replica set, as resolved by
/// the replica directory at one point in time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TabletLocation {
    /// The tablet's identifier.
    pub tablet_id: TabletId,
    /// The partition this tablet belongs to.
    pub partition_id: PartitionId,
    /// All replicas of this tablet, healthy or not.
    pub replicas: Vec<ReplicaInfo>,
}

impl TabletLocation {
    /// Create a location record for `tablet_id` in `partition_id`.
    pub fn new(tablet_id: TabletId, partition_id: PartitionId, replicas: Vec<ReplicaInfo>) -> Self {
        Self {
            tablet_id,
            partition_id,
            replicas,
        }
    }
}
