//! Quorum-based delete-commit coordination for a distributed analytical
//! store.
//!
//! A validated row-predicate delete arrives as a
//! [`DeleteRequest`](data_types::delete_request::DeleteRequest). The
//! [`DeleteCoordinator`] resolves the affected tablets and their replicas,
//! begins a transaction, fans a push task out to every healthy replica and
//! then waits, bounded by a deadline, for acknowledgements to come back.
//! Whether the transaction commits is decided by the [`quorum`] policy
//! recomputed over the per-tablet [`tracker`]s: every tablet must reach at
//! least a majority of acknowledged replicas, or the transaction is
//! aborted.
//!
//! Push completion and commit success are tracked as separate dimensions:
//! a job that reached [`DeleteState::Finished`] keeps that state in the
//! [`JobRegistry`] even when the commit step is later rejected, so
//! operators can distinguish "replicas did the work but the transaction
//! could not be finalised" from "replicas never did the work".

#![deny(rustdoc::broken_intra_doc_links, rustdoc::bare_urls, rust_2018_idioms)]
#![warn(
    missing_copy_implementations,
    missing_debug_implementations,
    missing_docs,
    clippy::explicit_iter_loop,
    clippy::use_self,
    clippy::clone_on_ref_ptr
)]

pub mod handler;
pub mod interface;
pub mod job;
pub mod latch;
pub mod mock;
pub mod quorum;
pub mod registry;
pub mod tracker;

pub use handler::{DeleteConfig, DeleteCoordinator, DeleteError, DeleteOutcome};
pub use job::{AckOutcome, DeleteJob, DeleteJobSummary, DeleteState, TabletProgress};
pub use registry::JobRegistry;
