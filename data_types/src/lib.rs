//! This crate contains the data types shared between the delete coordinator
//! and its collaborators: catalog identifiers, tablet/replica metadata,
//! transaction records and row-predicate descriptions.

#![deny(rustdoc::broken_intra_doc_links, rustdoc::bare_urls, rust_2018_idioms)]
#![warn(
    missing_copy_implementations,
    missing_debug_implementations,
    missing_docs,
    clippy::explicit_iter_loop,
    clippy::use_self,
    clippy::clone_on_ref_ptr
)]

pub mod delete_predicate;
pub mod delete_request;
pub mod node_id;
pub mod tablet_metadata;
pub mod transaction;
