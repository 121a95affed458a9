//! This crate exists to coordinate versions of `tracing` and friends so that
//! we can manage their updates in a single crate. All other crates in the
//! workspace depend on this one for their logging and tracing macros.

#![deny(rustdoc::broken_intra_doc_links, rustdoc::bare_urls, rust_2018_idioms)]
#![warn(missing_docs)]

pub use tracing;
