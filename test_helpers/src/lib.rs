//! Helpers shared by the tests of other crates in this workspace.

#![deny(rustdoc::broken_intra_doc_links, rustdoc::bare_urls, rust_2018_idioms)]
#![warn(missing_docs)]

use std::sync::Once;

use observability_deps::tracing::info;
use tracing_subscriber::EnvFilter;

static LOG_SETUP: Once = Once::new();

/// Enables debug logging if the RUST_LOG environment variable is set.
///
/// Does nothing otherwise, so tests stay quiet by default.
pub fn maybe_start_logging() {
    if std::env::var("RUST_LOG").is_ok() {
        start_logging()
    }
}

/// Installs a `tracing` subscriber that respects RUST_LOG and writes through
/// the test capture machinery. Safe to call from multiple tests.
pub fn start_logging() {
    LOG_SETUP.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_test_writer()
            .init();

        info!("logging enabled");
    });
}
