//! Shared scaffolding for CubeDB tests: temporary directories for dump
//! paths and opt-in logging.
#![deny(rustdoc::broken_intra_doc_links, rustdoc::bare_urls, rust_2018_idioms)]
#![warn(clippy::clone_on_ref_ptr, clippy::use_self)]

use std::sync::Once;

pub use tempfile::TempDir;

/// Create a temporary directory that is removed when the returned guard is
/// dropped. Used as a `--dump-path` stand-in by persistence tests.
pub fn tmp_dir() -> std::io::Result<TempDir> {
    tempfile::Builder::new().prefix("cubedb").tempdir()
}

static LOG_SETUP: Once = Once::new();

/// Enable tracing output for a test when `RUST_LOG` is set.
///
/// Safe to call from every test; the subscriber is installed at most once
/// per process.
pub fn maybe_start_logging() {
    if std::env::var("RUST_LOG").is_ok() {
        start_logging()
    }
}

/// Unconditionally install the test subscriber.
pub fn start_logging() {
    LOG_SETUP.call_once(|| {
        tracing_log::LogTracer::init().expect("log adapter install");
        let subscriber = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .finish();
        observability_deps::tracing::subscriber::set_global_default(subscriber)
            .expect("subscriber install");
    });
}
