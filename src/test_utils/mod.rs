//! Test utilities for the derived-data engine
//!
//! - [`init_test_logging`] installs a test-friendly tracing subscriber once
//! - [`fixtures::RepositoryFixture`] builds in-memory repositories with
//!   documents, variants, function definitions and version labels
//!
//! # Example
//!
//! ```rust,no_run
//! use derived_data::test_utils::fixtures::RepositoryFixture;
//!
//! let mut fixture = RepositoryFixture::new();
//! fixture
//!     .function("copy-title", "copy", "hippo:document")
//!     .accessed_relative("title", "title")
//!     .derived_relative("title", "summary");
//! let doc = fixture.document(fixture.root(), "news");
//! fixture.set(doc, "title", "Hello");
//! ```

pub mod fixtures;

pub use fixtures::{FunctionBuilder, RepositoryFixture};

use std::sync::Once;
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Global flag to ensure logging is only initialized once in tests
static INIT_LOGGING: Once = Once::new();

/// Initialize logging for tests.
///
/// Uses `level` when given, otherwise `RUST_LOG`; without either, logging
/// stays off. Safe to call from every test.
///
/// ```bash
/// RUST_LOG=derived_data=debug cargo test
/// ```
pub fn init_test_logging(level: Option<Level>) {
    INIT_LOGGING.call_once(|| {
        let filter = if let Some(level) = level {
            EnvFilter::new(level.to_string())
        } else if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            return;
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .with_thread_ids(false)
            .with_ansi(true)
            .try_init();
    });
}
