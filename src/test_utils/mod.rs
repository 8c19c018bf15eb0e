//! Test utilities for the constellation resolver
//!
//! Helpers shared by unit tests and the integration suites:
//!
//! - [`init_test_logging`] - once-only tracing setup that writes through the test harness
//! - [`RepoFixture`] - fluent builder for repository trees in a temporary directory
//!
//! # Example
//!
//! ```rust,no_run
//! use constellation_resolver::test_utils::RepoFixture;
//!
//! let fixture = RepoFixture::new()
//!     .template("web")
//!     .standalone_cluster("edge", "variables:\n  region: eu\n")
//!     .standalone_application("edge", "site", "name: site\ntemplate: web\n");
//! assert!(fixture.root().join("templates/web").is_dir());
//! ```

pub mod fixtures;

pub use fixtures::RepoFixture;

use std::sync::Once;
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Global flag to ensure logging is only initialized once in tests
static INIT_LOGGING: Once = Once::new();

/// Initialize logging for tests.
///
/// Uses `level` when given, otherwise `RUST_LOG`; with neither, logging stays
/// off. Safe to call from every test.
///
/// ```bash
/// RUST_LOG=scanner=debug cargo test
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
            .try_init();
    });
}
