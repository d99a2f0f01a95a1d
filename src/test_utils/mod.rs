//! Test utilities for devmap
//!
//! Helpers shared by unit tests and the integration suite (enable the
//! `test-utils` feature to use them from `tests/`):
//!
//! - [`init_test_logging`] installs a tracing subscriber that writes through
//!   the test harness, once per process
//! - [`fixtures`] builds sample developers and writes ready-to-load data
//!   directories
//!
//! # Example
//!
//! ```rust,no_run
//! use devmap::test_utils::{fixtures::DatasetFixture, init_test_logging};
//!
//! # async fn example() -> anyhow::Result<()> {
//! init_test_logging(None);
//! let dataset = DatasetFixture::cities(120).with_batch_size(50);
//! let dir = tempfile::TempDir::new()?;
//! dataset.write_batches(dir.path()).await?;
//! # Ok(())
//! # }
//! ```

pub mod fixtures;

pub use fixtures::DatasetFixture;

use std::sync::Once;
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Global flag to ensure logging is only initialized once in tests
static INIT_LOGGING: Once = Once::new();

/// Initialize logging for tests.
///
/// Uses `level` when given, otherwise `RUST_LOG`; with neither, logging stays off.
///
/// ```bash
/// RUST_LOG=devmap=debug cargo test
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
