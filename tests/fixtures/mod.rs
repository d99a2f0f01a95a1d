//! Data directories and configuration files shared by the integration tests.

// Not every helper is used by every test module
#![allow(dead_code)]

use anyhow::{Context, Result};
use devmap::test_utils::DatasetFixture;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Configuration with every pacing delay disabled.
pub const FAST_CONFIG: &str = r#"
[loader]
batch_delay_ms = 0

[markers]
group_delay_ms = 0

[geocoder]
enabled = false
"#;

/// A temporary directory holding `count` developers split into batches of `batch_size`.
pub async fn batch_dir(count: usize, batch_size: usize) -> Result<TempDir> {
    let temp = TempDir::new()?;
    DatasetFixture::cities(count).with_batch_size(batch_size).write_batches(temp.path()).await?;
    Ok(temp)
}

/// A temporary directory holding only a consolidated `developers.json`.
pub async fn consolidated_dir(count: usize) -> Result<TempDir> {
    let temp = TempDir::new()?;
    DatasetFixture::cities(count).write_consolidated(temp.path()).await?;
    Ok(temp)
}

/// Write [`FAST_CONFIG`] (plus `extra`) to `dir/config.toml` and return its path.
pub fn write_config(dir: &Path, extra: &str) -> Result<PathBuf> {
    let path = dir.join("config.toml");
    std::fs::write(&path, format!("{FAST_CONFIG}\n{extra}"))
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(path)
}
