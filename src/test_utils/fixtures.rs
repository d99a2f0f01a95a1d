//! Sample datasets for tests.
//!
//! [`DatasetFixture`] generates developers spread over a handful of well-known
//! cities and writes them in either on-disk layout a data source can have:
//! batch files plus `index.json`, or a single consolidated `developers.json`.

use anyhow::{Context, Result};
use std::path::Path;

use crate::constants::{CONSOLIDATED_FILE, DEFAULT_BATCH_SIZE};
use crate::models::Developer;
use crate::split::{split_developers, write_batches};

/// Location strings cycled through by [`DatasetFixture::cities`].
pub const SAMPLE_LOCATIONS: &[&str] = &[
    "San Francisco, CA",
    "Berlin, Germany",
    "Tokyo",
    "London, UK",
    "Lagos",
    "Somewhere in Europe",
    "Bay Area",
    "The Internet",
];

/// A developer list plus the batch size used to write it.
#[derive(Debug, Clone)]
pub struct DatasetFixture {
    pub developers: Vec<Developer>,
    pub batch_size: usize,
}

impl DatasetFixture {
    /// Wrap an explicit developer list.
    #[must_use]
    pub fn new(developers: Vec<Developer>) -> Self {
        Self {
            developers,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    /// `count` developers named `dev0000`, `dev0001`, ... cycling through
    /// [`SAMPLE_LOCATIONS`], with follower counts equal to their number.
    #[must_use]
    pub fn cities(count: usize) -> Self {
        let developers = (0..count)
            .map(|i| {
                let mut dev = Developer::new(format!("dev{i:04}"))
                    .with_location(SAMPLE_LOCATIONS[i % SAMPLE_LOCATIONS.len()])
                    .with_followers(i as u64);
                dev.display_name = Some(format!("Developer {i}"));
                dev.public_repo_count = (i % 7) as u64;
                dev.total_stars = ((i * 13) % 101) as u64;
                dev
            })
            .collect();
        Self::new(developers)
    }

    #[must_use]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Append a developer (duplicates allowed, to exercise first-write-wins).
    #[must_use]
    pub fn with_developer(mut self, developer: Developer) -> Self {
        self.developers.push(developer);
        self
    }

    /// Write batch files and `index.json` into `dir`.
    pub async fn write_batches(&self, dir: &Path) -> Result<()> {
        let (batches, index) = split_developers(self.developers.clone(), self.batch_size);
        write_batches(dir, &batches, &index).await
    }

    /// Write only the consolidated `developers.json` into `dir`, as a bare array.
    pub async fn write_consolidated(&self, dir: &Path) -> Result<()> {
        tokio::fs::create_dir_all(dir).await?;
        let path = dir.join(CONSOLIDATED_FILE);
        let content = serde_json::to_vec_pretty(&self.developers)?;
        tokio::fs::write(&path, content)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))
    }
}
