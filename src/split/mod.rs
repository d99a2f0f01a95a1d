//! Batch splitting: turn one consolidated developer file into batch files.
//!
//! The output directory gets one `batch_NNN.json` per chunk plus an
//! `index.json`, which is exactly the layout [`crate::source::DirSource`] reads.

use anyhow::{Context, Result};
use chrono::Utc;
use std::path::Path;
use tokio::fs;
use tracing::info;

use crate::constants::{INDEX_FILE, batch_file_name};
use crate::models::{BatchFile, BatchIndex, BatchSummary, ConsolidatedFile, Developer};

/// Chunk `developers` into batches of `batch_size` and build the matching index.
///
/// A `batch_size` of zero is treated as one.
#[must_use]
pub fn split_developers(developers: Vec<Developer>, batch_size: usize) -> (Vec<BatchFile>, BatchIndex) {
    let batch_size = batch_size.max(1);
    let generated_at = Some(Utc::now());
    let total_developers = developers.len();

    let mut batches = Vec::with_capacity(total_developers.div_ceil(batch_size));
    let mut remaining = developers.into_iter().peekable();
    let mut batch_index = 0u32;
    while remaining.peek().is_some() {
        let chunk: Vec<Developer> = remaining.by_ref().take(batch_size).collect();
        batches.push(BatchFile {
            batch_index,
            generated_at,
            developers: chunk,
        });
        batch_index += 1;
    }

    let index = BatchIndex {
        total_developers,
        total_batches: batch_index,
        batches: batches
            .iter()
            .map(|batch| BatchSummary {
                index: batch.batch_index,
                filename: batch_file_name(batch.batch_index),
                count: batch.developers.len(),
                generated_at: batch.generated_at,
            })
            .collect(),
    };

    (batches, index)
}

/// Write batch files and the index into `dir`, creating it if needed.
///
/// # Errors
///
/// Returns an error if the directory or any file cannot be written.
pub async fn write_batches(dir: &Path, batches: &[BatchFile], index: &BatchIndex) -> Result<()> {
    fs::create_dir_all(dir)
        .await
        .with_context(|| format!("Failed to create output directory: {}", dir.display()))?;

    for batch in batches {
        let path = dir.join(batch_file_name(batch.batch_index));
        let content = serde_json::to_vec_pretty(batch)
            .with_context(|| format!("Failed to serialize batch {}", batch.batch_index))?;
        fs::write(&path, content)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;
    }

    let path = dir.join(INDEX_FILE);
    let content = serde_json::to_vec_pretty(index).context("Failed to serialize batch index")?;
    fs::write(&path, content).await.with_context(|| format!("Failed to write {}", path.display()))?;

    info!("Wrote {} batch(es) and {} to {}", batches.len(), INDEX_FILE, dir.display());
    Ok(())
}

/// Read a consolidated file and split it into `out_dir`.
///
/// # Errors
///
/// Returns an error if the input cannot be read or parsed, or the output cannot be written.
pub async fn split_file(input: &Path, out_dir: &Path, batch_size: usize) -> Result<BatchIndex> {
    let content = fs::read(input).await.with_context(|| format!("Failed to read {}", input.display()))?;
    let file: ConsolidatedFile = serde_json::from_slice(&content)
        .with_context(|| format!("Failed to parse developers from {}", input.display()))?;

    let (batches, index) = split_developers(file.into_developers(), batch_size);
    write_batches(out_dir, &batches, &index).await?;
    Ok(index)
}
