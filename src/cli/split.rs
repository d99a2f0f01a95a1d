//! `devmap split`: consolidated file → batch files + index.

use anyhow::Result;
use clap::Args;
use colored::Colorize;
use std::path::PathBuf;

use super::CliConfig;
use crate::constants::DEFAULT_BATCH_SIZE;
use crate::split::split_file;

/// Split a developers.json file (array or {"developers": [...]}) into batches.
#[derive(Args, Debug)]
pub struct SplitCommand {
    /// Consolidated developer file
    input: PathBuf,

    /// Directory to write batch files and index.json into
    out_dir: PathBuf,

    /// Developers per batch
    #[arg(short, long, default_value_t = DEFAULT_BATCH_SIZE)]
    batch_size: usize,
}

impl SplitCommand {
    pub async fn execute(self, cli: &CliConfig) -> Result<()> {
        if self.batch_size == 0 {
            anyhow::bail!("--batch-size must be at least 1");
        }

        let index = split_file(&self.input, &self.out_dir, self.batch_size).await?;
        if !cli.quiet {
            println!(
                "{} {} developer(s) into {} batch(es) in {}",
                "Split".green(),
                index.total_developers,
                index.total_batches,
                self.out_dir.display()
            );
        }
        Ok(())
    }
}
