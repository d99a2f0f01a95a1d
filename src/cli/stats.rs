//! `devmap stats`: the developer count readout.

use anyhow::{Context, Result};
use clap::Args;

use super::CliConfig;
use super::common::{self, OutputFormat, SourceArgs};
use crate::geo::BoundingRegion;

/// Load a data source (optionally expanding for a zoom level) and print the counts.
#[derive(Args, Debug)]
pub struct StatsCommand {
    #[command(flatten)]
    source: SourceArgs,

    /// Expand loading and render the whole world as if the map were at this zoom level
    #[arg(short, long)]
    zoom: Option<f64>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
    format: OutputFormat,
}

impl StatsCommand {
    pub async fn execute(self, cli: &CliConfig) -> Result<()> {
        let config = common::load_config(cli).await?;
        let session = common::start_session(&self.source, &config, cli).await?;
        if let Some(zoom) = self.zoom {
            session.on_viewport_change(&BoundingRegion::world(), zoom).await;
        }
        common::print_notices(&session, cli).await;

        let status = session.status().await;
        match self.format {
            OutputFormat::Table => {
                println!("shown:          {}", status.shown);
                println!("total loaded:   {}", status.total_loaded);
                println!("batches loaded: {}", status.batches_loaded);
                match status.total_batches {
                    Some(total) => println!("total batches:  {total}"),
                    None => println!("total batches:  unknown"),
                }
            }
            OutputFormat::Json => {
                println!("{}", serde_json::to_string_pretty(&status).context("Failed to serialize stats")?);
            }
            OutputFormat::Yaml => {
                print!("{}", serde_yaml::to_string(&status).context("Failed to serialize stats")?);
            }
        }
        Ok(())
    }
}
