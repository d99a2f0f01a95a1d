//! `devmap markers`: the marker set for one map viewport.

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use colored::Colorize;

use super::CliConfig;
use super::common::{self, SourceArgs, fit};
use crate::geo::BoundingRegion;
use crate::render::MarkerSet;
use crate::utils::progress::Spinner;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum MarkerFormat {
    /// GeoJSON FeatureCollection
    #[default]
    Geojson,
    /// The marker set as JSON
    Json,
    /// Human readable table
    Table,
}

/// Load data for a viewport and print its markers.
#[derive(Args, Debug)]
pub struct MarkersCommand {
    #[command(flatten)]
    source: SourceArgs,

    /// Visible region as south,west,north,east in decimal degrees
    #[arg(long, value_name = "S,W,N,E", allow_hyphen_values = true)]
    bbox: BoundingRegion,

    /// Map zoom level; higher levels load more batches
    #[arg(short, long, default_value_t = 0.0)]
    zoom: f64,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = MarkerFormat::Geojson)]
    format: MarkerFormat,
}

impl MarkersCommand {
    pub async fn execute(self, cli: &CliConfig) -> Result<()> {
        let config = common::load_config(cli).await?;
        let session = common::start_session(&self.source, &config, cli).await?;

        let spinner = Spinner::new("Rendering markers...", cli.no_progress);
        let update = session.on_viewport_change(&self.bbox, self.zoom).await;
        spinner.finish_and_clear();
        common::print_notices(&session, cli).await;

        let output = match self.format {
            MarkerFormat::Geojson => serde_json::to_string_pretty(&update.markers.to_geojson())?,
            MarkerFormat::Json => serde_json::to_string_pretty(update.markers.as_ref())
                .context("Failed to serialize marker set")?,
            MarkerFormat::Table => format_table(&update.markers),
        };
        println!("{output}");

        if !cli.quiet {
            let status = session.status().await;
            eprintln!(
                "{} {} of {} loaded developers ({} batch(es))",
                "Showing".green(),
                status.shown,
                status.total_loaded,
                status.batches_loaded
            );
        }
        Ok(())
    }
}

fn format_table(set: &MarkerSet) -> String {
    let mut out = format!(
        "{} {} {} {} {}\n",
        fit("ID", 20).bold(),
        fit("NAME", 24).bold(),
        fit("FOLLOWERS", 10).bold(),
        fit("POSITION", 22).bold(),
        "LOCATION".bold()
    );
    for marker in &set.markers {
        out.push_str(&format!(
            "{} {} {} {} {}\n",
            fit(&marker.developer_id, 20),
            fit(&marker.name, 24),
            fit(&marker.follower_count.to_string(), 10),
            fit(&marker.position.to_string(), 22),
            marker.location.as_deref().unwrap_or("-")
        ));
    }
    out.trim_end().to_string()
}
