//! `devmap resolve`: show how location strings resolve.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use serde::Serialize;

use super::CliConfig;
use super::common::{self, OutputFormat, fit};
use crate::location::{LocationResolver, Resolution};

/// Resolve each location string with the same tables and fallbacks the map uses.
#[derive(Args, Debug)]
pub struct ResolveCommand {
    /// Free-text locations, e.g. "SF" "Berlin, Germany"
    #[arg(required = true, value_name = "TEXT")]
    locations: Vec<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
    format: OutputFormat,
}

#[derive(Serialize)]
struct ResolvedRow<'a> {
    input: &'a str,
    resolution: Resolution,
}

impl ResolveCommand {
    pub async fn execute(self, cli: &CliConfig) -> Result<()> {
        let config = common::load_config(cli).await?;
        let mut resolver = LocationResolver::new(config.resolver_settings()?)?;
        if let Some(geocoder) = config.geocoder()? {
            resolver = resolver.with_geocoder(geocoder);
        }

        let mut rows = Vec::with_capacity(self.locations.len());
        for input in &self.locations {
            rows.push(ResolvedRow {
                input,
                resolution: resolver.resolve_async(input).await,
            });
        }

        match self.format {
            OutputFormat::Table => println!("{}", format_table(&rows)),
            OutputFormat::Json => println!(
                "{}",
                serde_json::to_string_pretty(&rows).context("Failed to serialize resolutions")?
            ),
            OutputFormat::Yaml => {
                print!("{}", serde_yaml::to_string(&rows).context("Failed to serialize resolutions")?);
            }
        }

        let stats = resolver.stats();
        tracing::debug!(
            "Resolver: {} cache hit(s), {} table scan(s), {} external lookup(s)",
            stats.cache_hits,
            stats.table_scans,
            stats.external_lookups
        );
        Ok(())
    }
}

fn format_table(rows: &[ResolvedRow<'_>]) -> String {
    let mut out = String::new();
    for row in rows {
        let line = match &row.resolution {
            Resolution::Resolved(place) => format!(
                "{} {} {:?} ({})",
                fit(row.input, 28),
                fit(&place.coordinates.to_string(), 20),
                place.tier,
                place.place
            ),
            Resolution::Unresolved => format!("{} {}", fit(row.input, 28), "unresolved".yellow()),
        };
        out.push_str(&line);
        out.push('\n');
    }
    out.trim_end().to_string()
}
