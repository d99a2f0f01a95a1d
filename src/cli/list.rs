//! `devmap list`: the list view.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use super::CliConfig;
use super::common::{self, OutputFormat, SourceArgs, fit};
use crate::models::{Developer, SortKey};

/// Print loaded developers sorted by a metric and filtered by a query.
///
/// The list ignores the map viewport; only the initial batches are loaded
/// unless `--zoom` asks for more.
#[derive(Args, Debug)]
pub struct ListCommand {
    #[command(flatten)]
    source: SourceArgs,

    /// Metric to sort by, highest first
    #[arg(long, value_enum, default_value_t = SortKey::Followers)]
    sort: SortKey,

    /// Case-insensitive filter over name, id, bio, location and company
    #[arg(long, value_name = "QUERY")]
    search: Option<String>,

    /// Maximum rows (default: [list] display_budget)
    #[arg(short, long)]
    limit: Option<usize>,

    /// Load batches as if the map were at this zoom level
    #[arg(short, long)]
    zoom: Option<f64>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
    format: OutputFormat,
}

impl ListCommand {
    pub async fn execute(self, cli: &CliConfig) -> Result<()> {
        let mut config = common::load_config(cli).await?;
        if let Some(limit) = self.limit {
            config.list.display_budget = limit;
        }

        let mut session = common::start_session(&self.source, &config, cli).await?;
        if let Some(zoom) = self.zoom {
            session.on_viewport_change(&crate::geo::BoundingRegion::world(), zoom).await;
        }
        session.toggle_view();
        session.set_sort(self.sort);
        session.set_query(self.search.clone().unwrap_or_default());

        let rows = session.list().await;
        let matches = session.list_matches().await;
        common::print_notices(&session, cli).await;

        match self.format {
            OutputFormat::Table => println!("{}", format_table(&rows, self.sort)),
            OutputFormat::Json => {
                println!("{}", serde_json::to_string_pretty(&rows).context("Failed to serialize list")?);
            }
            OutputFormat::Yaml => {
                print!("{}", serde_yaml::to_string(&rows).context("Failed to serialize list")?);
            }
        }

        if !cli.quiet {
            let total = session.status().await.total_loaded;
            eprintln!("{} {} of {} match(es), {} loaded", "Showing".green(), rows.len(), matches, total);
        }
        Ok(())
    }
}

fn format_table(rows: &[Developer], sort: SortKey) -> String {
    let metric = match sort {
        SortKey::Followers => "FOLLOWERS",
        SortKey::Repos => "REPOS",
        SortKey::Stars => "STARS",
        SortKey::Forks => "FORKS",
    };

    let mut out = format!(
        "{} {} {} {} {}\n",
        fit("#", 4).bold(),
        fit("ID", 20).bold(),
        fit("NAME", 24).bold(),
        fit(metric, 10).bold(),
        "LOCATION".bold()
    );
    for (rank, dev) in rows.iter().enumerate() {
        out.push_str(&format!(
            "{} {} {} {} {}\n",
            fit(&(rank + 1).to_string(), 4),
            fit(&dev.id, 20),
            fit(dev.name(), 24),
            fit(&dev.metric(sort).to_string(), 10),
            dev.location_text().unwrap_or("-")
        ));
    }
    out.trim_end().to_string()
}
