//! Command-line interface for devmap.
//!
//! # Commands
//!
//! - `markers` - load a data source and print the marker set for one viewport
//! - `list` - print the list view (sorted, filtered, truncated)
//! - `resolve` - resolve free-text locations to coordinates
//! - `stats` - print the developer count readout after loading for a zoom level
//! - `split` - split a consolidated developer file into batch files and an index
//!
//! # Global Options
//!
//! - `--verbose` / `-v` - debug logging
//! - `--quiet` / `-q` - errors only, no spinner
//! - `--config` / `-c` - configuration file instead of `~/.devmap/config.toml`
//! - `--no-progress` - no spinner
//!
//! `RUST_LOG`, when set, overrides the level chosen by `--verbose`/`--quiet`.
//!
//! # Examples
//!
//! ```bash
//! # Markers for central Europe at zoom 6, as GeoJSON
//! devmap markers --source ./data --bbox 45,5,55,20 --zoom 6 > europe.geojson
//!
//! # Top 20 developers mentioning "berlin", by stars
//! devmap list --source ./data --search berlin --sort stars --limit 20
//!
//! # Check how locations resolve
//! devmap resolve "SF" "Lagos" "Somewhere in Europe"
//!
//! # Prepare a data directory
//! devmap split developers.json ./data --batch-size 100
//! ```

mod common;
mod list;
mod markers;
mod resolve;
mod split;
mod stats;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

pub use common::OutputFormat;

/// Settings derived from the global flags, passed to every command.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    /// Log filter used when `RUST_LOG` is not set.
    pub log_level: String,

    /// Hide the spinner.
    pub no_progress: bool,

    /// Suppress informational output on stderr.
    pub quiet: bool,

    /// Explicit configuration file.
    pub config_path: Option<PathBuf>,
}

impl CliConfig {
    /// Install the global tracing subscriber (stderr, `RUST_LOG` wins).
    pub fn init_logging(&self) {
        let filter = if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            EnvFilter::new(&self.log_level)
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .try_init();
    }
}

/// Explore developers on a map, from the terminal.
#[derive(Parser)]
#[command(
    name = "devmap",
    about = "Load developer batches, resolve their locations and render map markers",
    version,
    long_about = "devmap progressively loads batches of developer records from a directory or URL, \
                  resolves free-text locations to coordinates and renders the developers visible \
                  in a map viewport as markers or as a sortable list."
)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Only log errors and hide progress output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Path to the configuration file (default: ~/.devmap/config.toml)
    #[arg(short, long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Disable the progress spinner
    #[arg(long, global = true)]
    no_progress: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Render the markers for one map viewport
    Markers(markers::MarkersCommand),

    /// Show the list view: every loaded developer, sorted and filtered
    List(list::ListCommand),

    /// Resolve location strings to coordinates
    Resolve(resolve::ResolveCommand),

    /// Show the developer count readout
    Stats(stats::StatsCommand),

    /// Split a consolidated developer file into batch files
    Split(split::SplitCommand),
}

impl Cli {
    /// Run the selected command with configuration derived from the global flags.
    pub async fn execute(self) -> Result<()> {
        let config = self.build_config();
        config.init_logging();
        self.execute_with_config(config).await
    }

    #[must_use]
    pub fn build_config(&self) -> CliConfig {
        let log_level = if self.verbose {
            "debug"
        } else if self.quiet {
            "error"
        } else {
            "warn"
        };

        CliConfig {
            log_level: log_level.to_string(),
            no_progress: self.no_progress || self.quiet,
            quiet: self.quiet,
            config_path: self.config.clone(),
        }
    }

    pub async fn execute_with_config(self, config: CliConfig) -> Result<()> {
        match self.command {
            Commands::Markers(cmd) => cmd.execute(&config).await,
            Commands::List(cmd) => cmd.execute(&config).await,
            Commands::Resolve(cmd) => cmd.execute(&config).await,
            Commands::Stats(cmd) => cmd.execute(&config).await,
            Commands::Split(cmd) => cmd.execute(&config).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_build_config_levels() {
        let cli = Cli::parse_from(["devmap", "--verbose", "resolve", "Berlin"]);
        let config = cli.build_config();
        assert_eq!(config.log_level, "debug");
        assert!(!config.no_progress);

        let cli = Cli::parse_from(["devmap", "resolve", "Berlin", "--quiet"]);
        let config = cli.build_config();
        assert_eq!(config.log_level, "error");
        assert!(config.no_progress);
        assert!(config.quiet);

        let cli = Cli::parse_from(["devmap", "-c", "/tmp/devmap.toml", "resolve", "x"]);
        assert_eq!(cli.build_config().config_path, Some(PathBuf::from("/tmp/devmap.toml")));
    }

    #[test]
    fn test_verbose_and_quiet_conflict() {
        assert!(Cli::try_parse_from(["devmap", "-v", "-q", "resolve", "x"]).is_err());
    }

    #[test]
    fn test_bbox_is_validated_at_parse_time() {
        assert!(Cli::try_parse_from(["devmap", "markers", "--source", "d", "--bbox", "1,2,3"]).is_err());
        assert!(Cli::try_parse_from(["devmap", "markers", "--source", "d", "--bbox", "10,0,-10,5"]).is_err());
        assert!(Cli::try_parse_from(["devmap", "markers", "--source", "d", "--bbox", "-10,0,10,5"]).is_ok());
    }
}
