//! Pieces shared by the data-loading commands.

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use colored::Colorize;

use super::CliConfig;
use crate::config::DevmapConfig;
use crate::session::{NoticeLevel, Session};
use crate::source::Source;
use crate::utils::progress::Spinner;

/// `--source` for commands that read developer data.
#[derive(Args, Debug, Clone)]
pub struct SourceArgs {
    /// Directory or http(s) base URL holding index.json and batch files
    /// (default: [source] location from the config file)
    #[arg(short, long, value_name = "DIR_OR_URL")]
    pub source: Option<String>,
}

/// Structured output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human readable table
    #[default]
    Table,
    /// Pretty JSON
    Json,
    /// YAML
    Yaml,
}

/// Load the configuration file named by `--config`, or the default one.
pub async fn load_config(cli: &CliConfig) -> Result<DevmapConfig> {
    DevmapConfig::load_with_optional(cli.config_path.clone()).await
}

/// Open the data source and start a session, with a spinner while loading.
pub async fn start_session(
    args: &SourceArgs,
    config: &DevmapConfig,
    cli: &CliConfig,
) -> Result<Session<Source>> {
    let location = args
        .source
        .clone()
        .or_else(|| config.source.location.clone())
        .unwrap_or_default();
    let source = Source::open(&location)?;
    let session = Session::from_config(source, config)?;

    let spinner = Spinner::new(format!("Loading developers from {location}..."), cli.no_progress);
    let result = session.start().await;
    spinner.finish_and_clear();
    result.with_context(|| format!("Failed to load developers from {location}"))?;

    Ok(session)
}

/// Print the session's warning and error notices to stderr.
pub async fn print_notices(session: &Session<Source>, cli: &CliConfig) {
    if cli.quiet {
        return;
    }
    for notice in session.notices().await {
        match notice.level {
            NoticeLevel::Error => eprintln!("{}: {}", "error".red().bold(), notice.message),
            NoticeLevel::Warning => eprintln!("{}: {}", "warning".yellow(), notice.message),
            NoticeLevel::Info => eprintln!("{}: {}", "note".cyan(), notice.message),
        }
    }
}

/// Pad or cut `text` to exactly `width` characters.
pub fn fit(text: &str, width: usize) -> String {
    let count = text.chars().count();
    if count <= width {
        format!("{text:<width$}")
    } else {
        let cut: String = text.chars().take(width.saturating_sub(1)).collect();
        format!("{cut}…")
    }
}
