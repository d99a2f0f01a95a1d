//! Terminal progress feedback for long-running CLI operations.
//!
//! Loading batches over HTTP can take a few seconds, so commands show a
//! spinner while the session starts and while the map expands for a zoom
//! level. The spinner draws to stderr and is replaced by a hidden no-op bar
//! when progress is disabled (`--no-progress`, `--quiet`), so stdout stays
//! clean for piping JSON or GeoJSON.
//!
//! # Examples
//!
//! ```rust
//! use devmap::utils::progress::Spinner;
//!
//! let spinner = Spinner::new("Loading batches...", false);
//! // load().await?;
//! spinner.finish_with_message("Loaded 3 batches");
//! ```

use indicatif::{ProgressBar as IndicatifBar, ProgressStyle as IndicatifStyle};
use std::time::Duration;

/// An indeterminate progress indicator.
#[derive(Clone)]
pub struct Spinner {
    inner: IndicatifBar,
}

impl Spinner {
    /// Start a spinner showing `message`, or a hidden one when `disabled`.
    ///
    /// The animation ticks every 100ms until finished.
    pub fn new(message: impl Into<String>, disabled: bool) -> Self {
        let bar = if disabled {
            IndicatifBar::hidden()
        } else {
            let bar = IndicatifBar::new_spinner();
            bar.set_style(spinner_style());
            bar.enable_steady_tick(Duration::from_millis(100));
            bar
        };
        bar.set_message(message.into());
        Self {
            inner: bar,
        }
    }

    /// Replace the message shown next to the spinner.
    pub fn set_message(&self, msg: impl Into<String>) {
        self.inner.set_message(msg.into());
    }

    /// Stop the spinner and leave `msg` on screen.
    pub fn finish_with_message(&self, msg: impl Into<String>) {
        self.inner.finish_with_message(msg.into());
    }

    /// Stop the spinner and erase it.
    pub fn finish_and_clear(&self) {
        self.inner.finish_and_clear();
    }

    /// Whether the spinner draws nothing.
    #[must_use]
    pub fn is_hidden(&self) -> bool {
        self.inner.is_hidden()
    }
}

/// Braille spinner; falls back to the plain default if the template is rejected.
fn spinner_style() -> IndicatifStyle {
    IndicatifStyle::default_spinner()
        .template("{spinner:.cyan} {msg}")
        .unwrap_or_else(|_| IndicatifStyle::default_spinner())
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "✓"])
}
