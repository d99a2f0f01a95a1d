//! Error handling for devmap
//!
//! This module provides the error types and user-friendly error reporting for the
//! devmap loader and CLI. The error system is designed around two core principles:
//! 1. **Strongly-typed errors** for precise error handling in code
//! 2. **User-friendly messages** with actionable suggestions for CLI users
//!
//! # Architecture
//!
//! - [`DevmapError`] - Enumerated error types for all failure cases
//! - [`ErrorContext`] - Wrapper that adds user-friendly messages and suggestions
//!
//! # Error Categories
//!
//! - **Data unavailable**: [`DevmapError::ResourceNotFound`], [`DevmapError::NetworkError`].
//!   The loader recovers from these (consolidated fallback, skipped batch).
//! - **Malformed data**: [`DevmapError::DataParseError`]
//! - **Total data absence**: [`DevmapError::NoDevelopers`], fatal for a session
//! - **Render failure**: [`DevmapError::InvalidBounds`], reported as a notice while the
//!   previous marker set stays visible
//! - **Configuration**: [`DevmapError::ConfigError`], [`DevmapError::TomlError`]
//!
//! A location string that matches nothing is *not* an error: the resolver answers with
//! its documented fallback coordinate.
//!
//! # Examples
//!
//! ```rust,no_run
//! use devmap::core::{DevmapError, user_friendly_error};
//!
//! let error = DevmapError::NoDevelopers {
//!     source_location: "./data".to_string(),
//! };
//! let ctx = user_friendly_error(anyhow::Error::from(error));
//! ctx.display(); // Shows coloured error with suggestions
//! ```

use colored::Colorize;
use std::fmt;
use thiserror::Error;

/// The main error type for devmap operations.
///
/// Library seams that callers need to branch on (the data source, the loader's
/// fallback decision, the session start) return this type directly; application
/// code wraps it in [`anyhow::Error`] with additional context.
#[derive(Error, Debug)]
pub enum DevmapError {
    /// A resource (index, batch or consolidated file) does not exist at the source.
    ///
    /// This is the only fetch failure that triggers the consolidated fallback.
    #[error("Resource not found: {resource}")]
    ResourceNotFound {
        /// Path or URL of the missing resource
        resource: String,
    },

    /// A fetch failed for a reason other than "not found".
    #[error("Network error while fetching {resource}: {reason}")]
    NetworkError {
        /// Path or URL being fetched
        resource: String,
        /// Transport-level reason
        reason: String,
    },

    /// A resource was fetched but its content could not be decoded.
    #[error("Invalid data in {resource}: {reason}")]
    DataParseError {
        /// Path or URL of the malformed resource
        resource: String,
        /// Decoder message
        reason: String,
    },

    /// Neither the batch system nor the consolidated file produced any developer.
    #[error("No developers could be loaded from {source_location}")]
    NoDevelopers {
        /// The data source that was tried
        source_location: String,
    },

    /// A viewport rectangle that cannot be used for selection.
    #[error("Invalid bounding region: {reason}")]
    InvalidBounds {
        /// What is wrong with the rectangle
        reason: String,
    },

    /// The external location lookup service failed.
    #[error("Geocoder request for '{query}' failed: {reason}")]
    GeocoderError {
        /// Location text sent to the service
        query: String,
        /// Failure description
        reason: String,
    },

    /// Configuration file problems.
    #[error("Configuration error: {message}")]
    ConfigError {
        /// Description of the configuration problem
        message: String,
    },

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    /// Other errors
    #[error("{message}")]
    Other {
        /// Generic error message
        message: String,
    },
}

impl DevmapError {
    /// Whether this error means the resource does not exist at all.
    ///
    /// The batch loader only falls back to the consolidated file for this class
    /// of failure; transport errors are logged and the batch is skipped.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::ResourceNotFound {
                ..
            } => true,
            Self::IoError(e) => e.kind() == std::io::ErrorKind::NotFound,
            _ => false,
        }
    }
}

impl Clone for DevmapError {
    fn clone(&self) -> Self {
        match self {
            Self::ResourceNotFound {
                resource,
            } => Self::ResourceNotFound {
                resource: resource.clone(),
            },
            Self::NetworkError {
                resource,
                reason,
            } => Self::NetworkError {
                resource: resource.clone(),
                reason: reason.clone(),
            },
            Self::DataParseError {
                resource,
                reason,
            } => Self::DataParseError {
                resource: resource.clone(),
                reason: reason.clone(),
            },
            Self::NoDevelopers {
                source_location,
            } => Self::NoDevelopers {
                source_location: source_location.clone(),
            },
            Self::InvalidBounds {
                reason,
            } => Self::InvalidBounds {
                reason: reason.clone(),
            },
            Self::GeocoderError {
                query,
                reason,
            } => Self::GeocoderError {
                query: query.clone(),
                reason: reason.clone(),
            },
            Self::ConfigError {
                message,
            } => Self::ConfigError {
                message: message.clone(),
            },
            Self::IoError(e) => Self::IoError(std::io::Error::new(e.kind(), e.to_string())),
            Self::JsonError(e) => Self::Other {
                message: format!("JSON error: {e}"),
            },
            Self::TomlError(e) => Self::Other {
                message: format!("TOML parsing error: {e}"),
            },
            Self::Other {
                message,
            } => Self::Other {
                message: message.clone(),
            },
        }
    }
}

/// Error context wrapper that provides user-friendly error information
///
/// `ErrorContext` wraps a [`DevmapError`] and adds an optional suggestion and
/// optional details. When displayed, errors show:
/// 1. **Error**: The main error message in red
/// 2. **Details**: Additional context about the error in yellow (optional)
/// 3. **Suggestion**: Actionable steps to resolve the issue in green (optional)
///
/// # Examples
///
/// ```rust,no_run
/// use devmap::core::{DevmapError, ErrorContext};
///
/// let context = ErrorContext::new(DevmapError::ResourceNotFound {
///     resource: "data/index.json".to_string(),
/// })
/// .with_suggestion("Run 'devmap split' to produce batch files")
/// .with_details("The batch index lists every batch file");
///
/// context.display();
/// ```
#[derive(Debug)]
pub struct ErrorContext {
    /// The underlying devmap error
    pub error: DevmapError,
    /// Optional suggestion for resolving the error
    pub suggestion: Option<String>,
    /// Optional additional details about the error
    pub details: Option<String>,
}

impl ErrorContext {
    /// Create a new error context with no suggestion or details.
    #[must_use]
    pub const fn new(error: DevmapError) -> Self {
        Self {
            error,
            suggestion: None,
            details: None,
        }
    }

    /// Add a suggestion for resolving the error
    ///
    /// Suggestions should be actionable steps. They are displayed in green.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Add additional details explaining the error
    ///
    /// Details are displayed in yellow, less prominent than the error itself.
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Display the error context to stderr with terminal colors
    pub fn display(&self) {
        eprintln!("{}: {}", "error".red().bold(), self.error);

        if let Some(details) = &self.details {
            eprintln!("{}: {}", "details".yellow(), details);
        }

        if let Some(suggestion) = &self.suggestion {
            eprintln!("{}: {}", "suggestion".green(), suggestion);
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)?;

        if let Some(details) = &self.details {
            write!(f, "\nDetails: {details}")?;
        }

        if let Some(suggestion) = &self.suggestion {
            write!(f, "\nSuggestion: {suggestion}")?;
        }

        Ok(())
    }
}

impl std::error::Error for ErrorContext {}

/// Extension trait for converting [`DevmapError`] to [`anyhow::Error`] with context
pub trait IntoAnyhowWithContext {
    /// Convert the error to an [`anyhow::Error`] with the provided context
    fn into_anyhow_with_context(self, context: ErrorContext) -> anyhow::Error;
}

impl IntoAnyhowWithContext for DevmapError {
    fn into_anyhow_with_context(self, context: ErrorContext) -> anyhow::Error {
        anyhow::Error::new(ErrorContext {
            error: self,
            suggestion: context.suggestion,
            details: context.details,
        })
    }
}

/// Convert any error to a user-friendly [`ErrorContext`] with actionable suggestions
///
/// Recognises, in order:
/// - an [`ErrorContext`] already attached to the chain (returned as-is)
/// - [`DevmapError`] variants anywhere in the chain, with tailored suggestions
/// - [`std::io::Error`] with filesystem guidance
/// - [`toml::de::Error`] with configuration syntax help
/// - anything else, rendered with its full cause chain
#[must_use]
pub fn user_friendly_error(error: anyhow::Error) -> ErrorContext {
    if let Some(ctx) = error.downcast_ref::<ErrorContext>() {
        return ErrorContext {
            error: ctx.error.clone(),
            suggestion: ctx.suggestion.clone(),
            details: ctx.details.clone(),
        };
    }

    for cause in error.chain() {
        if let Some(devmap_error) = cause.downcast_ref::<DevmapError>() {
            return create_error_context(devmap_error.clone());
        }
    }

    if let Some(io_error) = error.downcast_ref::<std::io::Error>() {
        match io_error.kind() {
            std::io::ErrorKind::PermissionDenied => {
                return ErrorContext::new(DevmapError::Other {
                    message: format!("Permission denied: {io_error}"),
                })
                .with_suggestion("Check file ownership and permissions of the data directory");
            }
            std::io::ErrorKind::NotFound => {
                return ErrorContext::new(DevmapError::Other {
                    message: format!("File not found: {io_error}"),
                })
                .with_suggestion("Check that the file or directory exists and the path is correct");
            }
            _ => {}
        }
    }

    if let Some(toml_error) = error.downcast_ref::<toml::de::Error>() {
        return ErrorContext::new(DevmapError::ConfigError {
            message: toml_error.to_string(),
        })
        .with_suggestion("Check the TOML syntax in your devmap configuration file");
    }

    // Generic error - include the full error chain for better diagnostics
    let mut message = error.to_string();
    let chain: Vec<String> = error.chain().skip(1).map(std::string::ToString::to_string).collect();

    if !chain.is_empty() {
        message.push_str("\n\nCaused by:");
        for (i, cause) in chain.iter().enumerate() {
            message.push_str(&format!("\n  {}: {}", i + 1, cause));
        }
    }

    ErrorContext::new(DevmapError::Other {
        message,
    })
}

/// Map each [`DevmapError`] variant to an [`ErrorContext`] with suggestions.
fn create_error_context(error: DevmapError) -> ErrorContext {
    match &error {
        DevmapError::ResourceNotFound { resource } => {
            let suggestion = if resource.ends_with(crate::constants::INDEX_FILE) {
                "Generate batch files and an index with 'devmap split <developers.json> <dir>'"
            } else {
                "Check the --source location; it must contain index.json and batch files or developers.json"
            };
            ErrorContext::new(error.clone())
                .with_suggestion(suggestion)
                .with_details("The data source did not contain the requested file")
        }
        DevmapError::NetworkError { .. } => ErrorContext::new(error.clone())
            .with_suggestion("Check your internet connection and the source URL")
            .with_details("Failed batches are skipped; only a failed initial load is fatal"),
        DevmapError::DataParseError { .. } => ErrorContext::new(error.clone())
            .with_suggestion("Re-generate the data files; each batch must be a JSON object with a 'developers' array")
            .with_details("Batch files, the index and developers.json are produced by the collection step"),
        DevmapError::NoDevelopers { .. } => ErrorContext::new(error.clone())
            .with_suggestion("Point --source at a directory or URL holding index.json and batch files, or developers.json")
            .with_details("Neither the batch system nor the consolidated fallback produced any developer"),
        DevmapError::InvalidBounds { .. } => ErrorContext::new(error.clone())
            .with_suggestion("Pass --bbox as south,west,north,east in decimal degrees, e.g. 47.2,5.8,55.1,15.0"),
        DevmapError::GeocoderError { .. } => ErrorContext::new(error.clone())
            .with_suggestion("Disable the geocoder in the [geocoder] config section or check its endpoint"),
        DevmapError::ConfigError { .. } | DevmapError::TomlError(_) => {
            ErrorContext::new(error.clone())
                .with_suggestion("Check the syntax of ~/.devmap/config.toml or the file passed with --config")
        }
        _ => ErrorContext::new(error),
    }
}
