//! Static batch data sources.
//!
//! The collection step publishes developers as a set of static JSON files:
//!
//! ```text
//! <location>/
//! ├── index.json          # BatchIndex: totals and per-batch summaries
//! ├── batch_000.json      # BatchFile, one per batch (name may come from the index)
//! ├── batch_001.json
//! └── developers.json     # consolidated fallback: every developer in one file
//! ```
//!
//! The same layout can live in a local directory ([`DirSource`]) or behind an
//! HTTP base URL ([`HttpSource`]). [`Source::open`] picks one from a location
//! string.
//!
//! Every fetch reports a missing file as [`DevmapError::ResourceNotFound`] so the
//! loader can tell "not found" apart from transport failures and malformed data.

use serde::de::DeserializeOwned;
use std::future::Future;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::constants::{CONSOLIDATED_FILE, INDEX_FILE, USER_AGENT, batch_file_name};
use crate::core::DevmapError;
use crate::models::{BatchFile, BatchIndex, ConsolidatedFile, Developer};

/// A provider of the index, batch and consolidated resources.
pub trait DataSource: Send + Sync {
    /// Human readable location, used in logs and errors.
    fn location(&self) -> String;

    /// Fetch and decode the batch index.
    fn fetch_index(&self) -> impl Future<Output = Result<BatchIndex, DevmapError>> + Send;

    /// Fetch batch `index`.
    ///
    /// `filename` is the name recorded in the index, if known; otherwise the
    /// conventional `batch_NNN.json` name is used.
    fn fetch_batch(
        &self,
        index: u32,
        filename: Option<&str>,
    ) -> impl Future<Output = Result<BatchFile, DevmapError>> + Send;

    /// Fetch the single-file fallback holding every developer.
    fn fetch_consolidated(&self) -> impl Future<Output = Result<Vec<Developer>, DevmapError>> + Send;
}

/// Resolve the file name for a batch, ignoring any directory part of an index hint.
fn batch_resource(index: u32, filename: Option<&str>) -> String {
    filename
        .and_then(|name| Path::new(name).file_name())
        .and_then(|name| name.to_str())
        .map_or_else(|| batch_file_name(index), str::to_string)
}

fn decode<T: DeserializeOwned>(resource: &str, bytes: &[u8]) -> Result<T, DevmapError> {
    serde_json::from_slice(bytes).map_err(|e| DevmapError::DataParseError {
        resource: resource.to_string(),
        reason: e.to_string(),
    })
}

/// Data files in a local directory.
#[derive(Debug, Clone)]
pub struct DirSource {
    root: PathBuf,
}

impl DirSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
        }
    }

    async fn read_json<T: DeserializeOwned>(&self, name: &str) -> Result<T, DevmapError> {
        let path = self.root.join(name);
        let shown = path.display().to_string();
        debug!("Reading {}", shown);

        let bytes = tokio::fs::read(&path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                DevmapError::ResourceNotFound {
                    resource: shown.clone(),
                }
            } else {
                DevmapError::NetworkError {
                    resource: shown.clone(),
                    reason: e.to_string(),
                }
            }
        })?;

        decode(&shown, &bytes)
    }
}

impl DataSource for DirSource {
    fn location(&self) -> String {
        self.root.display().to_string()
    }

    async fn fetch_index(&self) -> Result<BatchIndex, DevmapError> {
        self.read_json(INDEX_FILE).await
    }

    async fn fetch_batch(&self, index: u32, filename: Option<&str>) -> Result<BatchFile, DevmapError> {
        self.read_json(&batch_resource(index, filename)).await
    }

    async fn fetch_consolidated(&self) -> Result<Vec<Developer>, DevmapError> {
        let file: ConsolidatedFile = self.read_json(CONSOLIDATED_FILE).await?;
        Ok(file.into_developers())
    }
}

/// Data files served relative to an HTTP(S) base URL.
#[derive(Debug, Clone)]
pub struct HttpSource {
    client: reqwest::Client,
    base_url: String,
}

impl HttpSource {
    pub fn new(base_url: impl Into<String>) -> Result<Self, DevmapError> {
        let client = reqwest::Client::builder().user_agent(USER_AGENT).build().map_err(|e| {
            DevmapError::ConfigError {
                message: format!("failed to build HTTP client: {e}"),
            }
        })?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn url_for(&self, name: &str) -> String {
        format!("{}/{}", self.base_url, name)
    }

    async fn get_json<T: DeserializeOwned>(&self, name: &str) -> Result<T, DevmapError> {
        let url = self.url_for(name);
        debug!("Fetching {}", url);

        let network_error = |e: reqwest::Error| DevmapError::NetworkError {
            resource: url.clone(),
            reason: e.to_string(),
        };

        let response = self.client.get(&url).send().await.map_err(network_error)?;
        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(DevmapError::ResourceNotFound {
                resource: url,
            });
        }
        if !status.is_success() {
            return Err(DevmapError::NetworkError {
                resource: url,
                reason: format!("HTTP {status}"),
            });
        }

        let bytes = response.bytes().await.map_err(network_error)?;
        decode(&url, &bytes)
    }
}

impl DataSource for HttpSource {
    fn location(&self) -> String {
        self.base_url.clone()
    }

    async fn fetch_index(&self) -> Result<BatchIndex, DevmapError> {
        self.get_json(INDEX_FILE).await
    }

    async fn fetch_batch(&self, index: u32, filename: Option<&str>) -> Result<BatchFile, DevmapError> {
        self.get_json(&batch_resource(index, filename)).await
    }

    async fn fetch_consolidated(&self) -> Result<Vec<Developer>, DevmapError> {
        let file: ConsolidatedFile = self.get_json(CONSOLIDATED_FILE).await?;
        Ok(file.into_developers())
    }
}

/// A source chosen at runtime from a location string.
#[derive(Debug, Clone)]
pub enum Source {
    Dir(DirSource),
    Http(HttpSource),
}

impl Source {
    /// `http://` and `https://` locations use [`HttpSource`]; anything else is a directory.
    pub fn open(location: &str) -> Result<Self, DevmapError> {
        let trimmed = location.trim();
        if trimmed.is_empty() {
            return Err(DevmapError::ConfigError {
                message: "no data source configured; pass --source or set [source] location".to_string(),
            });
        }

        if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
            Ok(Self::Http(HttpSource::new(trimmed)?))
        } else {
            Ok(Self::Dir(DirSource::new(trimmed)))
        }
    }
}

impl DataSource for Source {
    fn location(&self) -> String {
        match self {
            Self::Dir(source) => source.location(),
            Self::Http(source) => source.location(),
        }
    }

    async fn fetch_index(&self) -> Result<BatchIndex, DevmapError> {
        match self {
            Self::Dir(source) => source.fetch_index().await,
            Self::Http(source) => source.fetch_index().await,
        }
    }

    async fn fetch_batch(&self, index: u32, filename: Option<&str>) -> Result<BatchFile, DevmapError> {
        match self {
            Self::Dir(source) => source.fetch_batch(index, filename).await,
            Self::Http(source) => source.fetch_batch(index, filename).await,
        }
    }

    async fn fetch_consolidated(&self) -> Result<Vec<Developer>, DevmapError> {
        match self {
            Self::Dir(source) => source.fetch_consolidated().await,
            Self::Http(source) => source.fetch_consolidated().await,
        }
    }
}
