//! The map session: every piece of per-session state in one owned object.
//!
//! A [`Session`] owns the developer store, the batch loader, the location
//! cache, the current marker set and the view state (map or list, sort key,
//! search query). Its lifecycle is explicit:
//!
//! - [`Session::start`] loads the index and the initial batches. Total data
//!   absence is fatal and reported as [`DevmapError::NoDevelopers`].
//! - [`Session::on_viewport_change`] runs loader → selector → renderer for a new
//!   map viewport. Failures become [`Notice`]s and the previous marker set
//!   stays on display.
//! - [`Session::reset`] clears everything and starts again.
//!
//! # Example
//!
//! ```rust,no_run
//! use devmap::config::DevmapConfig;
//! use devmap::geo::BoundingRegion;
//! use devmap::session::Session;
//! use devmap::source::DirSource;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = DevmapConfig::default();
//! let session = Session::from_config(DirSource::new("./data"), &config)?;
//! session.start().await?;
//!
//! let europe = BoundingRegion::new(35.0, -10.0, 60.0, 30.0)?;
//! let update = session.on_viewport_change(&europe, 5.0).await;
//! println!("{} markers", update.markers.len());
//! # Ok(())
//! # }
//! ```

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{error, info, warn};

use crate::config::DevmapConfig;
use crate::core::DevmapError;
use crate::geo::BoundingRegion;
use crate::loader::{BatchLoader, LoadReport, LoaderSettings};
use crate::location::{Geocoder, LocationResolver, ResolverSettings};
use crate::models::{Developer, SortKey};
use crate::render::{MarkerLayer, MarkerRenderer, MarkerSet, MarkerSettings, list};
use crate::source::DataSource;
use crate::store::DeveloperStore;
use crate::viewport::ViewportSettings;

/// Which presentation is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    #[default]
    Map,
    List,
}

/// Severity of a [`Notice`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

/// A user-visible message.
#[derive(Debug, Clone, Serialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
    pub at: DateTime<Utc>,
}

/// The developer count readout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DeveloperCount {
    /// Markers currently on the map.
    pub shown: usize,
    /// Developers in the store.
    pub total_loaded: usize,
    /// Batches merged so far.
    pub batches_loaded: usize,
    /// Batches the index reports, if known.
    pub total_batches: Option<u32>,
}

/// Result of one viewport change.
#[derive(Debug, Clone)]
pub struct ViewportUpdate {
    /// Batches fetched for the new zoom level.
    pub load: LoadReport,
    /// The marker set now on display.
    pub markers: Arc<MarkerSet>,
    /// Whether a new marker set was committed.
    pub committed: bool,
}

/// Component settings for a session.
#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub loader: LoaderSettings,
    pub viewport: ViewportSettings,
    pub markers: MarkerSettings,
    pub resolver: ResolverSettings,
    pub list_budget: usize,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            loader: LoaderSettings::default(),
            viewport: ViewportSettings::default(),
            markers: MarkerSettings::default(),
            resolver: ResolverSettings::default(),
            list_budget: crate::constants::LIST_DISPLAY_BUDGET,
        }
    }
}

impl SessionSettings {
    /// Derive every component's settings from the configuration file.
    pub fn from_config(config: &DevmapConfig) -> anyhow::Result<Self> {
        Ok(Self {
            loader: config.loader_settings(),
            viewport: config.viewport_settings(),
            markers: config.marker_settings(),
            resolver: config.resolver_settings()?,
            list_budget: config.list.display_budget,
        })
    }
}

#[derive(Debug, Clone, Default)]
struct ViewState {
    mode: ViewMode,
    sort: SortKey,
    query: String,
}

/// One user session; see the module documentation.
pub struct Session<S> {
    loader: BatchLoader<S>,
    store: RwLock<DeveloperStore>,
    resolver: Arc<LocationResolver>,
    renderer: MarkerRenderer,
    layer: MarkerLayer,
    viewport: ViewportSettings,
    list_budget: usize,
    view: ViewState,
    notices: Mutex<Vec<Notice>>,
}

impl<S: DataSource> Session<S> {
    /// Create a session over `source`.
    pub fn new(
        source: S,
        settings: SessionSettings,
        geocoder: Option<Arc<dyn Geocoder>>,
    ) -> Result<Self, DevmapError> {
        let mut resolver = LocationResolver::new(settings.resolver)?;
        if let Some(geocoder) = geocoder {
            resolver = resolver.with_geocoder(geocoder);
        }
        let resolver = Arc::new(resolver);

        Ok(Self {
            loader: BatchLoader::new(source, settings.loader),
            store: RwLock::new(DeveloperStore::new()),
            renderer: MarkerRenderer::new(Arc::clone(&resolver), settings.markers),
            resolver,
            layer: MarkerLayer::new(),
            viewport: settings.viewport,
            list_budget: settings.list_budget,
            view: ViewState::default(),
            notices: Mutex::new(Vec::new()),
        })
    }

    /// Create a session configured from `config`, including its geocoder.
    pub fn from_config(source: S, config: &DevmapConfig) -> anyhow::Result<Self> {
        let settings = SessionSettings::from_config(config)?;
        Ok(Self::new(source, settings, config.geocoder()?)?)
    }

    /// Load the index and the initial batches.
    pub async fn start(&self) -> Result<LoadReport, DevmapError> {
        match self.loader.initial_load(&self.store).await {
            Ok(report) => {
                info!("Session started with {} developer(s)", self.store.read().await.len());
                if report.used_fallback {
                    self.notify(NoticeLevel::Info, "Loaded developers from the consolidated data file")
                        .await;
                }
                Ok(report)
            }
            Err(e) => {
                error!("Session start failed: {}", e);
                self.notify(NoticeLevel::Error, e.to_string()).await;
                Err(e)
            }
        }
    }

    /// React to a new map viewport: maybe load more batches, then rebuild the markers.
    pub async fn on_viewport_change(&self, bounds: &BoundingRegion, zoom: f64) -> ViewportUpdate {
        let load = self.loader.load_for_zoom(zoom, &self.store).await;
        if !load.failed.is_empty() {
            self.notify(
                NoticeLevel::Warning,
                format!("{} batch(es) could not be loaded and were skipped", load.failed.len()),
            )
            .await;
        }

        match self.renderer.refresh(bounds, &self.store, &self.viewport, &self.layer).await {
            Ok(markers) => ViewportUpdate {
                load,
                markers,
                committed: true,
            },
            Err(e) => {
                warn!("Marker refresh failed, keeping previous markers: {}", e);
                self.notify(NoticeLevel::Error, format!("Could not update the map: {e}")).await;
                ViewportUpdate {
                    load,
                    markers: self.layer.current().await,
                    committed: false,
                }
            }
        }
    }

    /// Clear all in-memory state and start again.
    pub async fn reset(&self) -> Result<LoadReport, DevmapError> {
        info!("Resetting session");
        // Loader first, so a batch still in flight is discarded rather than merged.
        self.loader.reset().await;
        self.store.write().await.clear();
        self.resolver.clear();
        self.layer.clear().await;
        self.notices.lock().await.clear();
        self.start().await
    }

    /// Switch between map and list; returns the new mode.
    pub fn toggle_view(&mut self) -> ViewMode {
        self.view.mode = match self.view.mode {
            ViewMode::Map => ViewMode::List,
            ViewMode::List => ViewMode::Map,
        };
        self.view.mode
    }

    #[must_use]
    pub fn view_mode(&self) -> ViewMode {
        self.view.mode
    }

    pub fn set_sort(&mut self, sort: SortKey) {
        self.view.sort = sort;
    }

    pub fn set_query(&mut self, query: impl Into<String>) {
        self.view.query = query.into();
    }

    /// The list view for the current sort key and query.
    pub async fn list(&self) -> Vec<Developer> {
        let store = self.store.read().await;
        list::render(&store, self.view.sort, &self.view.query, self.list_budget)
    }

    /// Developers matching the current query, before the list budget is applied.
    pub async fn list_matches(&self) -> usize {
        list::count_matches(&*self.store.read().await, &self.view.query)
    }

    /// The developer count readout.
    pub async fn status(&self) -> DeveloperCount {
        let shown = self.layer.current().await.len();
        let total_loaded = self.store.read().await.len();
        DeveloperCount {
            shown,
            total_loaded,
            batches_loaded: self.loader.loaded_count().await,
            total_batches: self.loader.total_batches().await,
        }
    }

    /// The marker set currently on display.
    pub async fn markers(&self) -> Arc<MarkerSet> {
        self.layer.current().await
    }

    /// Notices raised so far, oldest first.
    pub async fn notices(&self) -> Vec<Notice> {
        self.notices.lock().await.clone()
    }

    #[must_use]
    pub fn resolver(&self) -> &LocationResolver {
        &self.resolver
    }

    async fn notify(&self, level: NoticeLevel, message: impl Into<String>) {
        self.notices.lock().await.push(Notice {
            level,
            message: message.into(),
            at: Utc::now(),
        });
    }
}
