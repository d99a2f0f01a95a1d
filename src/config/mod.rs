//! Configuration management for devmap
//!
//! devmap reads an optional TOML file, by default `~/.devmap/config.toml`
//! (`%LOCALAPPDATA%\devmap\config.toml` on Windows), or the file named by the
//! global `--config` flag. A missing file means "all defaults"; every key is
//! optional and unknown keys are ignored.
//!
//! # Example
//!
//! ```toml
//! [source]
//! location = "https://example.com/devmap-data"
//!
//! [loader]
//! initial_batches = 2
//! min_zoom = 4.0
//! batches_per_zoom_level = 1
//! max_batches = 20
//! batch_delay_ms = 100
//!
//! [viewport]
//! padding = 0.15
//! display_budget = 150
//! small_dataset_floor = 100
//! small_dataset_cap = 200
//!
//! [markers]
//! resolve_group_size = 5
//! group_delay_ms = 200
//! offset_step = 0.0015
//! coordinate_precision = 3
//!
//! [list]
//! display_budget = 50
//!
//! [resolver]
//! fallback_to_default = true
//! default_latitude = 20.0
//! default_longitude = 0.0
//! # places_file = "/path/to/places.toml"
//!
//! [geocoder]
//! enabled = false
//! endpoint = "https://nominatim.openstreetmap.org/search"
//! min_interval_ms = 1000
//! ```
//!
//! The typed settings each component consumes are derived from this file with
//! [`DevmapConfig::loader_settings`], [`DevmapConfig::viewport_settings`],
//! [`DevmapConfig::marker_settings`] and [`DevmapConfig::resolver_settings`].

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::fs;

use crate::constants;
use crate::geo::Coordinates;
use crate::loader::LoaderSettings;
use crate::location::{Geocoder, NominatimGeocoder, PlaceTables, ResolverSettings};
use crate::render::MarkerSettings;
use crate::viewport::ViewportSettings;

/// Top-level configuration file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DevmapConfig {
    pub source: SourceConfig,
    pub loader: LoaderConfig,
    pub viewport: ViewportConfig,
    pub markers: MarkersConfig,
    pub list: ListConfig,
    pub resolver: ResolverConfig,
    pub geocoder: GeocoderConfig,
}

/// `[source]`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Directory or `http(s)://` base URL holding the data files.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

/// `[loader]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    pub initial_batches: u32,
    pub min_zoom: f64,
    pub batches_per_zoom_level: u32,
    pub max_batches: u32,
    pub batch_delay_ms: u64,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            initial_batches: constants::INITIAL_BATCHES,
            min_zoom: constants::MIN_EXPANSION_ZOOM,
            batches_per_zoom_level: constants::BATCHES_PER_ZOOM_LEVEL,
            max_batches: constants::MAX_BATCHES,
            batch_delay_ms: duration_ms(constants::BATCH_PACING_DELAY),
        }
    }
}

/// `[viewport]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewportConfig {
    pub padding: f64,
    pub display_budget: usize,
    pub small_dataset_floor: usize,
    pub small_dataset_cap: usize,
}

impl Default for ViewportConfig {
    fn default() -> Self {
        Self {
            padding: constants::VIEWPORT_PADDING,
            display_budget: constants::MAP_DISPLAY_BUDGET,
            small_dataset_floor: constants::SMALL_DATASET_FLOOR,
            small_dataset_cap: constants::SMALL_DATASET_CAP,
        }
    }
}

/// `[markers]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkersConfig {
    pub resolve_group_size: usize,
    pub group_delay_ms: u64,
    pub offset_step: f64,
    pub coordinate_precision: u32,
}

impl Default for MarkersConfig {
    fn default() -> Self {
        Self {
            resolve_group_size: constants::RESOLVE_GROUP_SIZE,
            group_delay_ms: duration_ms(constants::RESOLVE_GROUP_DELAY),
            offset_step: constants::CO_LOCATION_OFFSET_STEP,
            coordinate_precision: constants::COORDINATE_KEY_PRECISION,
        }
    }
}

/// `[list]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListConfig {
    pub display_budget: usize,
}

impl Default for ListConfig {
    fn default() -> Self {
        Self {
            display_budget: constants::LIST_DISPLAY_BUDGET,
        }
    }
}

/// `[resolver]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    pub fallback_to_default: bool,
    pub default_latitude: f64,
    pub default_longitude: f64,
    /// Replacement for the built-in place tables.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub places_file: Option<PathBuf>,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            fallback_to_default: true,
            default_latitude: constants::DEFAULT_LATITUDE,
            default_longitude: constants::DEFAULT_LONGITUDE,
            places_file: None,
        }
    }
}

/// `[geocoder]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeocoderConfig {
    pub enabled: bool,
    pub endpoint: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    pub min_interval_ms: u64,
}

impl Default for GeocoderConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: constants::DEFAULT_GEOCODER_ENDPOINT.to_string(),
            user_agent: None,
            min_interval_ms: duration_ms(constants::GEOCODER_MIN_INTERVAL),
        }
    }
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

impl DevmapConfig {
    /// Load from an optional path, falling back to the default location.
    ///
    /// A file that does not exist yields the default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub async fn load_with_optional(path: Option<PathBuf>) -> Result<Self> {
        let path = match path {
            Some(path) => path,
            None => match Self::default_path() {
                Ok(path) => path,
                Err(_) => return Ok(Self::default()),
            },
        };

        if path.exists() {
            Self::load_from(&path).await
        } else {
            tracing::debug!("No config file at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    /// Load from a specific file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or contains invalid TOML.
    pub async fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config from {}", path.display()))?;

        toml::from_str(&content).with_context(|| format!("Failed to parse config from {}", path.display()))
    }

    /// Write the configuration as pretty TOML, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory or file cannot be written.
    pub async fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await.with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(path, content)
            .await
            .with_context(|| format!("Failed to write config to {}", path.display()))
    }

    /// Platform default location of the configuration file.
    ///
    /// # Errors
    ///
    /// Returns an error if the home (or local data) directory cannot be determined.
    pub fn default_path() -> Result<PathBuf> {
        let config_dir = if cfg!(target_os = "windows") {
            dirs::data_local_dir()
                .ok_or_else(|| anyhow::anyhow!("Unable to determine local data directory"))?
                .join("devmap")
        } else {
            dirs::home_dir()
                .ok_or_else(|| anyhow::anyhow!("Unable to determine home directory"))?
                .join(".devmap")
        };

        Ok(config_dir.join("config.toml"))
    }

    #[must_use]
    pub fn loader_settings(&self) -> LoaderSettings {
        LoaderSettings {
            initial_batches: self.loader.initial_batches,
            min_zoom: self.loader.min_zoom,
            batches_per_zoom_level: self.loader.batches_per_zoom_level,
            max_batches: self.loader.max_batches,
            batch_delay: Duration::from_millis(self.loader.batch_delay_ms),
        }
    }

    #[must_use]
    pub fn viewport_settings(&self) -> ViewportSettings {
        ViewportSettings {
            padding: self.viewport.padding,
            display_budget: self.viewport.display_budget,
            small_dataset_floor: self.viewport.small_dataset_floor,
            small_dataset_cap: self.viewport.small_dataset_cap,
        }
    }

    #[must_use]
    pub fn marker_settings(&self) -> MarkerSettings {
        MarkerSettings {
            group_size: self.markers.resolve_group_size,
            group_delay: Duration::from_millis(self.markers.group_delay_ms),
            offset_step: self.markers.offset_step,
            coordinate_precision: self.markers.coordinate_precision,
        }
    }

    /// Resolver settings, loading the replacement place tables if one is configured.
    ///
    /// # Errors
    ///
    /// Returns an error if the default coordinate is invalid or the places file
    /// cannot be loaded.
    pub fn resolver_settings(&self) -> Result<ResolverSettings> {
        let default_coordinates =
            Coordinates::new(self.resolver.default_latitude, self.resolver.default_longitude);
        if !default_coordinates.is_valid() {
            anyhow::bail!(crate::core::DevmapError::ConfigError {
                message: format!("[resolver] default coordinate {default_coordinates} is out of range"),
            });
        }

        let tables = match &self.resolver.places_file {
            Some(path) => Some(
                PlaceTables::load_from(path)
                    .with_context(|| format!("Failed to load place tables from {}", path.display()))?,
            ),
            None => None,
        };

        Ok(ResolverSettings {
            fallback_to_default: self.resolver.fallback_to_default,
            default_coordinates,
            tables,
        })
    }

    /// The external geocoder, when enabled.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn geocoder(&self) -> Result<Option<Arc<dyn Geocoder>>> {
        if !self.geocoder.enabled {
            return Ok(None);
        }

        let geocoder: Arc<dyn Geocoder> = Arc::new(NominatimGeocoder::new(
            self.geocoder.endpoint.clone(),
            self.geocoder.user_agent.as_deref(),
            Duration::from_millis(self.geocoder.min_interval_ms),
        )?);
        Ok(Some(geocoder))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_missing_file_gives_defaults() {
        let temp = TempDir::new().unwrap();
        let config =
            DevmapConfig::load_with_optional(Some(temp.path().join("missing.toml"))).await.unwrap();
        assert_eq!(config, DevmapConfig::default());
        assert_eq!(config.viewport.display_budget, 150);
        assert_eq!(config.loader.batch_delay_ms, 100);
        assert!(!config.geocoder.enabled);
    }

    #[tokio::test]
    async fn test_partial_file_keeps_other_defaults() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        tokio::fs::write(
            &path,
            r#"
            [source]
            location = "/srv/devmap"

            [loader]
            max_batches = 5

            [unknown_section]
            anything = true
            "#,
        )
        .await
        .unwrap();

        let config = DevmapConfig::load_from(&path).await.unwrap();
        assert_eq!(config.source.location.as_deref(), Some("/srv/devmap"));
        assert_eq!(config.loader.max_batches, 5);
        assert_eq!(config.loader.initial_batches, 1);
        assert_eq!(config.markers.resolve_group_size, 5);
    }

    #[tokio::test]
    async fn test_save_load_round_trip() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested").join("config.toml");

        let mut config = DevmapConfig::default();
        config.list.display_budget = 25;
        config.resolver.fallback_to_default = false;
        config.save_to(&path).await.unwrap();

        let loaded = DevmapConfig::load_from(&path).await.unwrap();
        assert_eq!(loaded, config);
    }

    #[tokio::test]
    async fn test_invalid_toml_is_an_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        tokio::fs::write(&path, "[loader\nmax_batches = ").await.unwrap();
        assert!(DevmapConfig::load_from(&path).await.is_err());
    }

    #[test]
    fn test_settings_conversion() {
        let mut config = DevmapConfig::default();
        config.markers.group_delay_ms = 0;
        config.loader.batch_delay_ms = 0;

        assert!(config.marker_settings().group_delay.is_zero());
        assert!(config.loader_settings().batch_delay.is_zero());
        assert_eq!(config.viewport_settings().small_dataset_floor, 100);

        let resolver = config.resolver_settings().unwrap();
        assert_eq!(resolver.default_coordinates, Coordinates::new(20.0, 0.0));
        assert!(config.geocoder().unwrap().is_none());

        config.resolver.default_latitude = 120.0;
        assert!(config.resolver_settings().is_err());
    }
}
