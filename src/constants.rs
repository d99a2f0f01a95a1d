//! Global constants used throughout the devmap codebase.
//!
//! This module contains pacing delays, display budgets, zoom thresholds and
//! other numeric constants that are used across multiple modules. Every value
//! here is the *default*; the effective value comes from
//! [`DevmapConfig`](crate::config::DevmapConfig) so that tests and deployments
//! can tune them without recompiling.

use std::time::Duration;

/// Delay between two sequential batch fetches during zoom-driven expansion (100ms).
///
/// Batches are fetched one at a time; this pause keeps a burst of zoom events
/// from hammering the static data source.
pub const BATCH_PACING_DELAY: Duration = Duration::from_millis(100);

/// Number of batches merged by the initial load before any viewport event.
pub const INITIAL_BATCHES: u32 = 1;

/// Zoom level below which no additional batches are loaded.
pub const MIN_EXPANSION_ZOOM: f64 = 4.0;

/// Additional batches requested per whole zoom level above [`MIN_EXPANSION_ZOOM`].
pub const BATCHES_PER_ZOOM_LEVEL: u32 = 1;

/// Hard ceiling on the number of batches a session will ever load.
pub const MAX_BATCHES: u32 = 20;

/// Fraction of the viewport width/height added on every side before containment tests.
pub const VIEWPORT_PADDING: f64 = 0.15;

/// Maximum number of developers placed on the map by one refresh.
pub const MAP_DISPLAY_BUDGET: usize = 150;

/// Stores smaller than this bypass bounds filtering entirely.
pub const SMALL_DATASET_FLOOR: usize = 100;

/// Display budget used when the small-dataset bypass is active.
pub const SMALL_DATASET_CAP: usize = 200;

/// Number of distinct location strings resolved concurrently in one group.
pub const RESOLVE_GROUP_SIZE: usize = 5;

/// Pause between two resolution groups (200ms).
///
/// Caps the request rate seen by the external lookup service when one is configured.
pub const RESOLVE_GROUP_DELAY: Duration = Duration::from_millis(200);

/// Distance in degrees between consecutive members of a co-located group.
pub const CO_LOCATION_OFFSET_STEP: f64 = 0.0015;

/// Decimal places used when bucketing coordinates to detect co-location.
pub const COORDINATE_KEY_PRECISION: u32 = 3;

/// Maximum number of rows produced by the list view.
pub const LIST_DISPLAY_BUDGET: usize = 50;

/// Latitude of the fixed fallback coordinate used when nothing else matches.
pub const DEFAULT_LATITUDE: f64 = 20.0;

/// Longitude of the fixed fallback coordinate used when nothing else matches.
pub const DEFAULT_LONGITUDE: f64 = 0.0;

/// Minimum interval between two requests to the external geocoder (1 second).
///
/// Public Nominatim instances allow at most one request per second.
pub const GEOCODER_MIN_INTERVAL: Duration = Duration::from_secs(1);

/// Default geocoder endpoint.
pub const DEFAULT_GEOCODER_ENDPOINT: &str = "https://nominatim.openstreetmap.org/search";

/// `User-Agent` sent by every outbound HTTP request.
pub const USER_AGENT: &str = concat!("devmap/", env!("CARGO_PKG_VERSION"));

/// File name of the batch index inside a data source.
pub const INDEX_FILE: &str = "index.json";

/// File name of the consolidated single-file fallback inside a data source.
pub const CONSOLIDATED_FILE: &str = "developers.json";

/// Developers per batch produced by the splitting utility.
pub const DEFAULT_BATCH_SIZE: usize = 100;

/// Conventional file name for batch `index` when the index does not name it.
pub fn batch_file_name(index: u32) -> String {
    format!("batch_{index:03}.json")
}
