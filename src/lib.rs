//! devmap - progressive loading and map rendering of developer directories
//!
//! devmap loads publicly listed developers from a static batch data source,
//! resolves their free-text locations to coordinates and decides which of
//! them to draw for the current map viewport. It ships as a library and as the
//! `devmap` command-line tool.
//!
//! # Pipeline
//!
//! ```text
//! viewport change (bounds, zoom)
//!     │
//!     ├─► loader    fetch more batches if the zoom level calls for them
//!     ├─► viewport  pick the most followed developers inside the padded bounds
//!     └─► render    resolve missing locations, fan out co-located markers,
//!                   swap the marker set in one step
//! ```
//!
//! The list view runs beside the map and ignores the viewport: it filters the
//! whole store by a query and ranks it by a chosen metric.
//!
//! # Modules
//!
//! - [`session`] - owns all per-session state; start, viewport change, reset
//! - [`loader`] - batch bookkeeping, zoom-driven expansion, consolidated fallback
//! - [`location`] - cached, tiered resolution of location strings
//! - [`viewport`] - bounds filtering, ranking and display budget
//! - [`render`] - marker construction and the list view
//! - [`store`] - the deduplicated developer collection
//! - [`source`] - local directory and HTTP data sources
//! - [`split`] - produce batch files from one consolidated file
//! - [`models`], [`geo`] - data types
//! - [`config`], [`core`], [`constants`] - configuration, errors, defaults
//! - [`cli`] - the command-line front end
//!
//! # Data Layout
//!
//! ```text
//! data/
//! ├── index.json        # { total_developers, total_batches, batches: [...] }
//! ├── batch_000.json    # { batch_index, generated_at, developers: [...] }
//! ├── batch_001.json
//! └── developers.json   # fallback: every developer in one file
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use devmap::config::DevmapConfig;
//! use devmap::geo::BoundingRegion;
//! use devmap::session::Session;
//! use devmap::source::Source;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = DevmapConfig::load_with_optional(None).await?;
//! let session = Session::from_config(Source::open("./data")?, &config)?;
//! session.start().await?;
//!
//! let bay_area: BoundingRegion = "37.2,-122.6,38.0,-121.7".parse()?;
//! let update = session.on_viewport_change(&bay_area, 9.0).await;
//! println!("{}", update.markers.to_geojson());
//! # Ok(())
//! # }
//! ```

// Core functionality modules
pub mod cli;
pub mod config;
pub mod constants;
pub mod core;

// Data model
pub mod geo;
pub mod models;
pub mod store;

// Loading pipeline
pub mod loader;
pub mod location;
pub mod render;
pub mod session;
pub mod source;
pub mod viewport;

// Supporting modules
pub mod split;
pub mod utils;

// test_utils module is available for both unit tests and integration tests
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
