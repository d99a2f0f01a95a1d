//! Location resolution: free-text location strings to map coordinates.
//!
//! Developers describe where they live in free text ("SF", "Berlin, Germany",
//! "somewhere in Europe"). The [`LocationResolver`] turns such text into a
//! [`Coordinates`] pair with a layered strategy:
//!
//! 1. **Cache** - an exact-string hit returns the stored result, no further work
//! 2. **Known places** - normalized text is matched against the metro, city and
//!    region tables (see [`tables`]), in that order; first match wins
//! 3. **External lookup** - only on the async path and only if a [`Geocoder`]
//!    is configured
//! 4. **Fallback** - a continent named in the text, otherwise one fixed default
//!    coordinate (or an explicit [`Resolution::Unresolved`] when the default is
//!    disabled)
//!
//! Every outcome, including the fallback, is cached before it is returned, so
//! each distinct string is resolved at most once per session. Blank input is
//! answered with [`Resolution::Unresolved`] immediately and never cached.
//!
//! # Concurrency
//!
//! The cache is a [`DashMap`]. Results are stored with `entry().or_insert()`,
//! so when two resolutions of the same string race across an external lookup
//! the first stored result wins and both callers see it.
//!
//! # Examples
//!
//! ```rust,no_run
//! use devmap::location::{LocationResolver, ResolverSettings};
//!
//! # fn example() -> Result<(), devmap::core::DevmapError> {
//! let resolver = LocationResolver::new(ResolverSettings::default())?;
//! let sf = resolver.resolve("San Francisco, CA");
//! assert_eq!(sf.coordinates(), resolver.resolve("bay area").coordinates());
//! # Ok(())
//! # }
//! ```

pub mod geocoder;
pub mod tables;

use dashmap::DashMap;
use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, warn};

use crate::core::DevmapError;
use crate::geo::Coordinates;

pub use geocoder::{Geocoder, NominatimGeocoder};
pub use tables::{PlaceTables, TableKind, normalize};

/// Where a resolved coordinate came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchTier {
    Metro,
    City,
    Region,
    Geocoder,
    Continent,
    Default,
}

impl From<TableKind> for MatchTier {
    fn from(kind: TableKind) -> Self {
        match kind {
            TableKind::Metro => Self::Metro,
            TableKind::City => Self::City,
            TableKind::Region => Self::Region,
            TableKind::Continent => Self::Continent,
        }
    }
}

/// A successful resolution.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedPlace {
    pub coordinates: Coordinates,
    pub tier: MatchTier,
    /// Canonical name of the matched place
    pub place: String,
}

/// Outcome of resolving one location string.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum Resolution {
    Resolved(ResolvedPlace),
    Unresolved,
}

impl Resolution {
    /// The coordinates, if resolved.
    #[must_use]
    pub fn coordinates(&self) -> Option<Coordinates> {
        match self {
            Self::Resolved(place) => Some(place.coordinates),
            Self::Unresolved => None,
        }
    }

    /// The tier, if resolved.
    #[must_use]
    pub fn tier(&self) -> Option<MatchTier> {
        match self {
            Self::Resolved(place) => Some(place.tier),
            Self::Unresolved => None,
        }
    }
}

/// How the resolver behaves once every table has missed.
#[derive(Debug, Clone)]
pub struct ResolverSettings {
    /// Answer misses with `default_coordinates` instead of `Unresolved`.
    pub fallback_to_default: bool,
    /// The fixed last-resort coordinate.
    pub default_coordinates: Coordinates,
    /// Replacement place tables; the embedded ones when `None`.
    pub tables: Option<PlaceTables>,
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self {
            fallback_to_default: true,
            default_coordinates: Coordinates::new(
                crate::constants::DEFAULT_LATITUDE,
                crate::constants::DEFAULT_LONGITUDE,
            ),
            tables: None,
        }
    }
}

/// Counters describing how much work the resolver has done.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ResolverStats {
    /// Calls answered straight from the cache
    pub cache_hits: u64,
    /// Scans of the metro/city/region tables
    pub table_scans: u64,
    /// Requests sent to the external geocoder
    pub external_lookups: u64,
    /// Distinct strings currently cached
    pub entries: usize,
}

/// Memoizing location resolver; see the module documentation.
pub struct LocationResolver {
    tables: PlaceTables,
    settings: ResolverSettings,
    geocoder: Option<Arc<dyn Geocoder>>,
    cache: DashMap<String, Resolution>,
    cache_hits: AtomicU64,
    table_scans: AtomicU64,
    external_lookups: AtomicU64,
}

impl LocationResolver {
    /// Create a resolver without an external geocoder.
    pub fn new(mut settings: ResolverSettings) -> Result<Self, DevmapError> {
        let tables = match settings.tables.take() {
            Some(tables) => tables,
            None => PlaceTables::builtin()?,
        };

        Ok(Self {
            tables,
            settings,
            geocoder: None,
            cache: DashMap::new(),
            cache_hits: AtomicU64::new(0),
            table_scans: AtomicU64::new(0),
            external_lookups: AtomicU64::new(0),
        })
    }

    /// Attach an external geocoder consulted by [`resolve_async`](Self::resolve_async).
    #[must_use]
    pub fn with_geocoder(mut self, geocoder: Arc<dyn Geocoder>) -> Self {
        self.geocoder = Some(geocoder);
        self
    }

    /// Resolve using the cache and local tables only.
    pub fn resolve(&self, location: &str) -> Resolution {
        if location.trim().is_empty() {
            return Resolution::Unresolved;
        }
        if let Some(hit) = self.cached(location) {
            return hit;
        }

        let normalized = normalize(location);
        let resolution =
            self.match_tables(&normalized).unwrap_or_else(|| self.fallback(&normalized));
        self.store(location, resolution)
    }

    /// Resolve using the cache, local tables and, if configured, the external geocoder.
    ///
    /// Geocoder failures are logged and treated as a miss.
    pub async fn resolve_async(&self, location: &str) -> Resolution {
        if location.trim().is_empty() {
            return Resolution::Unresolved;
        }
        if let Some(hit) = self.cached(location) {
            return hit;
        }

        let normalized = normalize(location);
        if let Some(resolution) = self.match_tables(&normalized) {
            return self.store(location, resolution);
        }

        if let Some(geocoder) = &self.geocoder {
            self.external_lookups.fetch_add(1, Ordering::Relaxed);
            match geocoder.lookup(location).await {
                Ok(Some(coordinates)) => {
                    let resolution = Resolution::Resolved(ResolvedPlace {
                        coordinates,
                        tier: MatchTier::Geocoder,
                        place: location.trim().to_string(),
                    });
                    return self.store(location, resolution);
                }
                Ok(None) => debug!("Geocoder has no match for '{}'", location),
                Err(e) => warn!("Geocoder lookup failed for '{}': {}", location, e),
            }

            // Another task may have stored this string while we were waiting.
            if let Some(hit) = self.cached(location) {
                return hit;
            }
        }

        let resolution = self.fallback(&normalized);
        self.store(location, resolution)
    }

    /// Cached result for an exact string, without resolving it.
    #[must_use]
    pub fn peek(&self, location: &str) -> Option<Resolution> {
        self.cache.get(location).map(|entry| entry.value().clone())
    }

    /// Work counters.
    #[must_use]
    pub fn stats(&self) -> ResolverStats {
        ResolverStats {
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            table_scans: self.table_scans.load(Ordering::Relaxed),
            external_lookups: self.external_lookups.load(Ordering::Relaxed),
            entries: self.cache.len(),
        }
    }

    /// Drop every cached result and reset the counters.
    pub fn clear(&self) {
        self.cache.clear();
        self.cache_hits.store(0, Ordering::Relaxed);
        self.table_scans.store(0, Ordering::Relaxed);
        self.external_lookups.store(0, Ordering::Relaxed);
    }

    fn cached(&self, location: &str) -> Option<Resolution> {
        let hit = self.peek(location)?;
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
        Some(hit)
    }

    fn store(&self, location: &str, resolution: Resolution) -> Resolution {
        self.cache.entry(location.to_string()).or_insert(resolution).value().clone()
    }

    fn match_tables(&self, normalized: &str) -> Option<Resolution> {
        self.table_scans.fetch_add(1, Ordering::Relaxed);
        let (kind, place) = self.tables.find_place(normalized)?;
        debug!("Matched '{}' to {} ({:?} table)", normalized, place.name, kind);
        Some(Resolution::Resolved(ResolvedPlace {
            coordinates: place.coordinates,
            tier: kind.into(),
            place: place.name.clone(),
        }))
    }

    fn fallback(&self, normalized: &str) -> Resolution {
        if let Some(place) = self.tables.find_continent(normalized) {
            return Resolution::Resolved(ResolvedPlace {
                coordinates: place.coordinates,
                tier: MatchTier::Continent,
                place: place.name.clone(),
            });
        }

        if self.settings.fallback_to_default {
            debug!("No place matched '{}', using default coordinate", normalized);
            Resolution::Resolved(ResolvedPlace {
                coordinates: self.settings.default_coordinates,
                tier: MatchTier::Default,
                place: "default".to_string(),
            })
        } else {
            debug!("No place matched '{}', marking unresolved", normalized);
            Resolution::Unresolved
        }
    }
}
