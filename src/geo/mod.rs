//! Geographic primitives: coordinates, viewport rectangles and co-location keys.
//!
//! Latitudes and longitudes are plain decimal degrees (WGS84). A
//! [`BoundingRegion`] may cross the antimeridian, in which case its `west`
//! edge is numerically greater than its `east` edge.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::core::DevmapError;

/// A latitude/longitude pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    /// Latitude, -90..=90
    pub lat: f64,
    /// Longitude, -180..=180
    pub lng: f64,
}

impl Coordinates {
    /// Create a coordinate pair.
    #[must_use]
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self {
            lat,
            lng,
        }
    }

    /// Whether both components are finite and inside the valid ranges.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng)
    }

    /// Bucket key used to detect co-location, rounded to `precision` decimals.
    #[must_use]
    pub fn key(&self, precision: u32) -> CoordinateKey {
        let scale = 10f64.powi(precision as i32);
        CoordinateKey {
            lat: (self.lat * scale).round() as i64,
            lng: (self.lng * scale).round() as i64,
        }
    }
}

impl fmt::Display for Coordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.4},{:.4}", self.lat, self.lng)
    }
}

/// Fixed-precision rounding of a [`Coordinates`] value.
///
/// Two developers whose keys are equal are drawn as one co-located group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CoordinateKey {
    lat: i64,
    lng: i64,
}

/// The rectangle currently visible on the map.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingRegion {
    /// Southern edge latitude
    pub south: f64,
    /// Western edge longitude
    pub west: f64,
    /// Northern edge latitude
    pub north: f64,
    /// Eastern edge longitude
    pub east: f64,
}

impl BoundingRegion {
    /// Build a region, rejecting non-finite values and inverted latitudes.
    pub fn new(south: f64, west: f64, north: f64, east: f64) -> Result<Self, DevmapError> {
        let region = Self {
            south,
            west,
            north,
            east,
        };
        region.validate()?;
        Ok(region)
    }

    /// The whole world.
    #[must_use]
    pub const fn world() -> Self {
        Self {
            south: -90.0,
            west: -180.0,
            north: 90.0,
            east: 180.0,
        }
    }

    /// Check that the rectangle can be used for containment tests.
    pub fn validate(&self) -> Result<(), DevmapError> {
        let values = [self.south, self.west, self.north, self.east];
        if values.iter().any(|v| !v.is_finite()) {
            return Err(DevmapError::InvalidBounds {
                reason: "edges must be finite numbers".to_string(),
            });
        }
        if self.south > self.north {
            return Err(DevmapError::InvalidBounds {
                reason: format!("south edge {} is above north edge {}", self.south, self.north),
            });
        }
        if !(-90.0..=90.0).contains(&self.south) || !(-90.0..=90.0).contains(&self.north) {
            return Err(DevmapError::InvalidBounds {
                reason: "latitudes must lie within -90..=90".to_string(),
            });
        }
        Ok(())
    }

    /// Whether the region wraps across the 180th meridian.
    #[must_use]
    pub fn crosses_antimeridian(&self) -> bool {
        self.west > self.east
    }

    /// Width in degrees of longitude, accounting for antimeridian wrap.
    #[must_use]
    pub fn width(&self) -> f64 {
        if self.crosses_antimeridian() {
            (180.0 - self.west) + (self.east + 180.0)
        } else {
            self.east - self.west
        }
    }

    /// Expand every edge by `factor` times the width/height.
    ///
    /// Latitudes are clamped to the poles. A padded width of 360° or more
    /// becomes the full longitude range.
    #[must_use]
    pub fn padded(&self, factor: f64) -> Self {
        let lat_pad = (self.north - self.south) * factor;
        let width = self.width();
        let lng_pad = width * factor;

        let south = (self.south - lat_pad).max(-90.0);
        let north = (self.north + lat_pad).min(90.0);

        if width + 2.0 * lng_pad >= 360.0 {
            return Self {
                south,
                west: -180.0,
                north,
                east: 180.0,
            };
        }

        Self {
            south,
            west: wrap_longitude(self.west - lng_pad),
            north,
            east: wrap_longitude(self.east + lng_pad),
        }
    }

    /// Whether `point` lies inside the rectangle (edges inclusive).
    #[must_use]
    pub fn contains(&self, point: &Coordinates) -> bool {
        if point.lat < self.south || point.lat > self.north {
            return false;
        }
        if self.crosses_antimeridian() {
            point.lng >= self.west || point.lng <= self.east
        } else {
            point.lng >= self.west && point.lng <= self.east
        }
    }
}

impl FromStr for BoundingRegion {
    type Err = DevmapError;

    /// Parse `south,west,north,east`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<f64> = s
            .split(',')
            .map(|p| p.trim().parse::<f64>())
            .collect::<Result<_, _>>()
            .map_err(|e| DevmapError::InvalidBounds {
                reason: format!("'{s}' is not a list of numbers: {e}"),
            })?;

        match parts.as_slice() {
            [south, west, north, east] => Self::new(*south, *west, *north, *east),
            _ => Err(DevmapError::InvalidBounds {
                reason: format!("expected 4 comma-separated values, got {}", parts.len()),
            }),
        }
    }
}

fn wrap_longitude(lng: f64) -> f64 {
    if lng > 180.0 {
        lng - 360.0
    } else if lng < -180.0 {
        lng + 360.0
    } else {
        lng
    }
}
