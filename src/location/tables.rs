//! Known-place tables used by the location resolver.
//!
//! The tables are static configuration data rather than logic. The built-in
//! set ships as `data/places.toml` and is embedded in the binary; a replacement
//! file can be supplied through the `[resolver] places_file` configuration key.
//!
//! Each table is an ordered list of `{ name, patterns, lat, lng }` entries.
//! Order is significant: the first entry whose pattern occurs in the location
//! text wins, and tables are consulted from the most specific (metros) to the
//! broadest (continents).
//!
//! "Occurs" means contained on token boundaries, not as a raw substring: a
//! pattern must not be glued to other letters or digits on either side, so
//! `"sf"` does not fire inside `"transfer"`. The flip side is that run-together
//! or inflected text such as `"SanFrancisco"` or `"Berliner"` does not match
//! `"san francisco"` or `"berlin"`; list such spellings as extra patterns.

use regex::Regex;
use serde::Deserialize;
use std::path::Path;

use crate::core::DevmapError;
use crate::geo::Coordinates;

const BUILTIN_PLACES: &str = include_str!("../../data/places.toml");

/// One row of a place table as written in TOML.
#[derive(Debug, Clone, Deserialize)]
pub struct PlaceEntry {
    /// Canonical place name reported back to callers
    pub name: String,
    /// Aliases/substrings that identify the place
    pub patterns: Vec<String>,
    /// Latitude of the place
    pub lat: f64,
    /// Longitude of the place
    pub lng: f64,
}

#[derive(Debug, Deserialize)]
struct PlaceFile {
    #[serde(default)]
    metros: Vec<PlaceEntry>,
    #[serde(default)]
    cities: Vec<PlaceEntry>,
    #[serde(default)]
    regions: Vec<PlaceEntry>,
    #[serde(default)]
    continents: Vec<PlaceEntry>,
}

/// A place entry with its patterns compiled into one matcher.
#[derive(Debug, Clone)]
pub struct CompiledPlace {
    pub name: String,
    pub coordinates: Coordinates,
    matcher: Regex,
}

impl CompiledPlace {
    fn compile(entry: PlaceEntry) -> Result<Self, DevmapError> {
        let coordinates = Coordinates::new(entry.lat, entry.lng);
        if !coordinates.is_valid() {
            return Err(DevmapError::ConfigError {
                message: format!("place '{}' has invalid coordinates {coordinates}", entry.name),
            });
        }

        let alternatives: Vec<String> = entry
            .patterns
            .iter()
            .map(|p| normalize(p))
            .filter(|p| !p.is_empty())
            .map(|p| regex::escape(&p))
            .collect();
        if alternatives.is_empty() {
            return Err(DevmapError::ConfigError {
                message: format!("place '{}' has no patterns", entry.name),
            });
        }

        // A pattern must not be glued to other letters or digits on either side.
        let source = format!(r"(?:^|[^\p{{L}}\p{{N}}])(?:{})(?:[^\p{{L}}\p{{N}}]|$)", alternatives.join("|"));
        let matcher = Regex::new(&source).map_err(|e| DevmapError::ConfigError {
            message: format!("place '{}' produced an invalid matcher: {e}", entry.name),
        })?;

        Ok(Self {
            name: entry.name,
            coordinates,
            matcher,
        })
    }

    /// Whether this place occurs in already-normalized text.
    #[must_use]
    pub fn matches(&self, normalized: &str) -> bool {
        self.matcher.is_match(normalized)
    }
}

/// Which table produced a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TableKind {
    Metro,
    City,
    Region,
    Continent,
}

/// All place tables, compiled and in lookup order.
#[derive(Debug, Clone)]
pub struct PlaceTables {
    metros: Vec<CompiledPlace>,
    cities: Vec<CompiledPlace>,
    regions: Vec<CompiledPlace>,
    continents: Vec<CompiledPlace>,
}

impl PlaceTables {
    /// The tables embedded in the binary.
    pub fn builtin() -> Result<Self, DevmapError> {
        Self::from_toml(BUILTIN_PLACES)
    }

    /// Parse tables from TOML text.
    pub fn from_toml(content: &str) -> Result<Self, DevmapError> {
        let file: PlaceFile = toml::from_str(content)?;
        let compile = |entries: Vec<PlaceEntry>| {
            entries.into_iter().map(CompiledPlace::compile).collect::<Result<Vec<_>, _>>()
        };

        Ok(Self {
            metros: compile(file.metros)?,
            cities: compile(file.cities)?,
            regions: compile(file.regions)?,
            continents: compile(file.continents)?,
        })
    }

    /// Read and parse tables from a file.
    pub fn load_from(path: &Path) -> Result<Self, DevmapError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// First match in the metro, city and region tables, in that order.
    #[must_use]
    pub fn find_place(&self, normalized: &str) -> Option<(TableKind, &CompiledPlace)> {
        [
            (TableKind::Metro, &self.metros),
            (TableKind::City, &self.cities),
            (TableKind::Region, &self.regions),
        ]
        .into_iter()
        .find_map(|(kind, table)| {
            table.iter().find(|place| place.matches(normalized)).map(|place| (kind, place))
        })
    }

    /// First continent whose name occurs in the text.
    #[must_use]
    pub fn find_continent(&self, normalized: &str) -> Option<&CompiledPlace> {
        self.continents.iter().find(|place| place.matches(normalized))
    }

    /// Number of entries in each table: metros, cities, regions, continents.
    #[must_use]
    pub fn sizes(&self) -> [usize; 4] {
        [self.metros.len(), self.cities.len(), self.regions.len(), self.continents.len()]
    }
}

/// Lowercase, trim and collapse internal whitespace.
#[must_use]
pub fn normalize(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase()
}
