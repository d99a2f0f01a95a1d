//! Shared data models: developers, batch files and the batch index.
//!
//! These types mirror the JSON files written by the offline collection step:
//!
//! ```json
//! {
//!   "batch_index": 0,
//!   "generated_at": "2026-09-30T12:00:00Z",
//!   "developers": [
//!     { "login": "octocat", "name": "The Octocat", "location": "San Francisco", "followers": 9000 }
//!   ]
//! }
//! ```
//!
//! Developer records accept both GitHub-style field names (`login`, `name`,
//! `html_url`, `followers`, `public_repos`) and the canonical names used when
//! devmap itself serializes them.

use chrono::{DateTime, Utc};
use clap::ValueEnum;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use tracing::warn;

use crate::geo::Coordinates;

/// One publicly listed developer.
///
/// `id` is the identity key. `coordinates` starts out empty for most records and
/// is filled in once by the location resolver; it is never recomputed afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawDeveloper")]
pub struct Developer {
    /// Unique login/handle.
    pub id: String,

    /// Human readable name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,

    /// Avatar image URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,

    /// Profile page URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_url: Option<String>,

    /// Raw, free-text location as entered by the developer.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,

    /// Resolved position, if known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coordinates: Option<Coordinates>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,

    pub follower_count: u64,

    pub public_repo_count: u64,

    pub total_stars: u64,

    pub total_forks: u64,

    /// Most used languages, most frequent first.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub top_languages: Vec<String>,

    /// Platform name → profile URL.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub social_links: BTreeMap<String, String>,
}

/// Wire shape accepted for a developer record.
///
/// GitHub payloads carry a numeric `id` next to the `login` handle, so the two
/// spellings of each field are read separately and reconciled in
/// the `TryFrom` conversion below.
#[derive(Deserialize)]
struct RawDeveloper {
    #[serde(default)]
    login: Option<String>,
    #[serde(default)]
    id: Option<serde_json::Value>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    avatar_url: Option<String>,
    #[serde(default)]
    html_url: Option<String>,
    #[serde(default)]
    profile_url: Option<String>,
    #[serde(default)]
    location: Option<String>,
    #[serde(default)]
    coordinates: Option<Coordinates>,
    #[serde(default)]
    bio: Option<String>,
    #[serde(default)]
    company: Option<String>,
    #[serde(default)]
    followers: Option<u64>,
    #[serde(default)]
    follower_count: Option<u64>,
    #[serde(default)]
    public_repos: Option<u64>,
    #[serde(default)]
    public_repo_count: Option<u64>,
    #[serde(default)]
    total_stars: Option<u64>,
    #[serde(default)]
    total_forks: Option<u64>,
    #[serde(default)]
    top_languages: Option<Vec<String>>,
    #[serde(default)]
    social_links: Option<BTreeMap<String, String>>,
}

impl TryFrom<RawDeveloper> for Developer {
    type Error = String;

    fn try_from(raw: RawDeveloper) -> Result<Self, Self::Error> {
        // `login` is the handle; a string `id` is accepted for canonical records.
        let id = match (raw.login, raw.id) {
            (Some(login), _) if !login.trim().is_empty() => login,
            (_, Some(serde_json::Value::String(id))) if !id.trim().is_empty() => id,
            _ => return Err("developer record has no login/id".to_string()),
        };

        Ok(Self {
            id,
            display_name: raw.display_name.or(raw.name),
            avatar_url: raw.avatar_url,
            profile_url: raw.profile_url.or(raw.html_url),
            location: raw.location,
            coordinates: raw.coordinates,
            bio: raw.bio,
            company: raw.company,
            follower_count: raw.follower_count.or(raw.followers).unwrap_or(0),
            public_repo_count: raw.public_repo_count.or(raw.public_repos).unwrap_or(0),
            total_stars: raw.total_stars.unwrap_or(0),
            total_forks: raw.total_forks.unwrap_or(0),
            top_languages: raw.top_languages.unwrap_or_default(),
            social_links: raw.social_links.unwrap_or_default(),
        })
    }
}

impl Developer {
    /// A developer with only an id; every other field empty or zero.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: None,
            avatar_url: None,
            profile_url: None,
            location: None,
            coordinates: None,
            bio: None,
            company: None,
            follower_count: 0,
            public_repo_count: 0,
            total_stars: 0,
            total_forks: 0,
            top_languages: Vec::new(),
            social_links: BTreeMap::new(),
        }
    }

    /// Builder-style setter for the raw location text.
    #[must_use]
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    /// Builder-style setter for the follower count.
    #[must_use]
    pub fn with_followers(mut self, followers: u64) -> Self {
        self.follower_count = followers;
        self
    }

    /// Builder-style setter for pre-resolved coordinates.
    #[must_use]
    pub fn with_coordinates(mut self, coordinates: Coordinates) -> Self {
        self.coordinates = Some(coordinates);
        self
    }

    /// Display name, falling back to the id.
    #[must_use]
    pub fn name(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.id)
    }

    /// Location text if present and not blank.
    #[must_use]
    pub fn location_text(&self) -> Option<&str> {
        self.location.as_deref().map(str::trim).filter(|l| !l.is_empty())
    }

    /// Value of the numeric field selected by `key`.
    #[must_use]
    pub const fn metric(&self, key: SortKey) -> u64 {
        match key {
            SortKey::Followers => self.follower_count,
            SortKey::Repos => self.public_repo_count,
            SortKey::Stars => self.total_stars,
            SortKey::Forks => self.total_forks,
        }
    }
}

/// Numeric field used to order the list view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    /// Follower count
    #[default]
    Followers,
    /// Public repository count
    Repos,
    /// Total stars across repositories
    Stars,
    /// Total forks across repositories
    Forks,
}

/// One batch file as produced by the collection step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchFile {
    /// Zero-based batch number.
    pub batch_index: u32,
    /// When the batch was written.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated_at: Option<DateTime<Utc>>,
    /// Developers in source order; malformed records are skipped.
    #[serde(default, deserialize_with = "lenient_developers")]
    pub developers: Vec<Developer>,
}

/// Summary of one batch inside the index file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub index: u32,
    pub filename: String,
    #[serde(default)]
    pub count: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated_at: Option<DateTime<Utc>>,
}

/// The batch index describing every batch a data source offers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchIndex {
    pub total_developers: usize,
    pub total_batches: u32,
    #[serde(default)]
    pub batches: Vec<BatchSummary>,
}

impl BatchIndex {
    /// File name recorded for batch `index`, if the index lists it.
    #[must_use]
    pub fn filename_for(&self, index: u32) -> Option<&str> {
        self.batches.iter().find(|b| b.index == index).map(|b| b.filename.as_str())
    }
}

/// The single-file fallback: either a bare array or an object with a `developers` array.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ConsolidatedFile {
    /// `[ {...}, {...} ]`
    List(#[serde(deserialize_with = "lenient_developers")] Vec<Developer>),
    /// `{ "developers": [ ... ] }`
    Wrapped {
        /// All developers
        #[serde(deserialize_with = "lenient_developers")]
        developers: Vec<Developer>,
    },
}

impl ConsolidatedFile {
    /// Flatten into the developer list.
    #[must_use]
    pub fn into_developers(self) -> Vec<Developer> {
        match self {
            Self::List(developers)
            | Self::Wrapped {
                developers,
            } => developers,
        }
    }
}

/// Decode a developer array record by record.
///
/// The array itself must be well formed, but a record that is not a valid
/// developer (no handle, wrong field types) is logged and dropped instead of
/// failing the whole file.
fn lenient_developers<'de, D>(deserializer: D) -> Result<Vec<Developer>, D::Error>
where
    D: Deserializer<'de>,
{
    let records = Vec::<serde_json::Value>::deserialize(deserializer)?;
    let total = records.len();

    let developers: Vec<Developer> = records
        .into_iter()
        .enumerate()
        .filter_map(|(position, record)| match serde_json::from_value::<Developer>(record) {
            Ok(developer) => Some(developer),
            Err(e) => {
                warn!("Skipping developer record {}: {}", position, e);
                None
            }
        })
        .collect();

    if developers.len() < total {
        warn!("Dropped {} of {} developer record(s)", total - developers.len(), total);
    }
    Ok(developers)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_github_style_fields() {
        let json = r#"{
            "login": "octocat",
            "name": "The Octocat",
            "html_url": "https://github.com/octocat",
            "location": "San Francisco",
            "followers": 9000,
            "public_repos": 8,
            "top_languages": ["Ruby", "JavaScript"],
            "social_links": {"twitter": "https://twitter.com/github"}
        }"#;
        let dev: Developer = serde_json::from_str(json).unwrap();
        assert_eq!(dev.id, "octocat");
        assert_eq!(dev.name(), "The Octocat");
        assert_eq!(dev.follower_count, 9000);
        assert_eq!(dev.public_repo_count, 8);
        assert_eq!(dev.total_stars, 0);
        assert_eq!(dev.top_languages, vec!["Ruby", "JavaScript"]);
        assert_eq!(dev.social_links.len(), 1);
        assert!(dev.coordinates.is_none());
    }

    #[test]
    fn test_numeric_github_id_ignored_in_favour_of_login() {
        let dev: Developer =
            serde_json::from_str(r#"{"login": "octocat", "id": 583231, "followers": 1}"#).unwrap();
        assert_eq!(dev.id, "octocat");

        let missing: Result<Developer, _> = serde_json::from_str(r#"{"id": 583231}"#);
        assert!(missing.is_err());
    }

    #[test]
    fn test_canonical_round_trip_shape() {
        let dev = Developer::new("torvalds").with_location("Portland, OR").with_followers(200_000);
        let json = serde_json::to_string(&dev).unwrap();
        assert!(json.contains("\"id\":\"torvalds\""));
        assert!(json.contains("\"follower_count\":200000"));
        let back: Developer = serde_json::from_str(&json).unwrap();
        assert_eq!(back, dev);
    }

    #[test]
    fn test_blank_location_is_none() {
        let dev = Developer::new("a").with_location("   ");
        assert_eq!(dev.location_text(), None);
        let dev = Developer::new("b").with_location(" Berlin ");
        assert_eq!(dev.location_text(), Some("Berlin"));
    }

    #[test]
    fn test_consolidated_shapes() {
        let list: ConsolidatedFile = serde_json::from_str(r#"[{"login": "a"}, {"id": "b"}]"#).unwrap();
        assert_eq!(list.into_developers().len(), 2);

        let wrapped: ConsolidatedFile =
            serde_json::from_str(r#"{"developers": [{"login": "a"}]}"#).unwrap();
        assert_eq!(wrapped.into_developers()[0].id, "a");
    }

    #[test]
    fn test_bad_records_dropped_not_fatal() {
        let batch: BatchFile = serde_json::from_str(
            r#"{"batch_index": 0, "developers": [{"login": "a"}, {"name": "no handle"}, {"login": "b", "followers": "many"}, {"login": "c"}]}"#,
        )
        .unwrap();
        let ids: Vec<&str> = batch.developers.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c"]);

        let list: ConsolidatedFile =
            serde_json::from_str(r#"[{"login": "a"}, {"login": "b"}, {"name": "no handle"}]"#).unwrap();
        assert_eq!(list.into_developers().len(), 2);

        let wrapped: ConsolidatedFile =
            serde_json::from_str(r#"{"developers": [{"id": 7}, {"login": "x"}]}"#).unwrap();
        assert_eq!(wrapped.into_developers()[0].id, "x");

        // A broken envelope is still an error.
        assert!(serde_json::from_str::<BatchFile>(r#"{"batch_index": 0, "developers": {"login": "a"}}"#).is_err());
    }

    #[test]
    fn test_index_filename_lookup() {
        let index: BatchIndex = serde_json::from_str(
            r#"{
                "total_developers": 150,
                "total_batches": 2,
                "batches": [
                    {"index": 0, "filename": "developers_batch_0.json", "count": 100},
                    {"index": 1, "filename": "developers_batch_1.json", "count": 50}
                ]
            }"#,
        )
        .unwrap();
        assert_eq!(index.filename_for(1), Some("developers_batch_1.json"));
        assert_eq!(index.filename_for(2), None);
    }

    #[test]
    fn test_metric_selection() {
        let mut dev = Developer::new("x").with_followers(3);
        dev.total_stars = 7;
        assert_eq!(dev.metric(SortKey::Followers), 3);
        assert_eq!(dev.metric(SortKey::Stars), 7);
        assert_eq!(dev.metric(SortKey::Forks), 0);
    }
}
