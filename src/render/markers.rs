//! Marker rendering for the map view.
//!
//! A refresh runs the whole pipeline for one viewport:
//!
//! 1. select candidates with [`crate::viewport::select`]
//! 2. split them into positioned developers and developers that still need a
//!    location resolved
//! 3. resolve each *distinct* location string once, in fixed-size concurrent
//!    groups with a pause between groups
//! 4. write newly resolved coordinates back to the store, and drop developers
//!    whose fresh coordinate lies outside the padded viewport (they were only
//!    selected so their location could be resolved)
//! 5. group developers sharing a rounded coordinate and fan the members of
//!    each group out on a golden-angle spiral so none of them overlap
//! 6. swap the finished [`MarkerSet`] into the [`MarkerLayer`] in one step
//!
//! Concurrent refreshes are not cancelled; whichever finishes last owns the
//! layer.

use futures::future::join_all;
use serde::Serialize;
use serde_json::{Value, json};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::constants;
use crate::core::DevmapError;
use crate::geo::{BoundingRegion, CoordinateKey, Coordinates};
use crate::location::{LocationResolver, Resolution};
use crate::models::Developer;
use crate::store::DeveloperStore;
use crate::viewport::{self, ViewportSettings};

/// π(3 − √5) radians.
const GOLDEN_ANGLE: f64 = 2.399_963_229_728_653_3;

/// Tuning knobs for marker construction.
#[derive(Debug, Clone)]
pub struct MarkerSettings {
    /// Location strings resolved concurrently per group.
    pub group_size: usize,
    /// Pause between resolution groups.
    pub group_delay: Duration,
    /// Spiral radius growth per co-located member, in degrees.
    pub offset_step: f64,
    /// Decimal places used to detect co-location.
    pub coordinate_precision: u32,
}

impl Default for MarkerSettings {
    fn default() -> Self {
        Self {
            group_size: constants::RESOLVE_GROUP_SIZE,
            group_delay: constants::RESOLVE_GROUP_DELAY,
            offset_step: constants::CO_LOCATION_OFFSET_STEP,
            coordinate_precision: constants::COORDINATE_KEY_PRECISION,
        }
    }
}

/// One developer placed on the map.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Marker {
    pub developer_id: String,
    pub name: String,
    /// Where the marker is drawn, after the co-location offset.
    pub position: Coordinates,
    /// The developer's actual coordinate.
    pub base: Coordinates,
    /// Number of developers sharing `base`.
    pub group_size: usize,
    pub follower_count: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_url: Option<String>,
}

/// The complete set of markers from one refresh.
#[derive(Debug, Clone, Default, Serialize)]
pub struct MarkerSet {
    pub markers: Vec<Marker>,
    /// Developers picked by the viewport selector.
    pub candidates: usize,
    /// Candidates left off the map because their location stayed unresolved.
    pub unresolved: usize,
    /// Candidates resolved during this refresh to a point outside the view.
    pub off_screen: usize,
    /// Developers in the store when the set was built.
    pub total_loaded: usize,
}

impl MarkerSet {
    #[must_use]
    pub fn len(&self) -> usize {
        self.markers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }

    /// GeoJSON `FeatureCollection`, one point feature per marker.
    #[must_use]
    pub fn to_geojson(&self) -> Value {
        let features: Vec<Value> = self
            .markers
            .iter()
            .map(|m| {
                json!({
                    "type": "Feature",
                    "geometry": {
                        "type": "Point",
                        "coordinates": [m.position.lng, m.position.lat],
                    },
                    "properties": {
                        "id": m.developer_id,
                        "name": m.name,
                        "followers": m.follower_count,
                        "location": m.location,
                        "avatar_url": m.avatar_url,
                        "profile_url": m.profile_url,
                        "group_size": m.group_size,
                    },
                })
            })
            .collect();

        json!({
            "type": "FeatureCollection",
            "features": features,
        })
    }
}

/// Holder of the current [`MarkerSet`]; replaced whole, never patched.
#[derive(Debug, Default)]
pub struct MarkerLayer {
    current: RwLock<Arc<MarkerSet>>,
}

impl MarkerLayer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The set currently on display.
    pub async fn current(&self) -> Arc<MarkerSet> {
        Arc::clone(&*self.current.read().await)
    }

    /// Swap in a new set, discarding the previous one.
    pub async fn replace(&self, set: MarkerSet) -> Arc<MarkerSet> {
        let set = Arc::new(set);
        *self.current.write().await = Arc::clone(&set);
        set
    }

    pub async fn clear(&self) {
        *self.current.write().await = Arc::new(MarkerSet::default());
    }
}

/// Builds marker sets; see the module documentation.
pub struct MarkerRenderer {
    resolver: Arc<LocationResolver>,
    settings: MarkerSettings,
}

impl MarkerRenderer {
    pub fn new(resolver: Arc<LocationResolver>, settings: MarkerSettings) -> Self {
        Self {
            resolver,
            settings,
        }
    }

    /// Rebuild the marker set for `bounds` and commit it to `layer`.
    ///
    /// On error the layer is left untouched.
    pub async fn refresh(
        &self,
        bounds: &BoundingRegion,
        store: &RwLock<DeveloperStore>,
        viewport: &ViewportSettings,
        layer: &MarkerLayer,
    ) -> Result<Arc<MarkerSet>, DevmapError> {
        bounds.validate()?;

        let (candidates, total_loaded) = {
            let store = store.read().await;
            (viewport::select(bounds, &store, viewport), store.len())
        };
        let visible = viewport::filters_bounds(total_loaded, viewport).then(|| bounds.padded(viewport.padding));

        let pending: Vec<&str> = distinct_locations(&candidates);
        let resolved = self.resolve_all(&pending).await;

        let mut positioned: Vec<(Developer, Coordinates)> = Vec::with_capacity(candidates.len());
        let mut unresolved = 0;
        let mut off_screen = 0;
        {
            let mut store = store.write().await;
            for dev in &candidates {
                let coordinates = match dev.coordinates {
                    Some(coordinates) => Some(coordinates),
                    None => {
                        let found = dev
                            .location
                            .as_deref()
                            .and_then(|loc| resolved.get(loc))
                            .and_then(Resolution::coordinates);
                        if let Some(coordinates) = found {
                            store.set_coordinates(&dev.id, coordinates);
                            if visible.as_ref().is_some_and(|region| !region.contains(&coordinates)) {
                                debug!("{} resolved outside the view; not drawn", dev.id);
                                off_screen += 1;
                                continue;
                            }
                        }
                        found
                    }
                };

                match coordinates {
                    Some(coordinates) => positioned.push((dev.clone(), coordinates)),
                    None => unresolved += 1,
                }
            }
        }

        let markers = self.place(&positioned);
        let set = MarkerSet {
            markers,
            candidates: candidates.len(),
            unresolved,
            off_screen,
            total_loaded,
        };
        info!(
            "Rendered {} marker(s) from {} candidate(s), {} location(s) resolved",
            set.len(),
            set.candidates,
            pending.len()
        );

        Ok(layer.replace(set).await)
    }

    async fn resolve_all(&self, locations: &[&str]) -> HashMap<String, Resolution> {
        let mut resolved = HashMap::with_capacity(locations.len());
        let group_size = self.settings.group_size.max(1);

        for (i, group) in locations.chunks(group_size).enumerate() {
            if i > 0 && !self.settings.group_delay.is_zero() {
                tokio::time::sleep(self.settings.group_delay).await;
            }
            debug!("Resolving group {} ({} location(s))", i, group.len());

            let results = join_all(group.iter().map(|loc| self.resolver.resolve_async(loc))).await;
            for (loc, resolution) in group.iter().zip(results) {
                resolved.insert((*loc).to_string(), resolution);
            }
        }
        resolved
    }

    /// Fan out co-located developers; member 0 of each group stays at the base.
    fn place(&self, positioned: &[(Developer, Coordinates)]) -> Vec<Marker> {
        let precision = self.settings.coordinate_precision;
        let mut group_sizes: HashMap<CoordinateKey, usize> = HashMap::new();
        for (_, coordinates) in positioned {
            *group_sizes.entry(coordinates.key(precision)).or_default() += 1;
        }

        let mut seen: HashMap<CoordinateKey, usize> = HashMap::new();
        positioned
            .iter()
            .map(|(dev, base)| {
                let key = base.key(precision);
                let slot = seen.entry(key).or_default();
                let member = *slot;
                *slot += 1;

                Marker {
                    developer_id: dev.id.clone(),
                    name: dev.name().to_string(),
                    position: offset_position(*base, member, self.settings.offset_step),
                    base: *base,
                    group_size: group_sizes.get(&key).copied().unwrap_or(1),
                    follower_count: dev.follower_count,
                    location: dev.location.clone(),
                    avatar_url: dev.avatar_url.clone(),
                    profile_url: dev.profile_url.clone(),
                }
            })
            .collect()
    }
}

/// Location strings of developers without coordinates, first occurrence order.
fn distinct_locations(candidates: &[Developer]) -> Vec<&str> {
    let mut seen = HashSet::new();
    candidates
        .iter()
        .filter(|dev| dev.coordinates.is_none() && dev.location_text().is_some())
        .filter_map(|dev| dev.location.as_deref())
        .filter(|loc| seen.insert(*loc))
        .collect()
}

/// Position of member `index` on a golden-angle spiral around `base`.
#[must_use]
pub fn offset_position(base: Coordinates, index: usize, step: f64) -> Coordinates {
    if index == 0 {
        return base;
    }

    let i = index as f64;
    let angle = i * GOLDEN_ANGLE;
    let radius = step * i;
    let lat = (base.lat + radius * angle.sin()).clamp(-90.0, 90.0);
    let mut lng = base.lng + radius * angle.cos();
    if lng > 180.0 {
        lng -= 360.0;
    } else if lng < -180.0 {
        lng += 360.0;
    }
    Coordinates::new(lat, lng)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::location::ResolverSettings;

    fn renderer() -> MarkerRenderer {
        let resolver = Arc::new(LocationResolver::new(ResolverSettings::default()).unwrap());
        MarkerRenderer::new(
            resolver,
            MarkerSettings {
                group_delay: Duration::ZERO,
                ..MarkerSettings::default()
            },
        )
    }

    fn store_of(developers: Vec<Developer>) -> RwLock<DeveloperStore> {
        let mut store = DeveloperStore::new();
        store.merge(developers);
        RwLock::new(store)
    }

    #[test]
    fn test_offsets_distinct_and_deterministic() {
        let base = Coordinates::new(52.52, 13.405);
        let first: Vec<Coordinates> = (0..3).map(|i| offset_position(base, i, 0.0015)).collect();
        let second: Vec<Coordinates> = (0..3).map(|i| offset_position(base, i, 0.0015)).collect();

        assert_eq!(first, second);
        assert_eq!(first[0], base);
        assert_ne!(first[0], first[1]);
        assert_ne!(first[1], first[2]);
        assert_ne!(first[0], first[2]);
    }

    #[test]
    fn test_offset_stays_on_the_globe() {
        let pole = offset_position(Coordinates::new(90.0, 179.999), 7, 0.5);
        assert!(pole.is_valid());
    }

    #[tokio::test]
    async fn test_co_located_developers_spread_out() {
        let renderer = renderer();
        let store = store_of(vec![
            Developer::new("a").with_location("Berlin").with_followers(30),
            Developer::new("b").with_location("Berlin, Germany").with_followers(20),
            Developer::new("c").with_location("berlin").with_followers(10),
        ]);
        let layer = MarkerLayer::new();

        let set = renderer
            .refresh(&BoundingRegion::world(), &store, &ViewportSettings::default(), &layer)
            .await
            .unwrap();

        assert_eq!(set.len(), 3);
        let positions: Vec<Coordinates> = set.markers.iter().map(|m| m.position).collect();
        assert_ne!(positions[0], positions[1]);
        assert_ne!(positions[1], positions[2]);
        assert!(set.markers.iter().all(|m| m.group_size == 3 && m.base == set.markers[0].base));

        // Same input, same layout
        let again = renderer
            .refresh(&BoundingRegion::world(), &store, &ViewportSettings::default(), &layer)
            .await
            .unwrap();
        let repeat: Vec<Coordinates> = again.markers.iter().map(|m| m.position).collect();
        assert_eq!(positions, repeat);
    }

    #[tokio::test]
    async fn test_resolution_written_back_once_per_string() {
        let renderer = renderer();
        let store = store_of(vec![
            Developer::new("a").with_location("Tokyo"),
            Developer::new("b").with_location("Tokyo"),
            Developer::new("c").with_coordinates(Coordinates::new(1.0, 1.0)),
        ]);
        let layer = MarkerLayer::new();

        renderer
            .refresh(&BoundingRegion::world(), &store, &ViewportSettings::default(), &layer)
            .await
            .unwrap();

        let stats = renderer.resolver.stats();
        assert_eq!(stats.table_scans, 1);
        assert_eq!(stats.entries, 1);

        let store = store.read().await;
        assert!(store.get("a").unwrap().coordinates.is_some());
        assert_eq!(store.get("a").unwrap().coordinates, store.get("b").unwrap().coordinates);
        assert_eq!(store.get("c").unwrap().coordinates, Some(Coordinates::new(1.0, 1.0)));
    }

    #[tokio::test]
    async fn test_invalid_bounds_keep_previous_set() {
        let renderer = renderer();
        let store = store_of(vec![Developer::new("a").with_location("Paris")]);
        let layer = MarkerLayer::new();

        renderer
            .refresh(&BoundingRegion::world(), &store, &ViewportSettings::default(), &layer)
            .await
            .unwrap();

        let broken = BoundingRegion {
            south: 10.0,
            west: 0.0,
            north: -10.0,
            east: 5.0,
        };
        let err = renderer.refresh(&broken, &store, &ViewportSettings::default(), &layer).await;
        assert!(matches!(err, Err(DevmapError::InvalidBounds { .. })));
        assert_eq!(layer.current().await.len(), 1);
    }

    #[tokio::test]
    async fn test_unresolved_developers_left_off_map() {
        let resolver = Arc::new(
            LocationResolver::new(ResolverSettings {
                fallback_to_default: false,
                ..ResolverSettings::default()
            })
            .unwrap(),
        );
        let renderer = MarkerRenderer::new(resolver, MarkerSettings::default());
        let store = store_of(vec![
            Developer::new("a").with_location("Madrid"),
            Developer::new("b").with_location("The Internet"),
        ]);
        let layer = MarkerLayer::new();

        let set = renderer
            .refresh(&BoundingRegion::world(), &store, &ViewportSettings::default(), &layer)
            .await
            .unwrap();
        assert_eq!(set.len(), 1);
        assert_eq!(set.unresolved, 1);
        assert_eq!(set.candidates, 2);
    }

    #[tokio::test]
    async fn test_pending_developer_resolved_off_screen_not_drawn() {
        let renderer = renderer();
        let mut developers: Vec<Developer> = (0..150u64)
            .map(|i| Developer::new(format!("eu{i}")).with_coordinates(Coordinates::new(48.0, 2.0)).with_followers(i))
            .collect();
        developers.push(Developer::new("far").with_location("Tokyo").with_followers(1000));
        let store = store_of(developers);
        let layer = MarkerLayer::new();
        let europe = BoundingRegion::new(35.0, -10.0, 60.0, 30.0).unwrap();

        let set = renderer.refresh(&europe, &store, &ViewportSettings::default(), &layer).await.unwrap();

        assert!(set.markers.iter().all(|m| m.developer_id != "far"));
        assert!(set.markers.iter().all(|m| europe.padded(0.15).contains(&m.base)));
        assert_eq!(set.off_screen, 1);
        assert_eq!(set.candidates, 150);
        assert_eq!(set.len(), 149);

        // Resolution still sticks, so the next refresh filters it like any other.
        assert!(store.read().await.get("far").unwrap().coordinates.is_some());
        let again = renderer.refresh(&europe, &store, &ViewportSettings::default(), &layer).await.unwrap();
        assert_eq!(again.off_screen, 0);
        assert_eq!(again.len(), 150);
    }

    #[test]
    fn test_geojson_shape() {
        let set = MarkerSet {
            markers: vec![Marker {
                developer_id: "octocat".to_string(),
                name: "The Octocat".to_string(),
                position: Coordinates::new(37.77, -122.42),
                base: Coordinates::new(37.77, -122.42),
                group_size: 1,
                follower_count: 9000,
                location: Some("San Francisco".to_string()),
                avatar_url: None,
                profile_url: None,
            }],
            candidates: 1,
            unresolved: 0,
            off_screen: 0,
            total_loaded: 1,
        };

        let geojson = set.to_geojson();
        assert_eq!(geojson["type"], "FeatureCollection");
        assert_eq!(geojson["features"][0]["geometry"]["coordinates"][0], -122.42);
        assert_eq!(geojson["features"][0]["properties"]["id"], "octocat");
    }
}
