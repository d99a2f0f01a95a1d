//! Viewport selection: which developers belong on the map right now.
//!
//! [`select`] pads the visible rectangle, keeps developers positioned inside
//! it (plus those that still need their location resolved), orders them by
//! follower count and applies the display budget. Small collections skip the
//! bounds test entirely so fallback datasets stay visible at any pan/zoom.

use crate::constants;
use crate::geo::BoundingRegion;
use crate::models::Developer;
use crate::store::DeveloperStore;

/// Selection limits.
#[derive(Debug, Clone)]
pub struct ViewportSettings {
    /// Fraction of the width/height added on every side before testing containment.
    pub padding: f64,
    /// Maximum number of developers returned.
    pub display_budget: usize,
    /// Collections smaller than this bypass bounds filtering.
    pub small_dataset_floor: usize,
    /// Budget used when bounds filtering is bypassed.
    pub small_dataset_cap: usize,
}

impl Default for ViewportSettings {
    fn default() -> Self {
        Self {
            padding: constants::VIEWPORT_PADDING,
            display_budget: constants::MAP_DISPLAY_BUDGET,
            small_dataset_floor: constants::SMALL_DATASET_FLOOR,
            small_dataset_cap: constants::SMALL_DATASET_CAP,
        }
    }
}

/// Developers to show for `bounds`, most followed first, capped to the budget.
///
/// Ties keep store (load) order.
#[must_use]
pub fn select(bounds: &BoundingRegion, store: &DeveloperStore, settings: &ViewportSettings) -> Vec<Developer> {
    if !filters_bounds(store.len(), settings) {
        return top_by_followers(store.iter(), settings.small_dataset_cap);
    }

    let padded = bounds.padded(settings.padding);
    let candidates = store.iter().filter(|dev| match &dev.coordinates {
        Some(coordinates) => padded.contains(coordinates),
        None => dev.location_text().is_some(),
    });

    top_by_followers(candidates, settings.display_budget)
}

/// Whether a collection of `loaded` developers is filtered by bounds at all.
#[must_use]
pub fn filters_bounds(loaded: usize, settings: &ViewportSettings) -> bool {
    loaded >= settings.small_dataset_floor
}

fn top_by_followers<'a>(developers: impl Iterator<Item = &'a Developer>, budget: usize) -> Vec<Developer> {
    let mut ranked: Vec<&Developer> = developers.collect();
    ranked.sort_by(|a, b| b.follower_count.cmp(&a.follower_count));
    ranked.into_iter().take(budget).cloned().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::Coordinates;

    fn settings(budget: usize) -> ViewportSettings {
        ViewportSettings {
            display_budget: budget,
            ..ViewportSettings::default()
        }
    }

    fn europe() -> BoundingRegion {
        BoundingRegion::new(35.0, -10.0, 60.0, 30.0).unwrap()
    }

    #[test]
    fn test_cap_takes_top_followers() {
        let mut store = DeveloperStore::new();
        for i in 0..500u64 {
            store.insert_if_absent(
                Developer::new(format!("dev{i}"))
                    .with_followers((i * 37) % 1000)
                    .with_coordinates(Coordinates::new(48.0 + (i % 10) as f64 * 0.1, 2.0)),
            );
        }

        let selected = select(&europe(), &store, &settings(100));
        assert_eq!(selected.len(), 100);
        assert!(selected.windows(2).all(|w| w[0].follower_count >= w[1].follower_count));

        let mut all: Vec<u64> = store.iter().map(|d| d.follower_count).collect();
        all.sort_unstable_by(|a, b| b.cmp(a));
        assert_eq!(selected[99].follower_count, all[99]);
    }

    #[test]
    fn test_ties_keep_load_order() {
        let mut store = DeveloperStore::new();
        for i in 0..150 {
            store.insert_if_absent(
                Developer::new(format!("dev{i:03}"))
                    .with_followers(10)
                    .with_coordinates(Coordinates::new(50.0, 10.0)),
            );
        }
        let selected = select(&europe(), &store, &settings(5));
        let ids: Vec<&str> = selected.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["dev000", "dev001", "dev002", "dev003", "dev004"]);
    }

    #[test]
    fn test_bounds_filter_and_unresolved_included() {
        let mut store = DeveloperStore::new();
        for i in 0..100 {
            store.insert_if_absent(
                Developer::new(format!("far{i}")).with_coordinates(Coordinates::new(-33.8, 151.2)),
            );
        }
        store.insert_if_absent(Developer::new("berlin").with_coordinates(Coordinates::new(52.52, 13.4)));
        store.insert_if_absent(Developer::new("pending").with_location("Lisbon"));
        store.insert_if_absent(Developer::new("nowhere"));
        // Just outside the visible edge, inside the padding
        store.insert_if_absent(Developer::new("edge").with_coordinates(Coordinates::new(61.0, 10.0)));

        let selected = select(&europe(), &store, &settings(150));
        let ids: Vec<&str> = selected.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["berlin", "pending", "edge"]);
    }

    #[test]
    fn test_small_dataset_bypasses_bounds() {
        let mut store = DeveloperStore::new();
        for i in 0..40 {
            store.insert_if_absent(
                Developer::new(format!("dev{i}")).with_coordinates(Coordinates::new(-33.8, 151.2)),
            );
        }

        let selected = select(&europe(), &store, &ViewportSettings::default());
        assert_eq!(selected.len(), 40);
    }
}
