//! The in-memory developer collection.
//!
//! [`DeveloperStore`] keeps developers in the order they were first loaded and
//! indexes them by id. Insertion is first-write-wins: a developer that is
//! already present is never replaced by a later batch. Entries are only
//! removed by [`DeveloperStore::clear`].

use std::collections::HashMap;

use crate::geo::Coordinates;
use crate::models::Developer;

/// Deduplicated, insertion-ordered developer collection.
#[derive(Debug, Default, Clone)]
pub struct DeveloperStore {
    developers: Vec<Developer>,
    by_id: HashMap<String, usize>,
}

impl DeveloperStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `developer` unless its id is already present.
    ///
    /// Returns `true` when the developer was added.
    pub fn insert_if_absent(&mut self, developer: Developer) -> bool {
        if self.by_id.contains_key(&developer.id) {
            return false;
        }
        self.by_id.insert(developer.id.clone(), self.developers.len());
        self.developers.push(developer);
        true
    }

    /// Insert every developer with first-write-wins semantics; returns how many were new.
    pub fn merge(&mut self, developers: impl IntoIterator<Item = Developer>) -> usize {
        developers.into_iter().filter(|dev| self.insert_if_absent(dev.clone())).count()
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Developer> {
        self.by_id.get(id).map(|&i| &self.developers[i])
    }

    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.by_id.contains_key(id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.developers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.developers.is_empty()
    }

    /// Developers in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Developer> {
        self.developers.iter()
    }

    /// Record resolved coordinates for `id`.
    ///
    /// Coordinates are written once; returns `false` if the developer is
    /// unknown or already has coordinates.
    pub fn set_coordinates(&mut self, id: &str, coordinates: Coordinates) -> bool {
        let Some(&i) = self.by_id.get(id) else {
            return false;
        };
        let developer = &mut self.developers[i];
        if developer.coordinates.is_some() {
            return false;
        }
        developer.coordinates = Some(coordinates);
        true
    }

    /// Remove every developer.
    pub fn clear(&mut self) {
        self.developers.clear();
        self.by_id.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_write_wins() {
        let mut store = DeveloperStore::new();
        assert!(store.insert_if_absent(Developer::new("octocat").with_location("San Francisco")));
        assert!(!store.insert_if_absent(Developer::new("octocat").with_location("Berlin")));

        assert_eq!(store.len(), 1);
        assert_eq!(store.get("octocat").unwrap().location.as_deref(), Some("San Francisco"));
    }

    #[test]
    fn test_merge_counts_new_and_keeps_order() {
        let mut store = DeveloperStore::new();
        let added = store.merge(vec![Developer::new("a"), Developer::new("b")]);
        assert_eq!(added, 2);
        let added = store.merge(vec![Developer::new("b"), Developer::new("c"), Developer::new("a")]);
        assert_eq!(added, 1);

        let ids: Vec<&str> = store.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_coordinates_set_once() {
        let mut store = DeveloperStore::new();
        store.insert_if_absent(Developer::new("a"));

        assert!(store.set_coordinates("a", Coordinates::new(1.0, 2.0)));
        assert!(!store.set_coordinates("a", Coordinates::new(3.0, 4.0)));
        assert!(!store.set_coordinates("missing", Coordinates::new(3.0, 4.0)));
        assert_eq!(store.get("a").unwrap().coordinates, Some(Coordinates::new(1.0, 2.0)));
    }

    #[test]
    fn test_clear() {
        let mut store = DeveloperStore::new();
        store.merge(vec![Developer::new("a"), Developer::new("b")]);
        store.clear();
        assert!(store.is_empty());
        assert!(!store.contains("a"));
        assert!(store.insert_if_absent(Developer::new("a")));
    }
}
