//! The list view: every loaded developer, filtered and ranked.
//!
//! Unlike the map, the list ignores the viewport. A query matches when any of
//! name, id, bio, location or company contains it (case-insensitive); the
//! result is ordered by the chosen [`SortKey`], highest first, ties in load
//! order, and truncated to the display budget.

use crate::models::{Developer, SortKey};
use crate::store::DeveloperStore;

/// Filter, sort and truncate the store for the list view.
#[must_use]
pub fn render(store: &DeveloperStore, sort: SortKey, query: &str, budget: usize) -> Vec<Developer> {
    let needle = query.trim().to_lowercase();
    let mut rows: Vec<&Developer> = store.iter().filter(|dev| matches_query(dev, &needle)).collect();
    rows.sort_by(|a, b| b.metric(sort).cmp(&a.metric(sort)));
    rows.into_iter().take(budget).cloned().collect()
}

/// Number of developers matching `query`, before truncation.
#[must_use]
pub fn count_matches(store: &DeveloperStore, query: &str) -> usize {
    let needle = query.trim().to_lowercase();
    store.iter().filter(|dev| matches_query(dev, &needle)).count()
}

fn matches_query(dev: &Developer, needle: &str) -> bool {
    if needle.is_empty() {
        return true;
    }

    [
        dev.display_name.as_deref(),
        Some(dev.id.as_str()),
        dev.bio.as_deref(),
        dev.location.as_deref(),
        dev.company.as_deref(),
    ]
    .into_iter()
    .flatten()
    .any(|field| field.to_lowercase().contains(needle))
}
