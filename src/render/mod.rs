//! Presentation of the developer collection: map markers and the list view.

pub mod list;
pub mod markers;

pub use markers::{Marker, MarkerLayer, MarkerRenderer, MarkerSet, MarkerSettings};
