//! Ordering content by distance from an observer.

use std::cmp::Ordering;

use super::{distance_km, Coordinates};
use crate::models::ContentItem;

/// Order items nearest-first relative to `observer`.
///
/// With no observer the items keep their order and every `distance_km` is
/// cleared. Otherwise every item with coordinates gets a fresh `distance_km`,
/// items without one lose any previous value, and the result is sorted
/// ascending by distance with located items first. The sort is stable: ties and unlocated items keep
/// their incoming relative order.
pub fn rank(items: &[ContentItem], observer: Option<Coordinates>) -> Vec<ContentItem> {
    let mut ranked: Vec<ContentItem> = items
        .iter()
        .cloned()
        .map(|mut item| {
            item.distance_km = observer.zip(item.coordinates).map(|(o, c)| distance_km(o, c));
            item
        })
        .collect();

    if observer.is_none() {
        return ranked;
    }

    ranked.sort_by(|a, b| compare_distance(a.distance_km, b.distance_km));
    ranked
}

/// Rank, then keep only items no further than `radius_km` from the observer.
///
/// Items without coordinates cannot be placed inside the radius and are
/// dropped.
pub fn within_radius(
    items: &[ContentItem],
    observer: Coordinates,
    radius_km: f64,
) -> Vec<ContentItem> {
    rank(items, Some(observer))
        .into_iter()
        .filter(|item| item.distance_km.is_some_and(|d| d <= radius_km))
        .collect()
}

fn compare_distance(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.total_cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
