//! Geospatial helpers: points, great-circle distance, proximity ranking.

pub mod coordinates;
pub mod distance;
pub mod ranking;

pub use coordinates::Coordinates;
pub use distance::{distance_km, format_distance, EARTH_RADIUS_KM};
pub use ranking::{rank, within_radius};
