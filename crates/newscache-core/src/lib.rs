//! newscache core - offline-resilient content cache for a local news and
//! events reader.
//!
//! Screens ask a [`ContentService`] for a collection ("news", "events", ...)
//! and always get a list back: fresh from the local [`CacheStore`] when it
//! can be, refreshed from the [`RemoteSource`] when it cannot, and ranked by
//! distance from the reader when a position is known. A [`LoadGuard`] keeps
//! concurrent screens from fetching the same collection twice.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod geo;
pub mod guard;
pub mod models;
pub mod orchestrator;
pub mod utils;

pub use api::{HttpRemoteSource, RemoteError, RemoteSource};
pub use cache::{
    CachePolicy, CacheSnapshot, CacheStats, CacheStore, Clock, Freshness, ManualClock,
    PersistenceError, SystemClock, SCHEMA_VERSION,
};
pub use config::Config;
pub use error::{Error, Result};
pub use geo::{distance_km, format_distance, rank, within_radius, Coordinates};
pub use guard::{LoadGuard, LoadPermit, LoadState};
pub use models::ContentItem;
pub use orchestrator::ContentService;
