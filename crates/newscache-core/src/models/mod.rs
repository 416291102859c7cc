//! Data models for cached content.
//!
//! - `ContentItem`: a news article or event with optional location

pub mod content;

pub use content::ContentItem;
