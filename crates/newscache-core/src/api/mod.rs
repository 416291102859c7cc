//! Remote content sources.
//!
//! This module defines the `RemoteSource` trait the orchestrator fetches
//! through, and `HttpRemoteSource`, which talks to the news/events JSON API.

pub mod client;
pub mod error;
pub mod source;

pub use client::HttpRemoteSource;
pub use error::RemoteError;
pub use source::RemoteSource;
