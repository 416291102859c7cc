use std::future::Future;

use super::RemoteError;
use crate::models::ContentItem;

/// The document store behind the cache.
///
/// Implementations may be slow and may fail; callers treat every
/// `RemoteError` the same way.
pub trait RemoteSource: Send + Sync {
    fn fetch(&self, key: &str)
        -> impl Future<Output = Result<Vec<ContentItem>, RemoteError>> + Send;
}
