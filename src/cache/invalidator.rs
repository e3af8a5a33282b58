use async_trait::async_trait;
use thiserror::Error;

use super::keys::CacheKey;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CacheError {
    #[error("key namespace `{found}` does not belong to cache `{expected}`")]
    ForeignNamespace { expected: String, found: String },
}

/// Drops cached entries after the underlying data changed.
///
/// Callers treat failures as non-fatal.
#[async_trait]
pub trait CacheInvalidator: Send + Sync {
    async fn invalidate(&self, key: &CacheKey) -> Result<(), CacheError>;
}
