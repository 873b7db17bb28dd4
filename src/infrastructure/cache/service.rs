//! Cache service trait and error types.

use async_trait::async_trait;
use std::fmt;

/// Errors that can occur during cache operations.
#[derive(Debug)]
pub enum CacheError {
    ConnectionError(String),
    OperationError(String),
}

impl fmt::Display for CacheError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::ConnectionError(e) => write!(f, "Cache connection error: {}", e),
            Self::OperationError(e) => write!(f, "Cache operation error: {}", e),
        }
    }
}

impl std::error::Error for CacheError {}

/// Result type for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;

/// Key-value cache with TTL, shared by all service instances.
///
/// Values are JSON strings; callers own serialization. Implementations must
/// fail open: a broken cache degrades to a store read, never to a failed
/// redirect.
///
/// # Implementations
///
/// - [`crate::infrastructure::cache::RedisCache`] - Redis-backed, the intended deployment
/// - [`crate::infrastructure::cache::MemoryCache`] - In-process map for tests and single-node setups
/// - [`crate::infrastructure::cache::NullCache`] - No-op for disabled caching
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CacheService: Send + Sync {
    /// Retrieves a value.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(value))` on cache hit
    /// - `Ok(None)` on cache miss or backend error (fail-open)
    async fn get(&self, key: &str) -> CacheResult<Option<String>>;

    /// Stores a value with a TTL in seconds.
    ///
    /// Implementations log backend errors and return `Ok(())` so the request
    /// flow is never disrupted.
    async fn set(&self, key: &str, value: &str, ttl_seconds: u64) -> CacheResult<()>;

    /// Removes a key. Used for invalidation on rule mutations.
    async fn del(&self, key: &str) -> CacheResult<()>;

    /// Checks if the cache backend is healthy.
    async fn health_check(&self) -> bool;
}
