use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache operation failed: {0}")]
    Operation(String),
    #[error("cache operation timed out: {0}")]
    Timeout(String),
}

pub type CacheResult<T> = Result<T, CacheError>;

/// Shared cache used for link entries, pending click counters, rate-limit
/// buckets, the dirty set and the analytics queue.
///
/// All coordination between the hot path and the background loops goes
/// through this interface, so `incr` and the set operations must be atomic
/// per key. Callers on the hot path treat every error from here as a signal
/// to degrade, never to fail the request.
#[async_trait]
pub trait CacheLayer: Send + Sync {
    /// Get a string value
    async fn get(&self, key: &str) -> CacheResult<Option<String>>;

    /// Set a string value with an expiry
    async fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> CacheResult<()>;

    /// Delete a key (string, counter, set or list)
    async fn delete(&self, key: &str) -> CacheResult<()>;

    /// Atomically increment an integer value, creating it at zero first.
    /// Returns the new value.
    async fn incr(&self, key: &str) -> CacheResult<i64>;

    /// Set or refresh the expiry of an existing key
    async fn expire(&self, key: &str, ttl: Duration) -> CacheResult<()>;

    /// Add a member to a set
    async fn set_add(&self, key: &str, member: &str) -> CacheResult<()>;

    /// Remove a member from a set
    async fn set_remove(&self, key: &str, member: &str) -> CacheResult<()>;

    /// All members of a set (empty if the key is absent)
    async fn set_members(&self, key: &str) -> CacheResult<Vec<String>>;

    /// Append a value to the tail of a FIFO list
    async fn list_push(&self, key: &str, value: &str) -> CacheResult<()>;

    /// Pop a value from the head of a FIFO list
    async fn list_pop(&self, key: &str) -> CacheResult<Option<String>>;
}
