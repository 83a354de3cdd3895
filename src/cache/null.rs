use crate::cache::{CacheLayer, CacheResult};
use async_trait::async_trait;
use std::time::Duration;

/// Null-object cache backend for running without a cache layer.
///
/// Every read misses and every write succeeds as a no-op, so the resolver
/// always falls through to the durable store and click accounting is
/// silently skipped. This is the same behavior the hot path converges to
/// when a real backend is unreachable.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullCache;

#[async_trait]
impl CacheLayer for NullCache {
    async fn get(&self, _key: &str) -> CacheResult<Option<String>> {
        Ok(None)
    }

    async fn set_with_ttl(&self, _key: &str, _value: &str, _ttl: Duration) -> CacheResult<()> {
        Ok(())
    }

    async fn delete(&self, _key: &str) -> CacheResult<()> {
        Ok(())
    }

    async fn incr(&self, _key: &str) -> CacheResult<i64> {
        Ok(0)
    }

    async fn expire(&self, _key: &str, _ttl: Duration) -> CacheResult<()> {
        Ok(())
    }

    async fn set_add(&self, _key: &str, _member: &str) -> CacheResult<()> {
        Ok(())
    }

    async fn set_remove(&self, _key: &str, _member: &str) -> CacheResult<()> {
        Ok(())
    }

    async fn set_members(&self, _key: &str) -> CacheResult<Vec<String>> {
        Ok(Vec::new())
    }

    async fn list_push(&self, _key: &str, _value: &str) -> CacheResult<()> {
        Ok(())
    }

    async fn list_pop(&self, _key: &str) -> CacheResult<Option<String>> {
        Ok(None)
    }
}
