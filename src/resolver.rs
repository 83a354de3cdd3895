use crate::cache::{keys, CacheLayer};
use crate::models::LinkRecord;
use crate::storage::Storage;
use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Cached copies live for an hour; updates and deletes invalidate eagerly.
pub const LINK_CACHE_TTL: Duration = Duration::from_secs(60 * 60);

/// Cache-aside lookup of a link by short code.
///
/// A cache failure on either the read or the populate side degrades to
/// durable-store-only operation; the only errors that propagate are from the
/// durable store itself, since no more authoritative source exists.
pub struct Resolver {
    cache: Arc<dyn CacheLayer>,
    storage: Arc<dyn Storage>,
    ttl: Duration,
}

impl Resolver {
    pub fn new(cache: Arc<dyn CacheLayer>, storage: Arc<dyn Storage>) -> Self {
        Self {
            cache,
            storage,
            ttl: LINK_CACHE_TTL,
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Resolve a short code to its link record. `Ok(None)` means the code
    /// has no durable record (the caller maps it to 404).
    ///
    /// The cached `clicks` value is a snapshot from populate time and must
    /// not be treated as the live total; pending increments live in the
    /// cache counters until the aggregator folds them in.
    pub async fn resolve(&self, short_code: &str) -> Result<Option<LinkRecord>> {
        let key = keys::link(short_code);

        match self.cache.get(&key).await {
            Ok(Some(cached)) => match serde_json::from_str::<LinkRecord>(&cached) {
                Ok(record) => {
                    debug!(short_code, "cache hit");
                    return Ok(Some(record));
                }
                Err(err) => {
                    warn!(short_code, error = %err, "dropping undecodable cache entry");
                    if let Err(err) = self.cache.delete(&key).await {
                        warn!(short_code, error = %err, "failed to drop cache entry");
                    }
                }
            },
            Ok(None) => {}
            Err(err) => {
                warn!(short_code, error = %err, "cache read failed, falling back to durable store");
            }
        }

        let Some(record) = self.storage.find_by_code(short_code).await? else {
            return Ok(None);
        };
        debug!(short_code, "cache miss, populated from durable store");

        match serde_json::to_string(&record) {
            Ok(payload) => {
                if let Err(err) = self.cache.set_with_ttl(&key, &payload, self.ttl).await {
                    warn!(short_code, error = %err, "cache populate failed, continuing uncached");
                }
            }
            Err(err) => {
                warn!(short_code, error = %err, "failed to serialize link for caching");
            }
        }

        Ok(Some(record))
    }

    /// Drop the cached copy for a short code. Called after any mutation of
    /// the underlying record so readers never see a stale destination.
    pub async fn invalidate(&self, short_code: &str) {
        if let Err(err) = self.cache.delete(&keys::link(short_code)).await {
            warn!(short_code, error = %err, "cache invalidation failed, entry will age out");
        }
    }
}
