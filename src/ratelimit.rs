use crate::cache::{keys, CacheLayer};
use crate::models::LinkRecord;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// Buckets must outlive the longest supported window so a sum never reads a
/// bucket that expired mid-window.
pub const BUCKET_TTL: Duration = Duration::from_secs(120);

/// Default trailing window evaluated against a link's per-minute limit.
pub const WINDOW_SECONDS: i64 = 60;

/// Per-link sliding window over per-second click buckets.
///
/// The window is inclusive of both endpoints: a 60-second window reads the
/// 61 buckets for `now - 60 ..= now`. Missing or unparseable buckets count
/// as zero.
#[derive(Clone)]
pub struct RateLimiter {
    cache: Arc<dyn CacheLayer>,
}

/// Snapshot of a link's window, served to status callers.
#[derive(Debug, Clone, Serialize)]
pub struct RateLimitStatus {
    pub clicks_in_window: i64,
    pub remaining: i64,
    pub is_limited: bool,
}

fn unix_now() -> i64 {
    chrono::Utc::now().timestamp()
}

impl RateLimiter {
    pub fn new(cache: Arc<dyn CacheLayer>) -> Self {
        Self { cache }
    }

    /// Count one click in the current second's bucket and refresh its
    /// expiry. Best-effort: a cache failure skips the tick, which degrades
    /// rate limiting rather than the redirect.
    pub async fn record_tick(&self, link_id: i64) {
        self.record_tick_at(link_id, unix_now()).await;
    }

    /// Tick a specific second's bucket. Used by `record_tick` and by tests
    /// that need deterministic bucket placement.
    pub async fn record_tick_at(&self, link_id: i64, unix_second: i64) {
        let key = keys::rate_bucket(link_id, unix_second);

        if let Err(err) = self.cache.incr(&key).await {
            warn!(link_id, error = %err, "cache unavailable, rate tick skipped");
            return;
        }

        if let Err(err) = self.cache.expire(&key, BUCKET_TTL).await {
            warn!(link_id, error = %err, "failed to set bucket expiry");
        }
    }

    /// Sum the buckets for the trailing `window_seconds` (inclusive).
    /// A cache failure yields zero, which disables enforcement rather than
    /// blocking resolvable links.
    pub async fn recent_click_count(&self, link_id: i64, window_seconds: i64) -> i64 {
        self.recent_click_count_at(link_id, window_seconds, unix_now())
            .await
    }

    pub async fn recent_click_count_at(
        &self,
        link_id: i64,
        window_seconds: i64,
        now: i64,
    ) -> i64 {
        let mut total = 0i64;

        for second in (now - window_seconds)..=now {
            match self.cache.get(&keys::rate_bucket(link_id, second)).await {
                Ok(Some(value)) => total += value.parse::<i64>().unwrap_or(0),
                Ok(None) => {}
                Err(err) => {
                    warn!(link_id, error = %err, "cache unavailable, treating window as empty");
                    return 0;
                }
            }
        }

        total
    }

    /// Whether a click on this link must be denied right now. Links without
    /// the rate-limit flag bypass the bucket reads entirely.
    pub async fn is_limited(&self, link: &LinkRecord) -> bool {
        if !link.is_rate_limited || link.max_per_minute <= 0 {
            return false;
        }

        let recent = self.recent_click_count(link.id, WINDOW_SECONDS).await;
        recent >= link.max_per_minute
    }

    /// Window snapshot for the status endpoint of the surrounding system.
    pub async fn status(&self, link: &LinkRecord) -> RateLimitStatus {
        let clicks_in_window = self.recent_click_count(link.id, WINDOW_SECONDS).await;
        RateLimitStatus {
            clicks_in_window,
            remaining: (link.max_per_minute - clicks_in_window).max(0),
            is_limited: link.is_rate_limited && clicks_in_window >= link.max_per_minute,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;

    #[tokio::test]
    async fn test_window_sums_recent_buckets() {
        let limiter = RateLimiter::new(Arc::new(MemoryCache::new()));
        let now = 1_700_000_000;

        limiter.record_tick_at(5, now).await;
        limiter.record_tick_at(5, now).await;
        limiter.record_tick_at(5, now - 30).await;
        // On the inclusive boundary
        limiter.record_tick_at(5, now - 60).await;

        assert_eq!(limiter.recent_click_count_at(5, 60, now).await, 4);
    }

    #[tokio::test]
    async fn test_window_excludes_older_buckets() {
        let limiter = RateLimiter::new(Arc::new(MemoryCache::new()));
        let now = 1_700_000_000;

        limiter.record_tick_at(5, now - 61).await;
        limiter.record_tick_at(5, now - 90).await;

        assert_eq!(limiter.recent_click_count_at(5, 60, now).await, 0);
    }

    #[tokio::test]
    async fn test_malformed_bucket_counts_as_zero() {
        let cache = Arc::new(MemoryCache::new());
        let now = 1_700_000_000;
        cache
            .set_with_ttl(&keys::rate_bucket(5, now), "junk", BUCKET_TTL)
            .await
            .unwrap();

        let limiter = RateLimiter::new(cache);
        assert_eq!(limiter.recent_click_count_at(5, 60, now).await, 0);
    }
}
