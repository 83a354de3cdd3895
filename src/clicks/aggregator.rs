use crate::cache::{keys, CacheLayer};
use crate::storage::Storage;
use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time;
use tracing::{debug, error, info, warn};

pub const DEFAULT_AGGREGATE_INTERVAL: Duration = Duration::from_secs(5);

/// Folds pending click counters into the durable store.
///
/// Per dirty link the ordering is fixed: durable increment first, then
/// counter delete, then dirty-set removal. A crash after the increment but
/// before the delete re-applies the delta on the next pass.
pub struct ClickAggregator {
    cache: Arc<dyn CacheLayer>,
    storage: Arc<dyn Storage>,
    interval: Duration,
}

impl ClickAggregator {
    pub fn new(cache: Arc<dyn CacheLayer>, storage: Arc<dyn Storage>) -> Self {
        Self {
            cache,
            storage,
            interval: DEFAULT_AGGREGATE_INTERVAL,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// One aggregation pass over the dirty set. Returns the number of links
    /// folded. A failure mid-pass leaves the remaining links dirty; the next
    /// pass picks them up.
    pub async fn aggregate_once(&self) -> Result<u64> {
        let dirty = self
            .cache
            .set_members(keys::DIRTY_LINKS)
            .await
            .context("failed to read dirty set")?;

        if dirty.is_empty() {
            return Ok(0);
        }

        let mut folded = 0u64;

        for member in dirty {
            let Ok(link_id) = member.parse::<i64>() else {
                warn!(member, "discarding malformed dirty-set member");
                self.cache
                    .set_remove(keys::DIRTY_LINKS, &member)
                    .await
                    .context("failed to discard dirty-set member")?;
                continue;
            };

            let counter_key = keys::counter(link_id);
            let pending = match self
                .cache
                .get(&counter_key)
                .await
                .context("failed to read pending counter")?
            {
                Some(value) => match value.parse::<i64>() {
                    Ok(n) => n,
                    Err(_) => {
                        // A junk counter would make every later INCR fail,
                        // so it cannot stay behind once the link goes clean
                        warn!(link_id, value, "discarding non-numeric pending counter");
                        self.cache
                            .delete(&counter_key)
                            .await
                            .context("failed to discard pending counter")?;
                        0
                    }
                },
                None => 0,
            };

            if pending > 0 {
                self.storage
                    .increment_clicks(link_id, pending)
                    .await
                    .with_context(|| format!("failed to fold clicks for link {link_id}"))?;

                // Only after the durable write may the pending state go away
                self.cache
                    .delete(&counter_key)
                    .await
                    .context("failed to clear pending counter")?;

                debug!(link_id, pending, "folded pending clicks");
                folded += 1;
            }

            self.cache
                .set_remove(keys::DIRTY_LINKS, &member)
                .await
                .context("failed to clear dirty-set membership")?;
        }

        Ok(folded)
    }

    /// Run aggregation on a fixed interval until shutdown. Transient errors
    /// are logged and retried on the next tick; the loop never terminates on
    /// its own.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        info!(interval_secs = self.interval.as_secs(), "click aggregator started");
        let mut ticker = time::interval(self.interval);
        ticker.tick().await; // immediate first tick

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(err) = self.aggregate_once().await {
                        error!(error = %err, "aggregation pass failed, will retry");
                    }
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        // Final fold so a clean shutdown leaves no pending clicks
                        if let Err(err) = self.aggregate_once().await {
                            error!(error = %err, "final aggregation pass failed");
                        }
                        info!("click aggregator stopped");
                        break;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;
    use crate::clicks::ClickRecorder;
    use crate::storage::{NewLinkOptions, SqliteStorage};

    async fn sqlite_storage() -> Arc<dyn Storage> {
        let storage = SqliteStorage::new("sqlite::memory:", 5).await.unwrap();
        storage.init().await.unwrap();
        Arc::new(storage)
    }

    #[tokio::test]
    async fn test_fold_clears_counter_and_dirty_set() {
        let cache = Arc::new(MemoryCache::new());
        let storage = sqlite_storage().await;
        let link = storage
            .create_with_code("agg1", "https://example.com", NewLinkOptions::default())
            .await
            .unwrap();

        let recorder = ClickRecorder::new(cache.clone());
        for _ in 0..4 {
            recorder.record_click(link.id).await;
        }

        let aggregator = ClickAggregator::new(cache.clone(), storage.clone());
        assert_eq!(aggregator.aggregate_once().await.unwrap(), 1);

        let stored = storage.find_by_id(link.id).await.unwrap().unwrap();
        assert_eq!(stored.clicks, 4);
        assert_eq!(cache.get(&keys::counter(link.id)).await.unwrap(), None);
        assert!(cache.set_members(keys::DIRTY_LINKS).await.unwrap().is_empty());

        // Idempotent when nothing is dirty
        assert_eq!(aggregator.aggregate_once().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_malformed_members_and_counters_are_dropped() {
        let cache = Arc::new(MemoryCache::new());
        let storage = sqlite_storage().await;

        cache.set_add(keys::DIRTY_LINKS, "not-an-id").await.unwrap();
        cache.set_add(keys::DIRTY_LINKS, "9").await.unwrap();
        cache
            .set_with_ttl(&keys::counter(9), "garbage", Duration::from_secs(60))
            .await
            .unwrap();

        let aggregator = ClickAggregator::new(cache.clone(), storage);
        // Malformed counter counts as zero, so nothing folds
        assert_eq!(aggregator.aggregate_once().await.unwrap(), 0);
        assert!(cache.set_members(keys::DIRTY_LINKS).await.unwrap().is_empty());

        // The junk counter is gone too, so the next INCR starts clean
        assert_eq!(cache.get(&keys::counter(9)).await.unwrap(), None);
        assert_eq!(cache.incr(&keys::counter(9)).await.unwrap(), 1);
    }
}
