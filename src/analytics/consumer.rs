use crate::analytics::AnalyticsRelay;
use crate::storage::Storage;
use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, error, info};

/// Background loop that drains the analytics queue into durable detail
/// storage. Runs until the shutdown channel fires; storage errors back off
/// and retry rather than terminating the loop.
pub struct AnalyticsConsumer {
    relay: AnalyticsRelay,
    storage: Arc<dyn Storage>,
    batch_size: usize,
    poll_interval: Duration,
    error_backoff: Duration,
}

impl AnalyticsConsumer {
    pub fn new(relay: AnalyticsRelay, storage: Arc<dyn Storage>) -> Self {
        Self {
            relay,
            storage,
            batch_size: 100,
            poll_interval: Duration::from_millis(200),
            error_backoff: Duration::from_secs(5),
        }
    }

    pub fn with_intervals(
        mut self,
        batch_size: usize,
        poll_interval: Duration,
        error_backoff: Duration,
    ) -> Self {
        self.batch_size = batch_size;
        self.poll_interval = poll_interval;
        self.error_backoff = error_backoff;
        self
    }

    /// Consume one batch and persist it. Returns the number of events
    /// written. Exposed for tests and for a final drain at shutdown.
    pub async fn drain_once(&self) -> Result<usize> {
        let batch = self.relay.consume_batch(self.batch_size).await;
        if batch.is_empty() {
            return Ok(0);
        }

        self.storage.insert_click_details(&batch).await?;
        debug!(count = batch.len(), "persisted analytics batch");
        Ok(batch.len())
    }

    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        info!("analytics consumer started");

        loop {
            let sleep_for = match self.drain_once().await {
                Ok(_) => self.poll_interval,
                Err(err) => {
                    error!(error = %err, "failed to persist analytics batch, backing off");
                    self.error_backoff
                }
            };

            tokio::select! {
                _ = tokio::time::sleep(sleep_for) => {}
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        // Best-effort final drain so a clean shutdown loses nothing
                        if let Err(err) = self.drain_once().await {
                            error!(error = %err, "final analytics drain failed");
                        }
                        info!("analytics consumer stopped");
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
    use crate::analytics::ClickEvent;
    use crate::cache::MemoryCache;
    use crate::storage::{NewLinkOptions, SqliteStorage};

    async fn sqlite_storage() -> Arc<dyn Storage> {
        let storage = SqliteStorage::new("sqlite::memory:", 5).await.unwrap();
        storage.init().await.unwrap();
        Arc::new(storage)
    }

    #[tokio::test]
    async fn test_drain_once_persists_batch() {
        let storage = sqlite_storage().await;
        let link = storage
            .create_with_code("ev1", "https://example.com", NewLinkOptions::default())
            .await
            .unwrap();

        let relay = AnalyticsRelay::new(Arc::new(MemoryCache::new()));
        relay.publish(&ClickEvent::new(link.id, "US", None)).await;
        relay.publish(&ClickEvent::new(link.id, "DE", None)).await;

        let consumer = AnalyticsConsumer::new(relay, storage);
        assert_eq!(consumer.drain_once().await.unwrap(), 2);
        assert_eq!(consumer.drain_once().await.unwrap(), 0);
    }
}
