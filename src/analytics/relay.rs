use crate::analytics::ClickEvent;
use crate::cache::{keys, CacheLayer};
use std::sync::Arc;
use tracing::warn;

/// Fire-and-forget producer / batch consumer over the cache-layer FIFO
/// queue, decoupling click detail recording from the redirect path.
#[derive(Clone)]
pub struct AnalyticsRelay {
    cache: Arc<dyn CacheLayer>,
}

impl AnalyticsRelay {
    pub fn new(cache: Arc<dyn CacheLayer>) -> Self {
        Self { cache }
    }

    /// Append an event to the queue. Best-effort: serialization or queue
    /// failures are logged and dropped, never surfaced to the caller.
    pub async fn publish(&self, event: &ClickEvent) {
        let payload = match serde_json::to_string(event) {
            Ok(payload) => payload,
            Err(err) => {
                warn!(link_id = event.link_id, error = %err, "failed to serialize analytics event");
                return;
            }
        };

        if let Err(err) = self.cache.list_push(keys::ANALYTICS_QUEUE, &payload).await {
            warn!(link_id = event.link_id, error = %err, "analytics queue unavailable, dropping event");
        }
    }

    /// Pop up to `max_items` events from the head of the queue.
    /// Returns fewer (including zero) if the queue is shorter; malformed
    /// payloads are logged and skipped.
    pub async fn consume_batch(&self, max_items: usize) -> Vec<ClickEvent> {
        let mut events = Vec::new();

        for _ in 0..max_items {
            let item = match self.cache.list_pop(keys::ANALYTICS_QUEUE).await {
                Ok(Some(item)) => item,
                Ok(None) => break,
                Err(err) => {
                    warn!(error = %err, "analytics queue unavailable while consuming");
                    break;
                }
            };

            match serde_json::from_str::<ClickEvent>(&item) {
                Ok(event) => events.push(event),
                Err(err) => warn!(error = %err, "skipping malformed analytics event"),
            }
        }

        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;

    #[tokio::test]
    async fn test_publish_consume_fifo() {
        let relay = AnalyticsRelay::new(Arc::new(MemoryCache::new()));

        relay.publish(&ClickEvent::new(1, "US", None)).await;
        relay
            .publish(&ClickEvent::new(2, "DE", Some("curl/8".to_string())))
            .await;

        let batch = relay.consume_batch(10).await;
        assert_eq!(batch.len(), 2);
        assert_eq!(batch[0].link_id, 1);
        assert_eq!(batch[1].link_id, 2);
        assert_eq!(batch[1].user_agent.as_deref(), Some("curl/8"));

        assert!(relay.consume_batch(10).await.is_empty());
    }

    #[tokio::test]
    async fn test_consume_respects_batch_size() {
        let relay = AnalyticsRelay::new(Arc::new(MemoryCache::new()));

        for i in 0..5 {
            relay.publish(&ClickEvent::new(i, "UNKNOWN", None)).await;
        }

        assert_eq!(relay.consume_batch(3).await.len(), 3);
        assert_eq!(relay.consume_batch(3).await.len(), 2);
    }

    #[tokio::test]
    async fn test_malformed_payloads_are_skipped() {
        let cache = Arc::new(MemoryCache::new());
        cache
            .list_push(keys::ANALYTICS_QUEUE, "not json")
            .await
            .unwrap();

        let relay = AnalyticsRelay::new(cache);
        relay.publish(&ClickEvent::new(7, "FR", None)).await;

        let batch = relay.consume_batch(10).await;
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].link_id, 7);
    }
}
