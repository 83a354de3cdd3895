use crate::cache::{keys, CacheLayer};
use std::sync::Arc;
use tracing::warn;

/// Hot-path click accounting: one counter increment plus one dirty-set add,
/// both against the cache layer. No durable write happens here.
#[derive(Clone)]
pub struct ClickRecorder {
    cache: Arc<dyn CacheLayer>,
}

impl ClickRecorder {
    pub fn new(cache: Arc<dyn CacheLayer>) -> Self {
        Self { cache }
    }

    /// Count one click for `link_id`. Best-effort: if the cache layer is
    /// down the click is not counted and the redirect proceeds anyway.
    pub async fn record_click(&self, link_id: i64) {
        if let Err(err) = self.cache.incr(&keys::counter(link_id)).await {
            warn!(link_id, error = %err, "cache unavailable, click not counted");
            return;
        }

        if let Err(err) = self
            .cache
            .set_add(keys::DIRTY_LINKS, &link_id.to_string())
            .await
        {
            // The increment landed but the link is not marked dirty; the
            // counter stays pending until a later click marks it.
            warn!(link_id, error = %err, "failed to mark link dirty");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;

    #[tokio::test]
    async fn test_record_click_increments_and_marks_dirty() {
        let cache = Arc::new(MemoryCache::new());
        let recorder = ClickRecorder::new(cache.clone());

        recorder.record_click(42).await;
        recorder.record_click(42).await;
        recorder.record_click(7).await;

        assert_eq!(
            cache.get(&keys::counter(42)).await.unwrap(),
            Some("2".to_string())
        );
        assert_eq!(
            cache.get(&keys::counter(7)).await.unwrap(),
            Some("1".to_string())
        );

        let mut dirty = cache.set_members(keys::DIRTY_LINKS).await.unwrap();
        dirty.sort();
        assert_eq!(dirty, vec!["42", "7"]);
    }
}
