use crate::cache::{CacheError, CacheLayer, CacheResult};
use async_trait::async_trait;
use dashmap::DashMap;
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// In-process cache backend over a concurrent map with lazy expiry.
///
/// A read that observes an expired entry removes it, so keys written once
/// and never refreshed (rate buckets especially) do not pile up for the
/// lifetime of the process. Atomicity per key comes from the map's entry
/// API, which holds the shard lock for the whole read-modify-write,
/// matching the atomic increment the hot path relies on.
#[derive(Clone, Default)]
pub struct MemoryCache {
    entries: Arc<DashMap<String, Entry>>,
}

#[derive(Debug, Clone)]
enum Value {
    // Counters are strings too, mirroring how redis stores them
    Str(String),
    Set(HashSet<String>),
    List(VecDeque<String>),
}

#[derive(Debug, Clone)]
struct Entry {
    value: Value,
    expires_at: Option<Instant>,
}

impl Entry {
    fn fresh(value: Value, ttl: Option<Duration>) -> Self {
        Self {
            value,
            expires_at: ttl.map(|t| Instant::now() + t),
        }
    }

    fn is_expired(&self) -> bool {
        matches!(self.expires_at, Some(at) if at <= Instant::now())
    }
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live (unexpired) keys, for tests and diagnostics
    pub fn len(&self) -> usize {
        self.entries.iter().filter(|e| !e.is_expired()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remaining time to live for a key, for tests and diagnostics.
    /// `None` for missing, expired, or persistent entries.
    pub fn ttl(&self, key: &str) -> Option<Duration> {
        let entry = self.entries.get(key)?;
        let at = entry.expires_at?;
        at.checked_duration_since(Instant::now())
    }

    fn purge_expired(&self, key: &str) {
        self.entries.remove_if(key, |_, entry| entry.is_expired());
    }
}

#[async_trait]
impl CacheLayer for MemoryCache {
    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        if let Some(entry) = self.entries.get(key) {
            if !entry.is_expired() {
                return Ok(match &entry.value {
                    Value::Str(s) => Some(s.clone()),
                    _ => None,
                });
            }
        }
        self.purge_expired(key);
        Ok(None)
    }

    async fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> CacheResult<()> {
        self.entries.insert(
            key.to_string(),
            Entry::fresh(Value::Str(value.to_string()), Some(ttl)),
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> CacheResult<()> {
        self.entries.remove(key);
        Ok(())
    }

    async fn incr(&self, key: &str) -> CacheResult<i64> {
        let mut entry = self
            .entries
            .entry(key.to_string())
            .or_insert_with(|| Entry::fresh(Value::Str("0".to_string()), None));

        if entry.is_expired() {
            *entry = Entry::fresh(Value::Str("0".to_string()), None);
        }

        match &mut entry.value {
            Value::Str(s) => {
                let current: i64 = s
                    .parse()
                    .map_err(|_| CacheError::Operation(format!("non-numeric value at {key}")))?;
                let next = current + 1;
                *s = next.to_string();
                Ok(next)
            }
            _ => Err(CacheError::Operation(format!(
                "incr on non-string value at {key}"
            ))),
        }
    }

    async fn expire(&self, key: &str, ttl: Duration) -> CacheResult<()> {
        if let Some(mut entry) = self.entries.get_mut(key) {
            if !entry.is_expired() {
                entry.expires_at = Some(Instant::now() + ttl);
            }
        }
        Ok(())
    }

    async fn set_add(&self, key: &str, member: &str) -> CacheResult<()> {
        let mut entry = self
            .entries
            .entry(key.to_string())
            .or_insert_with(|| Entry::fresh(Value::Set(HashSet::new()), None));

        if entry.is_expired() {
            *entry = Entry::fresh(Value::Set(HashSet::new()), None);
        }

        match &mut entry.value {
            Value::Set(set) => {
                set.insert(member.to_string());
                Ok(())
            }
            _ => Err(CacheError::Operation(format!(
                "sadd on non-set value at {key}"
            ))),
        }
    }

    async fn set_remove(&self, key: &str, member: &str) -> CacheResult<()> {
        if let Some(mut entry) = self.entries.get_mut(key) {
            if let Value::Set(set) = &mut entry.value {
                set.remove(member);
            }
        }
        Ok(())
    }

    async fn set_members(&self, key: &str) -> CacheResult<Vec<String>> {
        if let Some(entry) = self.entries.get(key) {
            if !entry.is_expired() {
                return Ok(match &entry.value {
                    Value::Set(set) => set.iter().cloned().collect(),
                    _ => Vec::new(),
                });
            }
        }
        self.purge_expired(key);
        Ok(Vec::new())
    }

    async fn list_push(&self, key: &str, value: &str) -> CacheResult<()> {
        let mut entry = self
            .entries
            .entry(key.to_string())
            .or_insert_with(|| Entry::fresh(Value::List(VecDeque::new()), None));

        if entry.is_expired() {
            *entry = Entry::fresh(Value::List(VecDeque::new()), None);
        }

        match &mut entry.value {
            Value::List(list) => {
                list.push_back(value.to_string());
                Ok(())
            }
            _ => Err(CacheError::Operation(format!(
                "push on non-list value at {key}"
            ))),
        }
    }

    async fn list_pop(&self, key: &str) -> CacheResult<Option<String>> {
        if let Some(mut entry) = self.entries.get_mut(key) {
            if !entry.is_expired() {
                return Ok(match &mut entry.value {
                    Value::List(list) => list.pop_front(),
                    _ => None,
                });
            }
        }
        self.purge_expired(key);
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_incr_starts_at_zero() {
        let cache = MemoryCache::new();
        assert_eq!(cache.incr("c").await.unwrap(), 1);
        assert_eq!(cache.incr("c").await.unwrap(), 2);
        assert_eq!(cache.get("c").await.unwrap(), Some("2".to_string()));
    }

    #[tokio::test]
    async fn test_ttl_expiry_is_lazy() {
        let cache = MemoryCache::new();
        cache
            .set_with_ttl("k", "v", Duration::from_millis(10))
            .await
            .unwrap();
        assert_eq!(cache.get("k").await.unwrap(), Some("v".to_string()));

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(cache.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_expired_entries_are_purged_on_read() {
        let cache = MemoryCache::new();
        for second in 0..50 {
            cache
                .set_with_ttl(&format!("rate:1:{second}"), "1", Duration::from_millis(5))
                .await
                .unwrap();
        }
        tokio::time::sleep(Duration::from_millis(20)).await;

        for second in 0..50 {
            assert_eq!(cache.get(&format!("rate:1:{second}")).await.unwrap(), None);
        }

        // The reads removed the dead buckets, not just hid them
        assert_eq!(cache.entries.len(), 0);
    }

    #[tokio::test]
    async fn test_set_membership() {
        let cache = MemoryCache::new();
        cache.set_add("s", "1").await.unwrap();
        cache.set_add("s", "2").await.unwrap();
        cache.set_add("s", "1").await.unwrap();

        let mut members = cache.set_members("s").await.unwrap();
        members.sort();
        assert_eq!(members, vec!["1", "2"]);

        cache.set_remove("s", "1").await.unwrap();
        assert_eq!(cache.set_members("s").await.unwrap(), vec!["2"]);
    }

    #[tokio::test]
    async fn test_list_is_fifo() {
        let cache = MemoryCache::new();
        cache.list_push("q", "a").await.unwrap();
        cache.list_push("q", "b").await.unwrap();

        assert_eq!(cache.list_pop("q").await.unwrap(), Some("a".to_string()));
        assert_eq!(cache.list_pop("q").await.unwrap(), Some("b".to_string()));
        assert_eq!(cache.list_pop("q").await.unwrap(), None);
    }
}
