use crate::cache::{CacheError, CacheLayer, CacheResult};
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use std::time::Duration;
use tracing::debug;

/// Redis-backed cache layer.
///
/// Uses a connection manager so transient connection loss is retried inside
/// the client; persistent unavailability surfaces as `CacheError`, which the
/// hot path swallows per the degraded-mode policy.
#[derive(Clone)]
pub struct RedisCache {
    conn: ConnectionManager,
}

fn map_redis_error(operation: &str, err: redis::RedisError) -> CacheError {
    let message = format!("{operation}: {err}");
    if err.is_timeout() {
        CacheError::Timeout(message)
    } else {
        CacheError::Operation(message)
    }
}

impl RedisCache {
    pub async fn connect(url: &str) -> anyhow::Result<Self> {
        let client = redis::Client::open(url)?;
        let conn = ConnectionManager::new(client).await?;
        debug!("connected to redis cache layer");
        Ok(Self { conn })
    }
}

#[async_trait]
impl CacheLayer for RedisCache {
    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        let mut conn = self.conn.clone();
        conn.get(key)
            .await
            .map_err(|e| map_redis_error("GET", e))
    }

    async fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> CacheResult<()> {
        let mut conn = self.conn.clone();
        conn.set_ex(key, value, ttl.as_secs())
            .await
            .map_err(|e| map_redis_error("SETEX", e))
    }

    async fn delete(&self, key: &str) -> CacheResult<()> {
        let mut conn = self.conn.clone();
        conn.del(key)
            .await
            .map_err(|e| map_redis_error("DEL", e))
    }

    async fn incr(&self, key: &str) -> CacheResult<i64> {
        let mut conn = self.conn.clone();
        conn.incr(key, 1i64)
            .await
            .map_err(|e| map_redis_error("INCR", e))
    }

    async fn expire(&self, key: &str, ttl: Duration) -> CacheResult<()> {
        let mut conn = self.conn.clone();
        conn.expire(key, ttl.as_secs() as i64)
            .await
            .map_err(|e| map_redis_error("EXPIRE", e))
    }

    async fn set_add(&self, key: &str, member: &str) -> CacheResult<()> {
        let mut conn = self.conn.clone();
        conn.sadd(key, member)
            .await
            .map_err(|e| map_redis_error("SADD", e))
    }

    async fn set_remove(&self, key: &str, member: &str) -> CacheResult<()> {
        let mut conn = self.conn.clone();
        conn.srem(key, member)
            .await
            .map_err(|e| map_redis_error("SREM", e))
    }

    async fn set_members(&self, key: &str) -> CacheResult<Vec<String>> {
        let mut conn = self.conn.clone();
        conn.smembers(key)
            .await
            .map_err(|e| map_redis_error("SMEMBERS", e))
    }

    async fn list_push(&self, key: &str, value: &str) -> CacheResult<()> {
        let mut conn = self.conn.clone();
        conn.rpush(key, value)
            .await
            .map_err(|e| map_redis_error("RPUSH", e))
    }

    async fn list_pop(&self, key: &str) -> CacheResult<Option<String>> {
        let mut conn = self.conn.clone();
        conn.lpop(key, None)
            .await
            .map_err(|e| map_redis_error("LPOP", e))
    }
}
