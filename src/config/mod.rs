use anyhow::Context;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    pub cache: CacheConfig,
    pub worker: WorkerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub backend: DatabaseBackend,
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseBackend {
    Sqlite,
    Postgres,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    Redis,
    Memory,
    /// Null-object backend: run with no cache layer at all (degraded mode)
    None,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    pub backend: CacheBackend,
    #[serde(default)]
    pub redis_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    pub aggregate_interval_secs: u64,
    pub analytics_batch_size: usize,
    pub analytics_poll_ms: u64,
    pub analytics_error_backoff_secs: u64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            aggregate_interval_secs: 5,
            analytics_batch_size: 100,
            analytics_poll_ms: 200,
            analytics_error_backoff_secs: 5,
        }
    }
}

fn env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let backend_str =
            std::env::var("DATABASE_BACKEND").unwrap_or_else(|_| "sqlite".to_string());

        let backend = match backend_str.to_lowercase().as_str() {
            "postgres" | "postgresql" => DatabaseBackend::Postgres,
            _ => DatabaseBackend::Sqlite,
        };

        let database_url =
            std::env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite://./boltlink.db".to_string());

        let max_connections = env_parse("DATABASE_MAX_CONNECTIONS", 5);

        let cache_backend_str =
            std::env::var("CACHE_BACKEND").unwrap_or_else(|_| "redis".to_string());

        let cache_backend = match cache_backend_str.to_lowercase().as_str() {
            "memory" => CacheBackend::Memory,
            "none" => CacheBackend::None,
            "redis" => CacheBackend::Redis,
            other => {
                tracing::warn!(
                    "Unknown CACHE_BACKEND '{other}', falling back to 'redis'. Supported values: redis, memory, none"
                );
                CacheBackend::Redis
            }
        };

        let redis_url = match cache_backend {
            CacheBackend::Redis => Some(
                std::env::var("REDIS_URL").context("REDIS_URL must be set when CACHE_BACKEND=redis")?,
            ),
            _ => None,
        };

        let worker = WorkerConfig {
            aggregate_interval_secs: env_parse("AGGREGATE_INTERVAL_SECS", 5),
            analytics_batch_size: env_parse("ANALYTICS_BATCH_SIZE", 100),
            analytics_poll_ms: env_parse("ANALYTICS_POLL_MS", 200),
            analytics_error_backoff_secs: env_parse("ANALYTICS_ERROR_BACKOFF_SECS", 5),
        };

        Ok(Config {
            database: DatabaseConfig {
                backend,
                url: database_url,
                max_connections,
            },
            cache: CacheConfig {
                backend: cache_backend,
                redis_url,
            },
            worker,
        })
    }
}
