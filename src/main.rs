//! Background worker: runs the click aggregator and the analytics consumer
//! against the configured durable store and cache layer. The HTTP frontend
//! runs as its own process and shares state with this one only through the
//! cache layer.

use anyhow::Result;
use boltlink::analytics::{AnalyticsConsumer, AnalyticsRelay};
use boltlink::cache::{CacheLayer, MemoryCache, NullCache, RedisCache};
use boltlink::clicks::ClickAggregator;
use boltlink::config::{CacheBackend, Config, DatabaseBackend};
use boltlink::storage::{PostgresStorage, SqliteStorage, Storage};
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "boltlink-worker", about = "boltlink background worker")]
struct Args {
    /// Run a single aggregation pass and exit (for cron-style deployments)
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let args = Args::parse();
    let config = Config::from_env()?;
    info!("Loaded configuration");

    let storage: Arc<dyn Storage> = match config.database.backend {
        DatabaseBackend::Sqlite => {
            info!("Using SQLite storage: {}", config.database.url);
            Arc::new(SqliteStorage::new(&config.database.url, config.database.max_connections).await?)
        }
        DatabaseBackend::Postgres => {
            info!("Using PostgreSQL storage: {}", config.database.url);
            Arc::new(
                PostgresStorage::new(&config.database.url, config.database.max_connections).await?,
            )
        }
    };
    storage.init().await?;

    let cache: Arc<dyn CacheLayer> = match config.cache.backend {
        CacheBackend::Redis => {
            let url = config
                .cache
                .redis_url
                .as_deref()
                .ok_or_else(|| anyhow::anyhow!("redis backend requires REDIS_URL"))?;
            info!("Using redis cache layer");
            Arc::new(RedisCache::connect(url).await?)
        }
        CacheBackend::Memory => {
            info!("Using in-process cache layer");
            Arc::new(MemoryCache::new())
        }
        CacheBackend::None => {
            info!("Cache layer disabled, running degraded");
            Arc::new(NullCache)
        }
    };

    let aggregator = ClickAggregator::new(Arc::clone(&cache), Arc::clone(&storage))
        .with_interval(Duration::from_secs(config.worker.aggregate_interval_secs));

    if args.once {
        let folded = aggregator.aggregate_once().await?;
        info!(folded, "single aggregation pass complete");
        return Ok(());
    }

    let relay = AnalyticsRelay::new(Arc::clone(&cache));
    let consumer = AnalyticsConsumer::new(relay, Arc::clone(&storage)).with_intervals(
        config.worker.analytics_batch_size,
        Duration::from_millis(config.worker.analytics_poll_ms),
        Duration::from_secs(config.worker.analytics_error_backoff_secs),
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let aggregator_task = tokio::spawn(aggregator.run(shutdown_rx.clone()));
    let consumer_task = tokio::spawn(consumer.run(shutdown_rx));

    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received");
    let _ = shutdown_tx.send(true);

    let _ = tokio::join!(aggregator_task, consumer_task);
    info!("Worker stopped");

    Ok(())
}
