use crate::analytics::ClickEvent;
use crate::models::LinkRecord;
use crate::storage::{NewLinkOptions, Storage, StorageError, StorageResult};
use anyhow::Result;
use async_trait::async_trait;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use std::sync::Arc;

pub struct SqliteStorage {
    pool: Arc<SqlitePool>,
}

impl SqliteStorage {
    pub async fn new(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        Ok(Self {
            pool: Arc::new(pool),
        })
    }
}

fn unix_now() -> Result<i64> {
    Ok(std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)?
        .as_secs() as i64)
}

const LINK_COLUMNS: &str = "id, short_code, destination_url, created_at, clicks, \
                            password_hash, expires_at, is_rate_limited, max_per_minute";

#[async_trait]
impl Storage for SqliteStorage {
    async fn init(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS links (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                short_code TEXT NOT NULL UNIQUE,
                destination_url TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                clicks INTEGER NOT NULL DEFAULT 0,
                password_hash TEXT,
                expires_at INTEGER,
                is_rate_limited INTEGER NOT NULL DEFAULT 0,
                max_per_minute INTEGER NOT NULL DEFAULT 100
            )
            "#,
        )
        .execute(self.pool.as_ref())
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_links_short_code ON links(short_code)")
            .execute(self.pool.as_ref())
            .await?;

        // Click detail written in batches by the analytics consumer
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS link_clicks (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                link_id INTEGER NOT NULL,
                region TEXT NOT NULL,
                user_agent TEXT,
                clicked_at INTEGER NOT NULL
            )
            "#,
        )
        .execute(self.pool.as_ref())
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_link_clicks_link_id ON link_clicks(link_id)")
            .execute(self.pool.as_ref())
            .await?;

        Ok(())
    }

    async fn create_with_code(
        &self,
        short_code: &str,
        destination_url: &str,
        options: NewLinkOptions,
    ) -> StorageResult<LinkRecord> {
        let created_at = unix_now().map_err(StorageError::Other)?;

        let result = sqlx::query(
            r#"
            INSERT INTO links (short_code, destination_url, created_at,
                               password_hash, expires_at, is_rate_limited, max_per_minute)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(short_code) DO NOTHING
            "#,
        )
        .bind(short_code)
        .bind(destination_url)
        .bind(created_at)
        .bind(&options.password_hash)
        .bind(options.expires_at)
        .bind(options.is_rate_limited)
        .bind(options.max_per_minute)
        .execute(self.pool.as_ref())
        .await
        .map_err(|e| StorageError::Other(e.into()))?;

        if result.rows_affected() == 0 {
            return Err(StorageError::Conflict);
        }

        let link = sqlx::query_as::<_, LinkRecord>(&format!(
            "SELECT {LINK_COLUMNS} FROM links WHERE short_code = ?"
        ))
        .bind(short_code)
        .fetch_one(self.pool.as_ref())
        .await
        .map_err(|e| StorageError::Other(e.into()))?;

        Ok(link)
    }

    async fn find_by_code(&self, short_code: &str) -> Result<Option<LinkRecord>> {
        let link = sqlx::query_as::<_, LinkRecord>(&format!(
            "SELECT {LINK_COLUMNS} FROM links WHERE short_code = ?"
        ))
        .bind(short_code)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(link)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<LinkRecord>> {
        let link = sqlx::query_as::<_, LinkRecord>(&format!(
            "SELECT {LINK_COLUMNS} FROM links WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(link)
    }

    async fn update_destination(&self, id: i64, destination_url: &str) -> Result<bool> {
        let result = sqlx::query("UPDATE links SET destination_url = ? WHERE id = ?")
            .bind(destination_url)
            .bind(id)
            .execute(self.pool.as_ref())
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let mut tx = self.pool.begin().await?;

        // Click detail rows go first so a crash cannot orphan them
        sqlx::query("DELETE FROM link_clicks WHERE link_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let result = sqlx::query("DELETE FROM links WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(result.rows_affected() > 0)
    }

    async fn increment_clicks(&self, id: i64, delta: i64) -> Result<()> {
        sqlx::query("UPDATE links SET clicks = clicks + ? WHERE id = ?")
            .bind(delta)
            .bind(id)
            .execute(self.pool.as_ref())
            .await?;

        Ok(())
    }

    async fn insert_click_details(&self, events: &[ClickEvent]) -> Result<()> {
        if events.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await?;

        for event in events {
            sqlx::query(
                r#"
                INSERT INTO link_clicks (link_id, region, user_agent, clicked_at)
                VALUES (?, ?, ?, ?)
                "#,
            )
            .bind(event.link_id)
            .bind(&event.region)
            .bind(&event.user_agent)
            .bind(event.enqueued_at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Ok(())
    }
}
