use crate::analytics::ClickEvent;
use crate::models::LinkRecord;
use anyhow::Result;
use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("short code already exists")]
    Conflict,
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Policy options attached to a link at creation time.
#[derive(Debug, Clone, Default)]
pub struct NewLinkOptions {
    pub password_hash: Option<String>,
    pub expires_at: Option<i64>,
    pub is_rate_limited: bool,
    pub max_per_minute: i64,
}

/// Durable store for link records and click detail.
///
/// The data plane treats this as a key-value-by-code interface with an
/// atomic click increment. The hot path never touches it on a cache hit;
/// the aggregator and the analytics consumer are its main writers.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Initialize the storage (create tables, etc.)
    async fn init(&self) -> Result<()>;

    /// Create a new link with a caller-provided short code
    async fn create_with_code(
        &self,
        short_code: &str,
        destination_url: &str,
        options: NewLinkOptions,
    ) -> StorageResult<LinkRecord>;

    /// Get a link by short code
    async fn find_by_code(&self, short_code: &str) -> Result<Option<LinkRecord>>;

    /// Get a link by id
    async fn find_by_id(&self, id: i64) -> Result<Option<LinkRecord>>;

    /// Change a link's destination. Returns false if the link does not exist.
    async fn update_destination(&self, id: i64, destination_url: &str) -> Result<bool>;

    /// Delete a link and its click detail rows. Returns false if absent.
    async fn delete(&self, id: i64) -> Result<bool>;

    /// Atomically add `delta` to the link's click count
    async fn increment_clicks(&self, id: i64, delta: i64) -> Result<()>;

    /// Bulk-insert click detail rows drained from the analytics queue
    async fn insert_click_details(&self, events: &[ClickEvent]) -> Result<()>;
}
