use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Authoritative link row as stored in the durable store.
///
/// `clicks` is eventually consistent: the hot path accumulates increments in
/// the cache layer and the aggregator folds them in periodically, so a value
/// read from here (or from a cached copy) may lag the true total.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct LinkRecord {
    pub id: i64,
    pub short_code: String,
    pub destination_url: String,
    pub created_at: i64,
    pub clicks: i64,
    /// Password hash for protected links; `None` means unprotected.
    pub password_hash: Option<String>,
    /// Unix timestamp after which the link answers 410 Gone.
    pub expires_at: Option<i64>,
    pub is_rate_limited: bool,
    pub max_per_minute: i64,
}

impl LinkRecord {
    pub fn is_protected(&self) -> bool {
        self.password_hash.is_some()
    }

    pub fn is_expired_at(&self, now: i64) -> bool {
        matches!(self.expires_at, Some(at) if at < now)
    }
}
