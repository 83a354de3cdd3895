use serde::{Deserialize, Serialize};

/// Click detail event pushed by the redirect hot path and written to the
/// durable store in batches by the background consumer.
///
/// Events are best-effort: they live only on the cache-layer queue until the
/// consumer picks them up, and are dropped if the queue medium is down. The
/// click *count* never travels this path.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClickEvent {
    pub link_id: i64,
    /// Coarse region tag supplied by the edge (e.g. a country header);
    /// "UNKNOWN" when the edge provides none.
    pub region: String,
    pub user_agent: Option<String>,
    /// Unix timestamp at enqueue time
    pub enqueued_at: i64,
}

impl ClickEvent {
    pub fn new(link_id: i64, region: impl Into<String>, user_agent: Option<String>) -> Self {
        Self {
            link_id,
            region: region.into(),
            user_agent,
            enqueued_at: chrono::Utc::now().timestamp(),
        }
    }
}
