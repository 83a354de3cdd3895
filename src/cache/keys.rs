//! Key namespace shared by every component that talks to the cache layer.

/// Serialized link record, keyed by short code
pub fn link(short_code: &str) -> String {
    format!("link:{short_code}")
}

/// Pending click counter, keyed by link id
pub fn counter(link_id: i64) -> String {
    format!("link:counter:{link_id}")
}

/// Set of link ids with a nonzero pending counter
pub const DIRTY_LINKS: &str = "dirty_links";

/// Per-second rate-limit bucket
pub fn rate_bucket(link_id: i64, unix_second: i64) -> String {
    format!("rate:{link_id}:{unix_second}")
}

/// FIFO queue of click detail events awaiting the analytics consumer
pub const ANALYTICS_QUEUE: &str = "analytics_queue";
