//! Click detail relay: fire-and-forget producer on the redirect path, batch
//! consumer in the background. Detail rows are best-effort; the click count
//! itself travels through the aggregator instead.

pub mod consumer;
pub mod models;
pub mod relay;

pub use consumer::AnalyticsConsumer;
pub use models::ClickEvent;
pub use relay::AnalyticsRelay;
