use crate::analytics::{AnalyticsRelay, ClickEvent};
use crate::clicks::ClickRecorder;
use crate::models::LinkRecord;
use crate::ratelimit::RateLimiter;
use crate::resolver::Resolver;
use anyhow::Result;
use std::sync::Arc;
use tracing::debug;

/// What the HTTP layer should do with a resolution request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RedirectOutcome {
    /// Send the visitor to the destination URL
    Redirect(String),
    /// Short code has no record (404)
    NotFound,
    /// Link exists but its expiry has passed (410)
    Expired,
    /// Link is password protected; send the visitor to the verification flow
    PasswordRequired,
    /// Per-link sliding window is full; the denial is not counted as a click
    RateLimited,
}

/// Request attributes the hot path forwards into analytics.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    pub region: Option<String>,
    pub user_agent: Option<String>,
}

/// Composition of the data-plane components behind a single entry point for
/// the redirect handler.
pub struct RedirectFlow {
    resolver: Arc<Resolver>,
    limiter: RateLimiter,
    recorder: ClickRecorder,
    relay: AnalyticsRelay,
}

impl RedirectFlow {
    pub fn new(
        resolver: Arc<Resolver>,
        limiter: RateLimiter,
        recorder: ClickRecorder,
        relay: AnalyticsRelay,
    ) -> Self {
        Self {
            resolver,
            limiter,
            recorder,
            relay,
        }
    }

    /// Evaluate a public resolution request.
    ///
    /// Only durable-store failures propagate; every cache-layer problem has
    /// already degraded inside the components this composes.
    pub async fn handle(&self, short_code: &str, ctx: &RequestContext) -> Result<RedirectOutcome> {
        let Some(link) = self.resolver.resolve(short_code).await? else {
            return Ok(RedirectOutcome::NotFound);
        };

        if link.is_expired_at(chrono::Utc::now().timestamp()) {
            return Ok(RedirectOutcome::Expired);
        }

        if link.is_protected() {
            debug!(short_code, "protected link, deferring to verification flow");
            return Ok(RedirectOutcome::PasswordRequired);
        }

        if self.limiter.is_limited(&link).await {
            debug!(short_code, "rate limit exceeded, denying click");
            return Ok(RedirectOutcome::RateLimited);
        }

        self.account(&link, ctx).await;
        Ok(RedirectOutcome::Redirect(link.destination_url))
    }

    /// Evaluate a request whose password check already passed upstream.
    /// Identical to `handle` minus the protection gate.
    pub async fn handle_verified(
        &self,
        short_code: &str,
        ctx: &RequestContext,
    ) -> Result<RedirectOutcome> {
        let Some(link) = self.resolver.resolve(short_code).await? else {
            return Ok(RedirectOutcome::NotFound);
        };

        if link.is_expired_at(chrono::Utc::now().timestamp()) {
            return Ok(RedirectOutcome::Expired);
        }

        if self.limiter.is_limited(&link).await {
            return Ok(RedirectOutcome::RateLimited);
        }

        self.account(&link, ctx).await;
        Ok(RedirectOutcome::Redirect(link.destination_url))
    }

    /// Click accounting for an allowed request: pending counter, rate
    /// bucket, analytics event. All best-effort.
    async fn account(&self, link: &LinkRecord, ctx: &RequestContext) {
        self.recorder.record_click(link.id).await;
        self.limiter.record_tick(link.id).await;

        let region = ctx.region.clone().unwrap_or_else(|| "UNKNOWN".to_string());
        self.relay
            .publish(&ClickEvent::new(link.id, region, ctx.user_agent.clone()))
            .await;
    }
}
