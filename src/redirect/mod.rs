//! Transport-free redirect decision pipeline.
//!
//! The HTTP layer resolves a request to a `RedirectOutcome` through this
//! module and owns nothing but the status-code mapping. Policy order is
//! fixed: resolution, expiry, protection, rate limit, then accounting.

pub mod flow;

pub use flow::{RedirectFlow, RedirectOutcome, RequestContext};
