//! Write-behind click accounting.
//!
//! The redirect path bumps a cache-layer counter and marks the link dirty;
//! the aggregator periodically folds pending counters into the durable
//! store. The fold is not transactional across the two stores: a crash
//! between the durable increment and the counter reset re-applies the same
//! delta on the next pass (at-least-once, never under-counting).

pub mod aggregator;
pub mod recorder;

pub use aggregator::ClickAggregator;
pub use recorder::ClickRecorder;
