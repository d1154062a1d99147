//! # Campground Watch
//!
//! The availability-monitoring engine behind the campground watcher. Each
//! cycle turns the active watches into a deduplicated set of monthly
//! availability requests, fetches them concurrently with retry and
//! fail-fast cancellation, cross-references the payloads against every
//! watch's window, and hands the resulting notifications to the delivery
//! side.

/// Availability data model and wire payload
mod availability;
pub use availability::*;

/// Monitoring loop and the delivery seam
mod engine;
pub use engine::*;

/// Concurrent availability fetching with retry and fail-fast batching
mod fetcher;
pub use fetcher::*;

/// Cross-referencing fetched availability against watches
mod matcher;
pub use matcher::*;

/// Planning deduplicated fetch targets from active watches
mod planner;
pub use planner::*;

/// recreation.gov availability client
mod rec_gov_client;
pub use rec_gov_client::*;

/// Counters behind the periodic monitoring report
mod stats;
pub use stats::*;
