//! # Watch Store
//!
//! This crate provides the watch data model and the durable registry that
//! backs the availability monitor. A watch is a user's standing request to
//! be told when campsites open up at a campground within a date range; the
//! collection lives in memory behind a mutex and is mirrored to a JSON file
//! on every mutation.

/// Types for watches and watch creation
mod watch_types;
pub use watch_types::*;

/// File-backed watch collection
mod store;
pub use store::*;
