use std::collections::HashSet;
use std::fmt;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

/// Concurrency-safe accumulation of monitoring counters for the periodic
/// report. Purely observational: nothing recorded here ever feeds back into
/// planning or matching.
pub struct StatsTracker {
    inner: Mutex<StatsInner>,
}

#[derive(Debug)]
struct StatsInner {
    requests: u64,
    notified_watches: Vec<Uuid>,
    active_watches: HashSet<Uuid>,
    active_users: HashSet<String>,
    active_days: HashSet<NaiveDate>,
    since: DateTime<Utc>,
}

impl StatsInner {
    fn new() -> Self {
        Self {
            requests: 0,
            notified_watches: Vec::new(),
            active_watches: HashSet::new(),
            active_users: HashSet::new(),
            active_days: HashSet::new(),
            since: Utc::now(),
        }
    }
}

impl StatsTracker {
    /// Create a tracker with zeroed counters and the baseline set to now.
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(StatsInner::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, StatsInner> {
        // A poisoned lock only means another thread panicked mid-update;
        // the counters themselves are still usable.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Count `count` outbound availability requests.
    pub fn record_requests(&self, count: usize) {
        self.lock().requests += count as u64;
    }

    /// Record that a notification went out for a watch.
    pub fn record_notification(&self, watch_id: Uuid) {
        self.lock().notified_watches.push(watch_id);
    }

    /// Mark a watch as active in this reporting period. Idempotent.
    pub fn add_active_watch(&self, watch_id: Uuid) {
        self.lock().active_watches.insert(watch_id);
    }

    /// Mark a user as having at least one active watch. Idempotent.
    pub fn add_active_user(&self, user_id: &str) {
        self.lock().active_users.insert(user_id.to_string());
    }

    /// Mark a calendar day as being tracked. Idempotent.
    pub fn add_active_day(&self, day: NaiveDate) {
        self.lock().active_days.insert(day);
    }

    /// Copy out the current counters.
    pub fn snapshot(&self) -> StatsSnapshot {
        let inner = self.lock();
        let mut active_users: Vec<String> = inner.active_users.iter().cloned().collect();
        active_users.sort();

        StatsSnapshot {
            requests: inner.requests,
            notifications_sent: inner.notified_watches.len() as u64,
            notified_watches: inner.notified_watches.clone(),
            active_watches: inner.active_watches.len(),
            active_users,
            active_days: inner.active_days.len(),
            since: inner.since,
        }
    }

    /// Zero the counters, clear the sets and restart the elapsed-time
    /// baseline. Only the operator's scheduled report task calls this; the
    /// monitoring loop never resets anything.
    pub fn reset(&self) {
        *self.lock() = StatsInner::new();
    }
}

/// Point-in-time copy of the tracker's counters.
#[derive(Debug, Clone)]
pub struct StatsSnapshot {
    /// Availability requests issued since the baseline
    pub requests: u64,
    /// Notifications delivered since the baseline
    pub notifications_sent: u64,
    /// Watch ids notified, in delivery order
    pub notified_watches: Vec<Uuid>,
    /// Distinct watches seen active
    pub active_watches: usize,
    /// Distinct users with an active watch, sorted
    pub active_users: Vec<String>,
    /// Distinct calendar days being tracked
    pub active_days: usize,
    /// When the counters were last reset
    pub since: DateTime<Utc>,
}

impl fmt::Display for StatsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let elapsed_hours = (Utc::now() - self.since).num_seconds() as f64 / 3600.0;
        let requests_per_hour = if elapsed_hours > 0.0 {
            self.requests as f64 / elapsed_hours
        } else {
            0.0
        };

        write!(
            f,
            "{} requests over {:.2}h ({:.2}/h), {} notifications, {} active watches across {} users, {} days tracked",
            self.requests,
            elapsed_hours,
            requests_per_hour,
            self.notifications_sent,
            self.active_watches,
            self.active_users.len(),
            self.active_days,
        )
    }
}
