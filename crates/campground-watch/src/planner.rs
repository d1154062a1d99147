use std::collections::HashSet;

use chrono::Months;
use tracing::debug;
use watch_store::Watch;

use crate::availability::{FetchTarget, start_of_month};
use crate::stats::StatsTracker;

/// Turn a snapshot of watches into a deduplicated list of fetch targets,
/// one per (campground, month) pair touched by any active watch's window.
///
/// Output order is stable for a given input order: targets appear in the
/// order the contributing watches first produce them. As a side channel,
/// every active watch's id, owner and tracked days are recorded on the
/// stats tracker; that recording is additive and idempotent and never
/// affects the plan.
pub fn plan_requests(watches: &[Watch], stats: &StatsTracker) -> Vec<FetchTarget> {
    let mut seen = HashSet::new();
    let mut targets = Vec::new();

    for watch in watches {
        if !watch.active {
            continue;
        }

        stats.add_active_watch(watch.id);
        stats.add_active_user(&watch.user_id);

        let mut day = watch.start_date;
        while day <= watch.end_date {
            stats.add_active_day(day);
            match day.succ_opt() {
                Some(next) => day = next,
                None => break,
            }
        }

        // One target per calendar month the window overlaps.
        let mut month = start_of_month(watch.start_date);
        while month <= watch.end_date {
            let target = FetchTarget {
                campground_id: watch.campground_id.clone(),
                month_start: month,
            };
            if seen.insert(target.clone()) {
                targets.push(target);
            }
            month = month + Months::new(1);
        }
    }

    debug!("planned {} fetch targets from {} watches", targets.len(), watches.len());

    targets
}
