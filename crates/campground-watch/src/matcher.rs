use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use serde::Serialize;
use tracing::debug;
use uuid::Uuid;
use watch_store::Watch;

use crate::availability::CampgroundAvailability;

/// One bookable (campsite, day) found for a watch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SiteMatch {
    /// Campsite that has the opening
    pub campsite_id: String,
    /// Day the opening is for
    pub date: NaiveDate,
}

/// Everything the delivery side gets about one watch's openings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    /// Watch the matches belong to
    pub watch_id: Uuid,
    /// Matched openings, sorted by date then campsite id
    pub matches: Vec<SiteMatch>,
}

/// Cross-reference fetched availability against a snapshot of watches.
///
/// A watch matches a (campsite, day) when the campground ids line up, the
/// state is available, the day falls inside the watch's window (both ends
/// inclusive) and the campsite passes the watch's site filter. Watches
/// with no matches produce no notification; running this twice over the
/// same input yields the same notifications.
pub fn generate_notifications(
    results: &[CampgroundAvailability],
    watches: &[Watch],
) -> Vec<Notification> {
    let mut notifications = Vec::new();

    for watch in watches {
        if !watch.active {
            continue;
        }

        // Group candidate days per campsite so the consecutive-run rule
        // can inspect each site's days in order.
        let mut days_by_site: BTreeMap<String, BTreeSet<NaiveDate>> = BTreeMap::new();

        for result in results {
            if result.campground_id != watch.campground_id {
                continue;
            }
            for record in result.records() {
                if !record.state.is_available() {
                    continue;
                }
                if record.date < watch.start_date || record.date > watch.end_date {
                    continue;
                }
                if !watch.allows_campsite(&record.campsite_id) {
                    continue;
                }
                days_by_site.entry(record.campsite_id).or_default().insert(record.date);
            }
        }

        let minimum_run = watch.minimum_consecutive_days.max(1) as usize;
        let mut matches = Vec::new();

        for (campsite_id, days) in &days_by_site {
            for date in qualifying_days(days, minimum_run) {
                matches.push(SiteMatch {
                    campsite_id: campsite_id.clone(),
                    date,
                });
            }
        }

        if matches.is_empty() {
            continue;
        }

        matches.sort_by(|a, b| (a.date, &a.campsite_id).cmp(&(b.date, &b.campsite_id)));

        debug!("watch {} matched {} site-days", watch.id, matches.len());
        notifications.push(Notification {
            watch_id: watch.id,
            matches,
        });
    }

    notifications
}

/// Days that belong to at least one run of `minimum_run` consecutive days.
///
/// With a threshold of 1 every day qualifies. A site whose longest run
/// falls short of the threshold contributes nothing at all; when several
/// disjoint runs qualify, all of their days are kept.
fn qualifying_days(days: &BTreeSet<NaiveDate>, minimum_run: usize) -> Vec<NaiveDate> {
    if minimum_run <= 1 {
        return days.iter().copied().collect();
    }

    let sorted: Vec<NaiveDate> = days.iter().copied().collect();
    let mut qualifying = Vec::new();
    let mut run_start = 0;

    for index in 1..=sorted.len() {
        let run_ended =
            index == sorted.len() || sorted[index - 1].succ_opt() != Some(sorted[index]);
        if run_ended {
            if index - run_start >= minimum_run {
                qualifying.extend_from_slice(&sorted[run_start..index]);
            }
            run_start = index;
        }
    }

    qualifying
}
