use std::collections::HashMap;

use chrono::{Datelike, NaiveDate};
use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

/// One deduplicated unit of fetch work: a campground and the month to ask
/// the API about. The API returns one month of data per call, keyed by the
/// month's first day.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FetchTarget {
    /// Campground the request is for
    pub campground_id: String,
    /// First day of the month being requested
    pub month_start: NaiveDate,
}

/// Availability state of one campsite on one day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SiteState {
    /// The site can be booked for this day
    Available,
    /// Someone already holds the site
    Reserved,
    /// The site cannot be reserved online at all
    NotReservable,
    /// Any label we do not recognize; never treated as bookable
    Unavailable,
}

impl SiteState {
    /// Map an availability label from the API onto a state. Unknown labels
    /// are unavailable, never available.
    pub fn parse(label: &str) -> Self {
        match label {
            "Available" => SiteState::Available,
            "Reserved" => SiteState::Reserved,
            "Not Reservable" => SiteState::NotReservable,
            _ => SiteState::Unavailable,
        }
    }

    /// Whether this state counts as bookable.
    pub fn is_available(self) -> bool {
        matches!(self, SiteState::Available)
    }
}

/// One (campsite, date, state) entry flattened out of a monthly payload.
#[derive(Debug, Clone)]
pub struct AvailabilityRecord {
    /// Campsite the entry is for
    pub campsite_id: String,
    /// Calendar day the entry is for
    pub date: NaiveDate,
    /// Parsed availability state
    pub state: SiteState,
}

/// Response payload from the monthly campground availability API.
#[derive(Debug, Clone, Deserialize)]
pub struct MonthlyAvailability {
    /// Per-campsite availability, keyed by campsite id
    #[serde(default)]
    pub campsites: HashMap<String, CampsitePayload>,
    /// Number of campsites in the payload
    #[serde(default)]
    pub count: i32,
}

/// Per-campsite data from the monthly availability API.
#[derive(Debug, Clone, Deserialize)]
pub struct CampsitePayload {
    /// Availability label per RFC3339 date key
    #[serde(default)]
    pub availabilities: HashMap<String, String>,

    /// Campsite id as echoed inside the payload
    #[serde(default)]
    pub campsite_id: String,
    #[serde(default)]
    pub campsite_reserve_type: String,
    #[serde(default)]
    pub campsite_type: String,
    #[serde(default)]
    pub capacity_rating: String,
    #[serde(default, rename = "loop")]
    pub campsite_loop: String,
    #[serde(default)]
    pub max_num_people: i32,
    #[serde(default)]
    pub min_num_people: i32,
    #[serde(default)]
    pub site: String,
    #[serde(default)]
    pub type_of_use: String,

    /// Free-form rule blob the API sometimes attaches; carried opaquely,
    /// never interpreted
    #[serde(default)]
    pub campsite_rules: Value,
    /// Same treatment as `campsite_rules`
    #[serde(default)]
    pub quantities: Value,
}

/// Monthly availability for one campground, tagged with the id it was
/// fetched for.
#[derive(Debug, Clone)]
pub struct CampgroundAvailability {
    /// Campground the payload belongs to
    pub campground_id: String,
    /// The decoded monthly payload
    pub availability: MonthlyAvailability,
}

impl CampgroundAvailability {
    /// Flatten the payload into (campsite, date, state) records. Date keys
    /// that do not parse are skipped with a warning.
    pub fn records(&self) -> Vec<AvailabilityRecord> {
        let mut records = Vec::new();

        for (campsite_id, campsite) in &self.availability.campsites {
            for (raw_date, label) in &campsite.availabilities {
                let Some(date) = parse_availability_date(raw_date) else {
                    warn!("skipping unparsable availability date {raw_date}");
                    continue;
                };
                records.push(AvailabilityRecord {
                    campsite_id: campsite_id.clone(),
                    date,
                    state: SiteState::parse(label),
                });
            }
        }

        records
    }
}

/// Parse a date key from an availability payload. Keys look like
/// "2024-06-01T00:00:00Z"; only the day part matters.
pub fn parse_availability_date(raw: &str) -> Option<NaiveDate> {
    let day = raw.get(..10)?;
    NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
}

/// Snap a date to the first day of its month.
pub fn start_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_parse_site_state() {
        assert_eq!(SiteState::parse("Available"), SiteState::Available);
        assert_eq!(SiteState::parse("Reserved"), SiteState::Reserved);
        assert_eq!(SiteState::parse("Not Reservable"), SiteState::NotReservable);

        // Anything unrecognized is unavailable, including near-misses.
        assert_eq!(SiteState::parse("available"), SiteState::Unavailable);
        assert_eq!(SiteState::parse("Open"), SiteState::Unavailable);
        assert_eq!(SiteState::parse(""), SiteState::Unavailable);

        assert!(SiteState::Available.is_available());
        assert!(!SiteState::Reserved.is_available());
        assert!(!SiteState::NotReservable.is_available());
        assert!(!SiteState::Unavailable.is_available());
    }

    #[test]
    fn test_parse_availability_date() {
        assert_eq!(
            parse_availability_date("2024-06-01T00:00:00Z"),
            NaiveDate::from_ymd_opt(2024, 6, 1)
        );
        assert_eq!(parse_availability_date("2024-06-01"), NaiveDate::from_ymd_opt(2024, 6, 1));
        assert_eq!(parse_availability_date("garbage"), None);
        assert_eq!(parse_availability_date(""), None);
    }

    #[test]
    fn test_start_of_month() {
        let mid = NaiveDate::from_ymd_opt(2024, 6, 15).unwrap();
        assert_eq!(start_of_month(mid), NaiveDate::from_ymd_opt(2024, 6, 1).unwrap());

        let first = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        assert_eq!(start_of_month(first), first);
    }

    #[test]
    fn test_payload_decodes_with_extension_fields() {
        let availability: MonthlyAvailability = serde_json::from_value(json!({
            "campsites": {
                "71047": {
                    "availabilities": {
                        "2024-06-01T00:00:00Z": "Reserved",
                        "2024-06-02T00:00:00Z": "Available"
                    },
                    "campsite_id": "71047",
                    "campsite_type": "STANDARD NONELECTRIC",
                    "loop": "Upper Pines",
                    "max_num_people": 6,
                    "min_num_people": 1,
                    "campsite_rules": {"some": ["unknown", "shape"]},
                    "quantities": {}
                }
            },
            "count": 1
        }))
        .unwrap();

        assert_eq!(availability.count, 1);
        let campsite = &availability.campsites["71047"];
        assert_eq!(campsite.campsite_loop, "Upper Pines");
        assert_eq!(campsite.availabilities.len(), 2);
    }

    #[test]
    fn test_records_flatten_and_skip_bad_dates() {
        let availability: MonthlyAvailability = serde_json::from_value(json!({
            "campsites": {
                "71047": {
                    "availabilities": {
                        "2024-06-02T00:00:00Z": "Available",
                        "not-a-date": "Available"
                    }
                }
            },
            "count": 1
        }))
        .unwrap();

        let tagged = CampgroundAvailability {
            campground_id: "232447".to_string(),
            availability,
        };

        let records = tagged.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].campsite_id, "71047");
        assert_eq!(records[0].date, NaiveDate::from_ymd_opt(2024, 6, 2).unwrap());
        assert!(records[0].state.is_available());
    }
}
