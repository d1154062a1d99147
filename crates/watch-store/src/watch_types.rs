use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

/// A user's standing request to be notified when campsites open up at a
/// campground within a date range.
///
/// Watches are owned by the store and only ever mutated through it. They are
/// never deleted: a fired or stopped watch goes inactive, and an inactive
/// watch can be restarted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Watch {
    /// Unique identifier for the watch
    #[serde(rename = "watch_id")]
    pub id: Uuid,

    /// Whether the watch is currently being monitored
    pub active: bool,

    /// When the watch was created
    pub created_at: DateTime<Utc>,

    /// ID of the campground being watched
    pub campground_id: String,

    /// Name of the campground for display purposes
    pub campground_name: String,

    /// Campsites to restrict matches to; empty means any site qualifies
    #[serde(default)]
    pub campsite_ids: Vec<String>,

    /// First day of the window, inclusive
    pub start_date: NaiveDate,

    /// Last day of the window, inclusive
    pub end_date: NaiveDate,

    /// ID of the user who created the watch
    pub user_id: String,

    /// Display name of the user who created the watch
    pub user_name: String,

    /// Shortest run of consecutive available days worth reporting
    #[serde(default = "default_minimum_consecutive_days")]
    pub minimum_consecutive_days: u32,
}

fn default_minimum_consecutive_days() -> u32 {
    1
}

impl Watch {
    /// Build a watch from a validated request, assigning a fresh id and
    /// creation timestamp. The watch starts active.
    pub fn from_request(request: CreateWatchRequest, user_id: &str, user_name: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            active: true,
            created_at: Utc::now(),
            campground_id: request.campground_id,
            campground_name: request.campground_name,
            campsite_ids: request.campsite_ids,
            start_date: request.start_date,
            end_date: request.end_date,
            user_id: user_id.to_string(),
            user_name: user_name.to_string(),
            minimum_consecutive_days: request.minimum_consecutive_days.max(1),
        }
    }

    /// Whether a campsite passes this watch's site filter.
    pub fn allows_campsite(&self, campsite_id: &str) -> bool {
        self.campsite_ids.is_empty() || self.campsite_ids.iter().any(|id| id == campsite_id)
    }
}

/// Request structure for creating a new watch
#[derive(Debug, Deserialize, Validate)]
#[validate(schema(function = "validate_date_order"))]
pub struct CreateWatchRequest {
    /// ID of the campground to watch
    #[validate(length(min = 1, message = "Campground ID is required"))]
    pub campground_id: String,

    /// Name of the campground for display purposes
    #[validate(length(min = 1, message = "Campground name is required"))]
    pub campground_name: String,

    /// First day to watch, inclusive
    pub start_date: NaiveDate,

    /// Last day to watch, inclusive
    pub end_date: NaiveDate,

    /// Campsites to restrict the watch to; empty watches the whole campground
    #[serde(default)]
    pub campsite_ids: Vec<String>,

    /// Shortest run of consecutive available days worth reporting
    #[serde(default = "default_minimum_consecutive_days")]
    pub minimum_consecutive_days: u32,
}

/// Custom validation function for the date window
fn validate_date_order(request: &CreateWatchRequest) -> Result<(), ValidationError> {
    if request.start_date > request.end_date {
        return Err(ValidationError::new("start_after_end"));
    }
    Ok(())
}

/// Custom error type for watch store operations
#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    /// No watch with the given id exists
    #[error("watch {0} not found")]
    NotFound(Uuid),

    /// Reading or writing the watch file failed; in-memory state may now be
    /// ahead of what is on disk
    #[error("watch file I/O failed: {0}")]
    Persistence(#[from] std::io::Error),

    /// The watch file contents could not be encoded or decoded
    #[error("watch file malformed: {0}")]
    Format(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> CreateWatchRequest {
        CreateWatchRequest {
            campground_id: "232447".to_string(),
            campground_name: "Upper Pines".to_string(),
            start_date: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2024, 6, 3).unwrap(),
            campsite_ids: Vec::new(),
            minimum_consecutive_days: 1,
        }
    }

    #[test]
    fn test_valid_request_passes() {
        assert!(request().validate().is_ok());
    }

    #[test]
    fn test_empty_campground_id_rejected() {
        let mut request = request();
        request.campground_id = String::new();
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_reversed_dates_rejected() {
        let mut request = request();
        request.end_date = NaiveDate::from_ymd_opt(2024, 5, 31).unwrap();
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_single_day_window_allowed() {
        let mut request = request();
        request.end_date = request.start_date;
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_from_request_assigns_identity() {
        let watch = Watch::from_request(request(), "user-1", "alice");
        assert!(watch.active);
        assert_eq!(watch.user_id, "user-1");
        assert_eq!(watch.user_name, "alice");
        assert_eq!(watch.minimum_consecutive_days, 1);
    }

    #[test]
    fn test_zero_minimum_days_clamped_to_one() {
        let mut request = request();
        request.minimum_consecutive_days = 0;
        let watch = Watch::from_request(request, "user-1", "alice");
        assert_eq!(watch.minimum_consecutive_days, 1);
    }

    #[test]
    fn test_site_filter() {
        let mut watch = Watch::from_request(request(), "user-1", "alice");
        assert!(watch.allows_campsite("71047"));

        watch.campsite_ids = vec!["71047".to_string()];
        assert!(watch.allows_campsite("71047"));
        assert!(!watch.allows_campsite("99999"));
    }

    #[test]
    fn test_watch_json_round_trip_with_defaults() {
        let serialized = serde_json::json!({
            "watch_id": "d7e3a79e-8f2f-4a5e-9b14-6f0f0a3e1c55",
            "active": true,
            "created_at": "2024-05-01T12:00:00Z",
            "campground_id": "232447",
            "campground_name": "Upper Pines",
            "start_date": "2024-06-01",
            "end_date": "2024-06-03",
            "user_id": "user-1",
            "user_name": "alice"
        });

        let watch: Watch = serde_json::from_value(serialized).unwrap();
        assert!(watch.campsite_ids.is_empty());
        assert_eq!(watch.minimum_consecutive_days, 1);
    }
}
