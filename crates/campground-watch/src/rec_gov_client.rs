use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use rand::seq::IndexedRandom;
use reqwest::Client;
use reqwest::header::USER_AGENT;
use tracing::debug;

use crate::availability::{MonthlyAvailability, start_of_month};
use crate::fetcher::{AvailabilityProvider, FetchError};

const DEFAULT_BASE_URL: &str = "https://www.recreation.gov";

/// Client for the recreation.gov monthly availability API.
///
/// The endpoint is unauthenticated; requests rotate through a pool of
/// browser user agents and carry a 30 second timeout.
pub struct RecGovClient {
    client: Client,
    base_url: String,
    user_agents: Vec<String>,
}

impl RecGovClient {
    /// Create a client against the production endpoint.
    pub fn new() -> Result<Self, FetchError> {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    /// Create a client against a custom endpoint. Tests point this at a
    /// local mock server.
    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self, FetchError> {
        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;

        Ok(Self {
            client,
            base_url: base_url.into(),
            user_agents: default_user_agents(),
        })
    }

    fn user_agent(&self) -> &str {
        self.user_agents
            .choose(&mut rand::rng())
            .map(String::as_str)
            .unwrap_or("Mozilla/5.0")
    }
}

#[async_trait]
impl AvailabilityProvider for RecGovClient {
    async fn fetch_month(
        &self,
        campground_id: &str,
        month: NaiveDate,
    ) -> Result<MonthlyAvailability, FetchError> {
        let url = format!(
            "{}/api/camps/availability/campground/{}/month",
            self.base_url, campground_id
        );

        // The API only accepts month starts; snap whatever we were given.
        let month_start = start_of_month(month);
        let start_date = format!("{}T00:00:00.000Z", month_start.format("%Y-%m-%d"));

        debug!("requesting availability for campground {campground_id}, month {month_start}");

        let response = self
            .client
            .get(&url)
            .query(&[("start_date", start_date.as_str())])
            .header(USER_AGENT, self.user_agent())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status));
        }

        let body = response.text().await?;
        let availability = serde_json::from_str(&body)?;

        Ok(availability)
    }
}

fn default_user_agents() -> Vec<String> {
    [
        "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/119.0.0.0 Safari/537.36",
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/119.0.0.0 Safari/537.36",
        "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/119.0.0.0 Safari/537.36",
        "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.1 Safari/605.1.15",
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:121.0) Gecko/20100101 Firefox/121.0",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}
