use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::StatusCode;
use tokio::task::JoinSet;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::availability::{CampgroundAvailability, FetchTarget, MonthlyAvailability};

/// Why a single availability lookup failed.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// The HTTP request itself failed
    #[error("availability request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The API answered with a non-success status
    #[error("availability request returned status {0}")]
    Status(StatusCode),

    /// The response body was not a recognizable availability payload
    #[error("availability payload malformed: {0}")]
    Parse(#[from] serde_json::Error),

    /// A sibling fetch in the same batch failed first
    #[error("availability fetch cancelled")]
    Cancelled,
}

/// Source of monthly availability data. The engine only ever sees this
/// seam; the production implementation talks to recreation.gov.
#[async_trait]
pub trait AvailabilityProvider: Send + Sync {
    /// Fetch one month of availability for a campground. `month` may be
    /// any day; implementations snap it to the first of the month.
    async fn fetch_month(
        &self,
        campground_id: &str,
        month: NaiveDate,
    ) -> Result<MonthlyAvailability, FetchError>;
}

/// Retry policy for availability lookups.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Attempts per target before giving up (default: 3)
    pub retry_limit: u32,

    /// Base delay between attempts; the wait grows linearly with the
    /// number of failures so far (default: 1 second)
    pub retry_backoff: Duration,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            retry_limit: 3,
            retry_backoff: Duration::from_secs(1),
        }
    }
}

/// Resolve one target, retrying transient failures with linear backoff.
///
/// An attempt already in flight is never interrupted; cancellation is
/// observed between attempts and during the backoff sleep. Exhausting the
/// retry limit returns the last underlying error.
pub async fn fetch_with_retry(
    provider: &dyn AvailabilityProvider,
    target: &FetchTarget,
    config: &FetchConfig,
    cancel: &CancellationToken,
) -> Result<MonthlyAvailability, FetchError> {
    let limit = config.retry_limit.max(1);
    let mut failures = 0;

    loop {
        if cancel.is_cancelled() {
            return Err(FetchError::Cancelled);
        }

        match provider.fetch_month(&target.campground_id, target.month_start).await {
            Ok(availability) => return Ok(availability),
            Err(err) => {
                failures += 1;
                if failures >= limit {
                    return Err(err);
                }
                warn!(
                    "availability fetch for campground {} month {} failed, retrying ({failures}/{limit}): {err}",
                    target.campground_id, target.month_start
                );
            }
        }

        let backoff = config.retry_backoff * failures;
        tokio::select! {
            _ = cancel.cancelled() => return Err(FetchError::Cancelled),
            _ = sleep(backoff) => {}
        }
    }
}

/// Fetch every target concurrently with a shared fail-fast policy.
///
/// The first target to exhaust its retries cancels the rest of the batch
/// and its error becomes the batch result; results that completed before
/// the failure are discarded rather than returned partially. On success
/// every target's payload is returned, tagged with its campground id, in
/// no particular order.
pub async fn fetch_all(
    provider: Arc<dyn AvailabilityProvider>,
    targets: Vec<FetchTarget>,
    config: &FetchConfig,
) -> Result<Vec<CampgroundAvailability>, FetchError> {
    let cancel = CancellationToken::new();
    let mut tasks = JoinSet::new();

    for target in targets {
        let provider = provider.clone();
        let config = config.clone();
        let cancel = cancel.clone();
        tasks.spawn(async move {
            let result = fetch_with_retry(provider.as_ref(), &target, &config, &cancel).await;
            (target, result)
        });
    }

    let mut completed = Vec::new();
    let mut first_error = None;

    while let Some(joined) = tasks.join_next().await {
        let Ok((target, result)) = joined else {
            continue;
        };

        match result {
            Ok(availability) => completed.push(CampgroundAvailability {
                campground_id: target.campground_id,
                availability,
            }),
            Err(err) => {
                // Siblings cancelled by the first failure land here too;
                // only the first error becomes the batch's verdict.
                if first_error.is_none() {
                    debug!("cancelling availability batch: {err}");
                    first_error = Some(err);
                    cancel.cancel();
                }
            }
        }
    }

    match first_error {
        Some(err) => Err(err),
        None => Ok(completed),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use super::*;
    use crate::availability::start_of_month;

    const ALWAYS_FAIL: u32 = u32::MAX;

    /// Provider that fails a scripted number of times per campground
    /// before succeeding, counting every attempt.
    struct ScriptedProvider {
        failures: HashMap<String, u32>,
        attempts: Mutex<HashMap<String, u32>>,
    }

    impl ScriptedProvider {
        fn new(failures: &[(&str, u32)]) -> Self {
            Self {
                failures: failures
                    .iter()
                    .map(|(id, count)| (id.to_string(), *count))
                    .collect(),
                attempts: Mutex::new(HashMap::new()),
            }
        }

        fn attempts_for(&self, campground_id: &str) -> u32 {
            self.attempts
                .lock()
                .unwrap()
                .get(campground_id)
                .copied()
                .unwrap_or(0)
        }
    }

    #[async_trait]
    impl AvailabilityProvider for ScriptedProvider {
        async fn fetch_month(
            &self,
            campground_id: &str,
            _month: NaiveDate,
        ) -> Result<MonthlyAvailability, FetchError> {
            let attempt = {
                let mut attempts = self.attempts.lock().unwrap();
                let count = attempts.entry(campground_id.to_string()).or_insert(0);
                *count += 1;
                *count
            };

            let failures = self.failures.get(campground_id).copied().unwrap_or(0);
            if attempt <= failures {
                return Err(FetchError::Status(StatusCode::SERVICE_UNAVAILABLE));
            }

            Ok(MonthlyAvailability {
                campsites: HashMap::new(),
                count: 0,
            })
        }
    }

    fn target(campground_id: &str) -> FetchTarget {
        FetchTarget {
            campground_id: campground_id.to_string(),
            month_start: start_of_month(NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()),
        }
    }

    fn quick_config() -> FetchConfig {
        FetchConfig {
            retry_limit: 3,
            retry_backoff: Duration::from_millis(1),
        }
    }

    #[tokio::test]
    async fn test_retry_recovers_from_transient_failure() {
        let provider = ScriptedProvider::new(&[("L1", 1)]);
        let cancel = CancellationToken::new();

        let result = fetch_with_retry(&provider, &target("L1"), &quick_config(), &cancel).await;

        assert!(result.is_ok());
        assert_eq!(provider.attempts_for("L1"), 2);
    }

    #[tokio::test]
    async fn test_exhausted_retries_return_last_error() {
        let provider = ScriptedProvider::new(&[("L1", ALWAYS_FAIL)]);
        let cancel = CancellationToken::new();

        let result = fetch_with_retry(&provider, &target("L1"), &quick_config(), &cancel).await;

        assert!(matches!(
            result,
            Err(FetchError::Status(StatusCode::SERVICE_UNAVAILABLE))
        ));
        assert_eq!(provider.attempts_for("L1"), 3);
    }

    #[tokio::test]
    async fn test_cancelled_token_short_circuits_before_any_attempt() {
        let provider = ScriptedProvider::new(&[]);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = fetch_with_retry(&provider, &target("L1"), &quick_config(), &cancel).await;

        assert!(matches!(result, Err(FetchError::Cancelled)));
        assert_eq!(provider.attempts_for("L1"), 0);
    }

    #[tokio::test]
    async fn test_batch_success_returns_every_target_tagged() {
        let provider = Arc::new(ScriptedProvider::new(&[]));
        let targets = vec![target("L1"), target("L2"), target("L3")];

        let results = fetch_all(provider, targets, &quick_config()).await.unwrap();

        let mut ids: Vec<&str> = results.iter().map(|r| r.campground_id.as_str()).collect();
        ids.sort();
        assert_eq!(ids, vec!["L1", "L2", "L3"]);
    }

    #[tokio::test]
    async fn test_batch_fail_fast_returns_only_the_first_error() {
        // L2 exhausts its retries while L1 and L3 would succeed; the batch
        // must surface L2's error and no partial result list.
        let provider = Arc::new(ScriptedProvider::new(&[("L2", ALWAYS_FAIL)]));
        let targets = vec![target("L1"), target("L2"), target("L3")];

        let result = fetch_all(provider, targets, &quick_config()).await;

        assert!(matches!(
            result,
            Err(FetchError::Status(StatusCode::SERVICE_UNAVAILABLE))
        ));
    }

    #[tokio::test]
    async fn test_empty_batch_succeeds_with_no_results() {
        let provider = Arc::new(ScriptedProvider::new(&[]));

        let results = fetch_all(provider, Vec::new(), &quick_config()).await.unwrap();

        assert!(results.is_empty());
    }
}
