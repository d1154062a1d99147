//! Main entry point for the campground watch daemon.
//! Wires the watch store, the recreation.gov client and the monitoring
//! engine together, reports stats on an interval and shuts down cleanly on
//! ctrl-c.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use campground_watch::{
    EngineConfig, Notification, Notifier, NotifyError, RecGovClient, StatsTracker, WatchEngine,
};
use tokio_util::sync::CancellationToken;
use watch_store::{Watch, WatchStore};

/// Notifier that writes each match summary to the log. Stands in for a
/// chat or email transport; swap in another `Notifier` implementation to
/// deliver somewhere real.
struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn deliver(
        &self,
        watch: &Watch,
        notification: &Notification,
    ) -> Result<(), NotifyError> {
        let mut sites: Vec<&str> = notification
            .matches
            .iter()
            .map(|site_match| site_match.campsite_id.as_str())
            .collect();
        sites.sort();
        sites.dedup();

        log::info!(
            "openings for {} at {} ({} to {}): {} site-days across sites [{}]",
            watch.user_name,
            watch.campground_name,
            watch.start_date,
            watch.end_date,
            notification.matches.len(),
            sites.join(", "),
        );

        Ok(())
    }
}

fn env_duration_secs(key: &str, default_secs: u64) -> Duration {
    std::env::var(key)
        .ok()
        .and_then(|raw| raw.parse().ok())
        .map(Duration::from_secs)
        .unwrap_or(Duration::from_secs(default_secs))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize logger
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let watch_file =
        std::env::var("WATCH_FILE").unwrap_or_else(|_| "data/watches.json".to_string());
    let base_url = std::env::var("RECREATION_GOV_BASE_URL")
        .unwrap_or_else(|_| "https://www.recreation.gov".to_string());
    let report_interval = env_duration_secs("STATS_REPORT_INTERVAL_SECS", 3600);
    let config = EngineConfig {
        poll_interval: env_duration_secs("POLL_INTERVAL_SECS", 15),
        ..EngineConfig::default()
    };

    log::info!("starting campground watch daemon, watch file {watch_file}");

    let store = Arc::new(WatchStore::open(&watch_file).await?);
    let provider = Arc::new(RecGovClient::with_base_url(base_url)?);
    let stats = Arc::new(StatsTracker::new());

    let engine = WatchEngine::new(store, provider, Arc::new(LogNotifier), stats.clone(), config);

    let cancel = CancellationToken::new();

    // Periodic operator report; resetting the counters is this task's job
    // alone, the engine never does it.
    let report_cancel = cancel.clone();
    let report_stats = stats.clone();
    let reporter = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(report_interval);
        // The first tick completes immediately; skip it so the first
        // report covers a full interval.
        ticker.tick().await;
        loop {
            tokio::select! {
                _ = report_cancel.cancelled() => return,
                _ = ticker.tick() => {}
            }
            log::info!("monitoring summary: {}", report_stats.snapshot());
            report_stats.reset();
        }
    });

    let engine_cancel = cancel.clone();
    let runner = tokio::spawn(async move { engine.run(engine_cancel).await });

    tokio::signal::ctrl_c().await?;
    log::info!("shutting down");
    cancel.cancel();

    let _ = runner.await;
    let _ = reporter.await;

    Ok(())
}
