use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::interval;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};
use watch_store::{Watch, WatchStore};

use crate::fetcher::{AvailabilityProvider, FetchConfig, FetchError, fetch_all};
use crate::matcher::{Notification, generate_notifications};
use crate::planner::plan_requests;
use crate::stats::StatsTracker;

/// Why a notification could not be handed to the delivery side.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    /// The delivery transport rejected the notification
    #[error("notification delivery failed: {0}")]
    Delivery(String),
}

/// Delivery seam for notifications. Implementations format and transport
/// the message; they see only the watch and its ordered matches, never the
/// engine's internals.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver one notification to the watch's owner.
    async fn deliver(
        &self,
        watch: &Watch,
        notification: &Notification,
    ) -> Result<(), NotifyError>;
}

/// Configuration for the monitoring loop.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// How often a monitoring cycle starts (default: 15 seconds)
    pub poll_interval: Duration,

    /// Retry policy for the availability fetches inside a cycle
    pub fetch: FetchConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(15),
            fetch: FetchConfig::default(),
        }
    }
}

/// The availability-monitoring engine: plan, fetch, match, notify.
///
/// Every collaborator is injected; the engine owns no globals. One
/// instance is expected to drive one loop, but overlapping cycles cannot
/// corrupt anything — all shared state sits behind the store's and the
/// tracker's locks.
pub struct WatchEngine {
    store: Arc<WatchStore>,
    provider: Arc<dyn AvailabilityProvider>,
    notifier: Arc<dyn Notifier>,
    stats: Arc<StatsTracker>,
    config: EngineConfig,
}

impl WatchEngine {
    /// Wire up an engine from its collaborators.
    pub fn new(
        store: Arc<WatchStore>,
        provider: Arc<dyn AvailabilityProvider>,
        notifier: Arc<dyn Notifier>,
        stats: Arc<StatsTracker>,
        config: EngineConfig,
    ) -> Self {
        Self {
            store,
            provider,
            notifier,
            stats,
            config,
        }
    }

    /// Run cycles on the configured interval until the token cancels. The
    /// first cycle starts immediately. A failed cycle is logged and the
    /// loop keeps going; nothing here is fatal to the process.
    pub async fn run(&self, cancel: CancellationToken) {
        info!("starting watch engine, cycle every {:?}", self.config.poll_interval);
        let mut ticker = interval(self.config.poll_interval);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("watch engine stopping");
                    return;
                }
                _ = ticker.tick() => {}
            }

            if let Err(err) = self.run_cycle().await {
                error!("monitoring cycle failed: {err}");
            }
        }
    }

    /// One full plan → fetch → match → notify pass.
    ///
    /// A fetch failure abandons the whole cycle; the next tick starts
    /// fresh. Delivery and deactivation failures affect only their watch.
    pub async fn run_cycle(&self) -> Result<(), FetchError> {
        let watches = self.store.list_active().await;
        let targets = plan_requests(&watches, &self.stats);
        if targets.is_empty() {
            debug!("no active watches, skipping cycle");
            return Ok(());
        }

        self.stats.record_requests(targets.len());
        let results = fetch_all(self.provider.clone(), targets, &self.config.fetch).await?;

        // Match against the same snapshot the plan was built from.
        let notifications = generate_notifications(&results, &watches);
        debug!(
            "cycle produced {} notifications from {} payloads",
            notifications.len(),
            results.len()
        );

        for notification in notifications {
            let Some(watch) = watches.iter().find(|watch| watch.id == notification.watch_id)
            else {
                continue;
            };

            match self.notifier.deliver(watch, &notification).await {
                Ok(()) => {
                    self.stats.record_notification(notification.watch_id);
                    // A fired watch goes dormant until its owner restarts it.
                    if let Err(err) = self.store.set_active(notification.watch_id, false).await {
                        error!("failed to deactivate watch {}: {err}", notification.watch_id);
                    }
                }
                Err(err) => {
                    // Leave the watch active; the next cycle tries again.
                    error!("failed to notify watch {}: {err}", notification.watch_id);
                }
            }
        }

        Ok(())
    }
}
