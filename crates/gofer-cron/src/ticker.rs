//! The periodic scan loop.

use crate::predicate::{CronPredicate, truncate_to_minute};
use chrono::{DateTime, Utc};
use gofer_core::ports::{DispatchSink, Variables};
use gofer_extension::ExtensionContext;
use gofer_registry::TimeRegistry;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tracing::{debug, info};

/// Source of "now" for the ticker.
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Scans the registry once per interval and fires every admitted subscription.
///
/// Scans are serial. A scan that overruns the interval delays the next one,
/// and a minute is never evaluated twice.
pub struct Ticker {
    interval: Duration,
    clock: Clock,
}

impl Ticker {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            clock: Arc::new(Utc::now),
        }
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Run until `ctx.shutdown` is cancelled. An in-progress scan always completes.
    pub async fn run(&self, registry: &TimeRegistry<CronPredicate>, ctx: &ExtensionContext) {
        let mut ticker = interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut last_minute: Option<DateTime<Utc>> = None;

        info!(
            interval_secs = self.interval.as_secs_f64(),
            "Starting cron ticker"
        );

        loop {
            tokio::select! {
                _ = ctx.shutdown.cancelled() => {
                    info!("Cron ticker shutting down");
                    break;
                }
                _ = ticker.tick() => {
                    let minute = truncate_to_minute((self.clock)());
                    if last_minute.is_some_and(|last| minute <= last) {
                        debug!(%minute, "Minute already evaluated");
                        continue;
                    }
                    last_minute = Some(minute);
                    scan(registry, ctx.dispatcher.as_ref(), minute).await;
                }
            }
        }
    }
}

/// Fire every subscription whose predicate admits `at`. Returns the number of
/// runs the host accepted.
pub async fn scan(
    registry: &TimeRegistry<CronPredicate>,
    dispatcher: &dyn DispatchSink,
    at: DateTime<Utc>,
) -> usize {
    let mut due = registry.lookup_time(at).await;
    due.sort_by(|a, b| a.key.cmp(&b.key));

    let mut fired = 0;
    for subscription in &due {
        // Failures are logged by the dispatcher; siblings still fire.
        if dispatcher
            .fire(&subscription.key, Variables::new())
            .await
            .is_ok()
        {
            fired += 1;
        }
    }

    debug!(%at, due = due.len(), fired, "Scan complete");
    fired
}
