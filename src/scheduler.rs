use std::time::Duration;

use chrono::{DateTime, Local, TimeZone, Timelike};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::matcher::{Matcher, Tick};

/// Drives the matcher once per calendar minute.
///
/// On start the loop sleeps until the next minute boundary, then ticks on a
/// fixed 60 second interval. Ticks never overlap: the next tick cannot begin
/// until the previous scan has returned, though jobs dispatched by that scan
/// may still be running.
pub struct Scheduler {
    matcher: Matcher,
}

impl Scheduler {
    pub fn new(matcher: Matcher) -> Self {
        Self { matcher }
    }

    /// Run until the shutdown token is cancelled
    pub async fn run(self, shutdown: CancellationToken) {
        let delay = until_next_minute(&Local::now());
        info!(delay_ms = delay.as_millis() as u64, "Scheduler started, aligning to minute boundary");

        tokio::select! {
            _ = shutdown.cancelled() => {
                info!("Scheduler shutting down");
                return;
            }
            _ = tokio::time::sleep(delay) => {}
        }

        let mut interval = tokio::time::interval(Duration::from_secs(60));
        // If the process stalls past a boundary, skip the missed minutes
        // rather than firing a burst of late ticks.
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("Scheduler shutting down");
                    break;
                }
                _ = interval.tick() => {
                    let dispatched = self.matcher.scan(Tick::at(&Local::now())).await;
                    if !dispatched.is_empty() {
                        debug!(count = dispatched.len(), "Tick dispatched due jobs");
                    }
                }
            }
        }
    }
}

/// Delay from `now` to the next wall-clock minute boundary
fn until_next_minute<Tz: TimeZone>(now: &DateTime<Tz>) -> Duration {
    let into_minute =
        u64::from(now.second()) * 1_000 + u64::from(now.timestamp_subsec_millis());
    Duration::from_millis(60_000_u64.saturating_sub(into_minute))
}
