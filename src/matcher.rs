use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Datelike, TimeZone, Timelike};
use tracing::debug;

use crate::job::{JobId, MinuteKey, Schedule};
use crate::registry::JobRegistry;
use crate::worker::Dispatcher;

/// Wall-clock fields one matcher pass evaluates against, snapshotted from a
/// single instant so every job in the pass sees the same "now".
#[derive(Debug, Clone)]
pub struct Tick {
    pub minute: u32,
    pub hour: u32,
    /// 0 = Sunday, matching the wire-level dayOfWeek convention
    pub day_of_week: u32,
    pub key: MinuteKey,
}

impl Tick {
    pub fn at<Tz: TimeZone>(now: &DateTime<Tz>) -> Self
    where
        Tz::Offset: fmt::Display,
    {
        Self {
            minute: now.minute(),
            hour: now.hour(),
            day_of_week: now.weekday().num_days_from_sunday(),
            key: MinuteKey::at(now),
        }
    }
}

fn is_due(schedule: &Schedule, tick: &Tick) -> bool {
    match *schedule {
        Schedule::Hourly { minute } => tick.minute == minute,
        Schedule::Daily { hour, minute } => tick.hour == hour && tick.minute == minute,
        Schedule::Weekly {
            day_of_week,
            hour,
            minute,
        } => tick.day_of_week == day_of_week && tick.hour == hour && tick.minute == minute,
    }
}

/// Decides which jobs are due at a tick and hands them to the dispatcher.
pub struct Matcher {
    registry: Arc<JobRegistry>,
    dispatcher: Dispatcher,
}

impl Matcher {
    pub fn new(registry: Arc<JobRegistry>, dispatcher: Dispatcher) -> Self {
        Self {
            registry,
            dispatcher,
        }
    }

    /// Run one matching pass over the store.
    ///
    /// A job whose `last_run` already equals the tick's minute key is
    /// skipped, so re-running a pass within the same calendar minute never
    /// dispatches twice. For each due job the key is recorded while the
    /// store lock is still held; the dispatch happens after the lock is
    /// released and its outcome never feeds back into the store.
    ///
    /// Returns the ids that were dispatched.
    pub async fn scan(&self, tick: Tick) -> Vec<JobId> {
        let due: Vec<JobId> = {
            let mut store = self.registry.lock().await;
            if store.is_empty() {
                return Vec::new();
            }
            debug!(jobs = store.len(), minute_key = %tick.key, "Matcher pass");
            store
                .jobs_mut()
                .iter_mut()
                .filter_map(|job| {
                    if job.last_run.as_ref() == Some(&tick.key) {
                        return None;
                    }
                    if !is_due(&job.schedule, &tick) {
                        return None;
                    }
                    job.last_run = Some(tick.key.clone());
                    Some(job.id)
                })
                .collect()
        };

        for id in &due {
            debug!(job_id = %id, minute_key = %tick.key, "Job due");
            self.dispatcher.dispatch(*id);
        }

        due
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::JobSpec;
    use crate::worker::{HelloRunner, JobRunner};
    use async_trait::async_trait;
    use chrono::Utc;

    fn tick(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> Tick {
        Tick::at(&Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap())
    }

    fn matcher_with(registry: Arc<JobRegistry>) -> Matcher {
        Matcher::new(registry, Dispatcher::new(Arc::new(HelloRunner)))
    }

    async fn register(registry: &JobRegistry, spec: JobSpec) -> JobId {
        registry.create(&spec).await.unwrap().id
    }

    fn hourly(minute: i64) -> JobSpec {
        JobSpec {
            kind: Some("hourly".to_string()),
            minute: Some(minute),
            ..Default::default()
        }
    }

    fn daily(hour: i64, minute: i64) -> JobSpec {
        JobSpec {
            kind: Some("daily".to_string()),
            hour: Some(hour),
            minute: Some(minute),
            ..Default::default()
        }
    }

    fn weekly(day_of_week: i64, hour: i64, minute: i64) -> JobSpec {
        JobSpec {
            kind: Some("weekly".to_string()),
            day_of_week: Some(day_of_week),
            hour: Some(hour),
            minute: Some(minute),
            ..Default::default()
        }
    }

    #[test]
    fn hourly_matches_on_minute_alone() {
        let schedule = Schedule::Hourly { minute: 30 };
        assert!(is_due(&schedule, &tick(2025, 3, 5, 0, 30)));
        assert!(is_due(&schedule, &tick(2025, 3, 5, 23, 30)));
        assert!(!is_due(&schedule, &tick(2025, 3, 5, 14, 31)));
    }

    #[test]
    fn daily_matches_on_hour_and_minute() {
        let schedule = Schedule::Daily { hour: 14, minute: 0 };
        assert!(is_due(&schedule, &tick(2025, 3, 5, 14, 0)));
        assert!(is_due(&schedule, &tick(2025, 3, 6, 14, 0)));
        assert!(!is_due(&schedule, &tick(2025, 3, 5, 15, 0)));
        assert!(!is_due(&schedule, &tick(2025, 3, 5, 14, 1)));
    }

    #[test]
    fn weekly_matches_on_all_three_fields() {
        // 2025-03-05 is a Wednesday (dayOfWeek 3)
        let schedule = Schedule::Weekly {
            day_of_week: 3,
            hour: 9,
            minute: 15,
        };
        assert!(is_due(&schedule, &tick(2025, 3, 5, 9, 15)));
        // Same time on Thursday
        assert!(!is_due(&schedule, &tick(2025, 3, 6, 9, 15)));
        // Wednesday, wrong hour
        assert!(!is_due(&schedule, &tick(2025, 3, 5, 10, 15)));
        // One week later fires again
        assert!(is_due(&schedule, &tick(2025, 3, 12, 9, 15)));
    }

    #[tokio::test]
    async fn scan_dispatches_at_most_once_per_minute() {
        let registry = Arc::new(JobRegistry::new());
        let id = register(&registry, hourly(30)).await;
        let matcher = matcher_with(Arc::clone(&registry));

        let first = matcher.scan(tick(2025, 3, 5, 14, 30)).await;
        assert_eq!(first, vec![id]);

        // Second pass within the same minute must be a no-op
        let second = matcher.scan(tick(2025, 3, 5, 14, 30)).await;
        assert!(second.is_empty());

        // Next hour's occurrence is a fresh minute key
        let next_hour = matcher.scan(tick(2025, 3, 5, 15, 30)).await;
        assert_eq!(next_hour, vec![id]);
    }

    #[tokio::test]
    async fn scan_records_last_run_key() {
        let registry = Arc::new(JobRegistry::new());
        let id = register(&registry, daily(14, 0)).await;
        let matcher = matcher_with(Arc::clone(&registry));

        matcher.scan(tick(2025, 3, 5, 14, 0)).await;

        let jobs = registry.list().await;
        assert_eq!(jobs[0].id, id);
        assert_eq!(
            jobs[0].last_run.as_ref().map(|k| k.to_string()),
            Some("2025-03-05T14:00".to_string())
        );
    }

    #[tokio::test]
    async fn scan_skips_jobs_that_are_not_due() {
        let registry = Arc::new(JobRegistry::new());
        register(&registry, hourly(30)).await;
        register(&registry, daily(9, 30)).await;
        register(&registry, weekly(0, 14, 30)).await;
        let matcher = matcher_with(Arc::clone(&registry));

        // Wednesday 14:30 — hourly matches, daily (9:30) and weekly
        // (Sunday) do not
        let due = matcher.scan(tick(2025, 3, 5, 14, 30)).await;
        assert_eq!(due, vec![JobId(1)]);
    }

    #[tokio::test]
    async fn jobs_are_evaluated_in_store_order() {
        let registry = Arc::new(JobRegistry::new());
        let a = register(&registry, hourly(30)).await;
        let b = register(&registry, daily(14, 30)).await;
        let c = register(&registry, hourly(30)).await;
        let matcher = matcher_with(Arc::clone(&registry));

        let due = matcher.scan(tick(2025, 3, 5, 14, 30)).await;
        assert_eq!(due, vec![a, b, c]);
    }

    #[tokio::test]
    async fn deleted_job_no_longer_dispatches() {
        let registry = Arc::new(JobRegistry::new());
        let id = register(&registry, hourly(30)).await;
        let matcher = matcher_with(Arc::clone(&registry));

        registry.delete(id).await.unwrap();
        let due = matcher.scan(tick(2025, 3, 5, 14, 30)).await;
        assert!(due.is_empty());
    }

    #[tokio::test]
    async fn failed_execution_leaves_job_eligible_next_occurrence() {
        struct FailingRunner;

        #[async_trait]
        impl JobRunner for FailingRunner {
            async fn run(&self, _id: JobId) -> Result<(), String> {
                Err("boom".to_string())
            }
        }

        let registry = Arc::new(JobRegistry::new());
        let id = register(&registry, hourly(30)).await;
        let matcher = Matcher::new(
            Arc::clone(&registry),
            Dispatcher::new(Arc::new(FailingRunner)),
        );

        let first = matcher.scan(tick(2025, 3, 5, 14, 30)).await;
        assert_eq!(first, vec![id]);

        let next = matcher.scan(tick(2025, 3, 5, 15, 30)).await;
        assert_eq!(next, vec![id]);
    }
}
