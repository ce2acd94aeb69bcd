//! Recurring job registration.
//!
//! Each job is one tokio task looping over an interval. The task awaits
//! its own run before waiting for the next tick, so runs of one job never
//! overlap. Ticks missed during a long run collapse into one catch-up run.

use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Name of the pipeline's recurring job.
pub const PIPELINE_JOB: &str = "feedpress_hourly_import";

#[derive(Debug, Default)]
pub struct Scheduler {
    jobs: HashMap<String, JoinHandle<()>>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `task` to run now and then every `interval`.
    ///
    /// Returns `false` without touching the existing registration if `job`
    /// is already scheduled.
    pub fn schedule<F, Fut>(&mut self, job: &str, interval: Duration, mut task: F) -> bool
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        if self.is_scheduled(job) {
            tracing::debug!(job, "Job already scheduled");
            return false;
        }

        let name = job.to_string();
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                tracing::debug!(job = %name, "Running scheduled job");
                task().await;
            }
        });

        tracing::info!(job, interval_secs = interval.as_secs(), "Scheduled job");
        self.jobs.insert(job.to_string(), handle);
        true
    }

    /// Stops `job`. A run in progress is cancelled at its next await point.
    ///
    /// Returns whether the job was registered.
    pub fn unschedule(&mut self, job: &str) -> bool {
        match self.jobs.remove(job) {
            Some(handle) => {
                handle.abort();
                tracing::info!(job, "Unscheduled job");
                true
            }
            None => false,
        }
    }

    pub fn is_scheduled(&self, job: &str) -> bool {
        self.jobs
            .get(job)
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Unschedules every job.
    pub fn shutdown(&mut self) {
        for (job, handle) in self.jobs.drain() {
            handle.abort();
            tracing::info!(job = %job, "Unscheduled job");
        }
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        for handle in self.jobs.values() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    const HOUR: Duration = Duration::from_secs(3600);

    fn counting_task(counter: &Arc<AtomicUsize>) -> impl FnMut() -> std::future::Ready<()> + Send {
        let counter = Arc::clone(counter);
        move || {
            counter.fetch_add(1, Ordering::SeqCst);
            std::future::ready(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_runs_immediately_then_every_interval() {
        let runs = Arc::new(AtomicUsize::new(0));
        let mut scheduler = Scheduler::new();
        assert!(scheduler.schedule(PIPELINE_JOB, HOUR, counting_task(&runs)));

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 1);

        tokio::time::sleep(HOUR * 2).await;
        assert_eq!(runs.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_schedule_is_rejected() {
        let runs = Arc::new(AtomicUsize::new(0));
        let mut scheduler = Scheduler::new();

        assert!(scheduler.schedule(PIPELINE_JOB, HOUR, counting_task(&runs)));
        assert!(!scheduler.schedule(PIPELINE_JOB, HOUR, counting_task(&runs)));
        assert!(scheduler.is_scheduled(PIPELINE_JOB));

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unschedule_stops_runs() {
        let runs = Arc::new(AtomicUsize::new(0));
        let mut scheduler = Scheduler::new();
        scheduler.schedule(PIPELINE_JOB, HOUR, counting_task(&runs));

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(scheduler.unschedule(PIPELINE_JOB));
        assert!(!scheduler.is_scheduled(PIPELINE_JOB));
        assert!(!scheduler.unschedule(PIPELINE_JOB));

        tokio::time::sleep(HOUR * 3).await;
        assert_eq!(runs.load(Ordering::SeqCst), 1);

        // Can be registered again after removal
        assert!(scheduler.schedule(PIPELINE_JOB, HOUR, counting_task(&runs)));
        scheduler.shutdown();
        assert!(!scheduler.is_scheduled(PIPELINE_JOB));
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_run_skips_missed_ticks() {
        let runs = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&runs);
        let mut scheduler = Scheduler::new();
        scheduler.schedule(PIPELINE_JOB, HOUR, move || {
            let counter = Arc::clone(&counter);
            async move {
                // Only the first run is slow
                if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                    tokio::time::sleep(HOUR * 3 + Duration::from_secs(60)).await;
                }
            }
        });

        // First run ends at 3h01m; one catch-up run follows, not three
        tokio::time::sleep(HOUR * 3 + Duration::from_secs(30 * 60)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 2);

        // Back on the hourly grid at 4h
        tokio::time::sleep(HOUR).await;
        assert_eq!(runs.load(Ordering::SeqCst), 3);
    }
}
