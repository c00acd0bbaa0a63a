//! Fixed-rate scheduling of collection cycles.
//!
//! The n-th firing is due at `origin + n * period`, independent of how long
//! earlier cycles took. At most one cycle runs at a time: a firing that finds
//! the previous cycle still running is skipped, not queued.

use std::any::Any;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep_until};
use tracing::{debug, error, info, warn};

/// Default period between cycles (6 hours).
pub const DEFAULT_PERIOD: Duration = Duration::from_secs(6 * 60 * 60);

/// A failure escaping a job run, as opposed to per-location failures the job
/// absorbs itself.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchedulerFault {
    /// The job returned an error.
    #[error("job failed: {0}")]
    Job(String),

    /// The job panicked.
    #[error("job panicked: {0}")]
    Panicked(String),
}

/// Work the [`Scheduler`] fires once per period.
#[async_trait]
pub trait ScheduledJob: Send + Sync + 'static {
    /// Name used in log output.
    fn name(&self) -> &str;

    /// Run the job once.
    async fn run(&self) -> Result<(), SchedulerFault>;
}

/// Counters returned when the scheduler stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchedulerStats {
    /// Firings that started a cycle.
    pub fired: u64,
    /// Firings dropped because a cycle was still running.
    pub skipped: u64,
    /// Cycles that ended in a [`SchedulerFault`].
    pub faults: u64,
}

/// Fixed-rate, non-overlapping scheduler for a single job.
pub struct Scheduler {
    job: Arc<dyn ScheduledJob>,
    period: Duration,
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("job", &self.job.name())
            .field("period", &self.period)
            .finish()
    }
}

/// Clears the running flag when a cycle ends, however it ends.
struct RunningGuard(Arc<AtomicBool>);

impl Drop for RunningGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl Scheduler {
    /// Create a scheduler firing `job` every `period`. A zero period is
    /// raised to one millisecond.
    #[must_use]
    pub fn new(job: impl ScheduledJob, period: Duration) -> Self {
        Self::from_arc(Arc::new(job), period)
    }

    /// Create a scheduler for a shared job.
    #[must_use]
    pub fn from_arc(job: Arc<dyn ScheduledJob>, period: Duration) -> Self {
        Self {
            job,
            period: period.max(Duration::from_millis(1)),
        }
    }

    /// The firing period.
    #[must_use]
    pub const fn period(&self) -> Duration {
        self.period
    }

    /// Fire the job immediately and then every period until `shutdown`
    /// resolves, or until the next firing would lie beyond the clock's range.
    /// An in-flight cycle is awaited before returning.
    pub async fn run_until<F>(&self, shutdown: F) -> SchedulerStats
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        let running = Arc::new(AtomicBool::new(false));
        let faults = Arc::new(AtomicU64::new(0));
        let mut stats = SchedulerStats::default();
        let mut in_flight: Option<JoinHandle<()>> = None;
        // Deadlines advance by exact period steps from the first one, so the
        // n-th firing stays at `origin + n * period`.
        let mut next_fire = Some(Instant::now());
        let mut firing: u64 = 0;

        info!(job = self.job.name(), period = ?self.period, "Scheduler started");

        loop {
            let Some(deadline) = next_fire else {
                warn!(job = self.job.name(), "Next firing is beyond the clock's range");
                break;
            };

            tokio::select! {
                biased;
                () = &mut shutdown => {
                    info!(job = self.job.name(), "Shutdown requested");
                    break;
                }
                () = sleep_until(deadline) => {}
            }
            next_fire = deadline.checked_add(self.period);
            firing += 1;

            if running.swap(true, Ordering::AcqRel) {
                stats.skipped += 1;
                warn!(
                    job = self.job.name(),
                    firing,
                    "Previous cycle still running, skipping this firing"
                );
                continue;
            }

            stats.fired += 1;
            debug!(job = self.job.name(), firing, "Firing");
            let guard = RunningGuard(Arc::clone(&running));
            let job = Arc::clone(&self.job);
            let faults = Arc::clone(&faults);
            in_flight = Some(tokio::spawn(async move {
                let _guard = guard;
                supervise(job, &faults).await;
            }));
        }

        if let Some(handle) = in_flight.take() {
            if !handle.is_finished() {
                info!(job = self.job.name(), "Waiting for in-flight cycle");
            }
            if let Err(e) = handle.await {
                error!(job = self.job.name(), error = %e, "Cycle supervisor failed");
            }
        }

        stats.faults = faults.load(Ordering::Acquire);
        info!(
            job = self.job.name(),
            fired = stats.fired,
            skipped = stats.skipped,
            faults = stats.faults,
            "Scheduler stopped"
        );
        stats
    }
}

/// Run the job in its own task so a panic surfaces as a fault.
async fn supervise(job: Arc<dyn ScheduledJob>, faults: &AtomicU64) {
    let name = job.name().to_string();
    let started = Instant::now();

    let fault = match tokio::spawn(async move { job.run().await }).await {
        Ok(Ok(())) => None,
        Ok(Err(fault)) => Some(fault),
        Err(e) if e.is_panic() => Some(SchedulerFault::Panicked(panic_message(e.into_panic()))),
        Err(e) => Some(SchedulerFault::Job(e.to_string())),
    };

    let elapsed_ms = started.elapsed().as_millis() as u64;
    match fault {
        None => debug!(job = %name, elapsed_ms, "Cycle finished"),
        Some(fault) => {
            faults.fetch_add(1, Ordering::AcqRel);
            error!(job = %name, elapsed_ms, error = %fault, "Cycle fault");
        }
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}
