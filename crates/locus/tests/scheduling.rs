//! Scheduler behaviour with a collector-like job under a paused clock.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use locus::{
    Collector, InMemoryStore, Location, Provider, ProviderError, Record, ScheduledJob, Scheduler,
    SchedulerFault, config,
};
use tokio::time::sleep;

/// A cycle that takes `work` and tracks how many cycles overlap.
struct SlowCycle {
    work: Duration,
    cycles: AtomicUsize,
    active: AtomicUsize,
    max_active: AtomicUsize,
}

#[async_trait]
impl ScheduledJob for SlowCycle {
    fn name(&self) -> &str {
        "slow-cycle"
    }

    async fn run(&self) -> Result<(), SchedulerFault> {
        self.cycles.fetch_add(1, Ordering::SeqCst);
        let active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(active, Ordering::SeqCst);
        sleep(self.work).await;
        self.active.fetch_sub(1, Ordering::SeqCst);
        Ok(())
    }
}

#[tokio::test(start_paused = true)]
async fn test_slow_cycles_never_overlap() {
    let job = Arc::new(SlowCycle {
        work: Duration::from_millis(250),
        cycles: AtomicUsize::new(0),
        active: AtomicUsize::new(0),
        max_active: AtomicUsize::new(0),
    });
    let scheduler = Scheduler::from_arc(job.clone(), Duration::from_millis(100));

    let stats = scheduler.run_until(sleep(Duration::from_secs(1))).await;

    let cycles = job.cycles.load(Ordering::SeqCst);
    assert!((3..=4).contains(&cycles), "ran {cycles} cycles");
    assert_eq!(stats.fired as usize, cycles);
    assert!(stats.skipped > 0);
    assert_eq!(job.max_active.load(Ordering::SeqCst), 1);
}

/// Panics on its first fetch, then behaves.
#[derive(Debug, Default)]
struct PanickyProvider {
    calls: AtomicUsize,
}

#[async_trait]
impl Provider for PanickyProvider {
    fn name(&self) -> &str {
        "panicky"
    }

    fn description(&self) -> &str {
        "panics once"
    }

    async fn fetch(&self, _location: &Location) -> Result<Vec<Record>, ProviderError> {
        if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
            panic!("unexpected upstream shape");
        }
        Ok(Vec::new())
    }
}

#[tokio::test(start_paused = true)]
async fn test_panicking_cycle_is_contained() {
    let locations = config::default_locations().unwrap();
    let provider = Arc::new(PanickyProvider::default());
    let collector = Collector::new(locations, provider.clone(), Arc::new(InMemoryStore::new()));
    let scheduler = Scheduler::new(collector, Duration::from_secs(60));

    let stats = scheduler.run_until(sleep(Duration::from_secs(90))).await;

    assert_eq!(stats.fired, 2);
    assert_eq!(stats.faults, 1);
    // First cycle stopped at its first fetch; the second covered all eight.
    assert_eq!(provider.calls.load(Ordering::SeqCst), 9);
}
