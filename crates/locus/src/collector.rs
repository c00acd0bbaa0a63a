//! Collection cycles: fetch every location once and save what comes back.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use thiserror::Error;
use tracing::{debug, info, warn};

use locus_core::{
    Location, LocationCode, Locations, Provider, ProviderError, Record, Store, StoreError,
};

use crate::scheduler::{ScheduledJob, SchedulerFault};

/// Why a location failed within a cycle.
#[derive(Debug, Error)]
pub enum CycleError {
    /// The provider could not fetch the location.
    #[error("fetch failed: {0}")]
    Provider(#[from] ProviderError),

    /// The store rejected a record.
    #[error("save failed: {0}")]
    Store(#[from] StoreError),
}

/// Result of one location within a cycle.
#[derive(Debug)]
pub struct LocationOutcome {
    /// The location attempted.
    pub location: LocationCode,
    /// Records the provider returned.
    pub fetched: usize,
    /// Records the store accepted before any failure.
    pub saved: usize,
    /// The failure, if the location did not complete.
    pub error: Option<CycleError>,
}

impl LocationOutcome {
    /// Returns true if the location completed without error.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Aggregate result of a cycle, one outcome per location in input order.
#[derive(Debug)]
pub struct CycleReport {
    /// When the cycle began.
    pub started_at: DateTime<Utc>,
    /// When the last location finished.
    pub finished_at: DateTime<Utc>,
    /// Per-location outcomes.
    pub outcomes: Vec<LocationOutcome>,
}

impl CycleReport {
    /// Total records saved across all locations.
    #[must_use]
    pub fn saved(&self) -> usize {
        self.outcomes.iter().map(|o| o.saved).sum()
    }

    /// Number of locations that failed.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.outcomes.iter().filter(|o| !o.is_success()).count()
    }

    /// Number of locations that completed.
    #[must_use]
    pub fn succeeded(&self) -> usize {
        self.outcomes.len() - self.failed()
    }

    /// The failed locations with their errors.
    pub fn failures(&self) -> impl Iterator<Item = (&LocationCode, &CycleError)> {
        self.outcomes
            .iter()
            .filter_map(|o| o.error.as_ref().map(|e| (&o.location, e)))
    }
}

/// Run one cycle: fetch each location in order and save its records.
///
/// A failing fetch or save is recorded for that location and the cycle moves
/// on; nothing is retried.
pub async fn run_cycle(
    locations: &[Location],
    provider: &dyn Provider,
    store: &dyn Store,
) -> CycleReport {
    run_cycle_buffered(locations, provider, store, 1).await
}

/// Like [`run_cycle`], with up to `concurrency` fetches in flight.
///
/// Results are still consumed in location order and saves stay sequential.
async fn run_cycle_buffered(
    locations: &[Location],
    provider: &dyn Provider,
    store: &dyn Store,
    concurrency: usize,
) -> CycleReport {
    let started_at = Utc::now();
    debug!(
        provider = provider.name(),
        store = store.name(),
        locations = locations.len(),
        concurrency,
        "Cycle started"
    );

    let pending: Vec<_> = locations
        .iter()
        .map(|location| fetch_location(location, provider))
        .collect();
    let mut fetches = stream::iter(pending).buffered(concurrency.max(1));

    let mut outcomes = Vec::with_capacity(locations.len());
    while let Some((location, fetched)) = fetches.next().await {
        outcomes.push(save_location(location, fetched, store).await);
    }

    let report = CycleReport {
        started_at,
        finished_at: Utc::now(),
        outcomes,
    };
    info!(
        started_at = %report.started_at,
        saved = report.saved(),
        succeeded = report.succeeded(),
        failed = report.failed(),
        "Cycle complete"
    );
    report
}

async fn fetch_location<'a>(
    location: &'a Location,
    provider: &'a dyn Provider,
) -> (&'a Location, Result<Vec<Record>, ProviderError>) {
    (location, provider.fetch(location).await)
}

async fn save_location(
    location: &Location,
    fetched: Result<Vec<Record>, ProviderError>,
    store: &dyn Store,
) -> LocationOutcome {
    let code = location.code().clone();
    let records = match fetched {
        Ok(records) => records,
        Err(e) => {
            warn!(location = %code, error = %e, "Fetch failed");
            return LocationOutcome {
                location: code,
                fetched: 0,
                saved: 0,
                error: Some(e.into()),
            };
        }
    };

    let fetched = records.len();
    let mut saved = 0;
    for record in records {
        if let Err(e) = store.save(record).await {
            warn!(location = %code, saved, fetched, error = %e, "Save failed");
            return LocationOutcome {
                location: code,
                fetched,
                saved,
                error: Some(e.into()),
            };
        }
        saved += 1;
    }

    debug!(location = %code, saved, "Location complete");
    LocationOutcome {
        location: code,
        fetched,
        saved,
        error: None,
    }
}

/// A provider, a store and the locations to collect, bundled as a job.
#[derive(Clone)]
pub struct Collector {
    locations: Locations,
    provider: Arc<dyn Provider>,
    store: Arc<dyn Store>,
    concurrency: usize,
}

impl fmt::Debug for Collector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collector")
            .field(
                "locations",
                &self.locations.iter().map(|l| l.code().as_str()).collect::<Vec<_>>(),
            )
            .field("provider", &self.provider.name())
            .field("store", &self.store.name())
            .field("concurrency", &self.concurrency)
            .finish()
    }
}

impl Collector {
    /// Create a collector that fetches one location at a time.
    #[must_use]
    pub fn new(locations: Locations, provider: Arc<dyn Provider>, store: Arc<dyn Store>) -> Self {
        Self {
            locations,
            provider,
            store,
            concurrency: 1,
        }
    }

    /// Allow up to `concurrency` fetches in flight (minimum 1).
    #[must_use]
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// The configured locations.
    #[must_use]
    pub const fn locations(&self) -> &Locations {
        &self.locations
    }

    /// Run one cycle over every configured location.
    pub async fn run_cycle(&self) -> CycleReport {
        run_cycle_buffered(
            &self.locations,
            self.provider.as_ref(),
            self.store.as_ref(),
            self.concurrency,
        )
        .await
    }

    /// Run one cycle unless `shutdown` resolves first, in which case the
    /// cycle is abandoned and `None` is returned.
    pub async fn run_cycle_until<F>(&self, shutdown: F) -> Option<CycleReport>
    where
        F: Future<Output = ()>,
    {
        tokio::select! {
            report = self.run_cycle() => Some(report),
            () = shutdown => {
                warn!(
                    provider = self.provider.name(),
                    "Shutdown requested, abandoning cycle"
                );
                None
            }
        }
    }
}

#[async_trait]
impl ScheduledJob for Collector {
    fn name(&self) -> &str {
        self.provider.name()
    }

    async fn run(&self) -> Result<(), SchedulerFault> {
        let report = self.run_cycle().await;
        for (code, error) in report.failures() {
            debug!(location = %code, error = %error, "Location failed this cycle");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use locus_core::{GeoPoint, WeatherForecast};
    use locus_store::InMemoryStore;
    use std::sync::Mutex;

    #[derive(Debug, Default)]
    struct ScriptedProvider {
        calls: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Provider for ScriptedProvider {
        fn name(&self) -> &str {
            "scripted"
        }

        fn description(&self) -> &str {
            "returns two records, fails for codes starting with X"
        }

        async fn fetch(&self, location: &Location) -> Result<Vec<Record>, ProviderError> {
            self.calls.lock().unwrap().push(location.code().to_string());
            if location.code().as_str().starts_with('X') {
                return Err(ProviderError::Network("connection reset".to_string()));
            }
            let now = Utc::now();
            (0..2)
                .map(|i| {
                    let forecast = WeatherForecast {
                        predicted_at: now,
                        temperature: 20.0 + f64::from(i),
                        humidity: 50.0,
                        clouds: 0.0,
                        wind_speed: 1.0,
                        precipitation_probability: 0.0,
                        description: "clear sky".to_string(),
                    };
                    Record::new(now, "scripted", location.clone(), forecast)
                        .map_err(|e| ProviderError::Parse(e.to_string()))
                })
                .collect()
        }
    }

    fn locations(codes: &[&str]) -> Locations {
        Locations::new(
            codes
                .iter()
                .map(|c| Location::from_point(c, GeoPoint::new(28.0, -15.0)).unwrap())
                .collect(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_failing_location_does_not_stop_cycle() {
        let provider = ScriptedProvider::default();
        let store = InMemoryStore::new();
        let locations = locations(&["A1", "XB", "C3"]);

        let report = run_cycle(&locations, &provider, &store).await;

        assert_eq!(*provider.calls.lock().unwrap(), vec!["A1", "XB", "C3"]);
        assert_eq!(report.outcomes.len(), 3);
        assert_eq!(report.saved(), 4);
        assert_eq!(report.failed(), 1);
        assert_eq!(report.succeeded(), 2);

        let failures: Vec<_> = report.failures().collect();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].0.as_str(), "XB");
        assert!(matches!(failures[0].1, CycleError::Provider(_)));
        assert_eq!(store.len().await, 4);
        assert!(report.finished_at >= report.started_at);
    }

    #[tokio::test]
    async fn test_empty_location_list() {
        let report = run_cycle(&[], &ScriptedProvider::default(), &InMemoryStore::new()).await;
        assert!(report.outcomes.is_empty());
        assert_eq!(report.saved(), 0);
        assert_eq!(report.failed(), 0);
    }

    #[tokio::test]
    async fn test_concurrent_collector_keeps_location_order() {
        let store = Arc::new(InMemoryStore::new());
        let collector = Collector::new(
            locations(&["A1", "B2", "XC", "D4", "E5"]),
            Arc::new(ScriptedProvider::default()),
            store.clone(),
        )
        .with_concurrency(3);

        let report = collector.run_cycle().await;
        let order: Vec<&str> = report.outcomes.iter().map(|o| o.location.as_str()).collect();
        assert_eq!(order, vec!["A1", "B2", "XC", "D4", "E5"]);
        assert_eq!(report.saved(), 8);
        assert_eq!(store.len().await, 8);
    }

    #[derive(Debug)]
    struct StalledProvider;

    #[async_trait]
    impl Provider for StalledProvider {
        fn name(&self) -> &str {
            "stalled"
        }

        fn description(&self) -> &str {
            "never answers within a minute"
        }

        async fn fetch(&self, _location: &Location) -> Result<Vec<Record>, ProviderError> {
            tokio::time::sleep(std::time::Duration::from_secs(60)).await;
            Ok(Vec::new())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_interrupts_single_cycle() {
        let collector = Collector::new(
            locations(&["A1", "B2"]),
            Arc::new(StalledProvider),
            Arc::new(InMemoryStore::new()),
        );

        let interrupted = collector
            .run_cycle_until(tokio::time::sleep(std::time::Duration::from_secs(1)))
            .await;
        assert!(interrupted.is_none());

        let finished = collector
            .run_cycle_until(std::future::pending())
            .await
            .unwrap();
        assert_eq!(finished.succeeded(), 2);
    }

    #[tokio::test]
    async fn test_collector_job_never_faults_on_location_errors() {
        let collector = Collector::new(
            locations(&["XA", "XB"]),
            Arc::new(ScriptedProvider::default()),
            Arc::new(InMemoryStore::new()),
        );
        assert_eq!(ScheduledJob::name(&collector), "scripted");
        assert!(collector.run().await.is_ok());
    }
}
