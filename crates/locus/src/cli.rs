//! Command-line interface of the `locus` binary.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Result, bail};
use clap::{Parser, ValueEnum};
use locus_core::{Locations, Provider, Store};
use locus_store::broadcast::DEFAULT_TOPIC;
use locus_store::{NoopStore, SqliteStore, ZenohStore};

use crate::config::{self, ConfigError};
use crate::logging::LogFormat;
use crate::scheduler::DEFAULT_PERIOD;

/// Upstream data source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ProviderKind {
    /// OpenWeatherMap midday forecasts.
    Weather,
    /// Airbnb listings for the next check-in window.
    Accommodation,
}

/// Destination for collected records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StoreKind {
    /// Embedded SQLite database.
    Sqlite,
    /// Zenoh topic.
    Zenoh,
    /// Discard everything (dry run).
    Noop,
}

/// locus - periodic location-scoped data collection
#[derive(Parser, Debug)]
#[command(name = "locus", version, about, long_about = None)]
pub struct Cli {
    /// API key for the selected provider
    #[arg(long, env = "LOCUS_API_KEY", hide_env_values = true)]
    pub api_key: String,

    /// Data source to collect from
    #[arg(long, value_enum, default_value_t = ProviderKind::Weather)]
    pub provider: ProviderKind,

    /// Where to send records
    #[arg(long, value_enum, default_value_t = StoreKind::Sqlite)]
    pub store: StoreKind,

    /// SQLite database path
    #[arg(long, env = "LOCUS_DB_PATH", default_value = "locus.db")]
    pub db_path: PathBuf,

    /// Zenoh endpoint to connect to (default: peer discovery)
    #[arg(long, env = "LOCUS_ZENOH_ENDPOINT")]
    pub zenoh_endpoint: Option<String>,

    /// Zenoh topic prefix
    #[arg(long, default_value = DEFAULT_TOPIC)]
    pub topic: String,

    /// JSON file with the locations to collect (default: Canary Islands)
    #[arg(long)]
    pub locations: Option<PathBuf>,

    /// Seconds between cycles
    #[arg(long, default_value_t = DEFAULT_PERIOD.as_secs(), value_parser = clap::value_parser!(u64).range(1..))]
    pub period_secs: u64,

    /// Maximum concurrent fetches within a cycle
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u64).range(1..=64))]
    pub concurrency: u64,

    /// Run a single cycle and exit
    #[arg(long)]
    pub once: bool,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,

    /// Enable debug logging for all crates
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// The period between cycles.
    #[must_use]
    pub const fn period(&self) -> Duration {
        Duration::from_secs(self.period_secs)
    }

    /// The configured locations, or the built-in set.
    ///
    /// # Errors
    /// Fails if the locations file cannot be loaded.
    pub fn load_locations(&self) -> Result<Locations, ConfigError> {
        match &self.locations {
            Some(path) => config::load_locations(path),
            None => Ok(config::default_locations()?),
        }
    }

    /// Build the selected provider.
    ///
    /// # Errors
    /// Fails if the provider was not compiled in.
    pub fn build_provider(&self) -> Result<Arc<dyn Provider>> {
        match self.provider {
            #[cfg(feature = "openweather")]
            ProviderKind::Weather => Ok(Arc::new(locus_openweather::OpenWeatherProvider::new(
                &self.api_key,
            ))),
            #[cfg(feature = "airbnb")]
            ProviderKind::Accommodation => {
                Ok(Arc::new(locus_airbnb::AirbnbProvider::new(&self.api_key)))
            }
            #[allow(unreachable_patterns)]
            kind => bail!("provider {kind:?} is not enabled in this build"),
        }
    }

    /// Build the selected store. The store is not opened yet.
    #[must_use]
    pub fn build_store(&self) -> Arc<dyn Store> {
        match self.store {
            StoreKind::Sqlite => Arc::new(SqliteStore::new(&self.db_path)),
            StoreKind::Zenoh => {
                let store = ZenohStore::new(&self.topic);
                Arc::new(match &self.zenoh_endpoint {
                    Some(endpoint) => store.with_endpoint(endpoint),
                    None => store,
                })
            }
            StoreKind::Noop => Arc::new(NoopStore::new()),
        }
    }
}
