#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/locus-rs/locus/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Periodic, location-scoped data collection.
//!
//! This crate wires providers and stores together. It re-exports the core
//! types, the store backends and the enabled providers, and adds the
//! [`Collector`] (one pass over every location) and the [`Scheduler`]
//! (fixed-rate, non-overlapping cycles).
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use locus::{Collector, OpenWeatherProvider, Scheduler, SqliteStore, config};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let locations = config::default_locations()?;
//!     let store = Arc::new(SqliteStore::new("weather.db"));
//!     store.open(&locations).await?;
//!
//!     let collector = Collector::new(
//!         locations,
//!         Arc::new(OpenWeatherProvider::new("api_key")),
//!         store.clone(),
//!     );
//!     let report = collector.run_cycle().await;
//!     println!("saved {} records", report.saved());
//!
//!     store.close().await?;
//!     Ok(())
//! }
//! ```

// Core types and traits
pub use locus_core::*;

// Store backends
pub use locus_store::{InMemoryStore, NoopStore, SqliteStore, ZenohStore};

// Providers
#[cfg(feature = "airbnb")]
pub use locus_airbnb::AirbnbProvider;
#[cfg(feature = "openweather")]
pub use locus_openweather::OpenWeatherProvider;

pub mod cli;
pub mod collector;
pub mod config;
pub mod logging;
pub mod scheduler;

pub use collector::{Collector, CycleError, CycleReport, LocationOutcome, run_cycle};
pub use config::ConfigError;
pub use scheduler::{DEFAULT_PERIOD, ScheduledJob, Scheduler, SchedulerFault, SchedulerStats};
