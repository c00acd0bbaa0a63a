#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/locus-rs/locus/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Core traits and types for location-scoped data collection.
//!
//! This crate provides the foundational abstractions shared by every provider
//! and store:
//!
//! - [`Location`](types::Location) - A configured geographic area of interest
//! - [`Record`](types::Record) - One normalized observation or listing
//! - [`Provider`](provider::Provider) - Produces records for a location
//! - [`Store`](store::Store) - Persists or publishes records
//! - [`CheckInPolicy`](window::CheckInPolicy) - Deterministic forward-looking windows

/// Canonical text encoding for records and instants.
pub mod codec;
/// Error types for providers, stores and validation.
pub mod error;
/// Provider trait for fetching records.
pub mod provider;
/// Store trait for persisting and publishing records.
pub mod store;
/// Core data types (Location, Record, payloads).
pub mod types;
/// Forward-looking date windows derived from the current instant.
pub mod window;

// Re-export commonly used items at crate root
pub use error::{LocationError, ProviderError, RecordError, StoreError};
pub use provider::Provider;
pub use store::Store;
pub use types::{
    AccommodationListing, BoundingBox, GeoPoint, Location, LocationCode, Locations, Payload,
    Record, WeatherForecast,
};
pub use window::{CheckInPolicy, CheckInWindow};
