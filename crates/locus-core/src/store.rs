//! Store trait for persisting and publishing records.
//!
//! This module defines the [`Store`] trait that provides a unified interface
//! over durable backends (a database) and broadcast backends (a pub/sub topic).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::fmt::Debug;

use crate::{
    error::StoreError,
    types::{Location, Record},
};

/// Capability that accepts records for persistence or distribution.
///
/// `open` and `close` bracket the store's lifetime; backends that need no
/// bootstrap keep the default no-op implementations. Publish-only backends
/// keep the default `get`, which always reports the record as absent.
#[async_trait]
pub trait Store: Send + Sync + Debug {
    /// Returns the name of this store (e.g., "sqlite").
    fn name(&self) -> &str;

    /// Prepares the backend for the given locations.
    ///
    /// Called once before the first `save`.
    async fn open(&self, _locations: &[Location]) -> Result<(), StoreError> {
        Ok(())
    }

    /// Persists or publishes one record.
    ///
    /// Safe to call repeatedly for unrelated records.
    async fn save(&self, record: Record) -> Result<(), StoreError>;

    /// Reads back the record saved for `location` at exactly `ts`.
    ///
    /// Returns `Ok(None)` if no such record exists or the backend cannot read.
    async fn get(
        &self,
        _location: &Location,
        _ts: DateTime<Utc>,
    ) -> Result<Option<Record>, StoreError> {
        Ok(None)
    }

    /// Releases any held connection or channel.
    async fn close(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
