//! Provider trait for fetching records.
//!
//! A [`Provider`] wraps one upstream data source and turns its responses into
//! validated [`Record`]s for a single [`Location`] at a time.

use async_trait::async_trait;
use std::fmt::Debug;

use crate::{
    error::ProviderError,
    types::{Location, Record},
};

/// Capability that produces records for a location "as of now".
///
/// Implementations must:
///
/// - return only records that satisfy the [`Record`] invariants, silently
///   dropping upstream candidates with missing or invalid fields;
/// - surface I/O, authentication and response-shape failures as
///   [`ProviderError`] instead of retrying;
/// - leave the given location untouched.
#[async_trait]
pub trait Provider: Send + Sync + Debug {
    /// Returns the name of this provider (e.g., "openweathermap").
    ///
    /// The name doubles as the `source` of every record it produces.
    fn name(&self) -> &str;

    /// Returns a description of this provider.
    fn description(&self) -> &str;

    /// Fetches the current records for one location.
    ///
    /// The returned sequence is finite and may be empty.
    async fn fetch(&self, location: &Location) -> Result<Vec<Record>, ProviderError>;
}
