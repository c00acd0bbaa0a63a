//! Error types for collection operations.
//!
//! Each capability has its own error type so a failure can be attributed to
//! the stage that produced it:
//!
//! - [`ProviderError`] - fetching or parsing upstream data
//! - [`StoreError`] - persisting or publishing a record
//! - [`LocationError`] - invalid location configuration
//! - [`RecordError`] - a record that violates its invariants

use thiserror::Error;

/// Errors that can occur while fetching records from an upstream source.
#[derive(Error, Debug)]
pub enum ProviderError {
    /// Network-related errors (connection failures, timeouts, HTTP errors).
    #[error("Network error: {0}")]
    Network(String),

    /// Rate limit exceeded by a provider.
    #[error("Rate limited by {provider}: retry after {retry_after:?}")]
    RateLimited {
        /// The provider that rate limited the request.
        provider: String,
        /// Suggested time to wait before retrying.
        retry_after: Option<std::time::Duration>,
    },

    /// Authentication failed for a provider.
    #[error("Authentication failed for provider {0}")]
    AuthenticationFailed(String),

    /// Error parsing data from a provider.
    #[error("Parse error: {0}")]
    Parse(String),

    /// The upstream response parsed but did not have the expected shape.
    #[error("Unexpected response from {provider}: {message}")]
    UnexpectedResponse {
        /// The provider that returned the response.
        provider: String,
        /// What was wrong with it.
        message: String,
    },

    /// An invalid parameter was provided.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}

/// Errors that can occur while persisting or publishing records.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The backend could not be reached or opened.
    #[error("Connection error: {0}")]
    Connection(String),

    /// A record could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// The backend rejected a write.
    #[error("Write error: {0}")]
    Write(String),

    /// A read against the backend failed.
    #[error("Read error: {0}")]
    Read(String),

    /// The store was used before `open` or after `close`.
    #[error("Store {0} is not open")]
    NotOpen(String),
}

/// Errors raised when building a [`Location`](crate::types::Location).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LocationError {
    /// Location codes must be non-empty ASCII alphanumerics, `_` or `-`.
    #[error("Invalid location code: {0:?}")]
    InvalidCode(String),

    /// A coordinate is outside the valid decimal degree range.
    #[error("Invalid coordinate for {code}: lat={lat}, lng={lng}")]
    InvalidCoordinate {
        /// Code of the offending location.
        code: String,
        /// Latitude that was supplied.
        lat: f64,
        /// Longitude that was supplied.
        lng: f64,
    },

    /// The north-east corner lies south of the south-west corner.
    #[error("Inverted bounding box for {0}")]
    InvertedBounds(String),

    /// Neither a point nor a bounding box was supplied.
    #[error("Location {0} has neither a point nor a bounding box")]
    MissingArea(String),

    /// Two locations share the same code.
    #[error("Duplicate location code: {0}")]
    Duplicate(String),
}

/// Errors raised when a record would violate its invariants.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RecordError {
    /// A required textual field is empty.
    #[error("Required field `{0}` is empty")]
    EmptyField(&'static str),

    /// A numeric field is not finite or lies outside its range.
    #[error("Field `{field}` has invalid value {value}")]
    InvalidValue {
        /// Name of the field.
        field: &'static str,
        /// The rejected value.
        value: f64,
    },
}

impl From<RecordError> for StoreError {
    fn from(e: RecordError) -> Self {
        Self::Serialization(e.to_string())
    }
}
