//! Canonical text encoding for records.
//!
//! Records travel as JSON with the capture instant written as an RFC 3339 UTC
//! timestamp carrying nine fractional digits (see [`format_instant`]). The
//! fixed width keeps the text form lexically ordered, so stores may compare
//! encoded capture instants directly. Payload instants use chrono's default
//! RFC 3339 form.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serializer;

use crate::error::StoreError;
use crate::types::Record;

/// Encodes a record as canonical JSON.
///
/// # Errors
/// Returns [`StoreError::Serialization`] if encoding fails.
pub fn encode(record: &Record) -> Result<String, StoreError> {
    serde_json::to_string(record).map_err(|e| StoreError::Serialization(e.to_string()))
}

/// Decodes a record from canonical JSON, re-checking its invariants.
///
/// # Errors
/// Returns [`StoreError::Serialization`] if the text is malformed or the
/// decoded record is invalid.
pub fn decode(text: &str) -> Result<Record, StoreError> {
    serde_json::from_str(text).map_err(|e| StoreError::Serialization(e.to_string()))
}

/// Formats an instant in the canonical fixed-width form.
#[must_use]
pub fn format_instant(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

/// Serializes an instant through [`format_instant`].
pub(crate) fn serialize_instant<S: Serializer>(
    ts: &DateTime<Utc>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format_instant(*ts))
}

/// Parses an instant written by [`format_instant`] (or any RFC 3339 text).
///
/// # Errors
/// Returns [`StoreError::Serialization`] if the text is not RFC 3339.
pub fn parse_instant(text: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(text)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::Serialization(format!("invalid instant {text:?}: {e}")))
}
