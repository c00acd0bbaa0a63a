//! No-op store implementation.

use async_trait::async_trait;
use locus_core::{Record, Store, StoreError};
use tracing::trace;

/// A no-op store that doesn't keep anything.
///
/// `save` accepts and drops every record and `get` always returns `Ok(None)`.
/// Useful for dry runs that exercise providers without a backend.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopStore;

impl NoopStore {
    /// Create a new no-op store.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Store for NoopStore {
    fn name(&self) -> &str {
        "noop"
    }

    async fn save(&self, record: Record) -> Result<(), StoreError> {
        trace!(
            location = %record.location().code(),
            kind = record.payload().kind(),
            "NoopStore: save called, dropping record"
        );
        Ok(())
    }
}
