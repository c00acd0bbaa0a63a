//! Zenoh broadcast store.
//!
//! Publishes each record's canonical JSON to `<topic>/<LOCATION_CODE>` so
//! downstream consumers can subscribe to one location or, with `<topic>/**`,
//! to all of them. Nothing is retained, so `get` always reports absence.

use async_trait::async_trait;
use locus_core::{Location, Record, Store, StoreError, codec};
use std::fmt;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};
use zenoh::Session;
use zenoh::bytes::Encoding;

/// Default topic prefix for published records.
pub const DEFAULT_TOPIC: &str = "locus/records";

/// Store that publishes records to a zenoh topic.
///
/// The session is opened by [`Store::open`] or, failing that, on the first
/// `save`, and released by [`Store::close`]. Saves share the session behind an
/// async mutex, so concurrent callers publish one at a time.
pub struct ZenohStore {
    topic: String,
    endpoint: Option<String>,
    session: Mutex<Option<Session>>,
}

impl fmt::Debug for ZenohStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ZenohStore")
            .field("topic", &self.topic)
            .field("endpoint", &self.endpoint)
            .field(
                "connected",
                &self.session.try_lock().map(|s| s.is_some()).unwrap_or(true),
            )
            .finish()
    }
}

impl ZenohStore {
    /// Create a store publishing under `topic`, using zenoh's default peer
    /// discovery.
    #[must_use]
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into().trim_end_matches('/').to_string(),
            endpoint: None,
            session: Mutex::new(None),
        }
    }

    /// Connect to an explicit endpoint (e.g. `tcp/127.0.0.1:7447`).
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// The topic prefix records are published under.
    #[must_use]
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Key expression a record for `location` is published on.
    #[must_use]
    pub fn key_for(&self, location: &Location) -> String {
        format!("{}/{}", self.topic, location.code())
    }

    fn config(&self) -> Result<zenoh::Config, StoreError> {
        let mut config = zenoh::Config::default();
        if let Some(endpoint) = &self.endpoint {
            config
                .insert_json5("connect/endpoints", &format!("[\"{endpoint}\"]"))
                .map_err(|e| StoreError::Connection(format!("invalid endpoint: {e}")))?;
        }
        Ok(config)
    }

    async fn connect(&self) -> Result<Session, StoreError> {
        let session = zenoh::open(self.config()?)
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;
        info!(topic = %self.topic, "Zenoh session opened");
        Ok(session)
    }
}

#[async_trait]
impl Store for ZenohStore {
    fn name(&self) -> &str {
        "zenoh"
    }

    #[instrument(skip(self, _locations))]
    async fn open(&self, _locations: &[Location]) -> Result<(), StoreError> {
        let mut session = self.session.lock().await;
        if session.is_none() {
            *session = Some(self.connect().await?);
        }
        Ok(())
    }

    #[instrument(skip(self, record), fields(location = %record.location().code()))]
    async fn save(&self, record: Record) -> Result<(), StoreError> {
        let payload = codec::encode(&record)?;
        let key = self.key_for(record.location());

        let mut guard = self.session.lock().await;
        if guard.is_none() {
            debug!("Opening zenoh session on first publish");
            *guard = Some(self.connect().await?);
        }
        let session = guard
            .as_ref()
            .ok_or_else(|| StoreError::NotOpen(self.name().to_string()))?;

        session
            .put(key.as_str(), payload)
            .encoding(Encoding::APPLICATION_JSON)
            .await
            .map_err(|e| StoreError::Write(e.to_string()))?;

        debug!(key = %key, "Published record");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn close(&self) -> Result<(), StoreError> {
        let session = self.session.lock().await.take();
        if let Some(session) = session {
            if let Err(e) = session.close().await {
                warn!(error = %e, "Failed to close zenoh session cleanly");
                return Err(StoreError::Connection(e.to_string()));
            }
            info!(topic = %self.topic, "Zenoh session closed");
        }
        Ok(())
    }
}
