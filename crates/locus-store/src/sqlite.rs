//! SQLite-based store implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use locus_core::{Location, LocationCode, Record, Store, StoreError, codec};
use rusqlite::{Connection, OptionalExtension, params};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, instrument};

/// Where the database lives.
#[derive(Debug, Clone)]
enum Target {
    File(PathBuf),
    Memory,
}

/// SQLite-backed persistent store.
///
/// The connection is opened by [`Store::open`], which also creates the schema
/// and registers the configured locations, and released by [`Store::close`].
/// Records are kept as canonical JSON next to their location and capture
/// instant, so `get` returns a record equal to the one saved.
#[derive(Debug)]
pub struct SqliteStore {
    target: Target,
    conn: Mutex<Option<Connection>>,
}

impl SqliteStore {
    /// Create a store for the database file at the given path.
    ///
    /// Nothing is touched on disk until [`Store::open`] is called.
    #[must_use]
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            target: Target::File(path.as_ref().to_path_buf()),
            conn: Mutex::new(None),
        }
    }

    /// Create a store backed by an in-memory database.
    ///
    /// Useful for testing; data is lost when the store is closed.
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            target: Target::Memory,
            conn: Mutex::new(None),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Option<Connection>>, StoreError> {
        self.conn
            .lock()
            .map_err(|e| StoreError::Connection(e.to_string()))
    }

    fn connect(&self) -> Result<Connection, StoreError> {
        match &self.target {
            Target::File(path) => Connection::open(path),
            Target::Memory => Connection::open_in_memory(),
        }
        .map_err(|e| StoreError::Connection(e.to_string()))
    }

    /// Initialize the database schema.
    fn initialize_schema(conn: &Connection) -> Result<(), StoreError> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS locations (
                code TEXT PRIMARY KEY,
                name TEXT,
                lat REAL NOT NULL,
                lng REAL NOT NULL,
                ne_lat REAL,
                ne_lng REAL,
                sw_lat REAL,
                sw_lng REAL
            )",
            [],
        )
        .map_err(|e| StoreError::Connection(e.to_string()))?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS records (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                location TEXT NOT NULL REFERENCES locations(code),
                ts TEXT NOT NULL,
                source TEXT NOT NULL,
                kind TEXT NOT NULL,
                data_json TEXT NOT NULL
            )",
            [],
        )
        .map_err(|e| StoreError::Connection(e.to_string()))?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_records_location_ts
             ON records(location, ts)",
            [],
        )
        .map_err(|e| StoreError::Connection(e.to_string()))?;

        debug!("SQLite store schema initialized");
        Ok(())
    }

    fn not_open(&self) -> StoreError {
        StoreError::NotOpen(self.name().to_string())
    }

    /// Returns the number of stored records.
    ///
    /// # Errors
    /// Returns an error if the store is not open or the query fails.
    pub fn count(&self) -> Result<u64, StoreError> {
        let guard = self.lock()?;
        let conn = guard.as_ref().ok_or_else(|| self.not_open())?;
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM records", [], |row| row.get(0))
            .map_err(|e| StoreError::Read(e.to_string()))?;
        Ok(u64::try_from(count).unwrap_or_default())
    }

    /// Returns the most recently captured record for a location.
    ///
    /// # Errors
    /// Returns an error if the store is not open or the query fails.
    pub fn latest(&self, code: &LocationCode) -> Result<Option<Record>, StoreError> {
        let guard = self.lock()?;
        let conn = guard.as_ref().ok_or_else(|| self.not_open())?;
        conn.query_row(
            "SELECT data_json FROM records
             WHERE location = ?1
             ORDER BY ts DESC, id DESC
             LIMIT 1",
            params![code.as_str()],
            |row| row.get::<_, String>(0),
        )
        .optional()
        .map_err(|e| StoreError::Read(e.to_string()))?
        .map(|json| codec::decode(&json))
        .transpose()
    }
}

#[async_trait]
impl Store for SqliteStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    #[instrument(skip(self, locations), fields(count = locations.len()))]
    async fn open(&self, locations: &[Location]) -> Result<(), StoreError> {
        let mut guard = self.lock()?;
        if guard.is_none() {
            let conn = self.connect()?;
            Self::initialize_schema(&conn)?;
            *guard = Some(conn);
        }
        let conn = guard.as_ref().ok_or_else(|| self.not_open())?;

        let tx = conn
            .unchecked_transaction()
            .map_err(|e| StoreError::Write(e.to_string()))?;
        for location in locations {
            let point = location.coordinates();
            let bounds = location.bounds();
            tx.execute(
                "INSERT OR REPLACE INTO locations
                 (code, name, lat, lng, ne_lat, ne_lng, sw_lat, sw_lng)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    location.code().as_str(),
                    location.name(),
                    point.lat,
                    point.lng,
                    bounds.map(|b| b.ne_lat),
                    bounds.map(|b| b.ne_lng),
                    bounds.map(|b| b.sw_lat),
                    bounds.map(|b| b.sw_lng),
                ],
            )
            .map_err(|e| StoreError::Write(e.to_string()))?;
        }
        tx.commit().map_err(|e| StoreError::Write(e.to_string()))?;

        debug!("Registered {} locations", locations.len());
        Ok(())
    }

    #[instrument(skip(self, record), fields(location = %record.location().code(), kind = record.payload().kind()))]
    async fn save(&self, record: Record) -> Result<(), StoreError> {
        let data_json = codec::encode(&record)?;
        let ts = codec::format_instant(record.ts());

        let guard = self.lock()?;
        let conn = guard.as_ref().ok_or_else(|| self.not_open())?;
        conn.execute(
            "INSERT INTO records (location, ts, source, kind, data_json)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                record.location().code().as_str(),
                ts,
                record.source(),
                record.payload().kind(),
                data_json
            ],
        )
        .map_err(|e| StoreError::Write(e.to_string()))?;

        debug!("Saved record");
        Ok(())
    }

    #[instrument(skip(self, location), fields(location = %location.code()))]
    async fn get(
        &self,
        location: &Location,
        ts: DateTime<Utc>,
    ) -> Result<Option<Record>, StoreError> {
        let ts = codec::format_instant(ts);

        let guard = self.lock()?;
        let conn = guard.as_ref().ok_or_else(|| self.not_open())?;
        let result = conn
            .query_row(
                "SELECT data_json FROM records
                 WHERE location = ?1 AND ts = ?2
                 ORDER BY id DESC
                 LIMIT 1",
                params![location.code().as_str(), ts],
                |row| row.get::<_, String>(0),
            )
            .optional()
            .map_err(|e| StoreError::Read(e.to_string()))?;

        match result {
            Some(json) => {
                debug!("Found stored record");
                codec::decode(&json).map(Some)
            }
            None => {
                debug!("No stored record found");
                Ok(None)
            }
        }
    }

    #[instrument(skip(self))]
    async fn close(&self) -> Result<(), StoreError> {
        let conn = self.lock()?.take();
        if let Some(conn) = conn {
            conn.close()
                .map_err(|(_, e)| StoreError::Connection(e.to_string()))?;
            debug!("SQLite store closed");
        }
        Ok(())
    }
}
