//! In-memory store implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use locus_core::{Location, LocationCode, Record, Store, StoreError};
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::{debug, instrument};

/// Simple in-memory store for testing and development.
///
/// Records are kept per location in save order inside a `RwLock`-protected
/// `HashMap` and are lost when the store is dropped.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    records: RwLock<HashMap<LocationCode, Vec<Record>>>,
}

impl InMemoryStore {
    /// Create a new empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns every saved record for a location, oldest save first.
    pub async fn records_for(&self, code: &LocationCode) -> Vec<Record> {
        self.records
            .read()
            .await
            .get(code)
            .cloned()
            .unwrap_or_default()
    }

    /// Returns the total number of saved records.
    pub async fn len(&self) -> usize {
        self.records.read().await.values().map(Vec::len).sum()
    }

    /// Returns true if nothing has been saved.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Removes all saved records.
    pub async fn clear(&self) {
        self.records.write().await.clear();
    }
}

#[async_trait]
impl Store for InMemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    #[instrument(skip(self, record), fields(location = %record.location().code()))]
    async fn save(&self, record: Record) -> Result<(), StoreError> {
        let mut records = self.records.write().await;
        records
            .entry(record.location().code().clone())
            .or_default()
            .push(record);
        debug!("Stored record in memory");
        Ok(())
    }

    #[instrument(skip(self, location), fields(location = %location.code()))]
    async fn get(
        &self,
        location: &Location,
        ts: DateTime<Utc>,
    ) -> Result<Option<Record>, StoreError> {
        let records = self.records.read().await;
        let found = records
            .get(location.code())
            .and_then(|list| list.iter().rev().find(|r| r.ts() == ts))
            .cloned();
        if found.is_some() {
            debug!("Memory hit");
        } else {
            debug!("Memory miss");
        }
        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use locus_core::{AccommodationListing, GeoPoint};

    fn listing_record(location: &Location, ts: DateTime<Utc>, price_total: f64) -> Record {
        let listing = AccommodationListing {
            url: "https://www.airbnb.com/rooms/7".to_string(),
            name: "Finca".to_string(),
            city: "Valverde".to_string(),
            lat: 27.8,
            lng: -17.9,
            reviews_count: 0,
            rating: 0.0,
            price_total,
        };
        Record::new(ts, "airbnb", location.clone(), listing).unwrap()
    }

    #[tokio::test]
    async fn test_memory_store_save_and_get() {
        let store = InMemoryStore::new();
        let loc = Location::from_point("EH", GeoPoint::new(27.80, -17.89)).unwrap();
        let ts = Utc.with_ymd_and_hms(2024, 8, 1, 6, 0, 0).unwrap();

        // Initially no data
        assert!(store.get(&loc, ts).await.unwrap().is_none());
        assert!(store.is_empty().await);

        let record = listing_record(&loc, ts, 300.0);
        store.save(record.clone()).await.unwrap();

        assert_eq!(store.get(&loc, ts).await.unwrap(), Some(record));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_memory_store_keeps_save_order() {
        let store = InMemoryStore::new();
        let loc = Location::from_point("EH", GeoPoint::new(27.80, -17.89)).unwrap();
        let ts = Utc.with_ymd_and_hms(2024, 8, 1, 6, 0, 0).unwrap();

        for price in [100.0, 200.0, 300.0] {
            store.save(listing_record(&loc, ts, price)).await.unwrap();
        }

        let prices: Vec<f64> = store
            .records_for(loc.code())
            .await
            .iter()
            .map(|r| match r.payload() {
                locus_core::Payload::Accommodation(a) => a.price_total,
                locus_core::Payload::Weather(_) => 0.0,
            })
            .collect();
        assert_eq!(prices, vec![100.0, 200.0, 300.0]);

        store.clear().await;
        assert!(store.is_empty().await);
    }
}
