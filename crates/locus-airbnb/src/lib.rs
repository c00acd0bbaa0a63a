#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/locus-rs/locus/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! # Example
//!
//! ```no_run
//! use locus_airbnb::AirbnbProvider;
//! use locus_core::{BoundingBox, Location, Provider};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let provider = AirbnbProvider::new("rapidapi_key");
//! let area = BoundingBox::new(28.18, -15.35, 27.73, -15.83);
//! let location = Location::from_bounds("GC", area)?;
//!
//! let records = provider.fetch(&location).await?;
//! println!("Fetched {} listings", records.len());
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use locus_core::{
    AccommodationListing, CheckInPolicy, CheckInWindow, Location, Provider, ProviderError, Record,
};
use reqwest::StatusCode;
use serde::Deserialize;
use tokio::sync::Mutex;
use tokio::time::{Instant, sleep_until};
use tracing::{debug, trace};

/// RapidAPI airbnb13 base URL.
const AIRBNB_BASE_URL: &str = "https://airbnb13.p.rapidapi.com";

/// RapidAPI host header value.
const RAPIDAPI_HOST: &str = "airbnb13.p.rapidapi.com";

/// Provider name, also used as the record source.
const PROVIDER_NAME: &str = "airbnb";

/// Default number of adults in the search.
const DEFAULT_ADULTS: u32 = 2;

/// Default minimum spacing between requests.
const DEFAULT_RATE_LIMIT_MS: u64 = 1000;

/// Airbnb accommodation provider.
///
/// Searches the location's bounding box; locations without one are rejected.
pub struct AirbnbProvider {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    policy: CheckInPolicy,
    adults: u32,
    rate_limit: Duration,
    next_request: Mutex<Option<Instant>>,
}

impl fmt::Debug for AirbnbProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AirbnbProvider")
            .field("api_key", &"[REDACTED]")
            .field("base_url", &self.base_url)
            .field("policy", &self.policy)
            .field("adults", &self.adults)
            .field("rate_limit", &self.rate_limit)
            .finish_non_exhaustive()
    }
}

impl AirbnbProvider {
    /// Create a new provider with default settings.
    ///
    /// Requests are spaced at least one second apart.
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_default();
        Self::with_client(client, api_key)
    }

    /// Create a new provider with a custom HTTP client.
    #[must_use]
    pub fn with_client(client: reqwest::Client, api_key: impl Into<String>) -> Self {
        Self {
            client,
            api_key: api_key.into(),
            base_url: AIRBNB_BASE_URL.to_string(),
            policy: CheckInPolicy::default(),
            adults: DEFAULT_ADULTS,
            rate_limit: Duration::from_millis(DEFAULT_RATE_LIMIT_MS),
            next_request: Mutex::new(None),
        }
    }

    /// Point the provider at a different API root (e.g. a mock server).
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Set the rule used to pick check-in and check-out dates.
    #[must_use]
    pub const fn with_policy(mut self, policy: CheckInPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Set the number of adults searched for.
    #[must_use]
    pub const fn with_adults(mut self, adults: u32) -> Self {
        self.adults = adults;
        self
    }

    /// Set the minimum spacing between requests. `Duration::ZERO` disables it.
    #[must_use]
    pub const fn with_rate_limit(mut self, rate_limit: Duration) -> Self {
        self.rate_limit = rate_limit;
        self
    }

    /// The window a fetch issued at `now` searches.
    #[must_use]
    pub fn window_at(&self, now: DateTime<Utc>) -> CheckInWindow {
        self.policy.window_at(now)
    }

    /// Wait until the next request slot and reserve the one after it.
    async fn apply_rate_limit(&self) {
        if self.rate_limit.is_zero() {
            return;
        }
        let wait = {
            let mut next = self.next_request.lock().await;
            let now = Instant::now();
            let slot = next.map_or(now, |at| at.max(now));
            *next = Some(slot + self.rate_limit);
            slot
        };
        if wait > Instant::now() {
            debug!(wait_ms = (wait - Instant::now()).as_millis() as u64, "Rate limiting");
            sleep_until(wait).await;
        }
    }

    /// Build the search URL for a location and window.
    fn search_url(
        &self,
        location: &Location,
        window: CheckInWindow,
    ) -> Result<String, ProviderError> {
        let area = location.bounds().ok_or_else(|| {
            ProviderError::InvalidParameter(format!(
                "location {} has no bounding box",
                location.code()
            ))
        })?;
        Ok(format!(
            "{}/search-geo?ne_lat={}&ne_lng={}&sw_lat={}&sw_lng={}&checkin={}&checkout={}&adults={}",
            self.base_url,
            area.ne_lat,
            area.ne_lng,
            area.sw_lat,
            area.sw_lng,
            window.check_in.format("%Y-%m-%d"),
            window.check_out.format("%Y-%m-%d"),
            self.adults,
        ))
    }

    /// Make a GET request and parse the JSON response.
    async fn get<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T, ProviderError> {
        self.apply_rate_limit().await;

        let response = self
            .client
            .get(url)
            .header("X-RapidAPI-Key", &self.api_key)
            .header("X-RapidAPI-Host", RAPIDAPI_HOST)
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        match response.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                return Err(ProviderError::AuthenticationFailed(PROVIDER_NAME.to_string()));
            }
            StatusCode::TOO_MANY_REQUESTS => {
                let retry_after = response
                    .headers()
                    .get(reqwest::header::RETRY_AFTER)
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse::<u64>().ok())
                    .map(Duration::from_secs);
                return Err(ProviderError::RateLimited {
                    provider: PROVIDER_NAME.to_string(),
                    retry_after,
                });
            }
            status if !status.is_success() => {
                let text = response.text().await.unwrap_or_default();
                return Err(ProviderError::Network(format!("HTTP {status}: {text}")));
            }
            _ => {}
        }

        let text = response
            .text()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        serde_json::from_str(&text).map_err(|e| ProviderError::Parse(e.to_string()))
    }
}

/// Turn a search response into records captured at `now`, skipping unusable
/// candidates.
fn records_from_response(
    response: SearchResponse,
    location: &Location,
    now: DateTime<Utc>,
) -> Result<Vec<Record>, ProviderError> {
    let results = response
        .results
        .ok_or_else(|| ProviderError::UnexpectedResponse {
            provider: PROVIDER_NAME.to_string(),
            message: "missing `results` array".to_string(),
        })?;

    let total = results.len();
    let records: Vec<Record> = results
        .into_iter()
        .filter_map(|value| serde_json::from_value::<SearchResult>(value).ok())
        .filter_map(SearchResult::into_listing)
        .filter_map(|listing| {
            Record::new(now, PROVIDER_NAME, location.clone(), listing)
                .inspect_err(|e| trace!(error = %e, "Skipping invalid listing"))
                .ok()
        })
        .collect();

    debug!(
        location = %location.code(),
        candidates = total,
        records = records.len(),
        "Converted search results"
    );
    Ok(records)
}

#[async_trait]
impl Provider for AirbnbProvider {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    fn description(&self) -> &str {
        "Airbnb - accommodation listings by area (RapidAPI airbnb13)"
    }

    async fn fetch(&self, location: &Location) -> Result<Vec<Record>, ProviderError> {
        let now = Utc::now();
        let window = self.window_at(now);
        let url = self.search_url(location, window)?;

        debug!(
            location = %location.code(),
            check_in = %window.check_in,
            check_out = %window.check_out,
            "Airbnb search"
        );
        let response: SearchResponse = self.get(&url).await?;
        records_from_response(response, location, now)
    }
}

// ============================================================================
// Airbnb API Response Types
// ============================================================================

/// Search response; candidates are kept raw and converted one by one.
#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Option<Vec<serde_json::Value>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchResult {
    url: Option<String>,
    name: Option<String>,
    city: Option<String>,
    lat: Option<Coordinate>,
    lng: Option<Coordinate>,
    reviews_count: Option<u32>,
    rating: Option<f64>,
    price: Option<SearchPrice>,
}

#[derive(Debug, Deserialize)]
struct SearchPrice {
    total: Option<serde_json::Value>,
}

/// Coordinates arrive as numbers or numeric strings.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Coordinate {
    Number(f64),
    Text(String),
}

impl Coordinate {
    fn value(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Text(s) => s.trim().parse().ok(),
        }
    }
}

impl SearchResult {
    /// Map to a listing, or `None` if a required field or the price is missing.
    fn into_listing(self) -> Option<AccommodationListing> {
        let price_total = self.price?.total?.as_f64()?;
        Some(AccommodationListing {
            url: self.url?,
            name: self.name?,
            city: self.city?,
            lat: self.lat?.value()?,
            lng: self.lng?.value()?,
            reviews_count: self.reviews_count.unwrap_or(0),
            rating: self.rating.unwrap_or(0.0),
            price_total,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone};
    use locus_core::{BoundingBox, GeoPoint, Payload};
    use serde_json::json;

    fn el_hierro() -> Location {
        Location::from_bounds("EH", BoundingBox::new(27.86, -17.87, 27.63, -18.17)).unwrap()
    }

    fn candidate(price: serde_json::Value) -> serde_json::Value {
        json!({
            "id": "51239487",
            "url": "https://www.airbnb.com/rooms/51239487",
            "name": "Casa rural La Restinga",
            "city": "La Restinga",
            "lat": 27.6412,
            "lng": -17.9836,
            "reviewsCount": 42,
            "rating": 4.87,
            "price": price
        })
    }

    fn response(results: Vec<serde_json::Value>) -> SearchResponse {
        serde_json::from_value(json!({ "error": false, "results": results })).unwrap()
    }

    #[test]
    fn test_url_building() {
        let provider = AirbnbProvider::new("k");
        let window = CheckInWindow {
            check_in: NaiveDate::from_ymd_opt(2024, 3, 9).unwrap(),
            check_out: NaiveDate::from_ymd_opt(2024, 3, 14).unwrap(),
        };
        assert_eq!(
            provider.search_url(&el_hierro(), window).unwrap(),
            "https://airbnb13.p.rapidapi.com/search-geo?ne_lat=27.86&ne_lng=-17.87&sw_lat=27.63&sw_lng=-18.17&checkin=2024-03-09&checkout=2024-03-14&adults=2"
        );
    }

    #[test]
    fn test_location_without_bounds_is_rejected() {
        let provider = AirbnbProvider::new("k");
        let point_only = Location::from_point("EH", GeoPoint::new(27.80, -17.89)).unwrap();
        let window = provider.window_at(Utc::now());
        assert!(matches!(
            provider.search_url(&point_only, window),
            Err(ProviderError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_converts_complete_candidates() {
        let now = Utc.with_ymd_and_hms(2024, 3, 9, 8, 0, 0).unwrap();
        let records =
            records_from_response(response(vec![candidate(json!({ "total": 615 }))]), &el_hierro(), now)
                .unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].ts(), now);
        assert_eq!(records[0].source(), "airbnb");
        match records[0].payload() {
            Payload::Accommodation(a) => {
                assert_eq!(a.city, "La Restinga");
                assert_eq!(a.reviews_count, 42);
                assert_eq!(a.rating, 4.87);
                assert_eq!(a.price_total, 615.0);
            }
            other => panic!("unexpected payload {other:?}"),
        }
    }

    #[test]
    fn test_skips_candidates_without_usable_price() {
        let no_price = {
            let mut c = candidate(json!(null));
            c.as_object_mut().unwrap().remove("price");
            c
        };
        let results = vec![
            no_price,
            candidate(json!(null)),
            candidate(json!({})),
            candidate(json!({ "total": null })),
            candidate(json!({ "total": 0 })),
            candidate(json!({ "total": -20 })),
            candidate(json!({ "total": "cheap" })),
        ];
        let records = records_from_response(response(results), &el_hierro(), Utc::now()).unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn test_skips_candidates_missing_required_fields() {
        let mut results = Vec::new();
        for field in ["url", "name", "city", "lat", "lng"] {
            let mut c = candidate(json!({ "total": 300 }));
            c.as_object_mut().unwrap().remove(field);
            results.push(c);
        }
        let mut empty_name = candidate(json!({ "total": 300 }));
        empty_name["name"] = json!("");
        results.push(empty_name);

        let mut text_coords = candidate(json!({ "total": 300 }));
        text_coords["lat"] = json!("27.64");
        text_coords["lng"] = json!("-17.98");
        text_coords["rating"] = json!(null);
        text_coords.as_object_mut().unwrap().remove("reviewsCount");
        results.push(text_coords);

        let records = records_from_response(response(results), &el_hierro(), Utc::now()).unwrap();
        assert_eq!(records.len(), 1);
        match records[0].payload() {
            Payload::Accommodation(a) => {
                assert_eq!(a.lat, 27.64);
                assert_eq!(a.reviews_count, 0);
                assert_eq!(a.rating, 0.0);
            }
            other => panic!("unexpected payload {other:?}"),
        }
    }

    #[test]
    fn test_missing_results_is_unexpected() {
        let response: SearchResponse =
            serde_json::from_value(json!({ "error": true, "message": "quota" })).unwrap();
        assert!(matches!(
            records_from_response(response, &el_hierro(), Utc::now()),
            Err(ProviderError::UnexpectedResponse { .. })
        ));
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let provider = AirbnbProvider::new("secret_rapidapi_key");
        let debug_str = format!("{:?}", provider);
        assert!(!debug_str.contains("secret_rapidapi_key"));
        assert!(debug_str.contains("[REDACTED]"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limit_spaces_requests() {
        let provider = AirbnbProvider::new("k").with_rate_limit(Duration::from_millis(500));
        let start = Instant::now();
        provider.apply_rate_limit().await;
        provider.apply_rate_limit().await;
        provider.apply_rate_limit().await;
        assert!(Instant::now() - start >= Duration::from_millis(1000));
    }
}
