#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/locus-rs/locus/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! OpenWeatherMap forecast provider.
//!
//! This crate implements the locus-core [`Provider`] trait for the
//! [OpenWeatherMap](https://openweathermap.org/) 5 day forecast API.
//!
//! # Usage
//!
//! ```rust,ignore
//! use locus_openweather::OpenWeatherProvider;
//! use locus_core::{GeoPoint, Location, Provider};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let provider = OpenWeatherProvider::new("your_api_key");
//!     let location = Location::from_point("GC", GeoPoint::new(28.01, -15.53))?;
//!
//!     let records = provider.fetch(&location).await?;
//!     println!("{} forecasts", records.len());
//!     Ok(())
//! }
//! ```

use async_trait::async_trait;
use chrono::{DateTime, Timelike, Utc};
use locus_core::{Location, Provider, ProviderError, Record, WeatherForecast};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::fmt;
use std::time::Duration;
use tracing::{debug, trace};

/// Base URL for the OpenWeatherMap 2.5 API.
const OWM_BASE_URL: &str = "https://api.openweathermap.org/data/2.5";

/// Provider name, also used as the record source.
const PROVIDER_NAME: &str = "openweathermap";

/// Forecast hour (UTC) kept by default.
pub const DEFAULT_FORECAST_HOUR: u32 = 12;

/// Request timeout for upstream calls.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// OpenWeatherMap forecast provider.
///
/// Fetches `/forecast` for the location's coordinates in metric units and
/// keeps the entries at [`DEFAULT_FORECAST_HOUR`] (configurable).
#[derive(Clone)]
pub struct OpenWeatherProvider {
    client: Client,
    api_key: String,
    base_url: String,
    forecast_hour: Option<u32>,
}

impl fmt::Debug for OpenWeatherProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenWeatherProvider")
            .field("api_key", &"[REDACTED]")
            .field("base_url", &self.base_url)
            .field("forecast_hour", &self.forecast_hour)
            .finish()
    }
}

impl OpenWeatherProvider {
    /// Create a new provider with the given API key.
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self::with_client(client, api_key)
    }

    /// Create a new provider with a custom HTTP client.
    #[must_use]
    pub fn with_client(client: Client, api_key: impl Into<String>) -> Self {
        Self {
            client,
            api_key: api_key.into(),
            base_url: OWM_BASE_URL.to_string(),
            forecast_hour: Some(DEFAULT_FORECAST_HOUR),
        }
    }

    /// Point the provider at a different API root (e.g. a mock server).
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Keep only entries at this UTC hour, or every entry with `None`.
    #[must_use]
    pub const fn with_forecast_hour(mut self, hour: Option<u32>) -> Self {
        self.forecast_hour = hour;
        self
    }

    /// Build the forecast URL for a location.
    fn forecast_url(&self, location: &Location) -> String {
        let point = location.coordinates();
        format!(
            "{}/forecast?lat={}&lon={}&units=metric&appid={}",
            self.base_url, point.lat, point.lng, self.api_key
        )
    }

    /// Make a GET request and parse the JSON response.
    async fn get<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T, ProviderError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.without_url().to_string()))?;

        match response.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                return Err(ProviderError::AuthenticationFailed(PROVIDER_NAME.to_string()));
            }
            StatusCode::TOO_MANY_REQUESTS => {
                return Err(ProviderError::RateLimited {
                    provider: PROVIDER_NAME.to_string(),
                    retry_after: None,
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
            .map_err(|e| ProviderError::Network(e.without_url().to_string()))?;

        serde_json::from_str(&text).map_err(|e| ProviderError::Parse(format!("{e}: {text}")))
    }

    /// Convert a forecast response into records captured at `now`.
    fn records_from_response(
        &self,
        response: OwmForecastResponse,
        location: &Location,
        now: DateTime<Utc>,
    ) -> Result<Vec<Record>, ProviderError> {
        let entries = response
            .list
            .ok_or_else(|| ProviderError::UnexpectedResponse {
                provider: PROVIDER_NAME.to_string(),
                message: "missing `list` array".to_string(),
            })?;

        let total = entries.len();
        let records: Vec<Record> = entries
            .into_iter()
            .filter_map(|value| serde_json::from_value::<OwmEntry>(value).ok())
            .filter_map(|entry| entry.into_forecast())
            .filter(|forecast| {
                self.forecast_hour
                    .is_none_or(|hour| forecast.predicted_at.hour() == hour)
            })
            .filter_map(|forecast| {
                Record::new(now, PROVIDER_NAME, location.clone(), forecast)
                    .inspect_err(|e| trace!(error = %e, "Skipping invalid forecast"))
                    .ok()
            })
            .collect();

        debug!(
            location = %location.code(),
            entries = total,
            records = records.len(),
            "Converted forecast"
        );
        Ok(records)
    }
}

#[async_trait]
impl Provider for OpenWeatherProvider {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    fn description(&self) -> &str {
        "OpenWeatherMap - 5 day / 3 hour weather forecast"
    }

    async fn fetch(&self, location: &Location) -> Result<Vec<Record>, ProviderError> {
        debug!(location = %location.code(), "OpenWeatherMap request");
        let response: OwmForecastResponse = self.get(&self.forecast_url(location)).await?;
        self.records_from_response(response, location, Utc::now())
    }
}

// ============================================================================
// OpenWeatherMap API Response Types
// ============================================================================

/// Forecast response; entries are kept raw so one malformed entry does not
/// discard the rest.
#[derive(Debug, Deserialize)]
struct OwmForecastResponse {
    #[serde(default)]
    list: Option<Vec<serde_json::Value>>,
}

/// One 3-hour forecast entry.
#[derive(Debug, Deserialize)]
struct OwmEntry {
    dt: i64,
    main: Option<OwmMain>,
    #[serde(default)]
    weather: Vec<OwmCondition>,
    clouds: Option<OwmClouds>,
    wind: Option<OwmWind>,
    #[serde(default)]
    pop: f64,
}

#[derive(Debug, Deserialize)]
struct OwmMain {
    temp: Option<f64>,
    humidity: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct OwmCondition {
    #[serde(default)]
    description: String,
}

#[derive(Debug, Deserialize)]
struct OwmClouds {
    #[serde(default)]
    all: f64,
}

#[derive(Debug, Deserialize)]
struct OwmWind {
    #[serde(default)]
    speed: f64,
}

impl OwmEntry {
    /// Map to a forecast, or `None` if a required field is missing.
    fn into_forecast(self) -> Option<WeatherForecast> {
        let main = self.main?;
        let description = self.weather.into_iter().next()?.description;
        Some(WeatherForecast {
            predicted_at: DateTime::from_timestamp(self.dt, 0)?,
            temperature: main.temp?,
            humidity: main.humidity?,
            clouds: self.clouds.map_or(0.0, |c| c.all),
            wind_speed: self.wind.map_or(0.0, |w| w.speed),
            precipitation_probability: self.pop,
            description,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use locus_core::{GeoPoint, Payload};
    use serde_json::json;

    fn location() -> Location {
        Location::from_point("GC", GeoPoint::new(28.01, -15.53)).unwrap()
    }

    fn entry(dt: DateTime<Utc>, temp: serde_json::Value, description: &str) -> serde_json::Value {
        json!({
            "dt": dt.timestamp(),
            "main": { "temp": temp, "humidity": 65 },
            "weather": [{ "main": "Clouds", "description": description }],
            "clouds": { "all": 40 },
            "wind": { "speed": 6.3, "deg": 30 },
            "pop": 0.12,
            "dt_txt": dt.format("%Y-%m-%d %H:%M:%S").to_string()
        })
    }

    fn response(list: Vec<serde_json::Value>) -> OwmForecastResponse {
        serde_json::from_value(json!({ "cod": "200", "list": list })).unwrap()
    }

    #[test]
    fn test_url_building() {
        let provider = OpenWeatherProvider::new("test_key");
        assert_eq!(
            provider.forecast_url(&location()),
            "https://api.openweathermap.org/data/2.5/forecast?lat=28.01&lon=-15.53&units=metric&appid=test_key"
        );
    }

    #[test]
    fn test_keeps_only_midday_entries() {
        let provider = OpenWeatherProvider::new("k");
        let morning = Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap();
        let noon = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        let next_noon = Utc.with_ymd_and_hms(2024, 6, 2, 12, 0, 0).unwrap();
        let now = Utc::now();

        let records = provider
            .records_from_response(
                response(vec![
                    entry(morning, json!(19.0), "few clouds"),
                    entry(noon, json!(23.5), "scattered clouds"),
                    entry(next_noon, json!(24.1), "broken clouds"),
                ]),
                &location(),
                now,
            )
            .unwrap();

        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|r| r.ts() == now));
        assert!(records.iter().all(|r| r.source() == "openweathermap"));
        match records[0].payload() {
            Payload::Weather(w) => {
                assert_eq!(w.predicted_at, noon);
                assert_eq!(w.temperature, 23.5);
                assert_eq!(w.humidity, 65.0);
                assert_eq!(w.precipitation_probability, 0.12);
            }
            other => panic!("unexpected payload {other:?}"),
        }

        let all = OpenWeatherProvider::new("k").with_forecast_hour(None);
        let records = all
            .records_from_response(
                response(vec![
                    entry(morning, json!(19.0), "few clouds"),
                    entry(noon, json!(23.5), "scattered clouds"),
                ]),
                &location(),
                now,
            )
            .unwrap();
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn test_skips_incomplete_entries() {
        let provider = OpenWeatherProvider::new("k");
        let noon = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();

        let no_main = json!({ "dt": noon.timestamp(), "weather": [{ "description": "rain" }] });
        let records = provider
            .records_from_response(
                response(vec![
                    entry(noon, json!(null), "clear sky"),
                    entry(noon, json!(22.0), ""),
                    entry(noon, json!("hot"), "clear sky"),
                    no_main,
                    entry(noon, json!(22.0), "clear sky"),
                ]),
                &location(),
                Utc::now(),
            )
            .unwrap();

        assert_eq!(records.len(), 1);
    }

    #[test]
    fn test_missing_list_is_unexpected() {
        let provider = OpenWeatherProvider::new("k");
        let response: OwmForecastResponse =
            serde_json::from_value(json!({ "cod": "404", "message": "city not found" })).unwrap();
        let result = provider.records_from_response(response, &location(), Utc::now());
        assert!(matches!(
            result,
            Err(ProviderError::UnexpectedResponse { .. })
        ));
    }

    #[test]
    fn test_provider_metadata() {
        let provider = OpenWeatherProvider::new("test_key");
        assert_eq!(provider.name(), "openweathermap");
        assert!(!provider.description().is_empty());
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let provider = OpenWeatherProvider::new("secret_key_12345");
        let debug_str = format!("{:?}", provider);
        assert!(!debug_str.contains("secret_key_12345"));
        assert!(debug_str.contains("[REDACTED]"));
    }
}
