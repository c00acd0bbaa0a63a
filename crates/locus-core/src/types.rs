//! Core data types for location-scoped collection.
//!
//! This module defines the fundamental data structures:
//!
//! - [`LocationCode`] - Stable identity of a location
//! - [`GeoPoint`] / [`BoundingBox`] - The two geographic forms a location can take
//! - [`Location`] - A configured area of interest
//! - [`Locations`] - The immutable, ordered set of configured locations
//! - [`Record`] - One normalized observation tied to a location and instant
//! - [`Payload`] - Domain-specific record contents
//! - [`WeatherForecast`] - Weather prediction payload
//! - [`AccommodationListing`] - Accommodation listing payload

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::ops::Deref;
use std::str::FromStr;
use std::sync::Arc;

use crate::error::{LocationError, RecordError};

/// Stable identifier of a location (e.g. `GC`, `TF`).
///
/// Codes are trimmed and uppercased on creation.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LocationCode(String);

impl LocationCode {
    /// Creates a code, normalizing it to uppercase.
    ///
    /// # Errors
    /// Returns [`LocationError::InvalidCode`] if the code is empty or contains
    /// characters other than ASCII alphanumerics, `_` and `-`.
    pub fn new(s: impl AsRef<str>) -> Result<Self, LocationError> {
        let code = s.as_ref().trim().to_uppercase();
        let valid = !code.is_empty()
            && code
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if valid {
            Ok(Self(code))
        } else {
            Err(LocationError::InvalidCode(s.as_ref().to_string()))
        }
    }

    /// Returns the code as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LocationCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for LocationCode {
    type Err = LocationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for LocationCode {
    type Error = LocationError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<LocationCode> for String {
    fn from(code: LocationCode) -> Self {
        code.0
    }
}

impl AsRef<str> for LocationCode {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A point in decimal degrees.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    /// Latitude, -90 to 90.
    pub lat: f64,
    /// Longitude, -180 to 180.
    pub lng: f64,
}

impl GeoPoint {
    /// Creates a new point. Use [`GeoPoint::is_valid`] to check the range.
    #[must_use]
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Returns true if both coordinates are finite and within range.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng)
    }
}

/// A rectangular area given by its north-east and south-west corners.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Latitude of the north-east corner.
    pub ne_lat: f64,
    /// Longitude of the north-east corner.
    pub ne_lng: f64,
    /// Latitude of the south-west corner.
    pub sw_lat: f64,
    /// Longitude of the south-west corner.
    pub sw_lng: f64,
}

impl BoundingBox {
    /// Creates a bounding box from its corners.
    #[must_use]
    pub const fn new(ne_lat: f64, ne_lng: f64, sw_lat: f64, sw_lng: f64) -> Self {
        Self {
            ne_lat,
            ne_lng,
            sw_lat,
            sw_lng,
        }
    }

    /// North-east corner.
    #[must_use]
    pub const fn north_east(&self) -> GeoPoint {
        GeoPoint::new(self.ne_lat, self.ne_lng)
    }

    /// South-west corner.
    #[must_use]
    pub const fn south_west(&self) -> GeoPoint {
        GeoPoint::new(self.sw_lat, self.sw_lng)
    }

    /// Midpoint of the box.
    #[must_use]
    pub fn centre(&self) -> GeoPoint {
        GeoPoint::new(
            (self.ne_lat + self.sw_lat) / 2.0,
            (self.ne_lng + self.sw_lng) / 2.0,
        )
    }

    /// Returns true if the point lies inside the box (edges included).
    #[must_use]
    pub fn contains(&self, point: GeoPoint) -> bool {
        (self.sw_lat..=self.ne_lat).contains(&point.lat)
            && (self.sw_lng..=self.ne_lng).contains(&point.lng)
    }
}

/// Raw location as it appears in configuration, before validation.
#[derive(Deserialize)]
struct LocationSpec {
    code: LocationCode,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    point: Option<GeoPoint>,
    #[serde(default)]
    bounds: Option<BoundingBox>,
}

/// A geographic area of interest.
///
/// A location carries a point, a bounding box, or both; which one a provider
/// uses depends on the upstream API. Locations are validated on construction
/// and immutable afterwards.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "LocationSpec")]
pub struct Location {
    code: LocationCode,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    point: Option<GeoPoint>,
    #[serde(skip_serializing_if = "Option::is_none")]
    bounds: Option<BoundingBox>,
}

impl Location {
    /// Creates a point-plus-code location.
    ///
    /// # Errors
    /// Returns an error if the code or coordinates are invalid.
    pub fn from_point(code: impl AsRef<str>, point: GeoPoint) -> Result<Self, LocationError> {
        Self::validated(LocationCode::new(code)?, None, Some(point), None)
    }

    /// Creates a bounding-box location.
    ///
    /// # Errors
    /// Returns an error if the code or corners are invalid.
    pub fn from_bounds(code: impl AsRef<str>, bounds: BoundingBox) -> Result<Self, LocationError> {
        Self::validated(LocationCode::new(code)?, None, None, Some(bounds))
    }

    /// Adds an explicit point to this location.
    ///
    /// # Errors
    /// Returns an error if the point is out of range.
    pub fn with_point(self, point: GeoPoint) -> Result<Self, LocationError> {
        Self::validated(self.code, self.name, Some(point), self.bounds)
    }

    /// Adds a bounding box to this location.
    ///
    /// # Errors
    /// Returns an error if the box is out of range or inverted.
    pub fn with_bounds(self, bounds: BoundingBox) -> Result<Self, LocationError> {
        Self::validated(self.code, self.name, self.point, Some(bounds))
    }

    /// Sets a human-readable name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    fn validated(
        code: LocationCode,
        name: Option<String>,
        point: Option<GeoPoint>,
        bounds: Option<BoundingBox>,
    ) -> Result<Self, LocationError> {
        if point.is_none() && bounds.is_none() {
            return Err(LocationError::MissingArea(code.to_string()));
        }
        let corners = bounds
            .iter()
            .flat_map(|b| [b.north_east(), b.south_west()]);
        for p in point.into_iter().chain(corners) {
            if !p.is_valid() {
                return Err(LocationError::InvalidCoordinate {
                    code: code.to_string(),
                    lat: p.lat,
                    lng: p.lng,
                });
            }
        }
        if let Some(b) = bounds {
            if b.ne_lat < b.sw_lat {
                return Err(LocationError::InvertedBounds(code.to_string()));
            }
        }
        Ok(Self {
            code,
            name,
            point,
            bounds,
        })
    }

    /// The stable identity of this location.
    #[must_use]
    pub const fn code(&self) -> &LocationCode {
        &self.code
    }

    /// Human-readable name, if configured.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// The explicit point, if configured.
    #[must_use]
    pub const fn point(&self) -> Option<GeoPoint> {
        self.point
    }

    /// The bounding box, if configured.
    #[must_use]
    pub const fn bounds(&self) -> Option<BoundingBox> {
        self.bounds
    }

    /// A representative point: the explicit point, else the box centre.
    #[must_use]
    pub fn coordinates(&self) -> GeoPoint {
        match (self.point, self.bounds) {
            (Some(p), _) => p,
            (None, Some(b)) => b.centre(),
            // Construction guarantees at least one form is present.
            (None, None) => GeoPoint::new(0.0, 0.0),
        }
    }
}

impl TryFrom<LocationSpec> for Location {
    type Error = LocationError;

    fn try_from(spec: LocationSpec) -> Result<Self, Self::Error> {
        Self::validated(spec.code, spec.name, spec.point, spec.bounds)
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{} ({})", self.code, name),
            None => write!(f, "{}", self.code),
        }
    }
}

/// The ordered, immutable set of configured locations.
///
/// Cloning is cheap; the underlying slice is shared.
#[derive(Clone, Debug, PartialEq)]
pub struct Locations(Arc<[Location]>);

impl Locations {
    /// Builds the set, rejecting duplicate codes. Order is preserved.
    ///
    /// # Errors
    /// Returns [`LocationError::Duplicate`] if two locations share a code.
    pub fn new(locations: Vec<Location>) -> Result<Self, LocationError> {
        let mut seen = HashSet::with_capacity(locations.len());
        for location in &locations {
            if !seen.insert(location.code()) {
                return Err(LocationError::Duplicate(location.code().to_string()));
            }
        }
        Ok(Self(locations.into()))
    }

    /// Looks up a location by code.
    #[must_use]
    pub fn find(&self, code: &LocationCode) -> Option<&Location> {
        self.0.iter().find(|l| l.code() == code)
    }
}

impl Deref for Locations {
    type Target = [Location];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<'a> IntoIterator for &'a Locations {
    type Item = &'a Location;
    type IntoIter = std::slice::Iter<'a, Location>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Weather prediction for one instant at a location.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WeatherForecast {
    /// Instant the forecast refers to.
    pub predicted_at: DateTime<Utc>,
    /// Air temperature in degrees Celsius.
    pub temperature: f64,
    /// Relative humidity, 0-100 %.
    pub humidity: f64,
    /// Cloud cover, 0-100 %.
    pub clouds: f64,
    /// Wind speed in m/s.
    pub wind_speed: f64,
    /// Probability of precipitation, 0-1.
    pub precipitation_probability: f64,
    /// Short textual description (e.g. "light rain").
    pub description: String,
}

impl WeatherForecast {
    /// Checks the payload invariants.
    ///
    /// # Errors
    /// Returns the first violated invariant.
    pub fn validate(&self) -> Result<(), RecordError> {
        require_text("description", &self.description)?;
        require_range("temperature", self.temperature, -100.0, 70.0)?;
        require_range("humidity", self.humidity, 0.0, 100.0)?;
        require_range("clouds", self.clouds, 0.0, 100.0)?;
        require_range("wind_speed", self.wind_speed, 0.0, 200.0)?;
        require_range(
            "precipitation_probability",
            self.precipitation_probability,
            0.0,
            1.0,
        )
    }
}

/// One accommodation listing found inside a location's area.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AccommodationListing {
    /// Listing URL.
    pub url: String,
    /// Listing title.
    pub name: String,
    /// City the listing is in.
    pub city: String,
    /// Latitude of the listing.
    pub lat: f64,
    /// Longitude of the listing.
    pub lng: f64,
    /// Number of reviews; zero when the upstream omits it.
    pub reviews_count: u32,
    /// Average rating 0-5; zero when the upstream omits it.
    pub rating: f64,
    /// Total price for the requested stay.
    pub price_total: f64,
}

impl AccommodationListing {
    /// Checks the payload invariants.
    ///
    /// # Errors
    /// Returns the first violated invariant.
    pub fn validate(&self) -> Result<(), RecordError> {
        require_text("url", &self.url)?;
        require_text("name", &self.name)?;
        require_text("city", &self.city)?;
        require_range("lat", self.lat, -90.0, 90.0)?;
        require_range("lng", self.lng, -180.0, 180.0)?;
        require_range("rating", self.rating, 0.0, 5.0)?;
        if !self.price_total.is_finite() || self.price_total <= 0.0 {
            return Err(RecordError::InvalidValue {
                field: "price_total",
                value: self.price_total,
            });
        }
        Ok(())
    }
}

fn require_text(field: &'static str, value: &str) -> Result<(), RecordError> {
    if value.trim().is_empty() {
        Err(RecordError::EmptyField(field))
    } else {
        Ok(())
    }
}

fn require_range(field: &'static str, value: f64, min: f64, max: f64) -> Result<(), RecordError> {
    if value.is_finite() && (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(RecordError::InvalidValue { field, value })
    }
}

/// Domain-specific contents of a [`Record`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Payload {
    /// A weather forecast.
    Weather(WeatherForecast),
    /// An accommodation listing.
    Accommodation(AccommodationListing),
}

impl Payload {
    /// Short name of the payload kind, as used in serialized form.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Weather(_) => "weather",
            Self::Accommodation(_) => "accommodation",
        }
    }

    /// Checks the invariants of the contained payload.
    ///
    /// # Errors
    /// Returns the first violated invariant.
    pub fn validate(&self) -> Result<(), RecordError> {
        match self {
            Self::Weather(w) => w.validate(),
            Self::Accommodation(a) => a.validate(),
        }
    }
}

impl From<WeatherForecast> for Payload {
    fn from(w: WeatherForecast) -> Self {
        Self::Weather(w)
    }
}

impl From<AccommodationListing> for Payload {
    fn from(a: AccommodationListing) -> Self {
        Self::Accommodation(a)
    }
}

#[derive(Deserialize)]
struct RecordSpec {
    ts: DateTime<Utc>,
    source: String,
    location: Location,
    payload: Payload,
}

/// One normalized observation or listing tied to a location and an instant.
///
/// Records are validated on construction and immutable afterwards.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RecordSpec")]
pub struct Record {
    #[serde(serialize_with = "crate::codec::serialize_instant")]
    ts: DateTime<Utc>,
    source: String,
    location: Location,
    payload: Payload,
}

impl Record {
    /// Creates a record captured at `ts`.
    ///
    /// # Errors
    /// Returns an error if the source is empty or the payload is invalid.
    pub fn new(
        ts: DateTime<Utc>,
        source: impl Into<String>,
        location: Location,
        payload: impl Into<Payload>,
    ) -> Result<Self, RecordError> {
        let source = source.into();
        require_text("source", &source)?;
        let payload = payload.into();
        payload.validate()?;
        Ok(Self {
            ts,
            source,
            location,
            payload,
        })
    }

    /// Capture instant.
    #[must_use]
    pub const fn ts(&self) -> DateTime<Utc> {
        self.ts
    }

    /// Name of the provider that produced this record.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// The location this record belongs to.
    #[must_use]
    pub const fn location(&self) -> &Location {
        &self.location
    }

    /// The record contents.
    #[must_use]
    pub const fn payload(&self) -> &Payload {
        &self.payload
    }
}

impl TryFrom<RecordSpec> for Record {
    type Error = RecordError;

    fn try_from(spec: RecordSpec) -> Result<Self, Self::Error> {
        Self::new(spec.ts, spec.source, spec.location, spec.payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn listing() -> AccommodationListing {
        AccommodationListing {
            url: "https://www.airbnb.com/rooms/1".to_string(),
            name: "Sea view loft".to_string(),
            city: "Las Palmas".to_string(),
            lat: 28.1,
            lng: -15.4,
            reviews_count: 12,
            rating: 4.8,
            price_total: 540.0,
        }
    }

    #[test]
    fn test_location_code_normalized() {
        let code = LocationCode::new(" gc ").unwrap();
        assert_eq!(code.as_str(), "GC");
        assert!(LocationCode::new("").is_err());
        assert!(LocationCode::new("G C").is_err());
    }

    #[test]
    fn test_location_validation() {
        assert!(Location::from_point("GC", GeoPoint::new(28.01, -15.53)).is_ok());
        assert!(matches!(
            Location::from_point("GC", GeoPoint::new(128.0, -15.53)),
            Err(LocationError::InvalidCoordinate { .. })
        ));
        assert!(matches!(
            Location::from_bounds("GC", BoundingBox::new(27.0, -15.0, 28.0, -16.0)),
            Err(LocationError::InvertedBounds(_))
        ));
    }

    #[test]
    fn test_location_coordinates_fall_back_to_centre() {
        let loc = Location::from_bounds("GC", BoundingBox::new(28.0, -15.0, 27.0, -16.0)).unwrap();
        assert_eq!(loc.coordinates(), GeoPoint::new(27.5, -15.5));

        let loc = loc.with_point(GeoPoint::new(27.9, -15.4)).unwrap();
        assert_eq!(loc.coordinates(), GeoPoint::new(27.9, -15.4));
    }

    #[test]
    fn test_location_deserialize_validates() {
        let ok: Location = serde_json::from_str(
            r#"{"code":"tf","name":"Tenerife","point":{"lat":28.46,"lng":-16.25}}"#,
        )
        .unwrap();
        assert_eq!(ok.code().as_str(), "TF");
        assert_eq!(ok.name(), Some("Tenerife"));

        let missing = serde_json::from_str::<Location>(r#"{"code":"TF"}"#);
        assert!(missing.is_err());
    }

    #[test]
    fn test_locations_reject_duplicates() {
        let a = Location::from_point("GC", GeoPoint::new(28.0, -15.5)).unwrap();
        let b = Location::from_point("gc", GeoPoint::new(28.1, -15.6)).unwrap();
        assert_eq!(
            Locations::new(vec![a, b]),
            Err(LocationError::Duplicate("GC".to_string()))
        );
    }

    #[test]
    fn test_record_rejects_empty_required_field() {
        let loc = Location::from_point("GC", GeoPoint::new(28.0, -15.5)).unwrap();
        let ts = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap();

        let mut bad = listing();
        bad.city = "  ".to_string();
        assert_eq!(
            Record::new(ts, "airbnb", loc.clone(), bad),
            Err(RecordError::EmptyField("city"))
        );

        let mut free = listing();
        free.price_total = 0.0;
        assert!(Record::new(ts, "airbnb", loc.clone(), free).is_err());

        assert!(Record::new(ts, "", loc.clone(), listing()).is_err());
        assert!(Record::new(ts, "airbnb", loc, listing()).is_ok());
    }

    #[test]
    fn test_weather_validation() {
        let forecast = WeatherForecast {
            predicted_at: Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap(),
            temperature: 21.5,
            humidity: 64.0,
            clouds: 20.0,
            wind_speed: 6.2,
            precipitation_probability: 0.1,
            description: "few clouds".to_string(),
        };
        assert!(forecast.validate().is_ok());

        let wet = WeatherForecast {
            precipitation_probability: 1.5,
            ..forecast
        };
        assert!(matches!(
            wet.validate(),
            Err(RecordError::InvalidValue {
                field: "precipitation_probability",
                ..
            })
        ));
    }
}
