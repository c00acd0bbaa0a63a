//! Location configuration.
//!
//! Locations come either from the built-in Canary Islands set or from a JSON
//! file holding an array of `{code, name?, point?, bounds?}` objects. Either
//! way they are validated into an immutable [`Locations`] before the first
//! cycle.

use std::path::{Path, PathBuf};

use locus_core::{BoundingBox, GeoPoint, Location, LocationError, Locations};
use thiserror::Error;
use tracing::debug;

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The locations file could not be read.
    #[error("failed to read {path}: {source}")]
    Read {
        /// File that was read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The locations document is not valid JSON or a location is invalid.
    #[error("invalid locations document: {0}")]
    Parse(#[from] serde_json::Error),

    /// The location set is inconsistent (e.g. duplicate codes).
    #[error(transparent)]
    Location(#[from] LocationError),

    /// No locations were configured.
    #[error("no locations configured")]
    Empty,
}

/// Built-in areas: `(code, name, point, [ne_lat, ne_lng, sw_lat, sw_lng])`.
const CANARY_ISLANDS: [(&str, &str, (f64, f64), [f64; 4]); 8] = [
    ("GC", "Gran Canaria", (28.01, -15.53), [28.18, -15.35, 27.73, -15.83]),
    ("FTV", "Fuerteventura", (28.40, -13.86), [28.76, -13.82, 28.04, -14.52]),
    ("LZ", "Lanzarote", (28.97, -13.55), [29.25, -13.42, 28.83, -13.88]),
    ("LGR", "La Graciosa", (29.28, -13.50), [29.30, -13.47, 29.22, -13.54]),
    ("TF", "Tenerife", (28.46, -16.25), [28.59, -16.12, 27.99, -16.93]),
    ("LP", "La Palma", (28.75, -17.89), [28.86, -17.72, 28.45, -18.01]),
    ("GM", "La Gomera", (28.15, -17.26), [28.22, -17.09, 28.01, -17.35]),
    ("EH", "El Hierro", (27.80, -17.89), [27.86, -17.87, 27.63, -18.17]),
];

/// The default location set: the eight Canary Islands, each with a point and
/// a bounding box so every provider can use them.
///
/// # Errors
/// Only fails if the built-in table is invalid.
pub fn default_locations() -> Result<Locations, LocationError> {
    let locations = CANARY_ISLANDS
        .iter()
        .map(|&(code, name, (lat, lng), [ne_lat, ne_lng, sw_lat, sw_lng])| {
            Location::from_point(code, GeoPoint::new(lat, lng))?
                .with_bounds(BoundingBox::new(ne_lat, ne_lng, sw_lat, sw_lng))
                .map(|l| l.with_name(name))
        })
        .collect::<Result<Vec<_>, _>>()?;
    Locations::new(locations)
}

/// Parse a JSON array of locations.
///
/// # Errors
/// Returns an error for malformed JSON, invalid or duplicate locations, or an
/// empty array.
pub fn parse_locations(json: &str) -> Result<Locations, ConfigError> {
    let locations: Vec<Location> = serde_json::from_str(json)?;
    if locations.is_empty() {
        return Err(ConfigError::Empty);
    }
    Ok(Locations::new(locations)?)
}

/// Load and validate locations from a JSON file.
///
/// # Errors
/// See [`parse_locations`]; also fails if the file cannot be read.
pub fn load_locations(path: &Path) -> Result<Locations, ConfigError> {
    let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let locations = parse_locations(&json)?;
    debug!(path = %path.display(), count = locations.len(), "Loaded locations");
    Ok(locations)
}
