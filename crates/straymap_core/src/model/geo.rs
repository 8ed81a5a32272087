//! Geographic point value object and great-circle distance.
//!
//! # Responsibility
//! - Hold one validated `(latitude, longitude)` pair in degrees.
//! - Compute spherical distances in metres for filters, ordering and display.
//!
//! # Invariants
//! - Coordinate order is always `(latitude, longitude)`.
//! - `latitude` is in `[-90, 90]`, `longitude` in `[-180, 180]`; NaN is
//!   rejected as out of range.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Mean earth radius (IUGG) used by every distance computation.
pub const EARTH_RADIUS_METERS: f64 = 6_371_008.8;

/// Precondition failure on one numeric input.
///
/// Carries the field name so callers can decide whether the value came from
/// user input (recoverable) or from a programming error (fatal).
#[derive(Debug, Clone, PartialEq)]
pub struct RangeError {
    pub field: &'static str,
    pub message: String,
}

impl RangeError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl Display for RangeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} out of range: {}", self.field, self.message)
    }
}

impl Error for RangeError {}

/// Validated WGS84-style point in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    latitude: f64,
    longitude: f64,
}

impl GeoPoint {
    /// Reference point used when a distance is needed but none was supplied.
    pub const ORIGIN: GeoPoint = GeoPoint {
        latitude: 0.0,
        longitude: 0.0,
    };

    /// Builds a point, rejecting out-of-range coordinates.
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, RangeError> {
        if !(-90.0..=90.0).contains(&latitude) {
            return Err(RangeError::new(
                "latitude",
                format!("latitude must be in range [-90, 90], got {latitude}"),
            ));
        }
        if !(-180.0..=180.0).contains(&longitude) {
            return Err(RangeError::new(
                "longitude",
                format!("longitude must be in range [-180, 180], got {longitude}"),
            ));
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }

    /// Great-circle distance to `other` in metres.
    pub fn distance_meters(&self, other: &GeoPoint) -> f64 {
        haversine_meters(self.latitude, self.longitude, other.latitude, other.longitude)
    }
}

/// Haversine distance between two `(lat, lon)` pairs given in degrees.
///
/// Shared by `GeoPoint` and the `geo_distance_m` SQL function so in-process
/// and in-store distances agree bit for bit.
pub fn haversine_meters(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let d_phi = (lat2 - lat1).to_radians();
    let d_lambda = (lon2 - lon1).to_radians();

    let a = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    // Clamp guards asin against rounding just above 1.0 for antipodal points.
    let c = 2.0 * a.sqrt().min(1.0).asin();
    EARTH_RADIUS_METERS * c
}
