//! # Geographic Utilities
//!
//! Core geodesic computations for location-history analysis.
//!
//! | Function | Description |
//! |----------|-------------|
//! | [`haversine_km`] | Great-circle distance between two samples in kilometers |
//! | [`initial_bearing`] | Initial course in degrees, 0-360, 0 = north |
//! | [`polyline_km`] | Total length of a sample track in kilometers |
//!
//! All functions expect WGS84 coordinates (latitude/longitude in degrees),
//! the standard used by GPS receivers and location-history exports. Distance
//! uses the haversine formula on a spherical Earth (radius ~6371 km),
//! accurate to within 0.3% for surface travel.

use geo::{Bearing, Distance, Haversine, Point};

use crate::LocationSample;

/// Calculate the great-circle distance between two samples in kilometers.
///
/// Callers are expected to check [`LocationSample::has_valid_coordinates`]
/// first; the distance engine maps invalid pairs to 0.0 and counts them
/// instead of calling this with garbage.
///
/// # Example
/// ```
/// use chrono::{TimeZone, Utc};
/// use trip_analyzer::{haversine_km, LocationSample};
///
/// let t = Utc.with_ymd_and_hms(2024, 3, 4, 8, 0, 0).unwrap();
/// let london = LocationSample::new(t, 51.5074, -0.1278);
/// let paris = LocationSample::new(t, 48.8566, 2.3522);
/// let distance = haversine_km(&london, &paris);
/// assert!((distance - 343.5).abs() < 5.0); // ~344 km
/// ```
#[inline]
pub fn haversine_km(a: &LocationSample, b: &LocationSample) -> f64 {
    let p1 = Point::new(a.longitude, a.latitude);
    let p2 = Point::new(b.longitude, b.latitude);
    Haversine::distance(p1, p2) / 1000.0
}

/// Initial bearing from `a` to `b` in degrees, normalized to [0, 360).
///
/// 0 = north, 90 = east. Provided for directional analysis; the pipeline
/// stages themselves do not consume it.
#[inline]
pub fn initial_bearing(a: &LocationSample, b: &LocationSample) -> f64 {
    let p1 = Point::new(a.longitude, a.latitude);
    let p2 = Point::new(b.longitude, b.latitude);
    Haversine::bearing(p1, p2).rem_euclid(360.0)
}

/// Total length of a sample track in kilometers.
///
/// Sums the haversine distance between consecutive samples. Empty or
/// single-sample tracks return 0.0.
pub fn polyline_km(samples: &[LocationSample]) -> f64 {
    if samples.len() < 2 {
        return 0.0;
    }

    samples
        .windows(2)
        .map(|w| haversine_km(&w[0], &w[1]))
        .sum()
}
