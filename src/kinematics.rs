//! Distance & velocity engine: annotates an ordered track with derived
//! pairwise attributes.
//!
//! For each consecutive pair of samples the engine computes the haversine
//! distance, the time delta and the implied velocity. Raw samples are never
//! mutated; the output is a parallel [`TrackPoint`] sequence carrying the
//! derived values. Per-pair problems never fail the batch: invalid
//! coordinates zero the distance and bump a counter, physically impossible
//! jumps are flagged and kept.

use chrono::{DateTime, Utc};
use log::warn;
use serde::{Deserialize, Serialize};

use crate::geo_utils::haversine_km;
use crate::{LocationSample, TransportMode};

/// Distance between consecutive samples above which the pair is flagged as a
/// teleport anomaly. GPS cannot move this far between adjacent fixes; it
/// indicates a sensor or parsing error upstream.
pub const TELEPORT_DISTANCE_KM: f64 = 500.0;

/// A sample with derived kinematic attributes attached.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrackPoint {
    /// The original, unmodified sample
    pub sample: LocationSample,
    /// Haversine distance from the previous point in km (0.0 for the first
    /// point and for pairs with invalid coordinates)
    pub distance_from_prev_km: f64,
    /// Velocity in km/h: the source-provided value when present, otherwise
    /// derived from distance and time delta. None when underivable.
    pub velocity_kmh: Option<f64>,
}

impl TrackPoint {
    /// Sample timestamp.
    #[inline]
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.sample.timestamp
    }

    /// Declared (possibly later corrected) transport mode.
    #[inline]
    pub fn mode(&self) -> TransportMode {
        self.sample.mode
    }
}

/// Anomaly counters from one annotation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KinematicsStats {
    /// Pairs where at least one side had invalid/NaN coordinates
    pub invalid_coordinates: u32,
    /// Pairs whose distance exceeded [`TELEPORT_DISTANCE_KM`]
    pub teleport_jumps: u32,
}

/// Annotate a time-ordered track with pairwise distance and velocity.
///
/// The input must already be sorted by timestamp. Velocity is
/// `distance / Δt`; a non-positive Δt leaves the derived velocity undefined
/// rather than dividing by zero (a source-provided velocity still passes
/// through).
pub fn annotate_track(samples: Vec<LocationSample>) -> (Vec<TrackPoint>, KinematicsStats) {
    let mut stats = KinematicsStats::default();
    let mut points = Vec::with_capacity(samples.len());

    for (i, sample) in samples.iter().enumerate() {
        if i == 0 {
            points.push(TrackPoint {
                sample: *sample,
                distance_from_prev_km: 0.0,
                velocity_kmh: sample.velocity_kmh,
            });
            continue;
        }

        let prev = &samples[i - 1];
        let pair_valid = prev.has_valid_coordinates() && sample.has_valid_coordinates();

        let distance_km = if pair_valid {
            haversine_km(prev, sample)
        } else {
            stats.invalid_coordinates += 1;
            0.0
        };

        if distance_km > TELEPORT_DISTANCE_KM {
            stats.teleport_jumps += 1;
            warn!(
                "[Kinematics] {:.0} km jump between consecutive samples at {}",
                distance_km, sample.timestamp
            );
        }

        let delta_secs =
            (sample.timestamp - prev.timestamp).num_milliseconds() as f64 / 1000.0;
        let derived_kmh = if pair_valid && delta_secs > 0.0 {
            Some(distance_km / (delta_secs / 3600.0))
        } else {
            None
        };

        points.push(TrackPoint {
            sample: *sample,
            distance_from_prev_km: distance_km,
            velocity_kmh: sample.velocity_kmh.or(derived_kmh),
        });
    }

    (points, stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn ts() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 4, 8, 0, 0).unwrap()
    }

    #[test]
    fn test_empty_and_single() {
        let (points, stats) = annotate_track(vec![]);
        assert!(points.is_empty());
        assert_eq!(stats, KinematicsStats::default());

        let (points, _) = annotate_track(vec![LocationSample::new(ts(), 47.0, -122.0)]);
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].distance_from_prev_km, 0.0);
        assert!(points[0].velocity_kmh.is_none());
    }

    #[test]
    fn test_derives_velocity() {
        // 0.01 deg of latitude is ~1.11 km; one minute apart -> ~67 km/h
        let a = LocationSample::new(ts(), 47.60, -122.33);
        let b = LocationSample::new(ts() + Duration::minutes(1), 47.61, -122.33);
        let (points, stats) = annotate_track(vec![a, b]);

        assert_eq!(stats, KinematicsStats::default());
        assert!((points[1].distance_from_prev_km - 1.112).abs() < 0.01);
        let v = points[1].velocity_kmh.unwrap();
        assert!((v - 66.7).abs() < 1.0);
    }

    #[test]
    fn test_zero_time_delta_leaves_velocity_undefined() {
        let a = LocationSample::new(ts(), 47.60, -122.33);
        let b = LocationSample::new(ts(), 47.61, -122.33);
        let (points, _) = annotate_track(vec![a, b]);
        assert!(points[1].velocity_kmh.is_none());
        // Distance is still computed
        assert!(points[1].distance_from_prev_km > 1.0);
    }

    #[test]
    fn test_provided_velocity_wins() {
        let a = LocationSample::new(ts(), 47.60, -122.33);
        let b = LocationSample::new(ts() + Duration::minutes(1), 47.61, -122.33)
            .with_velocity(42.0);
        let (points, _) = annotate_track(vec![a, b]);
        assert_eq!(points[1].velocity_kmh, Some(42.0));
    }

    #[test]
    fn test_invalid_coordinates_zeroed_and_counted() {
        let a = LocationSample::new(ts(), 47.60, -122.33);
        let b = LocationSample::new(ts() + Duration::minutes(1), f64::NAN, -122.33);
        let c = LocationSample::new(ts() + Duration::minutes(2), 47.62, -122.33);
        let (points, stats) = annotate_track(vec![a, b, c]);

        // Both pairs touch the NaN sample
        assert_eq!(stats.invalid_coordinates, 2);
        assert_eq!(points[1].distance_from_prev_km, 0.0);
        assert_eq!(points[2].distance_from_prev_km, 0.0);
        assert!(points[1].velocity_kmh.is_none());
    }

    #[test]
    fn test_teleport_flagged_not_dropped() {
        // Seattle to London in one minute
        let a = LocationSample::new(ts(), 47.6062, -122.3321);
        let b = LocationSample::new(ts() + Duration::minutes(1), 51.5074, -0.1278);
        let (points, stats) = annotate_track(vec![a, b]);

        assert_eq!(stats.teleport_jumps, 1);
        assert_eq!(points.len(), 2);
        assert!(points[1].distance_from_prev_km > TELEPORT_DISTANCE_KM);
    }
}
