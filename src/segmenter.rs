//! Trip segmenter: partitions a cleaned track into discrete trips.
//!
//! A strictly sequential, order-sensitive scan. A new trip opens on a time
//! gap above the threshold or a change of mode category; a completed trip is
//! emitted only when it spans the minimum duration and point count. This
//! stage must never be parallelized across trip boundaries - the buffer is
//! the state.

use chrono::{DateTime, Utc};
use log::info;
use serde::{Deserialize, Serialize};

use crate::geo_utils::haversine_km;
use crate::{ModeCategory, TrackPoint, TransportMode};

/// Configuration for trip segmentation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TripConfig {
    /// Gap between consecutive samples that opens a new trip.
    /// Default: 1800 seconds (30 minutes)
    pub max_gap_secs: i64,

    /// Minimum duration for a trip to be emitted.
    /// Default: 120 seconds (2 minutes)
    pub min_trip_secs: i64,

    /// Minimum number of samples for a trip to be emitted.
    /// Default: 2
    pub min_trip_points: usize,
}

impl Default for TripConfig {
    fn default() -> Self {
        Self {
            max_gap_secs: 1800,
            min_trip_secs: 120,
            min_trip_points: 2,
        }
    }
}

/// A discrete trip: a maximal contiguous run of samples sharing one mode
/// category, bounded by time gaps or category changes.
///
/// Constructed once by the segmenter, never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trip {
    /// Time of the first sample
    pub start_time: DateTime<Utc>,
    /// Time of the last sample
    pub end_time: DateTime<Utc>,
    /// Sum of consecutive pairwise distances within the trip, km
    pub distance_km: f64,
    /// Most frequent mode among the trip's samples (ties to first occurrence)
    pub dominant_mode: TransportMode,
    /// Category shared by every sample in the trip
    pub category: ModeCategory,
    /// Number of samples in the trip
    pub point_count: u32,
}

impl Trip {
    /// Trip duration in seconds.
    pub fn duration_secs(&self) -> i64 {
        (self.end_time - self.start_time).num_seconds()
    }

    /// Average speed over the trip in km/h (0.0 for zero duration).
    pub fn average_speed_kmh(&self) -> f64 {
        let hours = self.duration_secs() as f64 / 3600.0;
        if hours > 0.0 {
            self.distance_km / hours
        } else {
            0.0
        }
    }
}

/// Output of one segmentation pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentationResult {
    /// Emitted trips, in chronological order
    pub trips: Vec<Trip>,
    /// Candidate trips discarded for being too short or too sparse
    pub discarded: u32,
}

/// Most frequent mode in the buffer; ties broken by first occurrence.
fn dominant_mode(points: &[TrackPoint]) -> TransportMode {
    let mut counts: Vec<(TransportMode, u32)> = Vec::new();
    for point in points {
        let mode = point.mode();
        match counts.iter_mut().find(|(m, _)| *m == mode) {
            Some((_, n)) => *n += 1,
            None => counts.push((mode, 1)),
        }
    }

    let mut best = counts[0];
    for &entry in &counts[1..] {
        if entry.1 > best.1 {
            best = entry;
        }
    }
    best.0
}

fn build_trip(points: &[TrackPoint], category: ModeCategory) -> Trip {
    let distance_km = points
        .windows(2)
        .map(|w| haversine_km(&w[0].sample, &w[1].sample))
        .sum();

    Trip {
        start_time: points[0].timestamp(),
        end_time: points[points.len() - 1].timestamp(),
        distance_km,
        dominant_mode: dominant_mode(points),
        category,
        point_count: points.len() as u32,
    }
}

/// Partition a cleaned, time-ordered track into trips.
///
/// Inputs must be sorted by timestamp before entering this stage. Trip
/// distance is recomputed pairwise over the trip's own samples, so earlier
/// point removal cannot leak phantom distance into a trip.
pub fn segment_trips(points: &[TrackPoint], config: &TripConfig) -> SegmentationResult {
    let mut trips = Vec::new();
    let mut discarded = 0u32;
    let mut buffer: Vec<TrackPoint> = Vec::new();
    let mut category = ModeCategory::NonMotorized;

    let flush = |buffer: &mut Vec<TrackPoint>, category: ModeCategory, discarded: &mut u32| {
        if buffer.is_empty() {
            return None;
        }
        let span_secs =
            (buffer[buffer.len() - 1].timestamp() - buffer[0].timestamp()).num_seconds();
        let trip = if buffer.len() >= config.min_trip_points && span_secs >= config.min_trip_secs {
            Some(build_trip(buffer, category))
        } else {
            *discarded += 1;
            None
        };
        buffer.clear();
        trip
    };

    for point in points {
        let point_category = point.mode().category();
        if let Some(last) = buffer.last() {
            let gap_secs = (point.timestamp() - last.timestamp()).num_seconds();
            if gap_secs > config.max_gap_secs || point_category != category {
                if let Some(trip) = flush(&mut buffer, category, &mut discarded) {
                    trips.push(trip);
                }
            }
        }
        if buffer.is_empty() {
            category = point_category;
        }
        buffer.push(*point);
    }
    if let Some(trip) = flush(&mut buffer, category, &mut discarded) {
        trips.push(trip);
    }

    info!(
        "[Segmenter] {} trips from {} points ({} candidates discarded)",
        trips.len(),
        points.len(),
        discarded
    );

    SegmentationResult { trips, discarded }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    use crate::LocationSample;

    fn ts() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 4, 8, 0, 0).unwrap()
    }

    fn driving_point(minutes: i64, step: f64) -> TrackPoint {
        TrackPoint {
            sample: LocationSample::new(
                ts() + Duration::minutes(minutes),
                47.60 + minutes as f64 * step,
                -122.33,
            )
            .with_mode(TransportMode::InVehicle),
            distance_from_prev_km: 0.0,
            velocity_kmh: Some(60.0),
        }
    }

    fn walking_point(minutes: i64) -> TrackPoint {
        TrackPoint {
            sample: LocationSample::new(ts() + Duration::minutes(minutes), 47.60, -122.33)
                .with_mode(TransportMode::Walking),
            distance_from_prev_km: 0.0,
            velocity_kmh: Some(4.0),
        }
    }

    #[test]
    fn test_empty_input() {
        let result = segment_trips(&[], &TripConfig::default());
        assert!(result.trips.is_empty());
        assert_eq!(result.discarded, 0);
    }

    #[test]
    fn test_gap_splits_into_two_trips() {
        // Two five-sample clusters at constant speed, 40 minutes apart
        let mut points: Vec<TrackPoint> = (0..5).map(|i| driving_point(i, 0.01)).collect();
        points.extend((44..49).map(|i| driving_point(i, 0.01)));

        let result = segment_trips(&points, &TripConfig::default());
        assert_eq!(result.trips.len(), 2);
        assert_eq!(result.discarded, 0);
        assert_eq!(result.trips[0].point_count, 5);
        assert_eq!(result.trips[1].point_count, 5);
    }

    #[test]
    fn test_trip_distance_is_pairwise_sum() {
        let points: Vec<TrackPoint> = (0..5).map(|i| driving_point(i, 0.01)).collect();
        let result = segment_trips(&points, &TripConfig::default());
        assert_eq!(result.trips.len(), 1);

        let expected: f64 = points
            .windows(2)
            .map(|w| haversine_km(&w[0].sample, &w[1].sample))
            .sum();
        assert!((result.trips[0].distance_km - expected).abs() < 1e-6);
    }

    #[test]
    fn test_category_change_splits() {
        let mut points: Vec<TrackPoint> = (0..5).map(|i| driving_point(i, 0.01)).collect();
        points.extend((5..10).map(walking_point));

        let result = segment_trips(&points, &TripConfig::default());
        assert_eq!(result.trips.len(), 2);
        assert_eq!(result.trips[0].category, ModeCategory::Motorized);
        assert_eq!(result.trips[0].dominant_mode, TransportMode::InVehicle);
        assert_eq!(result.trips[1].category, ModeCategory::NonMotorized);
        assert_eq!(result.trips[1].dominant_mode, TransportMode::Walking);
    }

    #[test]
    fn test_short_trips_discarded() {
        // Single sample, then a one-minute pair: both below the floor
        let mut points = vec![driving_point(0, 0.01)];
        points.push(driving_point(45, 0.01));
        points.push(driving_point(46, 0.01));

        let result = segment_trips(&points, &TripConfig::default());
        assert!(result.trips.is_empty());
        assert_eq!(result.discarded, 2);
    }

    #[test]
    fn test_minimum_duration_boundary() {
        // Exactly two minutes between first and last sample: emitted
        let points = vec![
            driving_point(0, 0.01),
            driving_point(1, 0.01),
            driving_point(2, 0.01),
        ];
        let result = segment_trips(&points, &TripConfig::default());
        assert_eq!(result.trips.len(), 1);
        assert_eq!(result.trips[0].duration_secs(), 120);
    }

    #[test]
    fn test_dominant_mode_tie_breaks_to_first() {
        // Two InBus, two InVehicle within one motorized trip; InBus seen first
        let mk = |minutes: i64, mode: TransportMode| TrackPoint {
            sample: LocationSample::new(
                ts() + Duration::minutes(minutes),
                47.60 + minutes as f64 * 0.01,
                -122.33,
            )
            .with_mode(mode),
            distance_from_prev_km: 0.0,
            velocity_kmh: Some(40.0),
        };
        let points = vec![
            mk(0, TransportMode::InBus),
            mk(1, TransportMode::InVehicle),
            mk(2, TransportMode::InBus),
            mk(3, TransportMode::InVehicle),
        ];
        let result = segment_trips(&points, &TripConfig::default());
        assert_eq!(result.trips.len(), 1);
        assert_eq!(result.trips[0].dominant_mode, TransportMode::InBus);
    }

    #[test]
    fn test_average_speed() {
        // 0.01 deg per minute is ~1.11 km/min, ~67 km/h
        let points: Vec<TrackPoint> = (0..10).map(|i| driving_point(i, 0.01)).collect();
        let result = segment_trips(&points, &TripConfig::default());
        let trip = &result.trips[0];
        assert!((trip.average_speed_kmh() - 66.7).abs() < 1.5);
    }
}
