//! Stationary-period remover.
//!
//! Parked cars and idle phones still emit fixes; sustained low-speed runs
//! would otherwise dilute trip statistics and glue trips together. A run is
//! elided only when every point in it is at or below the speed threshold and
//! the run spans at least the minimum duration.
//!
//! The scan is a single forward pass holding the current run's start index;
//! no neighbor rescanning per point.

use serde::{Deserialize, Serialize};

use crate::TrackPoint;

/// Configuration for stationary-period removal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StationaryConfig {
    /// Velocity at or below which a point counts as stationary.
    /// Default: 5.0 km/h
    pub max_speed_kmh: f64,

    /// Minimum time span for a low-speed run to be elided.
    /// Default: 900 seconds (15 minutes)
    pub min_duration_secs: i64,
}

impl Default for StationaryConfig {
    fn default() -> Self {
        Self {
            max_speed_kmh: 5.0,
            min_duration_secs: 900,
        }
    }
}

#[inline]
fn is_stationary(point: &TrackPoint, config: &StationaryConfig) -> bool {
    // A point without a known velocity cannot confirm a dwell
    point
        .velocity_kmh
        .map_or(false, |v| v <= config.max_speed_kmh)
}

/// Remove sustained low-speed dwell periods from a time-ordered track.
///
/// Returns the surviving points (order preserved) and the number removed.
pub fn remove_stationary(
    points: Vec<TrackPoint>,
    config: &StationaryConfig,
) -> (Vec<TrackPoint>, u32) {
    let mut drop_ranges: Vec<(usize, usize)> = Vec::new();
    let mut run_start: Option<usize> = None;

    for i in 0..=points.len() {
        let in_run = i < points.len() && is_stationary(&points[i], config);
        match (run_start, in_run) {
            (None, true) => run_start = Some(i),
            (Some(start), false) => {
                let span_secs =
                    (points[i - 1].timestamp() - points[start].timestamp()).num_seconds();
                if span_secs >= config.min_duration_secs {
                    drop_ranges.push((start, i));
                }
                run_start = None;
            }
            _ => {}
        }
    }

    if drop_ranges.is_empty() {
        return (points, 0);
    }

    let mut removed = 0u32;
    let mut next_range = 0;
    let mut kept = Vec::with_capacity(points.len());
    for (i, point) in points.into_iter().enumerate() {
        while next_range < drop_ranges.len() && i >= drop_ranges[next_range].1 {
            next_range += 1;
        }
        let dropped = next_range < drop_ranges.len()
            && i >= drop_ranges[next_range].0
            && i < drop_ranges[next_range].1;
        if dropped {
            removed += 1;
        } else {
            kept.push(point);
        }
    }

    (kept, removed)
}
