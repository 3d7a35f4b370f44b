//! Mode validator: velocity-based correction of implausible mode labels.
//!
//! Activity-recognition labels in location exports are noisy around
//! transitions (parking, boarding, signal loss). A point whose velocity falls
//! outside the declared mode's typical speed range gets a replacement mode
//! inferred from velocity buckets. The check is per-point and pure; points
//! without a known velocity pass through untouched.

use log::debug;
use serde::{Deserialize, Serialize};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::modes::infer_mode_from_speed;
use crate::TrackPoint;

/// Confidence assigned to a substituted mode when the sample carried none.
const INFERRED_CONFIDENCE: u8 = 50;

/// Correction counters from one validation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationStats {
    /// Points whose mode was replaced
    pub corrected: u32,
    /// Points left unchanged (including those without velocity)
    pub unchanged: u32,
}

/// Validate a single point, substituting an inferred mode when the declared
/// one is implausible for the observed velocity.
///
/// Returns the (possibly corrected) point and whether a correction was made.
/// Consults nothing but the point itself.
pub fn validate_mode(point: TrackPoint) -> (TrackPoint, bool) {
    let Some(velocity) = point.velocity_kmh else {
        return (point, false);
    };

    if point.sample.mode.is_speed_plausible(velocity) {
        return (point, false);
    }

    let inferred = infer_mode_from_speed(velocity);
    let mut corrected = point;
    corrected.sample.mode = inferred;
    if corrected.sample.mode_confidence.is_none() {
        corrected.sample.mode_confidence = Some(INFERRED_CONFIDENCE);
    }
    (corrected, true)
}

/// Validate a batch of points, preserving order.
pub fn validate_modes(points: Vec<TrackPoint>) -> (Vec<TrackPoint>, ValidationStats) {
    let mut stats = ValidationStats::default();
    let validated = points
        .into_iter()
        .map(|p| {
            let (p, corrected) = validate_mode(p);
            if corrected {
                stats.corrected += 1;
            } else {
                stats.unchanged += 1;
            }
            p
        })
        .collect();

    if stats.corrected > 0 {
        debug!("[Validator] Corrected {} mode labels", stats.corrected);
    }
    (validated, stats)
}

/// Parallel validation for large batches. Order is preserved; falls back to
/// the sequential pass below 10,000 points.
#[cfg(feature = "parallel")]
pub fn validate_modes_parallel(points: Vec<TrackPoint>) -> (Vec<TrackPoint>, ValidationStats) {
    if points.len() < 10_000 {
        return validate_modes(points);
    }

    let results: Vec<(TrackPoint, bool)> = points.into_par_iter().map(validate_mode).collect();

    let mut stats = ValidationStats::default();
    let validated = results
        .into_iter()
        .map(|(p, corrected)| {
            if corrected {
                stats.corrected += 1;
            } else {
                stats.unchanged += 1;
            }
            p
        })
        .collect();

    if stats.corrected > 0 {
        debug!("[Validator] Corrected {} mode labels", stats.corrected);
    }
    (validated, stats)
}
