//! # Trip Analyzer
//!
//! High-performance GPS trip extraction and EV range compatibility analysis.
//!
//! This library turns a noisy, unordered stream of raw location samples into
//! clean per-day driving summaries, then derives range recommendations from
//! them:
//! - Quality filtering and geodesic distance/velocity annotation
//! - Transport-mode plausibility correction
//! - Stationary-period removal and gap-based trip segmentation
//! - Daily aggregation and percentile-based range statistics
//!
//! ## Features
//!
//! - **`parallel`** - Enable parallel processing with rayon
//!
//! ## Quick Start
//!
//! ```rust
//! use chrono::{Duration, TimeZone, Utc};
//! use trip_analyzer::{run_analysis, LocationSample, PipelineConfig, PipelineOutcome, TransportMode};
//!
//! // Ten samples a minute apart, moving at road speed
//! let t0 = Utc.with_ymd_and_hms(2024, 3, 4, 8, 0, 0).unwrap();
//! let samples: Vec<LocationSample> = (0..10i64)
//!     .map(|i| {
//!         LocationSample::new(t0 + Duration::minutes(i), 47.60 + i as f64 * 0.01, -122.33)
//!             .with_mode(TransportMode::InVehicle)
//!     })
//!     .collect();
//!
//! let outcome = run_analysis(samples, &[300.0], &PipelineConfig::default(), None).unwrap();
//! match outcome {
//!     PipelineOutcome::Completed(result) => {
//!         assert_eq!(result.analyses.len(), 1);
//!         assert_eq!(result.analyses[0].compatible_days, 1);
//!     }
//!     PipelineOutcome::Cancelled => unreachable!(),
//! }
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// Unified error handling
pub mod error;
pub use error::{AnalysisError, Result};

// Geographic utilities (haversine distance, bearing, polyline length)
pub mod geo_utils;
pub use geo_utils::{haversine_km, initial_bearing, polyline_km};

// Transport modes, category and speed-plausibility tables
pub mod modes;
pub use modes::{infer_mode_from_speed, ModeCategory, SpeedRange, TransportMode};

// Stage 1: quality filter
pub mod filter;
pub use filter::{filter_samples, FilterConfig, FilterStats};

// Stage 2: distance & velocity engine
pub mod kinematics;
pub use kinematics::{annotate_track, KinematicsStats, TrackPoint, TELEPORT_DISTANCE_KM};

// Stage 3: mode validator
pub mod validator;
#[cfg(feature = "parallel")]
pub use validator::validate_modes_parallel;
pub use validator::{validate_mode, validate_modes, ValidationStats};

// Stage 4: stationary-period remover
pub mod stationary;
pub use stationary::{remove_stationary, StationaryConfig};

// Stage 5: trip segmenter
pub mod segmenter;
pub use segmenter::{segment_trips, SegmentationResult, Trip, TripConfig};

// Stage 6: daily aggregator
pub mod daily;
#[cfg(feature = "parallel")]
pub use daily::aggregate_daily_parallel;
pub use daily::{aggregate_daily, with_full_coverage, DailyConfig, DailySummary};

// Stage 7: range analyzer
pub mod analysis;
#[cfg(feature = "parallel")]
pub use analysis::analyze_ranges_parallel;
pub use analysis::{
    analyze_range, analyze_ranges, sweep_standard_ranges, AnalysisConfig, ChallengingDay,
    ExcessHistogram, MonthlyCompatibility, RangeAnalysis, RangeRecommendation, Severity,
    MAX_SUPPORTED_RANGE_KM, STANDARD_RANGES_KM,
};

// Full pipeline composition
pub mod pipeline;
pub use pipeline::{
    run_analysis, AnalysisWarning, CancellationToken, PipelineConfig, PipelineDiagnostics,
    PipelineOutcome, PipelineResult,
};

// ============================================================================
// Core Types
// ============================================================================

/// A single GPS fix from a location history export.
///
/// Samples are immutable once ingested; derived attributes (pairwise
/// distance, implied velocity) are attached later as [`TrackPoint`]s by the
/// distance engine rather than written back into the sample.
///
/// # Example
/// ```
/// use chrono::{TimeZone, Utc};
/// use trip_analyzer::{LocationSample, TransportMode};
///
/// let sample = LocationSample::new(
///     Utc.with_ymd_and_hms(2024, 3, 4, 8, 0, 0).unwrap(),
///     47.6062,
///     -122.3321,
/// )
/// .with_mode(TransportMode::InVehicle)
/// .with_accuracy(12.0);
///
/// assert!(sample.has_valid_coordinates());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LocationSample {
    /// Sample time (UTC)
    pub timestamp: DateTime<Utc>,
    /// Latitude in degrees, valid range [-90, 90]
    pub latitude: f64,
    /// Longitude in degrees, valid range [-180, 180]
    pub longitude: f64,
    /// Reported positional accuracy in meters (optional)
    pub accuracy_m: Option<f64>,
    /// Declared transport mode (defaults to Unknown)
    pub mode: TransportMode,
    /// Confidence in the declared mode, 0-100 (optional)
    pub mode_confidence: Option<u8>,
    /// Velocity in km/h, as provided by the source (optional)
    pub velocity_kmh: Option<f64>,
    /// Altitude in meters (optional)
    pub altitude_m: Option<f64>,
}

impl LocationSample {
    /// Create a new sample with only the required fields set.
    pub fn new(timestamp: DateTime<Utc>, latitude: f64, longitude: f64) -> Self {
        Self {
            timestamp,
            latitude,
            longitude,
            accuracy_m: None,
            mode: TransportMode::Unknown,
            mode_confidence: None,
            velocity_kmh: None,
            altitude_m: None,
        }
    }

    /// Set the declared transport mode.
    pub fn with_mode(mut self, mode: TransportMode) -> Self {
        self.mode = mode;
        self
    }

    /// Set the reported positional accuracy in meters.
    pub fn with_accuracy(mut self, accuracy_m: f64) -> Self {
        self.accuracy_m = Some(accuracy_m);
        self
    }

    /// Set the mode confidence (0-100).
    pub fn with_confidence(mut self, confidence: u8) -> Self {
        self.mode_confidence = Some(confidence);
        self
    }

    /// Set the source-provided velocity in km/h.
    pub fn with_velocity(mut self, velocity_kmh: f64) -> Self {
        self.velocity_kmh = Some(velocity_kmh);
        self
    }

    /// Set the altitude in meters.
    pub fn with_altitude(mut self, altitude_m: f64) -> Self {
        self.altitude_m = Some(altitude_m);
        self
    }

    /// Check if the sample has finite, in-range coordinates.
    pub fn has_valid_coordinates(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && self.latitude >= -90.0
            && self.latitude <= 90.0
            && self.longitude >= -180.0
            && self.longitude <= 180.0
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 4, 8, 0, 0).unwrap()
    }

    #[test]
    fn test_sample_coordinate_validation() {
        assert!(LocationSample::new(ts(), 47.6062, -122.3321).has_valid_coordinates());
        assert!(!LocationSample::new(ts(), 91.0, 0.0).has_valid_coordinates());
        assert!(!LocationSample::new(ts(), 0.0, 181.0).has_valid_coordinates());
        assert!(!LocationSample::new(ts(), f64::NAN, 0.0).has_valid_coordinates());
        assert!(!LocationSample::new(ts(), 0.0, f64::INFINITY).has_valid_coordinates());
    }

    #[test]
    fn test_sample_builder_defaults() {
        let sample = LocationSample::new(ts(), 47.6062, -122.3321);
        assert_eq!(sample.mode, TransportMode::Unknown);
        assert!(sample.accuracy_m.is_none());
        assert!(sample.velocity_kmh.is_none());

        let sample = sample
            .with_mode(TransportMode::InVehicle)
            .with_accuracy(15.0)
            .with_confidence(80)
            .with_velocity(55.0);
        assert_eq!(sample.mode, TransportMode::InVehicle);
        assert_eq!(sample.accuracy_m, Some(15.0));
        assert_eq!(sample.mode_confidence, Some(80));
        assert_eq!(sample.velocity_kmh, Some(55.0));
    }

    #[test]
    fn test_sample_serde_roundtrip() {
        let sample = LocationSample::new(ts(), 47.6062, -122.3321)
            .with_mode(TransportMode::Walking)
            .with_confidence(70);
        let json = serde_json::to_string(&sample).unwrap();
        let back: LocationSample = serde_json::from_str(&json).unwrap();
        assert_eq!(sample, back);
    }
}
