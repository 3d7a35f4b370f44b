//! End-to-end pipeline composition.
//!
//! Wires the seven stages together over a chunked ingest of raw samples:
//! filter, annotate, validate modes, drop dwells, segment, aggregate,
//! analyze. Each run owns its input copy and produces a fresh result;
//! concurrent runs never share mutable state.
//!
//! Long histories can be aborted cooperatively: cancellation is checked at
//! chunk boundaries and between stages, and a cancelled run returns an
//! explicit [`PipelineOutcome::Cancelled`] with no partial result.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::info;
use serde::{Deserialize, Serialize};

use crate::analysis::validate_range;
use crate::daily::with_full_coverage;
use crate::error::{AnalysisError, Result};
use crate::filter::{filter_samples, FilterConfig, FilterStats};
use crate::kinematics::{annotate_track, KinematicsStats};
use crate::segmenter::segment_trips;
use crate::stationary::{remove_stationary, StationaryConfig};
use crate::{
    sweep_standard_ranges, AnalysisConfig, DailyConfig, DailySummary, LocationSample,
    RangeAnalysis, RangeRecommendation, TripConfig,
};

#[cfg(not(feature = "parallel"))]
use crate::analysis::analyze_ranges;
#[cfg(feature = "parallel")]
use crate::analysis::analyze_ranges_parallel;
#[cfg(not(feature = "parallel"))]
use crate::daily::aggregate_daily;
#[cfg(feature = "parallel")]
use crate::daily::aggregate_daily_parallel;
#[cfg(not(feature = "parallel"))]
use crate::validator::validate_modes;
#[cfg(feature = "parallel")]
use crate::validator::validate_modes_parallel;

/// Significant-day floor below which results are flagged low-confidence.
const MIN_CONFIDENT_DAYS: u32 = 7;

/// Zero-activity ratio above which results are flagged low-confidence.
const MAX_ZERO_DAY_RATIO: f64 = 0.5;

/// Cooperative cancellation flag shared between the caller and a running
/// analysis. Cloning shares the underlying flag.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. The pipeline honors it at the next chunk or
    /// stage boundary.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

/// Configuration for a full pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub filter: FilterConfig,
    pub stationary: StationaryConfig,
    pub trip: TripConfig,
    pub daily: DailyConfig,
    pub analysis: AnalysisConfig,
    /// Samples consumed per ingest chunk; also the cancellation granularity.
    /// Default: 8192
    pub chunk_size: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            filter: FilterConfig::default(),
            stationary: StationaryConfig::default(),
            trip: TripConfig::default(),
            daily: DailyConfig::default(),
            analysis: AnalysisConfig::default(),
            chunk_size: 8192,
        }
    }
}

impl PipelineConfig {
    fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(AnalysisError::ConfigError {
                message: "chunk_size must be positive".to_string(),
            });
        }
        if !self.filter.max_accuracy_m.is_finite() || self.filter.max_accuracy_m < 0.0 {
            return Err(AnalysisError::ConfigError {
                message: "max_accuracy_m must be a non-negative number".to_string(),
            });
        }
        if self.stationary.max_speed_kmh < 0.0 || self.stationary.min_duration_secs < 0 {
            return Err(AnalysisError::ConfigError {
                message: "stationary thresholds must be non-negative".to_string(),
            });
        }
        if self.trip.max_gap_secs <= 0 || self.trip.min_trip_secs < 0 {
            return Err(AnalysisError::ConfigError {
                message: "trip thresholds must be positive".to_string(),
            });
        }
        if self.daily.utc_offset_minutes.abs() > 18 * 60 {
            return Err(AnalysisError::ConfigError {
                message: "utc_offset_minutes outside +/-18 hours".to_string(),
            });
        }
        Ok(())
    }
}

/// Per-run counters surfaced next to the results, not hidden in logs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineDiagnostics {
    /// Raw samples consumed from the input
    pub samples_ingested: u64,
    /// Samples skipped for unparseable or out-of-range coordinates
    pub samples_invalid: u64,
    /// Samples surviving the quality filter and coordinate check
    pub samples_retained: u64,
    /// Quality-filter rejection counters
    pub filter: FilterStats,
    /// Distance-engine anomaly counters
    pub kinematics: KinematicsStats,
    /// Mode labels replaced by the validator
    pub mode_corrections: u32,
    /// Points elided as stationary dwell
    pub stationary_removed: u32,
    /// Trip candidates discarded as too short or too sparse
    pub trips_discarded: u32,
    /// Trips emitted by the segmenter
    pub trips_emitted: u32,
}

/// Non-fatal conditions that make the results low-confidence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AnalysisWarning {
    /// Fewer significant driving days than the confidence floor
    InsufficientDays { significant_days: u32 },
    /// More than half the covered calendar span shows no driving
    SparseActivity { zero_day_pct: f64 },
}

impl fmt::Display for AnalysisWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnalysisWarning::InsufficientDays { significant_days } => {
                write!(
                    f,
                    "Only {} significant driving days; treat results as low-confidence",
                    significant_days
                )
            }
            AnalysisWarning::SparseActivity { zero_day_pct } => {
                write!(
                    f,
                    "{:.0}% of covered days show no driving; treat results as low-confidence",
                    zero_day_pct
                )
            }
        }
    }
}

/// Everything one pipeline run produces.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineResult {
    /// One summary per active local calendar day, chronological. Includes
    /// sub-threshold days; analyses use only the significant subset.
    pub daily_summaries: Vec<DailySummary>,
    /// One analysis per requested candidate range, in request order
    pub analyses: Vec<RangeAnalysis>,
    /// Compatibility sweep across the standard battery ranges
    pub standard_sweep: Vec<RangeRecommendation>,
    /// Per-stage counters
    pub diagnostics: PipelineDiagnostics,
    /// Low-confidence conditions, empty when none
    pub warnings: Vec<AnalysisWarning>,
}

impl PipelineResult {
    /// Serialize the full result to JSON for the embedding API layer.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| AnalysisError::Internal {
            message: format!("result serialization failed: {}", e),
        })
    }
}

/// Outcome of a pipeline run: completed with results, or cancelled with
/// nothing. Errors travel separately through [`Result`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PipelineOutcome {
    Completed(PipelineResult),
    Cancelled,
}

#[inline]
fn cancelled(token: Option<&CancellationToken>) -> bool {
    token.map_or(false, CancellationToken::is_cancelled)
}

fn compute_warnings(all_days: &[DailySummary], significant: &[DailySummary]) -> Vec<AnalysisWarning> {
    let mut warnings = Vec::new();

    let significant_days = significant.len() as u32;
    if significant_days < MIN_CONFIDENT_DAYS {
        warnings.push(AnalysisWarning::InsufficientDays { significant_days });
    }

    if !all_days.is_empty() {
        let covered = with_full_coverage(all_days);
        let zero_days = covered.iter().filter(|d| d.trip_count == 0).count();
        let ratio = zero_days as f64 / covered.len() as f64;
        if ratio > MAX_ZERO_DAY_RATIO {
            warnings.push(AnalysisWarning::SparseActivity {
                zero_day_pct: ratio * 100.0,
            });
        }
    }

    warnings
}

/// Run the full pipeline: raw samples in, daily summaries and range analyses
/// out.
///
/// The input may arrive in arbitrary order; it is consumed in fixed-size
/// chunks, filtered on the fly, then sorted by timestamp before
/// segmentation. Candidate ranges and the configuration are validated before
/// any sample is touched.
pub fn run_analysis<I>(
    samples: I,
    ranges_km: &[f64],
    config: &PipelineConfig,
    cancel: Option<&CancellationToken>,
) -> Result<PipelineOutcome>
where
    I: IntoIterator<Item = LocationSample>,
{
    config.validate()?;
    for &range in ranges_km {
        validate_range(range)?;
    }

    let mut diagnostics = PipelineDiagnostics::default();

    // Stage 1: chunked ingest + quality filter
    let mut iter = samples.into_iter();
    let mut retained: Vec<LocationSample> = Vec::new();
    loop {
        if cancelled(cancel) {
            info!("[Pipeline] Cancelled during ingest");
            return Ok(PipelineOutcome::Cancelled);
        }
        let chunk: Vec<LocationSample> = iter.by_ref().take(config.chunk_size).collect();
        if chunk.is_empty() {
            break;
        }
        diagnostics.samples_ingested += chunk.len() as u64;
        let (kept, stats) = filter_samples(chunk, &config.filter);
        diagnostics.filter.merge(&stats);
        for sample in kept {
            if sample.has_valid_coordinates() {
                retained.push(sample);
            } else {
                diagnostics.samples_invalid += 1;
            }
        }
    }
    diagnostics.samples_retained = retained.len() as u64;

    // Timestamps within a run must be non-decreasing from here on
    retained.sort_by_key(|s| s.timestamp);

    if cancelled(cancel) {
        info!("[Pipeline] Cancelled before annotation");
        return Ok(PipelineOutcome::Cancelled);
    }

    // Stage 2: distance & velocity
    let (points, kinematics_stats) = annotate_track(retained);
    diagnostics.kinematics = kinematics_stats;

    if cancelled(cancel) {
        info!("[Pipeline] Cancelled before mode validation");
        return Ok(PipelineOutcome::Cancelled);
    }

    // Stage 3: mode validation
    #[cfg(feature = "parallel")]
    let (points, validation_stats) = validate_modes_parallel(points);
    #[cfg(not(feature = "parallel"))]
    let (points, validation_stats) = validate_modes(points);
    diagnostics.mode_corrections = validation_stats.corrected;

    // Stage 4: stationary removal
    let (points, removed) = remove_stationary(points, &config.stationary);
    diagnostics.stationary_removed = removed;

    if cancelled(cancel) {
        info!("[Pipeline] Cancelled before segmentation");
        return Ok(PipelineOutcome::Cancelled);
    }

    // Stage 5: trip segmentation (strictly sequential)
    let segmentation = segment_trips(&points, &config.trip);
    diagnostics.trips_discarded = segmentation.discarded;
    diagnostics.trips_emitted = segmentation.trips.len() as u32;

    // Stage 6: daily aggregation
    #[cfg(feature = "parallel")]
    let all_days = aggregate_daily_parallel(&segmentation.trips, &config.daily);
    #[cfg(not(feature = "parallel"))]
    let all_days = aggregate_daily(&segmentation.trips, &config.daily);

    let significant: Vec<DailySummary> = all_days
        .iter()
        .filter(|d| d.is_significant(config.daily.min_significant_km))
        .cloned()
        .collect();
    let warnings = compute_warnings(&all_days, &significant);

    if cancelled(cancel) {
        info!("[Pipeline] Cancelled before range analysis");
        return Ok(PipelineOutcome::Cancelled);
    }

    // Stage 7: range analysis
    #[cfg(feature = "parallel")]
    let analyses = analyze_ranges_parallel(&significant, ranges_km, &config.analysis)?;
    #[cfg(not(feature = "parallel"))]
    let analyses = analyze_ranges(&significant, ranges_km, &config.analysis)?;

    let standard_sweep = sweep_standard_ranges(&significant, &config.analysis);

    info!(
        "[Pipeline] {} samples -> {} trips -> {} driving days ({} significant)",
        diagnostics.samples_ingested,
        diagnostics.trips_emitted,
        all_days.len(),
        significant.len()
    );

    Ok(PipelineOutcome::Completed(PipelineResult {
        daily_summaries: all_days,
        analyses,
        standard_sweep,
        diagnostics,
        warnings,
    }))
}
