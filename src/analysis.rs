//! Range analyzer: EV range compatibility statistics over daily summaries.
//!
//! A day is compatible with a range when its longest single trip fits on one
//! charge; several shorter trips in a day are separated by charging
//! opportunity, so total daily distance is reported but not used as the
//! criterion.
//!
//! ## Outputs
//! - Per-range compatibility counts and percentage
//! - Percentile-based range recommendation (default 95% coverage)
//! - Excess-distance histogram and ranked challenging days
//! - Per-month compatibility breakdown
//! - Recommendation sweep across standard battery ranges

use chrono::Datelike;
use log::info;
use serde::{Deserialize, Serialize};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::error::{AnalysisError, Result};
use crate::DailySummary;

/// Upper bound for candidate EV ranges, km. No production vehicle exceeds
/// this; anything above it is a caller bug.
pub const MAX_SUPPORTED_RANGE_KM: f64 = 1000.0;

/// Standard battery ranges swept by [`sweep_standard_ranges`], km.
pub const STANDARD_RANGES_KM: &[f64] = &[
    150.0, 200.0, 250.0, 300.0, 350.0, 400.0, 450.0, 500.0, 550.0, 600.0, 650.0, 700.0,
];

/// Configuration for range analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Coverage target for the recommended range, percent of days.
    /// Default: 95.0
    pub target_percentile: f64,

    /// Lower edge of the compatibility band that marks a swept range as
    /// recommended (upper edge is 100, exclusive). Default: 85.0
    pub sweep_recommend_min_pct: f64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            target_percentile: 95.0,
            sweep_recommend_min_pct: 85.0,
        }
    }
}

/// How badly a challenging day overshoots the candidate range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Severity {
    Minor,
    Moderate,
    Major,
    Severe,
}

/// Classify a day's excess distance over the range.
pub fn classify_severity(excess_km: f64) -> Severity {
    if excess_km <= 50.0 {
        Severity::Minor
    } else if excess_km <= 100.0 {
        Severity::Moderate
    } else if excess_km <= 200.0 {
        Severity::Major
    } else {
        Severity::Severe
    }
}

/// A day whose longest trip exceeds the candidate range.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChallengingDay {
    pub date: chrono::NaiveDate,
    pub longest_trip_km: f64,
    /// Distance beyond the candidate range, km
    pub excess_km: f64,
    pub severity: Severity,
}

/// Compatibility for one calendar month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyCompatibility {
    pub year: i32,
    pub month: u32,
    pub total_days: u32,
    pub compatible_days: u32,
    pub compatibility_pct: f64,
}

/// Histogram of excess distance over incompatible days, km-over buckets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExcessHistogram {
    /// Excess in (0, 50]
    pub up_to_50_km: u32,
    /// Excess in (50, 100]
    pub up_to_100_km: u32,
    /// Excess in (100, 200]
    pub up_to_200_km: u32,
    /// Excess above 200
    pub over_200_km: u32,
}

impl ExcessHistogram {
    fn add(&mut self, excess_km: f64) {
        match classify_severity(excess_km) {
            Severity::Minor => self.up_to_50_km += 1,
            Severity::Moderate => self.up_to_100_km += 1,
            Severity::Major => self.up_to_200_km += 1,
            Severity::Severe => self.over_200_km += 1,
        }
    }
}

/// Result of analyzing one candidate EV range against a set of days.
///
/// Produced fresh per request; never cached or mutated in place.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RangeAnalysis {
    /// Candidate range, km
    pub range_km: f64,
    /// Days analyzed
    pub total_days: u32,
    /// Days whose longest trip fits the range
    pub compatible_days: u32,
    /// Days whose longest trip exceeds the range
    pub incompatible_days: u32,
    /// compatible / total, percent (100.0 for an empty day set)
    pub compatibility_pct: f64,
    /// Mean of total daily distance, km
    pub average_daily_km: f64,
    /// Maximum total daily distance, km
    pub max_daily_km: f64,
    /// Minimum range covering the target percentile of days, km
    pub recommended_range_km: f64,
    /// Minimum range covering every analyzed day, km
    pub required_range_km: f64,
    /// Excess distance distribution over incompatible days
    pub excess_histogram: ExcessHistogram,
    /// Per-month compatibility, chronological
    pub monthly: Vec<MonthlyCompatibility>,
    /// Incompatible days ranked by severity, then excess
    pub challenging_days: Vec<ChallengingDay>,
}

pub(crate) fn validate_range(range_km: f64) -> Result<()> {
    if !range_km.is_finite() || range_km <= 0.0 || range_km > MAX_SUPPORTED_RANGE_KM {
        return Err(AnalysisError::InvalidRange {
            range_km,
            max_supported_km: MAX_SUPPORTED_RANGE_KM,
        });
    }
    Ok(())
}

fn validate_percentile(pct: f64) -> Result<()> {
    if !pct.is_finite() || pct <= 0.0 || pct > 100.0 {
        return Err(AnalysisError::ConfigError {
            message: format!("target percentile {} outside (0, 100]", pct),
        });
    }
    Ok(())
}

/// Minimum range such that `pct` percent of days' longest trips fit, km.
///
/// Sorts longest-trip distances ascending and reads the value at rank
/// `ceil(n * pct / 100)`; the result is rounded up to a whole kilometer.
/// Returns 0.0 for an empty day set.
pub fn percentile_range_km(days: &[DailySummary], pct: f64) -> f64 {
    if days.is_empty() {
        return 0.0;
    }
    let mut longest: Vec<f64> = days.iter().map(|d| d.longest_trip_km).collect();
    longest.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let n = longest.len();
    let rank = (n as f64 * pct / 100.0).ceil() as i64 - 1;
    let idx = rank.clamp(0, n as i64 - 1) as usize;
    longest[idx].ceil()
}

fn monthly_breakdown(days: &[DailySummary], range_km: f64) -> Vec<MonthlyCompatibility> {
    let mut months: Vec<MonthlyCompatibility> = Vec::new();
    for day in days {
        let (year, month) = (day.date.year(), day.date.month());
        let idx = match months.iter().position(|m| m.year == year && m.month == month) {
            Some(idx) => idx,
            None => {
                months.push(MonthlyCompatibility {
                    year,
                    month,
                    total_days: 0,
                    compatible_days: 0,
                    compatibility_pct: 0.0,
                });
                months.len() - 1
            }
        };
        let entry = &mut months[idx];
        entry.total_days += 1;
        if day.longest_trip_km <= range_km {
            entry.compatible_days += 1;
        }
    }

    for entry in &mut months {
        entry.compatibility_pct = entry.compatible_days as f64 / entry.total_days as f64 * 100.0;
    }
    months.sort_by_key(|m| (m.year, m.month));
    months
}

/// Analyze one candidate EV range against a set of significant days.
///
/// An empty day set yields a zeroed result with 100% compatibility rather
/// than an error; the pipeline surfaces low-data conditions as warnings.
pub fn analyze_range(
    days: &[DailySummary],
    range_km: f64,
    config: &AnalysisConfig,
) -> Result<RangeAnalysis> {
    validate_range(range_km)?;
    validate_percentile(config.target_percentile)?;

    if days.is_empty() {
        return Ok(RangeAnalysis {
            range_km,
            total_days: 0,
            compatible_days: 0,
            incompatible_days: 0,
            compatibility_pct: 100.0,
            average_daily_km: 0.0,
            max_daily_km: 0.0,
            recommended_range_km: 0.0,
            required_range_km: 0.0,
            excess_histogram: ExcessHistogram::default(),
            monthly: Vec::new(),
            challenging_days: Vec::new(),
        });
    }

    let mut compatible = 0u32;
    let mut histogram = ExcessHistogram::default();
    let mut challenging: Vec<ChallengingDay> = Vec::new();
    let mut total_daily_km = 0.0;
    let mut max_daily_km = 0.0f64;

    for day in days {
        total_daily_km += day.total_distance_km;
        max_daily_km = max_daily_km.max(day.total_distance_km);

        if day.longest_trip_km <= range_km {
            compatible += 1;
        } else {
            let excess = day.longest_trip_km - range_km;
            histogram.add(excess);
            challenging.push(ChallengingDay {
                date: day.date,
                longest_trip_km: day.longest_trip_km,
                excess_km: excess,
                severity: classify_severity(excess),
            });
        }
    }

    challenging.sort_by(|a, b| {
        b.severity.cmp(&a.severity).then(
            b.excess_km
                .partial_cmp(&a.excess_km)
                .unwrap_or(std::cmp::Ordering::Equal),
        )
    });

    let total = days.len() as u32;
    let analysis = RangeAnalysis {
        range_km,
        total_days: total,
        compatible_days: compatible,
        incompatible_days: total - compatible,
        compatibility_pct: compatible as f64 / total as f64 * 100.0,
        average_daily_km: total_daily_km / total as f64,
        max_daily_km,
        recommended_range_km: percentile_range_km(days, config.target_percentile),
        required_range_km: percentile_range_km(days, 100.0),
        excess_histogram: histogram,
        monthly: monthly_breakdown(days, range_km),
        challenging_days: challenging,
    };

    info!(
        "[Analysis] Range {:.0} km: {}/{} days compatible ({:.1}%)",
        range_km, analysis.compatible_days, analysis.total_days, analysis.compatibility_pct
    );
    Ok(analysis)
}

/// Analyze several candidate ranges. Every range is validated before any
/// analysis runs, so a bad range aborts the whole request with no partial
/// output.
pub fn analyze_ranges(
    days: &[DailySummary],
    ranges_km: &[f64],
    config: &AnalysisConfig,
) -> Result<Vec<RangeAnalysis>> {
    for &range in ranges_km {
        validate_range(range)?;
    }
    ranges_km
        .iter()
        .map(|&range| analyze_range(days, range, config))
        .collect()
}

/// Parallel variant: candidate ranges are independent, each reads only the
/// immutable day set.
#[cfg(feature = "parallel")]
pub fn analyze_ranges_parallel(
    days: &[DailySummary],
    ranges_km: &[f64],
    config: &AnalysisConfig,
) -> Result<Vec<RangeAnalysis>> {
    for &range in ranges_km {
        validate_range(range)?;
    }
    ranges_km
        .par_iter()
        .map(|&range| analyze_range(days, range, config))
        .collect()
}

/// One entry of the standard-range sweep.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RangeRecommendation {
    pub range_km: f64,
    pub compatibility_pct: f64,
    /// Compatibility falls in the recommended band (default [85, 100))
    pub recommended: bool,
}

/// Sweep the standard battery ranges and mark the recommendable band.
///
/// A range already covering 100% of days is not "recommended" - it is
/// oversized for the observed history; the band captures ranges that fit
/// most days while leaving headroom decisions visible.
pub fn sweep_standard_ranges(
    days: &[DailySummary],
    config: &AnalysisConfig,
) -> Vec<RangeRecommendation> {
    STANDARD_RANGES_KM
        .iter()
        .map(|&range_km| {
            let compatibility_pct = if days.is_empty() {
                100.0
            } else {
                let compatible = days.iter().filter(|d| d.longest_trip_km <= range_km).count();
                compatible as f64 / days.len() as f64 * 100.0
            };
            RangeRecommendation {
                range_km,
                compatibility_pct,
                recommended: compatibility_pct >= config.sweep_recommend_min_pct
                    && compatibility_pct < 100.0,
            }
        })
        .collect()
}
