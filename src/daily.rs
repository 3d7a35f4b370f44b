//! Daily aggregator: reduces trips into one summary per calendar day.
//!
//! Only motorized trips count toward driving distance. Days are keyed by the
//! local calendar date of the trip start, under a configurable UTC offset.

use std::collections::HashMap;

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::{ModeCategory, Trip, TransportMode};

/// Configuration for daily aggregation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyConfig {
    /// Offset applied to UTC timestamps before date bucketing.
    /// Default: 0 (UTC calendar days)
    pub utc_offset_minutes: i32,

    /// Minimum total distance for a day to count as significant.
    /// Default: 1.0 km
    pub min_significant_km: f64,
}

impl Default for DailyConfig {
    fn default() -> Self {
        Self {
            utc_offset_minutes: 0,
            min_significant_km: 1.0,
        }
    }
}

/// One calendar day of driving activity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailySummary {
    /// Local calendar date
    pub date: NaiveDate,
    /// Total motorized distance, km
    pub total_distance_km: f64,
    /// Number of motorized trips
    pub trip_count: u32,
    /// Longest single trip, km
    pub longest_trip_km: f64,
    /// Total distance over total driving time, km/h
    pub average_speed_kmh: f64,
    /// Distinct dominant modes across the day's trips, first-seen order
    pub modes: Vec<TransportMode>,
    /// Samples contributing to the day's trips
    pub sample_count: u32,
    /// Data quality 0-100: one retained sample per driving minute is full
    /// quality
    pub quality_score: f64,
}

impl DailySummary {
    /// Whether this day carries enough driving to analyze.
    pub fn is_significant(&self, min_km: f64) -> bool {
        self.total_distance_km >= min_km && self.trip_count > 0
    }

    /// A summary for a date with no recorded driving.
    pub fn empty(date: NaiveDate) -> Self {
        Self {
            date,
            total_distance_km: 0.0,
            trip_count: 0,
            longest_trip_km: 0.0,
            average_speed_kmh: 0.0,
            modes: Vec::new(),
            sample_count: 0,
            quality_score: 0.0,
        }
    }
}

#[derive(Debug, Default, Clone)]
struct DayAccumulator {
    total_km: f64,
    trip_count: u32,
    longest_km: f64,
    driving_secs: i64,
    modes: Vec<TransportMode>,
    sample_count: u32,
}

impl DayAccumulator {
    fn add(&mut self, trip: &Trip) {
        self.total_km += trip.distance_km;
        self.trip_count += 1;
        self.longest_km = self.longest_km.max(trip.distance_km);
        self.driving_secs += trip.duration_secs();
        if !self.modes.contains(&trip.dominant_mode) {
            self.modes.push(trip.dominant_mode);
        }
        self.sample_count += trip.point_count;
    }

    fn finalize(self, date: NaiveDate) -> DailySummary {
        let driving_hours = self.driving_secs as f64 / 3600.0;
        let average_speed_kmh = if driving_hours > 0.0 {
            self.total_km / driving_hours
        } else {
            0.0
        };
        let driving_minutes = self.driving_secs as f64 / 60.0;
        let quality_score = if driving_minutes > 0.0 {
            (self.sample_count as f64 / driving_minutes).min(1.0) * 100.0
        } else {
            0.0
        };

        DailySummary {
            date,
            total_distance_km: self.total_km,
            trip_count: self.trip_count,
            longest_trip_km: self.longest_km,
            average_speed_kmh,
            modes: self.modes,
            sample_count: self.sample_count,
            quality_score,
        }
    }
}

fn local_date(trip: &Trip, config: &DailyConfig) -> NaiveDate {
    (trip.start_time + Duration::minutes(config.utc_offset_minutes as i64)).date_naive()
}

fn group_by_date(trips: &[Trip], config: &DailyConfig) -> HashMap<NaiveDate, DayAccumulator> {
    let mut days: HashMap<NaiveDate, DayAccumulator> = HashMap::new();
    for trip in trips {
        if trip.category != ModeCategory::Motorized {
            continue;
        }
        days.entry(local_date(trip, config)).or_default().add(trip);
    }
    days
}

/// Reduce trips into one summary per local calendar day, sorted by date.
///
/// Non-motorized trips are skipped; they bound trip segmentation but do not
/// contribute driving distance.
pub fn aggregate_daily(trips: &[Trip], config: &DailyConfig) -> Vec<DailySummary> {
    let days = group_by_date(trips, config);
    let mut summaries: Vec<DailySummary> = days
        .into_iter()
        .map(|(date, acc)| acc.finalize(date))
        .collect();
    summaries.sort_by_key(|s| s.date);
    summaries
}

/// Parallel variant: groups are independent, so finalization fans out per
/// date. Falls back to the sequential pass for small trip counts.
#[cfg(feature = "parallel")]
pub fn aggregate_daily_parallel(trips: &[Trip], config: &DailyConfig) -> Vec<DailySummary> {
    if trips.len() < 10_000 {
        return aggregate_daily(trips, config);
    }

    let days = group_by_date(trips, config);
    let mut summaries: Vec<DailySummary> = days
        .into_par_iter()
        .map(|(date, acc)| acc.finalize(date))
        .collect();
    summaries.sort_by_key(|s| s.date);
    summaries
}

/// Expand a sorted summary list to full calendar coverage, inserting
/// zero-activity days for every date between the first and last summary.
pub fn with_full_coverage(summaries: &[DailySummary]) -> Vec<DailySummary> {
    let (Some(first), Some(last)) = (summaries.first(), summaries.last()) else {
        return Vec::new();
    };

    let mut out = Vec::new();
    let mut next = first.date;
    for summary in summaries {
        while next < summary.date {
            out.push(DailySummary::empty(next));
            match next.succ_opt() {
                Some(d) => next = d,
                None => return out,
            }
        }
        out.push(summary.clone());
        match summary.date.succ_opt() {
            Some(d) => next = d,
            None => break,
        }
    }
    debug_assert_eq!(out.last().map(|s| s.date), Some(last.date));
    out
}
