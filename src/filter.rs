//! Quality filter: pure rejection of untrustworthy fixes.
//!
//! Drops a sample when its reported accuracy is worse than the threshold,
//! its mode confidence is below the threshold, or it sits on the (0, 0)
//! sentinel used by some exporters for failed fixes. No correction, no
//! reordering, no duplication; every rejection is counted by reason.

use serde::{Deserialize, Serialize};

use crate::LocationSample;

/// Configuration for the quality filter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterConfig {
    /// Samples with reported accuracy above this are dropped.
    /// Default: 100.0 meters
    pub max_accuracy_m: f64,

    /// Samples with mode confidence below this are dropped.
    /// Default: 50
    pub min_mode_confidence: u8,

    /// Samples with both |lat| and |lon| within this of zero are dropped.
    /// Default: 0.01 degrees
    pub origin_tolerance_deg: f64,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            max_accuracy_m: 100.0,
            min_mode_confidence: 50,
            origin_tolerance_deg: 0.01,
        }
    }
}

/// Per-reason counters from one filter pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterStats {
    /// Samples that passed the filter
    pub accepted: u32,
    /// Dropped: accuracy above threshold
    pub rejected_accuracy: u32,
    /// Dropped: mode confidence below threshold
    pub rejected_confidence: u32,
    /// Dropped: (0, 0) sentinel fix
    pub rejected_origin: u32,
}

impl FilterStats {
    /// Total rejected across all reasons.
    pub fn total_rejected(&self) -> u32 {
        self.rejected_accuracy + self.rejected_confidence + self.rejected_origin
    }

    /// Merge counters from another pass (used for chunked ingestion).
    pub fn merge(&mut self, other: &FilterStats) {
        self.accepted += other.accepted;
        self.rejected_accuracy += other.rejected_accuracy;
        self.rejected_confidence += other.rejected_confidence;
        self.rejected_origin += other.rejected_origin;
    }
}

enum RejectReason {
    Accuracy,
    Confidence,
    Origin,
}

fn rejection_reason(sample: &LocationSample, config: &FilterConfig) -> Option<RejectReason> {
    if let Some(accuracy) = sample.accuracy_m {
        if accuracy > config.max_accuracy_m {
            return Some(RejectReason::Accuracy);
        }
    }
    if let Some(confidence) = sample.mode_confidence {
        if confidence < config.min_mode_confidence {
            return Some(RejectReason::Confidence);
        }
    }
    if sample.latitude.abs() <= config.origin_tolerance_deg
        && sample.longitude.abs() <= config.origin_tolerance_deg
    {
        return Some(RejectReason::Origin);
    }
    None
}

/// Filter a batch of samples, preserving input order.
///
/// Samples with missing accuracy or confidence are not penalized for the
/// missing field; only present values are checked against the thresholds.
pub fn filter_samples(
    samples: Vec<LocationSample>,
    config: &FilterConfig,
) -> (Vec<LocationSample>, FilterStats) {
    let mut stats = FilterStats::default();
    let mut kept = Vec::with_capacity(samples.len());

    for sample in samples {
        match rejection_reason(&sample, config) {
            None => {
                stats.accepted += 1;
                kept.push(sample);
            }
            Some(RejectReason::Accuracy) => stats.rejected_accuracy += 1,
            Some(RejectReason::Confidence) => stats.rejected_confidence += 1,
            Some(RejectReason::Origin) => stats.rejected_origin += 1,
        }
    }

    (kept, stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};

    fn ts() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 4, 8, 0, 0).unwrap()
    }

    fn good_sample() -> LocationSample {
        LocationSample::new(ts(), 47.6062, -122.3321)
    }

    #[test]
    fn test_accepts_clean_sample() {
        let (kept, stats) = filter_samples(vec![good_sample()], &FilterConfig::default());
        assert_eq!(kept.len(), 1);
        assert_eq!(stats.accepted, 1);
        assert_eq!(stats.total_rejected(), 0);
    }

    #[test]
    fn test_missing_optional_fields_pass() {
        // No accuracy, no confidence: nothing to check against
        let (kept, _) = filter_samples(vec![good_sample()], &FilterConfig::default());
        assert_eq!(kept.len(), 1);
    }

    #[test]
    fn test_rejects_poor_accuracy() {
        let bad = good_sample().with_accuracy(250.0);
        let ok = good_sample().with_accuracy(99.0);
        let (kept, stats) = filter_samples(vec![bad, ok], &FilterConfig::default());
        assert_eq!(kept.len(), 1);
        assert_eq!(stats.rejected_accuracy, 1);
    }

    #[test]
    fn test_rejects_low_confidence() {
        let bad = good_sample().with_confidence(30);
        let ok = good_sample().with_confidence(50);
        let (kept, stats) = filter_samples(vec![bad, ok], &FilterConfig::default());
        assert_eq!(kept.len(), 1);
        assert_eq!(stats.rejected_confidence, 1);
    }

    #[test]
    fn test_rejects_origin_sentinel() {
        let sentinel = LocationSample::new(ts(), 0.004, -0.006);
        let (kept, stats) = filter_samples(vec![sentinel], &FilterConfig::default());
        assert!(kept.is_empty());
        assert_eq!(stats.rejected_origin, 1);
    }

    #[test]
    fn test_near_origin_but_outside_tolerance_passes() {
        // Gulf of Guinea, but a real fix more than 0.01 deg from (0,0)
        let sample = LocationSample::new(ts(), 0.5, 0.5);
        let (kept, stats) = filter_samples(vec![sample], &FilterConfig::default());
        assert_eq!(kept.len(), 1);
        assert_eq!(stats.rejected_origin, 0);
    }

    #[test]
    fn test_preserves_order() {
        let a = good_sample().with_velocity(1.0);
        let b = good_sample().with_accuracy(500.0);
        let c = good_sample().with_velocity(3.0);
        let (kept, _) = filter_samples(vec![a, b, c], &FilterConfig::default());
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].velocity_kmh, Some(1.0));
        assert_eq!(kept[1].velocity_kmh, Some(3.0));
    }

    #[test]
    fn test_stats_merge() {
        let mut a = FilterStats {
            accepted: 10,
            rejected_accuracy: 1,
            rejected_confidence: 2,
            rejected_origin: 0,
        };
        let b = FilterStats {
            accepted: 5,
            rejected_accuracy: 0,
            rejected_confidence: 1,
            rejected_origin: 3,
        };
        a.merge(&b);
        assert_eq!(a.accepted, 15);
        assert_eq!(a.total_rejected(), 8);
    }
}
