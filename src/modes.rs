//! Transport modes and the constant domain tables attached to them.
//!
//! Category membership (motorized vs non-motorized) and per-mode typical
//! speed ranges are immutable domain knowledge: the tables are built once at
//! first use and never mutated. Velocity-based mode inference lives here too,
//! so the mode validator stays a thin per-sample check.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

/// Closed set of transport modes seen in location-history exports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransportMode {
    InVehicle,
    InBus,
    OnMotorcycle,
    Walking,
    Running,
    OnBicycle,
    InTrain,
    InFlight,
    Unknown,
}

/// Mode category used for trip segmentation.
///
/// Only motorized trips count toward driving distance; trains and flights are
/// deliberately non-motorized here since neither is replaceable by a car
/// charge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModeCategory {
    Motorized,
    NonMotorized,
}

/// Typical speed range for a mode, km/h.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpeedRange {
    pub min_kmh: f64,
    pub max_kmh: f64,
}

impl SpeedRange {
    /// Check whether a velocity falls inside the range (inclusive).
    #[inline]
    pub fn contains(&self, kmh: f64) -> bool {
        kmh >= self.min_kmh && kmh <= self.max_kmh
    }
}

/// Typical speed range per mode.
///
/// Motorized modes carry a nonzero minimum: a fix crawling at walking pace
/// with a vehicle label is almost always a labeling error around parking or
/// boarding, and gets reclassified by the validator.
static MODE_SPEED_RANGES: Lazy<HashMap<TransportMode, SpeedRange>> = Lazy::new(|| {
    use TransportMode::*;
    HashMap::from([
        (Walking, SpeedRange { min_kmh: 0.0, max_kmh: 8.0 }),
        (Running, SpeedRange { min_kmh: 3.0, max_kmh: 20.0 }),
        (OnBicycle, SpeedRange { min_kmh: 3.0, max_kmh: 45.0 }),
        (InVehicle, SpeedRange { min_kmh: 5.0, max_kmh: 120.0 }),
        (InBus, SpeedRange { min_kmh: 5.0, max_kmh: 100.0 }),
        (OnMotorcycle, SpeedRange { min_kmh: 5.0, max_kmh: 140.0 }),
        (InTrain, SpeedRange { min_kmh: 20.0, max_kmh: 300.0 }),
        (InFlight, SpeedRange { min_kmh: 100.0, max_kmh: 900.0 }),
        (Unknown, SpeedRange { min_kmh: 0.0, max_kmh: f64::INFINITY }),
    ])
});

/// Vendor export labels to modes. Covers both the legacy activity-recognition
/// labels and the newer semantic-history spellings.
static LABEL_TO_MODE: Lazy<HashMap<&'static str, TransportMode>> = Lazy::new(|| {
    use TransportMode::*;
    HashMap::from([
        ("IN_VEHICLE", InVehicle),
        ("IN_PASSENGER_VEHICLE", InVehicle),
        ("DRIVING", InVehicle),
        ("IN_BUS", InBus),
        ("ON_MOTORCYCLE", OnMotorcycle),
        ("MOTORCYCLING", OnMotorcycle),
        ("WALKING", Walking),
        ("ON_FOOT", Walking),
        ("RUNNING", Running),
        ("ON_BICYCLE", OnBicycle),
        ("CYCLING", OnBicycle),
        ("IN_TRAIN", InTrain),
        ("IN_SUBWAY", InTrain),
        ("IN_TRAM", InTrain),
        ("FLYING", InFlight),
        ("IN_FLIGHT", InFlight),
        ("UNKNOWN", Unknown),
        ("STILL", Unknown),
    ])
});

impl TransportMode {
    /// All modes, for iteration in tests and sweeps.
    pub const ALL: [TransportMode; 9] = [
        TransportMode::InVehicle,
        TransportMode::InBus,
        TransportMode::OnMotorcycle,
        TransportMode::Walking,
        TransportMode::Running,
        TransportMode::OnBicycle,
        TransportMode::InTrain,
        TransportMode::InFlight,
        TransportMode::Unknown,
    ];

    /// Category of this mode. The variant set is closed, so this is a plain
    /// match rather than a runtime table.
    pub fn category(self) -> ModeCategory {
        match self {
            TransportMode::InVehicle | TransportMode::InBus | TransportMode::OnMotorcycle => {
                ModeCategory::Motorized
            }
            TransportMode::Walking
            | TransportMode::Running
            | TransportMode::OnBicycle
            | TransportMode::InTrain
            | TransportMode::InFlight
            | TransportMode::Unknown => ModeCategory::NonMotorized,
        }
    }

    /// Shorthand for `category() == Motorized`.
    #[inline]
    pub fn is_motorized(self) -> bool {
        self.category() == ModeCategory::Motorized
    }

    /// Typical speed range for this mode.
    pub fn speed_range(self) -> SpeedRange {
        MODE_SPEED_RANGES[&self]
    }

    /// Check whether a velocity is plausible for this mode.
    #[inline]
    pub fn is_speed_plausible(self, kmh: f64) -> bool {
        self.speed_range().contains(kmh)
    }

    /// Map a vendor export label to a mode, if recognized.
    pub fn from_label(label: &str) -> Option<TransportMode> {
        LABEL_TO_MODE.get(label.to_ascii_uppercase().as_str()).copied()
    }
}

impl Default for TransportMode {
    fn default() -> Self {
        TransportMode::Unknown
    }
}

impl fmt::Display for TransportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TransportMode::InVehicle => "InVehicle",
            TransportMode::InBus => "InBus",
            TransportMode::OnMotorcycle => "OnMotorcycle",
            TransportMode::Walking => "Walking",
            TransportMode::Running => "Running",
            TransportMode::OnBicycle => "OnBicycle",
            TransportMode::InTrain => "InTrain",
            TransportMode::InFlight => "InFlight",
            TransportMode::Unknown => "Unknown",
        };
        f.write_str(name)
    }
}

impl FromStr for TransportMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        TransportMode::from_label(s).ok_or_else(|| format!("unrecognized transport mode '{}'", s))
    }
}

/// Infer a mode from velocity alone, using coarse speed buckets.
///
/// Used when the declared mode fails the plausibility check.
pub fn infer_mode_from_speed(kmh: f64) -> TransportMode {
    if kmh < 8.0 {
        TransportMode::Walking
    } else if kmh < 25.0 {
        TransportMode::OnBicycle
    } else if kmh < 120.0 {
        TransportMode::InVehicle
    } else {
        TransportMode::InFlight
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_partition() {
        let motorized: Vec<_> = TransportMode::ALL
            .iter()
            .filter(|m| m.is_motorized())
            .collect();
        assert_eq!(
            motorized,
            vec![
                &TransportMode::InVehicle,
                &TransportMode::InBus,
                &TransportMode::OnMotorcycle
            ]
        );
        assert_eq!(TransportMode::InTrain.category(), ModeCategory::NonMotorized);
        assert_eq!(TransportMode::Unknown.category(), ModeCategory::NonMotorized);
    }

    #[test]
    fn test_speed_range_table_covers_all_modes() {
        for mode in TransportMode::ALL {
            let range = mode.speed_range();
            assert!(range.min_kmh >= 0.0);
            assert!(range.max_kmh > range.min_kmh);
        }
    }

    #[test]
    fn test_speed_plausibility() {
        assert!(TransportMode::Walking.is_speed_plausible(4.0));
        assert!(!TransportMode::Walking.is_speed_plausible(30.0));
        assert!(TransportMode::InVehicle.is_speed_plausible(66.0));
        assert!(!TransportMode::InVehicle.is_speed_plausible(3.0));
        assert!(TransportMode::InFlight.is_speed_plausible(800.0));
        assert!(!TransportMode::InFlight.is_speed_plausible(50.0));
        // Unknown accepts anything
        assert!(TransportMode::Unknown.is_speed_plausible(500.0));
    }

    #[test]
    fn test_infer_mode_buckets() {
        assert_eq!(infer_mode_from_speed(3.0), TransportMode::Walking);
        assert_eq!(infer_mode_from_speed(15.0), TransportMode::OnBicycle);
        assert_eq!(infer_mode_from_speed(80.0), TransportMode::InVehicle);
        assert_eq!(infer_mode_from_speed(400.0), TransportMode::InFlight);
        // Bucket edges
        assert_eq!(infer_mode_from_speed(7.99), TransportMode::Walking);
        assert_eq!(infer_mode_from_speed(8.0), TransportMode::OnBicycle);
        assert_eq!(infer_mode_from_speed(120.0), TransportMode::InFlight);
    }

    #[test]
    fn test_label_mapping() {
        assert_eq!(
            TransportMode::from_label("IN_VEHICLE"),
            Some(TransportMode::InVehicle)
        );
        assert_eq!(
            TransportMode::from_label("in_passenger_vehicle"),
            Some(TransportMode::InVehicle)
        );
        assert_eq!(
            TransportMode::from_label("CYCLING"),
            Some(TransportMode::OnBicycle)
        );
        assert_eq!(TransportMode::from_label("WARP_DRIVE"), None);
    }

    #[test]
    fn test_from_str() {
        assert_eq!(
            "WALKING".parse::<TransportMode>().unwrap(),
            TransportMode::Walking
        );
        assert!("bogus".parse::<TransportMode>().is_err());
    }
}
