//! Unified error handling for the trip-analyzer library.
//!
//! Only structural problems are errors: an invalid candidate range or a
//! malformed configuration aborts a run before any work happens. Per-record
//! problems (bad coordinates, teleport jumps, low-quality fixes) are counted
//! in the diagnostics and never fail a run.

use std::fmt;

/// Unified error type for trip-analyzer operations.
#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisError {
    /// A candidate EV range is outside the supported bounds
    InvalidRange {
        range_km: f64,
        max_supported_km: f64,
    },
    /// Configuration value is malformed
    ConfigError { message: String },
    /// Generic internal error
    Internal { message: String },
}

impl fmt::Display for AnalysisError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnalysisError::InvalidRange {
                range_km,
                max_supported_km,
            } => {
                write!(
                    f,
                    "Range {:.0} km is outside the supported interval (0, {:.0}]",
                    range_km, max_supported_km
                )
            }
            AnalysisError::ConfigError { message } => {
                write!(f, "Configuration error: {}", message)
            }
            AnalysisError::Internal { message } => {
                write!(f, "Internal error: {}", message)
            }
        }
    }
}

impl std::error::Error for AnalysisError {}

/// Result type alias for trip-analyzer operations.
pub type Result<T> = std::result::Result<T, AnalysisError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_range_display() {
        let err = AnalysisError::InvalidRange {
            range_km: 1200.0,
            max_supported_km: 1000.0,
        };
        assert!(err.to_string().contains("1200"));
        assert!(err.to_string().contains("1000"));
    }

    #[test]
    fn test_config_error_display() {
        let err = AnalysisError::ConfigError {
            message: "chunk_size must be positive".to_string(),
        };
        assert!(err.to_string().contains("chunk_size"));
    }
}
