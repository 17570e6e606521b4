use chrono::{DateTime, Utc};
use thiserror::Error;

/// Runtime failures raised while scanning a candle series.
///
/// Callers that only need a "signal or no signal" answer go through
/// `StructureDetector::detect_or_empty`, which logs these and degrades to an
/// empty result.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DetectionError {
    #[error("Candle series is not chronological at index {index}: {previous} >= {current}")]
    NotChronological {
        index: usize,
        previous: DateTime<Utc>,
        current: DateTime<Utc>,
    },

    #[error("{detector} exceeded its window evaluation budget of {budget}")]
    IterationBudgetExceeded { detector: &'static str, budget: usize },

    #[error("Regime history is empty for a series of {candles} candles")]
    EmptyHistory { candles: usize },

    #[error("Regime history covers {covered} candles but the series has {candles}")]
    HistoryCoverage { covered: usize, candles: usize },
}

/// Invalid engine configuration. These are programmer errors and are raised
/// when a detector or the engine is constructed, never mid-evaluation.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("{field} must be positive, got {value}")]
    NonPositive { field: &'static str, value: f64 },

    #[error("Duration band inverted: min_duration {min} > max_duration {max}")]
    InvertedDurationBand { min: usize, max: usize },

    #[error("{field} must lie in [0, 1], got {value}")]
    OutOfUnitRange { field: &'static str, value: f64 },

    #[error("Unknown timeframe: '{0}'. Valid options: 5minute, 15minute, hour, day, week")]
    UnknownTimeframe(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detection_error_formatting() {
        let error = DetectionError::IterationBudgetExceeded {
            detector: "accumulation",
            budget: 500,
        };

        let msg = error.to_string();
        assert!(msg.contains("accumulation"));
        assert!(msg.contains("500"));
    }

    #[test]
    fn test_config_error_formatting() {
        let error = ConfigError::InvertedDurationBand { min: 20, max: 8 };
        let msg = error.to_string();
        assert!(msg.contains("20"));
        assert!(msg.contains("8"));

        let error = ConfigError::NonPositive {
            field: "min_duration",
            value: 0.0,
        };
        assert!(error.to_string().starts_with("min_duration"));
    }
}
