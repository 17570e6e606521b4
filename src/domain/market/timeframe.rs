use crate::domain::errors::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Candle interval of the series under analysis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Timeframe {
    #[serde(rename = "5minute")]
    FiveMinute,
    #[serde(rename = "15minute")]
    FifteenMinute,
    Hour,
    #[default]
    Day,
    Week,
}

/// Thresholds that scale with the candle interval.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeframeProfile {
    /// Maximum `(high - low) / mid` of a consolidation window
    pub compression_tolerance: f64,
    /// Minimum bars a zone must span
    pub min_duration: usize,
    /// Bars over which the distribution prior advance is measured
    pub precondition_window: usize,
}

impl Timeframe {
    pub fn profile(&self) -> TimeframeProfile {
        match self {
            Timeframe::Day => TimeframeProfile {
                compression_tolerance: 0.05,
                min_duration: 8,
                precondition_window: 60,
            },
            Timeframe::Week => TimeframeProfile {
                compression_tolerance: 0.12,
                min_duration: 6,
                precondition_window: 30,
            },
            Timeframe::Hour => TimeframeProfile {
                compression_tolerance: 0.05,
                min_duration: 8,
                precondition_window: 60,
            },
            Timeframe::FifteenMinute | Timeframe::FiveMinute => TimeframeProfile {
                compression_tolerance: 0.04,
                min_duration: 8,
                precondition_window: 60,
            },
        }
    }

    /// Parses an interval label, falling back to `fallback` for anything
    /// missing or unknown.
    pub fn from_interval_or(interval: Option<&str>, fallback: Timeframe) -> Self {
        interval
            .and_then(|s| s.parse::<Timeframe>().ok())
            .unwrap_or(fallback)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Timeframe::FiveMinute => "5minute",
            Timeframe::FifteenMinute => "15minute",
            Timeframe::Hour => "hour",
            Timeframe::Day => "day",
            Timeframe::Week => "week",
        }
    }

    /// Human readable duration of `bars` candles on this timeframe.
    pub fn format_duration(&self, bars: usize) -> String {
        match self {
            Timeframe::Day => {
                if bars >= 20 {
                    format!("~{:.1} months", bars as f64 / 20.0)
                } else if bars >= 5 {
                    format!("~{:.1} weeks", bars as f64 / 5.0)
                } else {
                    format!("{} days", bars)
                }
            }
            Timeframe::Week => {
                if bars >= 4 {
                    format!("~{:.1} months", bars as f64 / 4.0)
                } else {
                    format!("{} weeks", bars)
                }
            }
            _ => format!("{} bars", bars),
        }
    }
}

impl FromStr for Timeframe {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "5minute" | "5min" | "5m" => Ok(Timeframe::FiveMinute),
            "15minute" | "15min" | "15m" => Ok(Timeframe::FifteenMinute),
            "hour" | "hourly" | "60minute" | "1h" => Ok(Timeframe::Hour),
            "day" | "daily" | "1d" => Ok(Timeframe::Day),
            "week" | "weekly" | "1w" => Ok(Timeframe::Week),
            _ => Err(ConfigError::UnknownTimeframe(s.to_string())),
        }
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_table() {
        let day = Timeframe::Day.profile();
        assert_eq!(day.compression_tolerance, 0.05);
        assert_eq!(day.min_duration, 8);
        assert_eq!(day.precondition_window, 60);

        let week = Timeframe::Week.profile();
        assert_eq!(week.compression_tolerance, 0.12);
        assert_eq!(week.min_duration, 6);
        assert_eq!(week.precondition_window, 30);

        assert_eq!(Timeframe::Hour.profile().compression_tolerance, 0.05);
        assert_eq!(Timeframe::FifteenMinute.profile().compression_tolerance, 0.04);
        assert_eq!(Timeframe::FiveMinute.profile().compression_tolerance, 0.04);
    }

    #[test]
    fn test_from_str() {
        assert_eq!(Timeframe::from_str("day").unwrap(), Timeframe::Day);
        assert_eq!(Timeframe::from_str("Weekly").unwrap(), Timeframe::Week);
        assert_eq!(Timeframe::from_str("15minute").unwrap(), Timeframe::FifteenMinute);
        assert_eq!(Timeframe::from_str("1h").unwrap(), Timeframe::Hour);
        assert!(Timeframe::from_str("fortnight").is_err());
    }

    #[test]
    fn test_unknown_interval_uses_fallback() {
        let fallback = Timeframe::default();
        assert_eq!(fallback, Timeframe::Day);
        assert_eq!(Timeframe::from_interval_or(Some("month"), fallback), Timeframe::Day);
        assert_eq!(Timeframe::from_interval_or(None, Timeframe::Hour), Timeframe::Hour);
        assert_eq!(Timeframe::from_interval_or(Some("week"), fallback), Timeframe::Week);
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(Timeframe::Day.format_duration(3), "3 days");
        assert_eq!(Timeframe::Day.format_duration(10), "~2.0 weeks");
        assert_eq!(Timeframe::Day.format_duration(50), "~2.5 months");
        assert_eq!(Timeframe::Week.format_duration(2), "2 weeks");
        assert_eq!(Timeframe::Week.format_duration(6), "~1.5 months");
        assert_eq!(Timeframe::Hour.format_duration(7), "7 bars");
    }
}
