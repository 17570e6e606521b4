use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Structural state of price action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MarketBias {
    Accumulation,
    Distribution,
    FailedBreakout,
    Neutral,
}

impl MarketBias {
    pub fn as_str(&self) -> &'static str {
        match self {
            MarketBias::Accumulation => "ACCUMULATION",
            MarketBias::Distribution => "DISTRIBUTION",
            MarketBias::FailedBreakout => "FAILED_BREAKOUT",
            MarketBias::Neutral => "NEUTRAL",
        }
    }
}

impl fmt::Display for MarketBias {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MarketBias::Accumulation => write!(f, "Accumulation"),
            MarketBias::Distribution => write!(f, "Distribution"),
            MarketBias::FailedBreakout => write!(f, "Failed Breakout"),
            MarketBias::Neutral => write!(f, "Neutral"),
        }
    }
}

impl FromStr for MarketBias {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().replace([' ', '-'], "_").as_str() {
            "ACCUMULATION" => Ok(MarketBias::Accumulation),
            "DISTRIBUTION" => Ok(MarketBias::Distribution),
            "FAILED_BREAKOUT" => Ok(MarketBias::FailedBreakout),
            "NEUTRAL" => Ok(MarketBias::Neutral),
            _ => Err(format!("Invalid market bias: '{}'", s)),
        }
    }
}

/// Three-level confidence label shared by zones, events and the arbitrated state.
///
/// Ordering follows strength, so `Confidence::High > Confidence::Low`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
pub enum Confidence {
    #[default]
    Low,
    Medium,
    High,
}

impl Confidence {
    /// Fixed cut points for the zone detectors: >= 6 High, >= 4 Medium.
    pub fn from_zone_score(score: f64) -> Self {
        if score >= 6.0 {
            Confidence::High
        } else if score >= 4.0 {
            Confidence::Medium
        } else {
            Confidence::Low
        }
    }

    /// Failed breakouts are graded on how many of the five failure signals fired.
    pub fn from_signal_count(count: usize) -> Self {
        match count {
            c if c >= 4 => Confidence::High,
            3 => Confidence::Medium,
            _ => Confidence::Low,
        }
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Confidence::Low => write!(f, "Low"),
            Confidence::Medium => write!(f, "Medium"),
            Confidence::High => write!(f, "High"),
        }
    }
}

impl FromStr for Confidence {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "low" => Ok(Confidence::Low),
            "medium" => Ok(Confidence::Medium),
            "high" => Ok(Confidence::High),
            _ => Err(format!("Invalid confidence: '{}'", s)),
        }
    }
}
