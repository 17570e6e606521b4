use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TechnicalGrade {
    #[serde(rename = "Strong Bullish")]
    StrongBullish,
    Bullish,
    Neutral,
    Bearish,
    #[serde(rename = "Strong Bearish")]
    StrongBearish,
}

impl TechnicalGrade {
    pub fn from_score(score: f64) -> Self {
        if score >= 80.0 {
            TechnicalGrade::StrongBullish
        } else if score >= 60.0 {
            TechnicalGrade::Bullish
        } else if score >= 40.0 {
            TechnicalGrade::Neutral
        } else if score >= 20.0 {
            TechnicalGrade::Bearish
        } else {
            TechnicalGrade::StrongBearish
        }
    }
}

impl fmt::Display for TechnicalGrade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TechnicalGrade::StrongBullish => "Strong Bullish",
            TechnicalGrade::Bullish => "Bullish",
            TechnicalGrade::Neutral => "Neutral",
            TechnicalGrade::Bearish => "Bearish",
            TechnicalGrade::StrongBearish => "Strong Bearish",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct TechnicalComponents {
    pub ma_position: f64,
    pub volume: f64,
    pub trend: f64,
    pub momentum: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TechnicalScore {
    pub total_score: f64,
    pub grade: TechnicalGrade,
    pub components: TechnicalComponents,
    pub signals: Vec<String>,
}

impl TechnicalScore {
    /// Neutral placeholder used when the series cannot be scored.
    pub fn unavailable() -> Self {
        Self {
            total_score: 50.0,
            grade: TechnicalGrade::Neutral,
            components: TechnicalComponents::default(),
            signals: vec!["Technical score unavailable for this series".to_string()],
        }
    }
}
