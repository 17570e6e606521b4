use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CompositeBand {
    Strong,
    Neutral,
    Weak,
}

impl CompositeBand {
    /// >= 70 Strong, >= 40 Neutral, otherwise Weak.
    pub fn from_value(value: f64) -> Self {
        if value >= 70.0 {
            CompositeBand::Strong
        } else if value >= 40.0 {
            CompositeBand::Neutral
        } else {
            CompositeBand::Weak
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            CompositeBand::Strong => {
                "High-conviction regime with sustained strength across multiple dimensions"
            }
            CompositeBand::Neutral => {
                "Mixed signals or transitional state; monitor for regime clarity"
            }
            CompositeBand::Weak => {
                "Deteriorating conditions across technical and fundamental factors"
            }
        }
    }
}

impl fmt::Display for CompositeBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompositeBand::Strong => write!(f, "STRONG"),
            CompositeBand::Neutral => write!(f, "NEUTRAL"),
            CompositeBand::Weak => write!(f, "WEAK"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CompositeWeights {
    pub technical: f64,
    pub fundamental: f64,
    pub stability: f64,
}

impl Default for CompositeWeights {
    fn default() -> Self {
        Self {
            technical: 0.40,
            fundamental: 0.40,
            stability: 0.20,
        }
    }
}

/// Clamped inputs, rounded to one decimal.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Attribution {
    pub technical: f64,
    pub fundamental: f64,
    pub stability: f64,
}

/// Percentage share of each weighted factor in the total.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Breakdown {
    pub technical_pct: f64,
    pub fundamental_pct: f64,
    pub stability_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositeScore {
    pub value: f64,
    pub band: CompositeBand,
    pub band_description: String,
    pub attribution: Attribution,
    pub breakdown: Breakdown,
    pub weights: CompositeWeights,
}
