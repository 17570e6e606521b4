use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Fundamental regime as classified outside this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FundamentalRegime {
    Strong,
    #[default]
    Neutral,
    Weak,
}

impl FundamentalRegime {
    pub fn as_str(&self) -> &'static str {
        match self {
            FundamentalRegime::Strong => "STRONG",
            FundamentalRegime::Neutral => "NEUTRAL",
            FundamentalRegime::Weak => "WEAK",
        }
    }
}

impl fmt::Display for FundamentalRegime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for FundamentalRegime {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "STRONG" => Ok(FundamentalRegime::Strong),
            "NEUTRAL" => Ok(FundamentalRegime::Neutral),
            "WEAK" => Ok(FundamentalRegime::Weak),
            _ => Err(format!("Invalid fundamental regime: '{}'", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConfluenceConfidence {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl fmt::Display for ConfluenceConfidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfluenceConfidence::High => write!(f, "HIGH"),
            ConfluenceConfidence::Medium => write!(f, "MEDIUM"),
            ConfluenceConfidence::Low => write!(f, "LOW"),
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RiskLevel::Low => write!(f, "LOW"),
            RiskLevel::Medium => write!(f, "MEDIUM"),
            RiskLevel::High => write!(f, "HIGH"),
        }
    }
}

/// One cell of the technical x fundamental matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfluenceCell {
    pub label: &'static str,
    pub confidence: ConfluenceConfidence,
    pub explanation: &'static str,
    pub risk_level: RiskLevel,
    pub institutional_note: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfluenceState {
    pub state: String,
    pub confidence: ConfluenceConfidence,
    pub explanation: String,
    pub institutional_note: String,
    pub risk_level: RiskLevel,
    /// Parsed technical regime, `UNKNOWN` when the input was not recognised
    pub technical_regime: String,
    pub fundamental_regime: String,
}

impl ConfluenceState {
    pub(crate) fn from_cell(cell: &ConfluenceCell, technical: &str, fundamental: &str) -> Self {
        Self {
            state: cell.label.to_string(),
            confidence: cell.confidence,
            explanation: cell.explanation.to_string(),
            institutional_note: cell.institutional_note.to_string(),
            risk_level: cell.risk_level,
            technical_regime: technical.to_string(),
            fundamental_regime: fundamental.to_string(),
        }
    }
}
