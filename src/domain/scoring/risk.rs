use crate::domain::market::{Confidence, MarketBias};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RiskDimension {
    #[serde(rename = "Earnings Quality")]
    EarningsQuality,
    #[serde(rename = "Capital Efficiency")]
    CapitalEfficiency,
    #[serde(rename = "Price Structure")]
    PriceStructure,
    #[serde(rename = "Margin Pressure")]
    MarginPressure,
}

impl fmt::Display for RiskDimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RiskDimension::EarningsQuality => write!(f, "Earnings Quality"),
            RiskDimension::CapitalEfficiency => write!(f, "Capital Efficiency"),
            RiskDimension::PriceStructure => write!(f, "Price Structure"),
            RiskDimension::MarginPressure => write!(f, "Margin Pressure"),
        }
    }
}

/// Severity of an active constraint. Low-severity findings are not emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskSeverity {
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskConstraint {
    pub dimension: RiskDimension,
    pub severity: RiskSeverity,
    pub statement: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metric_value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gap: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_margin: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub regime: Option<MarketBias>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<Confidence>,
    pub institutional_note: String,
}

impl RiskConstraint {
    pub(crate) fn new(
        dimension: RiskDimension,
        severity: RiskSeverity,
        statement: String,
        institutional_note: &str,
    ) -> Self {
        Self {
            dimension,
            severity,
            statement,
            metric_value: None,
            threshold: None,
            gap: None,
            current_margin: None,
            regime: None,
            confidence: None,
            institutional_note: institutional_note.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OverallRisk {
    #[serde(rename = "HIGH")]
    High,
    #[serde(rename = "MEDIUM-HIGH")]
    MediumHigh,
    #[serde(rename = "MEDIUM")]
    Medium,
    #[serde(rename = "LOW-MEDIUM")]
    LowMedium,
    #[serde(rename = "LOW")]
    Low,
}

impl fmt::Display for OverallRisk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OverallRisk::High => "HIGH",
            OverallRisk::MediumHigh => "MEDIUM-HIGH",
            OverallRisk::Medium => "MEDIUM",
            OverallRisk::LowMedium => "LOW-MEDIUM",
            OverallRisk::Low => "LOW",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskSummary {
    pub overall_risk: OverallRisk,
    pub constraint_count: usize,
    pub high_severity_count: usize,
    pub medium_severity_count: usize,
    pub summary: String,
}

/// Latest fundamental metrics. Absent values skip their dimension.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct FundamentalSnapshot {
    /// Other income over net income, as a fraction
    #[serde(default)]
    pub other_income_ratio: Option<f64>,
    /// Return on capital employed, in percent
    #[serde(default)]
    pub roce: Option<f64>,
    /// Year over year change of net margin, in percentage points
    #[serde(default)]
    pub net_margin_yoy_delta: Option<f64>,
    #[serde(default)]
    pub net_margin_pct: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dimension_and_overall_serialization() {
        assert_eq!(
            serde_json::to_string(&RiskDimension::EarningsQuality).unwrap(),
            "\"Earnings Quality\""
        );
        assert_eq!(
            serde_json::to_string(&OverallRisk::MediumHigh).unwrap(),
            "\"MEDIUM-HIGH\""
        );
        assert_eq!(RiskDimension::MarginPressure.to_string(), "Margin Pressure");
    }

    #[test]
    fn test_snapshot_fields_default_to_none() {
        let snap: FundamentalSnapshot = serde_json::from_str(r#"{"roce": 12.5}"#).unwrap();
        assert_eq!(snap.roce, Some(12.5));
        assert!(snap.other_income_ratio.is_none());
    }
}
