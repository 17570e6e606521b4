//! Risk constraint assessment.
//!
//! Four independent checks, each producing at most one constraint. Missing
//! fundamental metrics skip their check rather than being read as zero.

use crate::application::market_data::indicators::round_to;
use crate::domain::market::{Confidence, MarketBias};
use crate::domain::scoring::{
    FundamentalSnapshot, OverallRisk, RiskConstraint, RiskDimension, RiskSeverity, RiskSummary,
};

/// Other income share of net profit, in percent.
const OTHER_INCOME_MEDIUM_PCT: f64 = 15.0;
const OTHER_INCOME_HIGH_PCT: f64 = 30.0;
/// ROCE benchmark, in percent.
const COST_OF_CAPITAL_PCT: f64 = 14.0;
const ROCE_HIGH_BELOW_PCT: f64 = 10.0;
/// YoY net margin change, in percentage points.
const MARGIN_MEDIUM_DELTA: f64 = -0.5;
const MARGIN_HIGH_DELTA: f64 = -1.0;

pub struct RiskConstraintAssessor;

impl RiskConstraintAssessor {
    pub fn assess(
        fundamentals: &FundamentalSnapshot,
        regime: MarketBias,
        confidence: Confidence,
    ) -> Vec<RiskConstraint> {
        [
            fundamentals.other_income_ratio.and_then(Self::earnings_quality),
            fundamentals.roce.and_then(Self::capital_efficiency),
            Self::price_structure(regime, confidence),
            fundamentals
                .net_margin_yoy_delta
                .and_then(|delta| Self::margin_pressure(delta, fundamentals.net_margin_pct)),
        ]
        .into_iter()
        .flatten()
        .collect()
    }

    pub fn earnings_quality(other_income_ratio: f64) -> Option<RiskConstraint> {
        let pct = other_income_ratio * 100.0;
        if !pct.is_finite() || pct < OTHER_INCOME_MEDIUM_PCT {
            return None;
        }

        let (severity, statement) = if pct >= OTHER_INCOME_HIGH_PCT {
            (
                RiskSeverity::High,
                format!(
                    "Other income at {:.1}% of net profit indicates weak core earnings quality",
                    pct
                ),
            )
        } else {
            (
                RiskSeverity::Medium,
                format!(
                    "Other income at {:.1}% of net profit warrants monitoring for earnings sustainability",
                    pct
                ),
            )
        };

        Some(RiskConstraint {
            metric_value: Some(round_to(pct, 1)),
            threshold: Some(OTHER_INCOME_MEDIUM_PCT),
            ..RiskConstraint::new(
                RiskDimension::EarningsQuality,
                severity,
                statement,
                "High non-operating income dependency reduces earnings predictability",
            )
        })
    }

    pub fn capital_efficiency(roce: f64) -> Option<RiskConstraint> {
        if !roce.is_finite() || roce >= COST_OF_CAPITAL_PCT {
            return None;
        }

        let (severity, statement) = if roce < ROCE_HIGH_BELOW_PCT {
            (
                RiskSeverity::High,
                format!(
                    "ROCE at {:.1}% significantly below cost of capital ({:.1}%), destroying shareholder value",
                    roce, COST_OF_CAPITAL_PCT
                ),
            )
        } else {
            (
                RiskSeverity::Medium,
                format!(
                    "ROCE at {:.1}% below cost of capital ({:.1}%), limiting valuation expansion",
                    roce, COST_OF_CAPITAL_PCT
                ),
            )
        };

        Some(RiskConstraint {
            metric_value: Some(round_to(roce, 1)),
            threshold: Some(COST_OF_CAPITAL_PCT),
            gap: Some(round_to(COST_OF_CAPITAL_PCT - roce, 1)),
            ..RiskConstraint::new(
                RiskDimension::CapitalEfficiency,
                severity,
                statement,
                "Returns below cost of capital constrain sustainable growth and valuation multiples",
            )
        })
    }

    pub fn price_structure(regime: MarketBias, confidence: Confidence) -> Option<RiskConstraint> {
        let (severity, statement, note) = match (regime, confidence) {
            (MarketBias::Distribution, _) => (
                RiskSeverity::High,
                "Price in distribution phase indicates institutional selling and downside risk",
                "Distribution regimes often precede sustained declines",
            ),
            (MarketBias::FailedBreakout, _) => (
                RiskSeverity::High,
                "Failed breakout signals momentum exhaustion and elevated downside risk",
                "Failed breakouts frequently lead to reversion or further deterioration",
            ),
            (MarketBias::Neutral, Confidence::Low) => (
                RiskSeverity::Medium,
                "Indecisive price action with low conviction increases directional uncertainty",
                "Low-conviction environments vulnerable to sudden regime shifts",
            ),
            _ => return None,
        };

        Some(RiskConstraint {
            regime: Some(regime),
            confidence: Some(confidence),
            ..RiskConstraint::new(
                RiskDimension::PriceStructure,
                severity,
                statement.to_string(),
                note,
            )
        })
    }

    pub fn margin_pressure(delta: f64, current_margin: Option<f64>) -> Option<RiskConstraint> {
        if !delta.is_finite() || delta >= MARGIN_MEDIUM_DELTA {
            return None;
        }

        let (severity, statement) = if delta <= MARGIN_HIGH_DELTA {
            (
                RiskSeverity::High,
                format!(
                    "Net margin contracted {:.1}% YoY, indicating severe profitability pressure",
                    delta.abs()
                ),
            )
        } else {
            (
                RiskSeverity::Medium,
                format!(
                    "Net margin contracted {:.1}% YoY, warranting monitoring for sustained pressure",
                    delta.abs()
                ),
            )
        };

        Some(RiskConstraint {
            metric_value: Some(round_to(delta, 2)),
            current_margin: current_margin.map(|m| round_to(m, 1)),
            ..RiskConstraint::new(
                RiskDimension::MarginPressure,
                severity,
                statement,
                "Margin compression threatens earnings growth and return on capital",
            )
        })
    }

    pub fn summary(constraints: &[RiskConstraint]) -> RiskSummary {
        let high = constraints
            .iter()
            .filter(|c| c.severity == RiskSeverity::High)
            .count();
        let medium = constraints
            .iter()
            .filter(|c| c.severity == RiskSeverity::Medium)
            .count();

        let (overall_risk, summary) = if constraints.is_empty() {
            (OverallRisk::Low, "No significant risk constraints identified")
        } else if high >= 2 {
            (
                OverallRisk::High,
                "Multiple material risk constraints identified; elevated risk environment warrants caution",
            )
        } else if high == 1 {
            (
                OverallRisk::MediumHigh,
                "Material risk constraint identified; active monitoring warranted",
            )
        } else if medium >= 2 {
            (
                OverallRisk::Medium,
                "Multiple medium-severity constraints; cautious approach warranted",
            )
        } else {
            (
                OverallRisk::LowMedium,
                "Limited constraints; manageable risk profile",
            )
        };

        RiskSummary {
            overall_risk,
            constraint_count: constraints.len(),
            high_severity_count: high,
            medium_severity_count: medium,
            summary: summary.to_string(),
        }
    }
}
