//! Technical x fundamental confluence matrix.

use crate::domain::market::MarketBias;
use crate::domain::scoring::{
    ConfluenceCell, ConfluenceConfidence, ConfluenceState, FundamentalRegime, RiskLevel,
};
use std::fmt::Write;
use tracing::debug;

const UNKNOWN: &str = "UNKNOWN";

const FALLBACK: ConfluenceCell = ConfluenceCell {
    label: "Indecision",
    confidence: ConfluenceConfidence::Low,
    explanation: "Insufficient data to determine confluence state",
    risk_level: RiskLevel::Medium,
    institutional_note: "Awaiting clear regime signals",
};

const TECHNICAL_ROWS: [MarketBias; 4] = [
    MarketBias::Accumulation,
    MarketBias::Neutral,
    MarketBias::Distribution,
    MarketBias::FailedBreakout,
];

const FUNDAMENTAL_COLUMNS: [FundamentalRegime; 3] = [
    FundamentalRegime::Strong,
    FundamentalRegime::Neutral,
    FundamentalRegime::Weak,
];

pub struct ConfluenceMatrix;

impl ConfluenceMatrix {
    /// Looks up a pair of regime labels. Unrecognised labels yield the
    /// Indecision fallback with both regimes reported as `UNKNOWN`.
    pub fn state(technical: &str, fundamental: &str) -> ConfluenceState {
        let tech = technical.parse::<MarketBias>();
        let funda = fundamental.parse::<FundamentalRegime>();
        match (tech, funda) {
            (Ok(tech), Ok(funda)) => Self::state_for(tech, funda),
            _ => {
                debug!(
                    "Confluence fallback for technical '{}' / fundamental '{}'",
                    technical, fundamental
                );
                ConfluenceState::from_cell(&FALLBACK, UNKNOWN, UNKNOWN)
            }
        }
    }

    pub fn state_for(technical: MarketBias, fundamental: FundamentalRegime) -> ConfluenceState {
        ConfluenceState::from_cell(
            &Self::cell(technical, fundamental),
            technical.as_str(),
            fundamental.as_str(),
        )
    }

    pub fn cell(technical: MarketBias, fundamental: FundamentalRegime) -> ConfluenceCell {
        use ConfluenceConfidence as C;
        use FundamentalRegime as F;
        use MarketBias as T;

        match (technical, fundamental) {
            (T::Accumulation, F::Strong) => ConfluenceCell {
                label: "Aligned Strength",
                confidence: C::High,
                explanation: "Price accumulation supported by strong fundamental momentum; both price and business confirm strength",
                risk_level: RiskLevel::Low,
                institutional_note: "High-conviction setup with technical and fundamental confirmation",
            },
            (T::Accumulation, F::Neutral) => ConfluenceCell {
                label: "Early Opportunity",
                confidence: C::Medium,
                explanation: "Technical strength ahead of fundamental confirmation; price may be anticipating improvement",
                risk_level: RiskLevel::Medium,
                institutional_note: "Monitor for fundamental inflection to validate technical positioning",
            },
            (T::Accumulation, F::Weak) => ConfluenceCell {
                label: "Structural Risk",
                confidence: C::Low,
                explanation: "Price accumulation despite weak business fundamentals; technical strength lacks fundamental support",
                risk_level: RiskLevel::High,
                institutional_note: "Elevated risk of failed breakout if fundamentals do not improve",
            },
            (T::Neutral, F::Strong) => ConfluenceCell {
                label: "Fundamentals Leading",
                confidence: C::Medium,
                explanation: "Strong fundamentals not yet reflected in price action; potential value opportunity",
                risk_level: RiskLevel::Medium,
                institutional_note: "Watch for technical confirmation to validate fundamental strength",
            },
            (T::Neutral, F::Neutral) => ConfluenceCell {
                label: "Indecision",
                confidence: C::Low,
                explanation: "Both price and fundamentals lack clear direction; awaiting catalyst",
                risk_level: RiskLevel::Medium,
                institutional_note: "Low conviction environment; wait for regime clarity",
            },
            (T::Neutral, F::Weak) => ConfluenceCell {
                label: "Drift Risk",
                confidence: C::Low,
                explanation: "Weak fundamental momentum combined with non-directional price behavior increases probability of downside resolution",
                risk_level: RiskLevel::High,
                institutional_note: "Vulnerable to distribution if fundamentals deteriorate further",
            },
            (T::Distribution, F::Strong) => ConfluenceCell {
                label: "Valuation Risk",
                confidence: C::Medium,
                explanation: "Price distribution despite strong fundamentals; potential overvaluation or profit-taking",
                risk_level: RiskLevel::Medium,
                institutional_note: "Monitor for fundamental deterioration or technical stabilization",
            },
            (T::Distribution, F::Neutral) => ConfluenceCell {
                label: "Exhaustion",
                confidence: C::Medium,
                explanation: "Price distribution with neutral fundamentals; momentum fading without fundamental catalyst",
                risk_level: RiskLevel::High,
                institutional_note: "Risk of downside acceleration if fundamentals weaken",
            },
            (T::Distribution, F::Weak) => ConfluenceCell {
                label: "Aligned Weakness",
                confidence: C::High,
                explanation: "Price distribution confirmed by weak fundamentals; both price and business show deterioration",
                risk_level: RiskLevel::High,
                institutional_note: "High-conviction bearish setup with technical and fundamental confirmation",
            },
            (T::FailedBreakout, F::Strong) => ConfluenceCell {
                label: "Technical Failure",
                confidence: C::Low,
                explanation: "Failed breakout despite strong fundamentals; price unable to sustain momentum",
                risk_level: RiskLevel::Medium,
                institutional_note: "Reassess if fundamentals can drive renewed technical strength",
            },
            (T::FailedBreakout, F::Neutral) => ConfluenceCell {
                label: "Momentum Loss",
                confidence: C::Low,
                explanation: "Failed breakout with neutral fundamentals; lack of conviction on both fronts",
                risk_level: RiskLevel::High,
                institutional_note: "High risk of further deterioration without catalyst",
            },
            (T::FailedBreakout, F::Weak) => ConfluenceCell {
                label: "Confirmed Breakdown",
                confidence: C::High,
                explanation: "Failed breakout confirmed by weak fundamentals; technical and fundamental deterioration aligned",
                risk_level: RiskLevel::High,
                institutional_note: "Avoid until both technical and fundamental regimes stabilize",
            },
        }
    }

    /// Plain-text table of every cell, for documentation.
    pub fn render() -> String {
        let rule = "=".repeat(80);
        let thin = "-".repeat(80);
        let mut out = format!("Tech-Fundamental Confluence Matrix\n{}\n", rule);

        for tech in TECHNICAL_ROWS {
            let _ = write!(out, "\n{}:\n{}\n", tech.as_str(), thin);
            for funda in FUNDAMENTAL_COLUMNS {
                let cell = Self::cell(tech, funda);
                let _ = writeln!(
                    out,
                    "  x {:8} -> {:20} [{:6}] Risk: {}",
                    funda.as_str(),
                    cell.label,
                    cell.confidence.to_string(),
                    cell.risk_level
                );
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aligned_strength() {
        let state = ConfluenceMatrix::state("ACCUMULATION", "STRONG");
        assert_eq!(state.state, "Aligned Strength");
        assert_eq!(state.risk_level, RiskLevel::Low);
        assert_eq!(state.confidence, ConfluenceConfidence::High);
        assert_eq!(state.technical_regime, "ACCUMULATION");
    }

    #[test]
    fn test_labels_are_case_insensitive() {
        let state = ConfluenceMatrix::state("failed_breakout", "weak");
        assert_eq!(state.state, "Confirmed Breakdown");
        assert_eq!(state.fundamental_regime, "WEAK");
    }

    #[test]
    fn test_unknown_inputs_fall_back() {
        let state = ConfluenceMatrix::state("SIDEWAYS", "STRONG");
        assert_eq!(state.state, "Indecision");
        assert_eq!(state.confidence, ConfluenceConfidence::Low);
        assert_eq!(state.risk_level, RiskLevel::Medium);
        assert_eq!(state.technical_regime, "UNKNOWN");
        assert_eq!(state.fundamental_regime, "UNKNOWN");
    }

    #[test]
    fn test_every_cell_is_distinct() {
        let mut labels: Vec<&str> = TECHNICAL_ROWS
            .iter()
            .flat_map(|t| FUNDAMENTAL_COLUMNS.iter().map(|f| ConfluenceMatrix::cell(*t, *f).label))
            .collect();
        labels.sort_unstable();
        labels.dedup();
        assert_eq!(labels.len(), 12);
    }

    #[test]
    fn test_render_lists_all_rows() {
        let text = ConfluenceMatrix::render();
        assert!(text.starts_with("Tech-Fundamental Confluence Matrix"));
        assert!(text.contains("FAILED_BREAKOUT:"));
        assert!(text.contains("Confirmed Breakdown"));
        assert_eq!(text.matches("Risk:").count(), 12);
    }
}
