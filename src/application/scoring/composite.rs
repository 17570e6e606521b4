use crate::application::market_data::indicators::round_to;
use crate::domain::scoring::{Attribution, Breakdown, CompositeBand, CompositeScore, CompositeWeights};

/// Weighted blend of technical, fundamental and stability scores.
///
/// A ranking aid, not a recommendation.
#[derive(Debug, Clone, Copy, Default)]
pub struct CompositeScorer {
    weights: CompositeWeights,
}

impl CompositeScorer {
    pub fn new(weights: CompositeWeights) -> Self {
        Self { weights }
    }

    pub fn score(&self, technical: f64, fundamental: f64, stability: f64) -> CompositeScore {
        let clamp = |v: f64| if v.is_finite() { v.clamp(0.0, 100.0) } else { 0.0 };
        let (technical, fundamental, stability) = (clamp(technical), clamp(fundamental), clamp(stability));

        let w = self.weights;
        let contributions = [
            technical * w.technical,
            fundamental * w.fundamental,
            stability * w.stability,
        ];
        let total: f64 = contributions.iter().sum();
        let pct = |c: f64| if total > 0.0 { round_to(c / total * 100.0, 1) } else { 0.0 };

        let band = CompositeBand::from_value(total);
        CompositeScore {
            value: round_to(total, 1),
            band,
            band_description: band.description().to_string(),
            attribution: Attribution {
                technical: round_to(technical, 1),
                fundamental: round_to(fundamental, 1),
                stability: round_to(stability, 1),
            },
            breakdown: Breakdown {
                technical_pct: pct(contributions[0]),
                fundamental_pct: pct(contributions[1]),
                stability_pct: pct(contributions[2]),
            },
            weights: w,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_marks_are_strong() {
        let score = CompositeScorer::default().score(100.0, 100.0, 100.0);
        assert_eq!(score.value, 100.0);
        assert_eq!(score.band, CompositeBand::Strong);
        assert_eq!(score.breakdown.technical_pct, 40.0);
        assert_eq!(score.breakdown.stability_pct, 20.0);
    }

    #[test]
    fn test_midpoint_is_neutral() {
        let score = CompositeScorer::default().score(50.0, 50.0, 50.0);
        assert!((45.0..=55.0).contains(&score.value));
        assert_eq!(score.band, CompositeBand::Neutral);
        assert_eq!(
            score.band_description,
            "Mixed signals or transitional state; monitor for regime clarity"
        );
    }

    #[test]
    fn test_inputs_are_clamped() {
        let score = CompositeScorer::default().score(150.0, -20.0, f64::NAN);
        assert_eq!(score.attribution.technical, 100.0);
        assert_eq!(score.attribution.fundamental, 0.0);
        assert_eq!(score.attribution.stability, 0.0);
        assert_eq!(score.value, 40.0);
        assert_eq!(score.breakdown.technical_pct, 100.0);
    }

    #[test]
    fn test_all_zero_has_no_breakdown() {
        let score = CompositeScorer::default().score(0.0, 0.0, 0.0);
        assert_eq!(score.band, CompositeBand::Weak);
        assert_eq!(score.breakdown.technical_pct, 0.0);
        assert_eq!(score.breakdown.fundamental_pct, 0.0);
    }
}
