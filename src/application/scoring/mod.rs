// Downstream scorers fed by the market structure classification
pub mod composite;
pub mod confluence;
pub mod regime_stability;
pub mod risk_constraints;
pub mod technical_score;

pub use composite::CompositeScorer;
pub use confluence::ConfluenceMatrix;
pub use regime_stability::RegimeStabilityScorer;
pub use risk_constraints::RiskConstraintAssessor;
pub use technical_score::TechnicalScorer;
