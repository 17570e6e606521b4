// Scoring value types
pub mod composite;
pub mod confluence;
pub mod risk;
pub mod stability;
pub mod technical;

pub use composite::{Attribution, Breakdown, CompositeBand, CompositeScore, CompositeWeights};
pub use confluence::{
    ConfluenceCell, ConfluenceConfidence, ConfluenceState, FundamentalRegime, RiskLevel,
};
pub use risk::{
    FundamentalSnapshot, OverallRisk, RiskConstraint, RiskDimension, RiskSeverity, RiskSummary,
};
pub use stability::{FundamentalQuarter, FundamentalStability, StabilityMetrics};
pub use technical::{TechnicalComponents, TechnicalGrade, TechnicalScore};
