// Pattern detectors over a validated candle series
pub mod accumulation;
pub mod distribution;
pub mod failed_breakout;
pub mod traits;

pub use accumulation::AccumulationDetector;
pub use distribution::DistributionDetector;
pub use failed_breakout::FailedBreakoutDetector;
pub use traits::{DetectionContext, StructureDetector, WindowBudget};
