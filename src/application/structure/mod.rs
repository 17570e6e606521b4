// Arbitration of detector output and regime history stitching
pub mod arbitrator;
pub mod regime_history;

pub use arbitrator::{DetectedStructures, MarketStructureService, arbitrate, resolve_bias};
pub use regime_history::{RegimeHistoryStitcher, RegimeSlice};
