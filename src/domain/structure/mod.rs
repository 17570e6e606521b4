// Market structure value types
pub mod failed_breakout;
pub mod regime_event;
pub mod state;
pub mod zone;

pub use failed_breakout::{BreakoutDirection, FailedBreakoutEvent, FailureSignals, FailureType};
pub use regime_event::RegimeEvent;
pub use state::{MarketStructureState, StructureDetails, Transition};
pub use zone::{RejectionReason, RejectionTally, Zone, ZoneKind, merge_overlapping};
