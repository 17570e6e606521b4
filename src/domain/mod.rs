// Market data domain
pub mod market;

// Zones, failed breakouts and arbitrated structure state
pub mod structure;

// Stability, composite, confluence and risk value types
pub mod scoring;

// Domain-specific error types
pub mod errors;
