// Candle normalization, series validation and indicator math
pub mod market_data;

// Accumulation, distribution and failed breakout detectors
pub mod detectors;

// Arbitration and regime history
pub mod structure;

// Stability, composite, confluence, risk and technical scorers
pub mod scoring;

// Decision bundle orchestration
pub mod decision;
