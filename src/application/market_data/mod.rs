// Market data processing modules
pub mod candle_normalizer;
pub mod candle_series;
pub mod indicators;

pub use candle_normalizer::{CandleNormalizer, OhlcPayload};
pub use candle_series::CandleSeries;
pub use indicators::IndicatorSnapshot;
