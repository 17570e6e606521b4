// Market data domain
pub mod candle;
pub mod market_regime;
pub mod timeframe;

pub use candle::{Bar, Candle};
pub use market_regime::{Confidence, MarketBias};
pub use timeframe::{Timeframe, TimeframeProfile};
