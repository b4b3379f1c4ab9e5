pub mod candles;
pub mod catalog;
pub mod orderbook;
pub mod pool;

// Re-export the Candle struct for convenient access (e.g. `use crate::market_data::Candle`).
pub use candles::{Candle, CandleFetcher, CandleWindow};
pub use catalog::SymbolCatalog;
pub use orderbook::{normalize_depth, OrderBookFetcher, DEPTH_TIERS};
pub use pool::{Gathered, WorkerPool, DEFAULT_WORKERS};
