// =============================================================================
// Analytics — pure reductions over fetched market data
// =============================================================================
//
//   1. Ranker             orders symbols by their best candle's metric
//   2. NotionalCalculator Σ price × quantity over a book prefix
//   3. SpreadTracker      spread per symbol and its change since last cycle

pub mod notional;
pub mod ranker;
pub mod spread;

pub use notional::{NotionalCalculator, NotionalRecord};
pub use ranker::{RankedSymbol, Ranker};
pub use spread::{SpreadRecord, SpreadTracker};
