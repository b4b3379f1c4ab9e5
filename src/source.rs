// =============================================================================
// Market source — the collaborator seam the pipeline consumes
// =============================================================================
//
// The pipeline only needs four operations from an exchange. `BinanceClient`
// is the production implementation; tests use the in-memory mock below.
// =============================================================================

use async_trait::async_trait;

use crate::error::ScanResult;
use crate::market_data::Candle;
use crate::types::{OrderBook, Symbol};

/// Read-only market data operations.
#[async_trait]
pub trait MarketSource: Send + Sync + 'static {
    /// No-op liveness check, performed once before any other call.
    async fn ping(&self) -> ScanResult<()>;

    /// Every symbol the exchange lists, in listing order.
    async fn list_symbols(&self) -> ScanResult<Vec<Symbol>>;

    /// Candles for `symbol` between `start_ms` and `end_ms`, oldest first.
    async fn candles(
        &self,
        symbol: &str,
        interval: &str,
        start_ms: i64,
        end_ms: i64,
    ) -> ScanResult<Vec<Candle>>;

    /// Order-book depth for `symbol`; `limit` must already be a supported tier.
    async fn order_book(&self, symbol: &str, limit: u32) -> ScanResult<OrderBook>;
}
