// =============================================================================
// Order Book Fetcher — depth snapshots for the ranked subset
// =============================================================================

use std::sync::Arc;

use tracing::{debug, info, instrument};

use crate::error::{ScanError, ScanResult};
use crate::market_data::pool::{Gathered, WorkerPool};
use crate::source::MarketSource;
use crate::types::{OrderBook, Symbol};

/// Limits accepted by `GET /api/v3/depth`, ascending.
pub const DEPTH_TIERS: [u32; 8] = [5, 10, 20, 50, 100, 500, 1000, 5000];

/// Round `requested` up to the smallest supported tier.
///
/// Never returns fewer levels than requested; anything above the largest
/// tier is rejected.
pub fn normalize_depth(requested: u32) -> ScanResult<u32> {
    DEPTH_TIERS
        .iter()
        .copied()
        .find(|&tier| requested <= tier)
        .ok_or(ScanError::InvalidDepth {
            requested,
            max: DEPTH_TIERS[DEPTH_TIERS.len() - 1],
        })
}

/// Pulls one depth snapshot per symbol through the shared worker pool.
pub struct OrderBookFetcher<S> {
    source: Arc<S>,
    pool: WorkerPool,
}

impl<S: MarketSource> OrderBookFetcher<S> {
    pub fn new(source: Arc<S>, pool: WorkerPool) -> Self {
        Self { source, pool }
    }

    /// Fetch books at the tier covering `requested_depth`.
    ///
    /// The depth is validated before any request goes out. Books with no
    /// levels on either side are dropped and listed in `skipped`.
    #[instrument(
        skip_all,
        name = "orderbook::fetch_all",
        fields(symbols = symbols.len(), requested_depth = requested_depth)
    )]
    pub async fn fetch_all(
        &self,
        symbols: &[Symbol],
        requested_depth: u32,
    ) -> ScanResult<Gathered<OrderBook>> {
        let limit = normalize_depth(requested_depth)?;
        debug!(requested_depth, limit, "depth normalised to supported tier");

        let gathered = self
            .pool
            .gather("order_books", symbols, |symbol| {
                let source = Arc::clone(&self.source);
                let name = symbol.name.clone();
                async move {
                    let book = source.order_book(&name, limit).await?;
                    Ok((!book.is_empty()).then_some(book))
                }
            })
            .await?;

        info!(
            fetched = gathered.entries.len(),
            skipped = gathered.skipped.len(),
            limit,
            "order books gathered"
        );
        Ok(gathered)
    }
}
