use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::error::{ScanError, ScanResult};
use crate::market_data::pool::{Gathered, WorkerPool};
use crate::source::MarketSource;
use crate::types::Symbol;

// ---------------------------------------------------------------------------
// Data types
// ---------------------------------------------------------------------------

/// A single kline from the Binance REST API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candle {
    pub open_time: i64,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: Decimal,
    pub close_time: i64,
    pub quote_volume: Decimal,
    pub trades: u64,
    pub taker_buy_volume: Decimal,
    pub taker_buy_quote_volume: Decimal,
}

/// Candles for one symbol, oldest first as returned by the exchange.
pub type CandleWindow = Vec<Candle>;

/// `[now - hours, now]` in epoch milliseconds.
pub fn lookback_window(now: DateTime<Utc>, hours: u32) -> ScanResult<(i64, i64)> {
    let start = now
        .checked_sub_signed(Duration::hours(i64::from(hours)))
        .ok_or_else(|| {
            ScanError::Config(format!(
                "lookback of {hours}h reaches before the supported date range"
            ))
        })?;
    Ok((start.timestamp_millis(), now.timestamp_millis()))
}

// ---------------------------------------------------------------------------
// CandleFetcher
// ---------------------------------------------------------------------------

/// Pulls one candle window per symbol through the shared worker pool.
pub struct CandleFetcher<S> {
    source: Arc<S>,
    pool: WorkerPool,
    interval: String,
}

impl<S: MarketSource> CandleFetcher<S> {
    pub fn new(source: Arc<S>, pool: WorkerPool, interval: impl Into<String>) -> Self {
        Self {
            source,
            pool,
            interval: interval.into(),
        }
    }

    /// Fetch `[window_start_ms, window_end_ms]` for every symbol.
    ///
    /// Symbols whose window comes back empty are left out of the result and
    /// listed in `skipped`. Any transport or decode failure fails the stage.
    #[instrument(skip_all, name = "candles::fetch_all", fields(symbols = symbols.len()))]
    pub async fn fetch_all(
        &self,
        symbols: &[Symbol],
        window_start_ms: i64,
        window_end_ms: i64,
    ) -> ScanResult<Gathered<CandleWindow>> {
        let gathered = self
            .pool
            .gather("candles", symbols, |symbol| {
                let source = Arc::clone(&self.source);
                let name = symbol.name.clone();
                let interval = self.interval.clone();
                async move {
                    let window = source
                        .candles(&name, &interval, window_start_ms, window_end_ms)
                        .await?;
                    Ok((!window.is_empty()).then_some(window))
                }
            })
            .await?;

        info!(
            fetched = gathered.entries.len(),
            skipped = gathered.skipped.len(),
            interval = %self.interval,
            "candle windows gathered"
        );
        Ok(gathered)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
