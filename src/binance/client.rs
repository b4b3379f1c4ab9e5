// =============================================================================
// Binance REST API Client — public spot market data
// =============================================================================
//
// Only unauthenticated endpoints are used: ping, exchangeInfo, klines, depth.
// Every response is checked for a success status before decoding; Binance
// sends prices and quantities as JSON strings, which are parsed into
// `Decimal` so no precision is lost before notional sums.
// =============================================================================

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde_json::Value;
use tracing::{debug, instrument};

use crate::binance::rate_limit::RateLimitTracker;
use crate::error::{ScanError, ScanResult};
use crate::market_data::Candle;
use crate::source::MarketSource;
use crate::types::{OrderBook, OrderBookLevel, OrderBookSide, Symbol};

/// Production endpoint.
pub const DEFAULT_BASE_URL: &str = "https://api.binance.com";

/// Binance spot REST client for public market data.
#[derive(Clone)]
pub struct BinanceClient {
    base_url: String,
    client: reqwest::Client,
    rate_limit: Arc<RateLimitTracker>,
}

impl BinanceClient {
    // -------------------------------------------------------------------------
    // Construction
    // -------------------------------------------------------------------------

    /// Create a client against `base_url` (no trailing `/api/v3`).
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> ScanResult<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();

        let client = reqwest::Client::builder()
            .user_agent(concat!("spot-scanner/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(|e| ScanError::Config(format!("failed to build HTTP client: {e}")))?;

        debug!(base_url = %base_url, "BinanceClient initialised");

        Ok(Self {
            base_url,
            client,
            rate_limit: Arc::new(RateLimitTracker::new()),
        })
    }

    /// Request-weight tracker fed from response headers.
    pub fn rate_limit(&self) -> &RateLimitTracker {
        &self.rate_limit
    }

    // -------------------------------------------------------------------------
    // Endpoints
    // -------------------------------------------------------------------------

    /// GET /api/v3/ping.
    #[instrument(skip(self), name = "binance::ping")]
    pub async fn ping(&self) -> ScanResult<()> {
        let url = format!("{}/api/v3/ping", self.base_url);
        self.get_json(&url).await?;
        debug!("endpoint reachable");
        Ok(())
    }

    /// GET /api/v3/exchangeInfo: every listed symbol.
    #[instrument(skip(self), name = "binance::get_exchange_info")]
    pub async fn get_exchange_info(&self) -> ScanResult<Vec<Symbol>> {
        let url = format!("{}/api/v3/exchangeInfo", self.base_url);
        let body = self.get_json(&url).await?;
        let symbols = parse_exchange_info(&body)?;
        debug!(count = symbols.len(), "exchange info retrieved");
        Ok(symbols)
    }

    /// GET /api/v3/klines between `start_ms` and `end_ms`.
    #[instrument(skip(self), name = "binance::get_klines")]
    pub async fn get_klines(
        &self,
        symbol: &str,
        interval: &str,
        start_ms: i64,
        end_ms: i64,
    ) -> ScanResult<Vec<Candle>> {
        let url = format!(
            "{}/api/v3/klines?symbol={}&interval={}&startTime={}&endTime={}",
            self.base_url, symbol, interval, start_ms, end_ms
        );
        let body = self.get_json(&url).await?;
        let candles = parse_klines(&body)?;
        debug!(symbol, interval, count = candles.len(), "klines fetched");
        Ok(candles)
    }

    /// GET /api/v3/depth with a supported `limit`.
    #[instrument(skip(self), name = "binance::get_depth")]
    pub async fn get_depth(&self, symbol: &str, limit: u32) -> ScanResult<OrderBook> {
        let url = format!(
            "{}/api/v3/depth?symbol={}&limit={}",
            self.base_url, symbol, limit
        );
        let body = self.get_json(&url).await?;
        let book = parse_depth(&body)?;
        debug!(
            symbol,
            bids = book.bids.len(),
            asks = book.asks.len(),
            "order book fetched"
        );
        Ok(book)
    }

    // -------------------------------------------------------------------------
    // Internal helpers
    // -------------------------------------------------------------------------

    /// GET `url`, fail on transport errors or non-success status, decode JSON.
    async fn get_json(&self, url: &str) -> ScanResult<Value> {
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ScanError::Connectivity {
                url: url.to_string(),
                reason: e.to_string(),
            })?;

        self.rate_limit.update_from_headers(resp.headers());

        let status = resp.status();
        let text = resp.text().await.map_err(|e| ScanError::Connectivity {
            url: url.to_string(),
            reason: format!("failed to read body: {e}"),
        })?;

        if !status.is_success() {
            return Err(ScanError::Status {
                url: url.to_string(),
                status: status.as_u16(),
                body: text,
            });
        }

        serde_json::from_str(&text)
            .map_err(|e| ScanError::malformed(endpoint_of(url), e.to_string()))
    }
}

#[async_trait]
impl MarketSource for BinanceClient {
    async fn ping(&self) -> ScanResult<()> {
        BinanceClient::ping(self).await
    }

    async fn list_symbols(&self) -> ScanResult<Vec<Symbol>> {
        self.get_exchange_info().await
    }

    async fn candles(
        &self,
        symbol: &str,
        interval: &str,
        start_ms: i64,
        end_ms: i64,
    ) -> ScanResult<Vec<Candle>> {
        self.get_klines(symbol, interval, start_ms, end_ms).await
    }

    async fn order_book(&self, symbol: &str, limit: u32) -> ScanResult<OrderBook> {
        self.get_depth(symbol, limit).await
    }
}

impl std::fmt::Debug for BinanceClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BinanceClient")
            .field("base_url", &self.base_url)
            .field("rate_limit", &self.rate_limit)
            .finish()
    }
}

// -----------------------------------------------------------------------------
// Response decoding
// -----------------------------------------------------------------------------

/// `/api/v3/klines?...` -> `klines`
fn endpoint_of(url: &str) -> &str {
    let path = url.split('?').next().unwrap_or(url);
    path.rsplit('/').next().unwrap_or(path)
}

/// Decode `{"symbols": [{"symbol", "baseAsset", "quoteAsset", ...}]}`.
fn parse_exchange_info(body: &Value) -> ScanResult<Vec<Symbol>> {
    let entries = body["symbols"]
        .as_array()
        .ok_or_else(|| ScanError::malformed("exchangeInfo", "missing 'symbols' array"))?;

    entries
        .iter()
        .map(|entry| -> ScanResult<Symbol> {
            let field = |name: &str| {
                entry[name].as_str().map(str::to_string).ok_or_else(|| {
                    ScanError::malformed("exchangeInfo", format!("symbol entry missing '{name}'"))
                })
            };
            Ok(Symbol {
                name: field("symbol")?,
                base_asset: field("baseAsset")?,
                quote_asset: field("quoteAsset")?,
            })
        })
        .collect()
}

/// Decode Binance's array-of-arrays kline response.
///
/// Array indices:
///   [0] openTime, [1] open, [2] high, [3] low, [4] close, [5] volume,
///   [6] closeTime, [7] quoteAssetVolume, [8] numberOfTrades,
///   [9] takerBuyBaseVolume, [10] takerBuyQuoteVolume
fn parse_klines(body: &Value) -> ScanResult<Vec<Candle>> {
    let raw = body
        .as_array()
        .ok_or_else(|| ScanError::malformed("klines", "response is not an array"))?;

    let mut candles = Vec::with_capacity(raw.len());

    for entry in raw {
        let arr = entry
            .as_array()
            .ok_or_else(|| ScanError::malformed("klines", "kline entry is not an array"))?;

        if arr.len() < 11 {
            return Err(ScanError::malformed(
                "klines",
                format!("kline entry has {} elements, expected at least 11", arr.len()),
            ));
        }

        let int = |idx: usize, name: &str| {
            arr[idx]
                .as_i64()
                .ok_or_else(|| ScanError::malformed("klines", format!("{name} is not an integer")))
        };

        candles.push(Candle {
            open_time: int(0, "openTime")?,
            open: parse_decimal(&arr[1], "klines", "open")?,
            high: parse_decimal(&arr[2], "klines", "high")?,
            low: parse_decimal(&arr[3], "klines", "low")?,
            close: parse_decimal(&arr[4], "klines", "close")?,
            volume: parse_decimal(&arr[5], "klines", "volume")?,
            close_time: int(6, "closeTime")?,
            quote_volume: parse_decimal(&arr[7], "klines", "quoteAssetVolume")?,
            trades: arr[8].as_u64().ok_or_else(|| {
                ScanError::malformed("klines", "numberOfTrades is not an integer")
            })?,
            taker_buy_volume: parse_decimal(&arr[9], "klines", "takerBuyBaseVolume")?,
            taker_buy_quote_volume: parse_decimal(&arr[10], "klines", "takerBuyQuoteVolume")?,
        });
    }

    Ok(candles)
}

/// Decode `{"lastUpdateId": .., "bids": [["p","q"], ..], "asks": [..]}`.
fn parse_depth(body: &Value) -> ScanResult<OrderBook> {
    Ok(OrderBook {
        bids: parse_side(&body["bids"], "bids")?,
        asks: parse_side(&body["asks"], "asks")?,
    })
}

fn parse_side(levels: &Value, name: &str) -> ScanResult<OrderBookSide> {
    let levels = levels
        .as_array()
        .ok_or_else(|| ScanError::malformed("depth", format!("missing '{name}' array")))?;

    levels
        .iter()
        .map(|level| -> ScanResult<OrderBookLevel> {
            match level.as_array().map(Vec::as_slice) {
                Some([price, qty, ..]) => Ok(OrderBookLevel::new(
                    parse_decimal(price, "depth", "price")?,
                    parse_decimal(qty, "depth", "quantity")?,
                )),
                _ => Err(ScanError::malformed(
                    "depth",
                    format!("{name} level is not a [price, qty] pair"),
                )),
            }
        })
        .collect()
}

/// Parse a JSON value that may be either a string or a number into `Decimal`.
fn parse_decimal(val: &Value, endpoint: &str, field: &str) -> ScanResult<Decimal> {
    match val {
        Value::String(s) => Decimal::from_str(s).map_err(|e| {
            ScanError::malformed(endpoint, format!("failed to parse {field} '{s}': {e}"))
        }),
        Value::Number(n) => Decimal::from_str(&n.to_string()).map_err(|e| {
            ScanError::malformed(endpoint, format!("failed to parse {field} {n}: {e}"))
        }),
        _ => Err(ScanError::malformed(
            endpoint,
            format!("{field} has unexpected JSON type: {val}"),
        )),
    }
}

// -----------------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------------
