// =============================================================================
// Shared types used across the scan pipeline
// =============================================================================

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::analytics::{NotionalRecord, RankedSymbol, SpreadRecord};

/// A tradable spot pair as listed by the exchange.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Symbol {
    pub name: String,
    pub base_asset: String,
    pub quote_asset: String,
}

impl Symbol {
    pub fn new(
        name: impl Into<String>,
        base_asset: impl Into<String>,
        quote_asset: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            base_asset: base_asset.into(),
            quote_asset: quote_asset.into(),
        }
    }
}

impl std::fmt::Display for Symbol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name)
    }
}

// ---------------------------------------------------------------------------
// SymbolMap — ordered symbol -> value mapping
// ---------------------------------------------------------------------------

/// Symbol-keyed results that keep catalog (dispatch) order.
///
/// Fan-in assembles one of these from per-task slots, so iteration order never
/// depends on which fetch finished first.
#[derive(Debug, Clone, PartialEq)]
pub struct SymbolMap<V> {
    entries: Vec<(Symbol, V)>,
}

impl<V> SymbolMap<V> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Build from entries that are already unique by symbol name.
    pub fn from_entries(entries: Vec<(Symbol, V)>) -> Self {
        debug_assert!(
            {
                let mut names: Vec<&str> = entries.iter().map(|(s, _)| s.name.as_str()).collect();
                names.sort_unstable();
                names.windows(2).all(|w| w[0] != w[1])
            },
            "SymbolMap entries must be unique"
        );
        Self { entries }
    }

    pub fn get(&self, name: &str) -> Option<&V> {
        self.entries
            .iter()
            .find(|(s, _)| s.name == name)
            .map(|(_, v)| v)
    }

    #[cfg(test)]
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Symbol, &V)> {
        self.entries.iter().map(|(s, v)| (s, v))
    }

    pub fn symbols(&self) -> impl Iterator<Item = &Symbol> {
        self.entries.iter().map(|(s, _)| s)
    }

    pub fn map_values<U>(&self, mut f: impl FnMut(&V) -> U) -> SymbolMap<U> {
        SymbolMap {
            entries: self.entries.iter().map(|(s, v)| (s.clone(), f(v))).collect(),
        }
    }
}

impl<V> Default for SymbolMap<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> IntoIterator for SymbolMap<V> {
    type Item = (Symbol, V);
    type IntoIter = std::vec::IntoIter<(Symbol, V)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

// ---------------------------------------------------------------------------
// Order book
// ---------------------------------------------------------------------------

/// One price level: (price, quantity).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderBookLevel {
    pub price: Decimal,
    pub quantity: Decimal,
}

impl OrderBookLevel {
    pub fn new(price: Decimal, quantity: Decimal) -> Self {
        Self { price, quantity }
    }
}

/// Levels of one side, best price first as delivered by the exchange.
pub type OrderBookSide = Vec<OrderBookLevel>;

/// Both sides of a depth snapshot for one symbol.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderBook {
    pub bids: OrderBookSide,
    pub asks: OrderBookSide,
}

impl OrderBook {
    /// A book with no levels on either side carries no information.
    pub fn is_empty(&self) -> bool {
        self.bids.is_empty() && self.asks.is_empty()
    }

    /// Keep at most `levels` entries per side.
    pub fn truncate(&mut self, levels: usize) {
        self.bids.truncate(levels);
        self.asks.truncate(levels);
    }
}

// ---------------------------------------------------------------------------
// Ranking metric
// ---------------------------------------------------------------------------

/// Scalar used to rank symbols.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum RankMetric {
    /// Base-asset traded volume.
    #[default]
    Volume,
    /// Number of trades.
    Trades,
    /// Quote-asset traded volume.
    QuoteVolume,
}

impl std::fmt::Display for RankMetric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Volume => write!(f, "Volume"),
            Self::Trades => write!(f, "Trades"),
            Self::QuoteVolume => write!(f, "Quote Volume"),
        }
    }
}

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// Symbols dropped from one cycle because their source returned nothing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkipCounts {
    pub candles: usize,
    pub order_books: usize,
}

/// Everything one pipeline pass produced.
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    pub cycle: u64,
    pub taken_at: DateTime<Utc>,
    pub metric: RankMetric,
    pub lookback_hours: u32,
    pub ranked: Vec<RankedSymbol>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notional: Option<Vec<NotionalRecord>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spreads: Option<Vec<SpreadRecord>>,
    pub skipped: SkipCounts,
}
