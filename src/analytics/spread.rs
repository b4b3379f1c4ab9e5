// =============================================================================
// Spread Tracker — per-symbol spread and its change between cycles
// =============================================================================
//
// Spread is measured over the levels the caller kept (the trimmed depth), not
// the single top-of-book pair: best bid minus the worst ask still retained.
// The previous cycle's spreads are the only state that survives a cycle.
// =============================================================================

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::Serialize;
use tracing::debug;

use crate::types::{OrderBookLevel, OrderBookSide, Symbol, SymbolMap};

/// Spread for one symbol in one cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SpreadRecord {
    pub symbol: Symbol,
    pub spread: Decimal,
    /// Spread from the immediately preceding cycle, if the symbol was present.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous: Option<Decimal>,
    /// `spread - previous`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delta: Option<Decimal>,
}

#[derive(Debug, Default)]
pub struct SpreadTracker {
    previous: HashMap<String, Decimal>,
}

impl SpreadTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compute spreads for every symbol present on both sides and replace the
    /// retained mapping with this cycle's values.
    pub fn update(
        &mut self,
        bids: &SymbolMap<OrderBookSide>,
        asks: &SymbolMap<OrderBookSide>,
    ) -> Vec<SpreadRecord> {
        let mut current = HashMap::with_capacity(bids.len());
        let mut records = Vec::with_capacity(bids.len());

        for (symbol, bid_side) in bids.iter() {
            let Some(ask_side) = asks.get(&symbol.name) else {
                debug!(symbol = %symbol, "no asks for symbol — spread skipped");
                continue;
            };
            let Some(spread) = Self::spread(bid_side, ask_side) else {
                debug!(symbol = %symbol, "one side of the book is empty — spread skipped");
                continue;
            };

            let previous = self.previous.get(&symbol.name).copied();
            records.push(SpreadRecord {
                symbol: symbol.clone(),
                spread,
                previous,
                delta: previous.map(|p| spread - p),
            });
            current.insert(symbol.name.clone(), spread);
        }

        self.previous = current;
        records
    }

    /// Highest bid minus highest retained ask: with bids sorted descending and
    /// asks ascending, `bids[0] - asks[last]`.
    pub fn spread(bids: &[OrderBookLevel], asks: &[OrderBookLevel]) -> Option<Decimal> {
        let best_bid = bids.iter().map(|l| l.price).max()?;
        let worst_ask = asks.iter().map(|l| l.price).max()?;
        Some(best_bid - worst_ask)
    }

    /// Number of symbols carried into the next cycle.
    pub fn tracked(&self) -> usize {
        self.previous.len()
    }
}
