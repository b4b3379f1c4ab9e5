use rust_decimal::Decimal;
use serde::Serialize;

use crate::types::{OrderBook, OrderBookLevel, Symbol, SymbolMap};

/// Bid and ask exposure for one symbol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotionalRecord {
    pub symbol: Symbol,
    pub bid_levels: usize,
    pub bids: Decimal,
    pub ask_levels: usize,
    pub asks: Decimal,
}

pub struct NotionalCalculator;

impl NotionalCalculator {
    /// Σ price × quantity over the first `limit` levels.
    pub fn total(side: &[OrderBookLevel], limit: usize) -> Decimal {
        side.iter()
            .take(limit)
            .map(|level| level.price * level.quantity)
            .sum()
    }

    /// Totals for both sides of every book, in book order.
    pub fn summarize(books: &SymbolMap<OrderBook>, limit: usize) -> Vec<NotionalRecord> {
        books
            .iter()
            .map(|(symbol, book)| NotionalRecord {
                symbol: symbol.clone(),
                bid_levels: book.bids.len().min(limit),
                bids: Self::total(&book.bids, limit),
                ask_levels: book.asks.len().min(limit),
                asks: Self::total(&book.asks, limit),
            })
            .collect()
    }
}
