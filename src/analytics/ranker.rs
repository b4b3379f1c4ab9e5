use rust_decimal::Decimal;
use serde::Serialize;

use crate::market_data::{Candle, CandleWindow};
use crate::types::{RankMetric, Symbol, SymbolMap};

impl RankMetric {
    /// The scalar this metric reads from a candle.
    pub fn value(&self, candle: &Candle) -> Decimal {
        match self {
            Self::Volume => candle.volume,
            Self::Trades => Decimal::from(candle.trades),
            Self::QuoteVolume => candle.quote_volume,
        }
    }
}

/// A symbol's position in the ranking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RankedSymbol {
    pub symbol: Symbol,
    pub value: Decimal,
    /// 0-based position after the descending sort.
    pub rank: usize,
}

pub struct Ranker;

impl Ranker {
    /// Order symbols by the best candle in each window, highest first.
    ///
    /// Ties keep input order. Empty windows never appear in the output.
    pub fn rank(
        candles: &SymbolMap<CandleWindow>,
        metric: RankMetric,
        top: Option<usize>,
    ) -> Vec<RankedSymbol> {
        let mut scored: Vec<(&Symbol, Decimal)> = candles
            .iter()
            .filter_map(|(symbol, window)| Self::peak(window, metric).map(|v| (symbol, v)))
            .collect();

        // `sort_by` is stable.
        scored.sort_by(|a, b| b.1.cmp(&a.1));

        let keep = top.unwrap_or(scored.len());
        scored
            .into_iter()
            .take(keep)
            .enumerate()
            .map(|(rank, (symbol, value))| RankedSymbol {
                symbol: symbol.clone(),
                value,
                rank,
            })
            .collect()
    }

    /// Metric of the highest-metric candle in the window, i.e. the head of
    /// the window once sorted descending by that metric.
    pub fn peak(window: &[Candle], metric: RankMetric) -> Option<Decimal> {
        window.iter().map(|c| metric.value(c)).max()
    }
}
