use std::collections::HashSet;

use tracing::{info, warn};

use crate::error::ScanResult;
use crate::source::MarketSource;
use crate::types::Symbol;

/// Resolves the working set of symbols once per process.
pub struct SymbolCatalog;

impl SymbolCatalog {
    /// List every symbol and keep those whose quote asset equals or contains
    /// `quote_filter` (case-insensitive). No filter keeps everything.
    pub async fn resolve<S: MarketSource + ?Sized>(
        source: &S,
        quote_filter: Option<&str>,
    ) -> ScanResult<Vec<Symbol>> {
        let listed = source.list_symbols().await?;
        let total = listed.len();
        let symbols = Self::filter(listed, quote_filter);

        if symbols.is_empty() {
            warn!(total, filter = ?quote_filter, "no symbols match the quote asset filter");
        } else {
            info!(total, kept = symbols.len(), filter = ?quote_filter, "symbol catalog resolved");
        }
        Ok(symbols)
    }

    fn filter(listed: Vec<Symbol>, quote_filter: Option<&str>) -> Vec<Symbol> {
        let needle = quote_filter.map(str::to_uppercase);
        let mut seen = HashSet::new();

        listed
            .into_iter()
            .filter(|s| match &needle {
                Some(n) => s.quote_asset.to_uppercase().contains(n.as_str()),
                None => true,
            })
            .filter(|s| {
                let fresh = seen.insert(s.name.clone());
                if !fresh {
                    warn!(symbol = %s.name, "duplicate symbol in listing — keeping first");
                }
                fresh
            })
            .collect()
    }
}
