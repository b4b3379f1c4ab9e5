// =============================================================================
// Report — renders a Snapshot for stdout
// =============================================================================

use std::fmt::Write as _;

use rust_decimal::Decimal;

use crate::types::Snapshot;

/// Plain-text report, one line per fact.
pub fn render(snapshot: &Snapshot) -> String {
    let mut out = String::new();

    let _ = writeln!(
        out,
        "Top {} symbols by {} over the last {}h",
        snapshot.ranked.len(),
        snapshot.metric,
        snapshot.lookback_hours
    );
    for ranked in &snapshot.ranked {
        let _ = writeln!(out, "{:<12} {}", ranked.symbol.name, ranked.value.normalize());
    }

    if let Some(records) = &snapshot.notional {
        for side in ["bids", "asks"] {
            for r in records {
                let (levels, total) = match side {
                    "bids" => (r.bid_levels, r.bids),
                    _ => (r.ask_levels, r.asks),
                };
                let _ = writeln!(
                    out,
                    "Total notional value for top {levels} {side} for symbol {} : {}",
                    r.symbol.name,
                    total.normalize()
                );
            }
        }
    }

    if let Some(records) = &snapshot.spreads {
        for r in records {
            let _ = write!(out, "Price spread for {} : {}", r.symbol.name, r.spread.normalize());
            if let Some(delta) = r.delta {
                let _ = write!(out, " (change {})", signed(delta));
            }
            out.push('\n');
        }
    }

    out
}

/// Snapshot as a single JSON line.
pub fn render_json(snapshot: &Snapshot) -> serde_json::Result<String> {
    serde_json::to_string(snapshot)
}

fn signed(value: Decimal) -> String {
    let value = value.normalize();
    if value.is_sign_negative() {
        value.to_string()
    } else {
        format!("+{value}")
    }
}
