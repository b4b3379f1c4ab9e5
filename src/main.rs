// =============================================================================
// Spot Scanner — Main Entry Point
// =============================================================================
//
// Ranks Binance spot symbols by their best candle over the lookback window and
// optionally reports order-book notional and spread for the leaders. Runs one
// cycle by default; `--daemon` repeats until Ctrl-C.
//
// stdout carries only the report; logs go to stderr.
// =============================================================================

// ── Module declarations ──────────────────────────────────────────────────────
mod analytics;
mod binance;
mod cli;
mod config;
mod error;
mod market_data;
mod report;
mod scheduler;
mod shutdown;
mod source;
mod types;

use std::sync::Arc;

use anyhow::Context;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::binance::BinanceClient;
use crate::cli::Cli;
use crate::config::ScanConfig;
use crate::scheduler::Scheduler;
use crate::types::Snapshot;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── 1. Environment & logging ─────────────────────────────────────────
    let _ = dotenv::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    // ── 2. Config: defaults < file < flags ───────────────────────────────
    let cli = Cli::parse_args();
    let base = match &cli.config {
        Some(path) => ScanConfig::load(path)?,
        None => ScanConfig::default(),
    };
    let config = cli.apply(base);
    let json = cli.json;

    info!(
        quote_asset = ?config.quote_filter(),
        metric = %config.metric,
        top = config.top,
        notional = ?config.notional,
        spread = config.spread,
        daemon = config.daemon,
        "spot scanner starting"
    );

    // ── 3. Client & scheduler ────────────────────────────────────────────
    let client = Arc::new(
        BinanceClient::new(&config.base_url, config.request_timeout())
            .context("failed to build HTTP client")?,
    );
    let daemon = config.daemon;
    let mut scheduler =
        Scheduler::new(Arc::clone(&client), config).context("invalid scan configuration")?;

    // ── 4. Run ───────────────────────────────────────────────────────────
    if !daemon {
        let snapshot = scheduler.run_once().await.context("scan failed")?;
        emit(&snapshot, json);
        info!(rate_limit = ?client.rate_limit().snapshot(), "scan complete");
        return Ok(());
    }

    let cancel = CancellationToken::new();
    shutdown::spawn_ctrl_c(cancel.clone());

    let rate_limit = client.rate_limit();
    let result = scheduler
        .run(cancel, |snapshot| {
            emit(snapshot, json);
            info!(
                cycle = snapshot.cycle,
                rate_limit = ?rate_limit.snapshot(),
                "snapshot emitted"
            );
        })
        .await;

    match result {
        Ok(cycles) => {
            info!(cycles, "spot scanner stopped");
            Ok(())
        }
        Err(e) => {
            error!(error = %e, configuration = e.is_configuration(), "daemon aborted");
            Err(e).context("scan failed")
        }
    }
}

fn emit(snapshot: &Snapshot, json: bool) {
    if json {
        match report::render_json(snapshot) {
            Ok(line) => println!("{line}"),
            Err(e) => warn!(error = %e, "failed to encode snapshot"),
        }
    } else {
        print!("{}", report::render(snapshot));
    }
}
