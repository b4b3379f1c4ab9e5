use std::path::PathBuf;

use clap::Parser;

use crate::config::ScanConfig;
use crate::types::RankMetric;

/// Rank Binance spot symbols by 24h activity and report order-book notional and spread.
#[derive(Parser, Debug)]
#[command(name = "spot-scanner")]
#[command(version)]
pub struct Cli {
    /// JSON config file; flags given here override its values
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Quote asset to filter symbols by (BTC, USDT, ...)
    #[arg(short, long = "quote-asset")]
    pub quote_asset: Option<String>,

    /// Sort top values by
    #[arg(short, long, value_enum)]
    pub sort: Option<RankMetric>,

    /// Number of top symbols to show
    #[arg(short, long)]
    pub top: Option<usize>,

    /// Number of top bids and asks to get notional values for by symbol
    #[arg(short, long)]
    pub notional: Option<u32>,

    /// Show price spread of the top symbols
    #[arg(long)]
    pub spread: bool,

    /// Repeat every --interval seconds until interrupted
    #[arg(long)]
    pub daemon: bool,

    /// Seconds between cycles in daemon mode
    #[arg(long)]
    pub interval: Option<u64>,

    /// Concurrent requests per stage
    #[arg(long)]
    pub workers: Option<usize>,

    /// Kline interval for the lookback window (1h, 4h, 1d, ...)
    #[arg(long = "kline-interval")]
    pub kline_interval: Option<String>,

    /// Lookback window in hours
    #[arg(long = "lookback-hours")]
    pub lookback_hours: Option<u32>,

    /// REST base URL
    #[arg(long = "base-url", env = "SCAN_BASE_URL")]
    pub base_url: Option<String>,

    /// Print each snapshot as a JSON line instead of text
    #[arg(long)]
    pub json: bool,
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Apply flags on top of `config`. Boolean flags can only switch features on.
    pub fn apply(&self, mut config: ScanConfig) -> ScanConfig {
        if let Some(q) = &self.quote_asset {
            config.quote_asset = Some(q.trim().to_uppercase());
        }
        if let Some(metric) = self.sort {
            config.metric = metric;
        }
        if let Some(top) = self.top {
            config.top = top;
        }
        if let Some(n) = self.notional {
            config.notional = Some(n);
        }
        if let Some(secs) = self.interval {
            config.interval_secs = secs;
        }
        if let Some(workers) = self.workers {
            config.workers = workers;
        }
        if let Some(iv) = &self.kline_interval {
            config.kline_interval = iv.clone();
        }
        if let Some(hours) = self.lookback_hours {
            config.lookback_hours = hours;
        }
        if let Some(url) = &self.base_url {
            config.base_url = url.clone();
        }
        config.spread |= self.spread;
        config.daemon |= self.daemon;
        config
    }
}
