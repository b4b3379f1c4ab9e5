// =============================================================================
// Scan Configuration — one explicit value built at startup
// =============================================================================
//
// Layering: serde defaults < optional JSON file < CLI flags. The resulting
// `ScanConfig` is validated once and then handed to the scheduler; nothing
// below `main` reads process arguments or environment.
//
// All fields carry `#[serde(default)]` so a partial config file is valid.
// =============================================================================

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::binance::DEFAULT_BASE_URL;
use crate::error::{ScanError, ScanResult};
use crate::market_data::{normalize_depth, DEFAULT_WORKERS};
use crate::types::RankMetric;

/// Upper bound on `lookback_hours` (ten years).
pub const MAX_LOOKBACK_HOURS: u32 = 24 * 365 * 10;

// =============================================================================
// Default-value helpers (required by serde `default = "..."` attribute)
// =============================================================================

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_top() -> usize {
    5
}

fn default_spread_depth() -> Option<u32> {
    Some(100)
}

fn default_interval_secs() -> u64 {
    10
}

fn default_kline_interval() -> String {
    "1d".to_string()
}

fn default_lookback_hours() -> u32 {
    24
}

fn default_workers() -> usize {
    DEFAULT_WORKERS
}

// =============================================================================
// ScanConfig
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanConfig {
    // --- Endpoint -----------------------------------------------------------

    /// REST base URL, without `/api/v3`.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-request timeout.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    // --- Ranking ------------------------------------------------------------

    /// Keep symbols whose quote asset equals or contains this (e.g. "BTC").
    #[serde(default)]
    pub quote_asset: Option<String>,

    #[serde(default)]
    pub metric: RankMetric,

    /// Number of ranked symbols reported and passed to the order-book stage.
    #[serde(default = "default_top")]
    pub top: usize,

    /// Kline interval requested for the lookback window.
    #[serde(default = "default_kline_interval")]
    pub kline_interval: String,

    #[serde(default = "default_lookback_hours")]
    pub lookback_hours: u32,

    // --- Order book ---------------------------------------------------------

    /// Sum notional over this many top bids/asks.
    #[serde(default)]
    pub notional: Option<u32>,

    /// Report bid/ask spread for the top symbols.
    #[serde(default)]
    pub spread: bool,

    /// Levels retained for spread when `notional` is unset.
    #[serde(default = "default_spread_depth")]
    pub spread_depth: Option<u32>,

    // --- Scheduling ---------------------------------------------------------

    /// Repeat until interrupted instead of running once.
    #[serde(default)]
    pub daemon: bool,

    /// Pause between the end of one cycle and the start of the next.
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,

    /// Concurrent fetches per stage.
    #[serde(default = "default_workers")]
    pub workers: usize,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            request_timeout_secs: default_request_timeout_secs(),
            quote_asset: None,
            metric: RankMetric::default(),
            top: default_top(),
            kline_interval: default_kline_interval(),
            lookback_hours: default_lookback_hours(),
            notional: None,
            spread: false,
            spread_depth: default_spread_depth(),
            daemon: false,
            interval_secs: default_interval_secs(),
            workers: default_workers(),
        }
    }
}

/// What the order-book stage has to do, derived from a validated config.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BookPlan {
    /// Levels kept per side after fetching.
    pub retained_levels: u32,
    /// Supported tier actually requested (>= `retained_levels`).
    pub fetch_depth: u32,
    pub notional: bool,
    pub spread: bool,
}

impl ScanConfig {
    /// Load configuration from a JSON file at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read scan config from {}", path.display()))?;

        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse scan config from {}", path.display()))?;

        info!(
            path = %path.display(),
            metric = %config.metric,
            top = config.top,
            "scan config loaded"
        );

        Ok(config)
    }

    /// Check every setting and work out the order-book stage.
    ///
    /// Runs before any network call, so depth errors surface first.
    pub fn validate(&self) -> ScanResult<Option<BookPlan>> {
        if self.top == 0 {
            return Err(ScanError::Config("top must be at least 1".into()));
        }
        if self.workers == 0 {
            return Err(ScanError::Config("workers must be at least 1".into()));
        }
        if self.kline_interval.trim().is_empty() {
            return Err(ScanError::Config("kline interval must not be empty".into()));
        }
        if self.lookback_hours == 0 {
            return Err(ScanError::Config("lookback must be at least one hour".into()));
        }
        if self.lookback_hours > MAX_LOOKBACK_HOURS {
            return Err(ScanError::Config(format!(
                "lookback must be at most {MAX_LOOKBACK_HOURS} hours"
            )));
        }
        if self.interval_secs == 0 {
            return Err(ScanError::Config("interval must be at least one second".into()));
        }
        if self.request_timeout_secs == 0 {
            return Err(ScanError::Config("request timeout must be at least one second".into()));
        }
        if self.notional == Some(0) {
            return Err(ScanError::Config("notional must be at least 1".into()));
        }

        if self.notional.is_none() && !self.spread {
            return Ok(None);
        }

        let retained_levels = match self.notional {
            Some(n) => n,
            None => match self.spread_depth {
                Some(0) => return Err(ScanError::Config("spread depth must be at least 1".into())),
                Some(d) => d,
                None => return Err(ScanError::MissingDepth),
            },
        };

        Ok(Some(BookPlan {
            retained_levels,
            fetch_depth: normalize_depth(retained_levels)?,
            notional: self.notional.is_some(),
            spread: self.spread,
        }))
    }

    /// Quote filter, ignoring blank values.
    pub fn quote_filter(&self) -> Option<&str> {
        self.quote_asset
            .as_deref()
            .map(str::trim)
            .filter(|q| !q.is_empty())
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

// =============================================================================
// Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_expected_values() {
        let cfg = ScanConfig::default();
        assert_eq!(cfg.base_url, "https://api.binance.com");
        assert_eq!(cfg.metric, RankMetric::Volume);
        assert_eq!(cfg.top, 5);
        assert_eq!(cfg.kline_interval, "1d");
        assert_eq!(cfg.lookback_hours, 24);
        assert_eq!(cfg.interval_secs, 10);
        assert_eq!(cfg.spread_depth, Some(100));
        assert_eq!(cfg.workers, DEFAULT_WORKERS);
        assert!(!cfg.daemon);
        assert!(cfg.notional.is_none());
    }

    #[test]
    fn deserialise_empty_json_uses_defaults() {
        let cfg: ScanConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg, ScanConfig::default());
    }

    #[test]
    fn deserialise_partial_json_fills_defaults() {
        let json = r#"{ "metric": "trades", "quote_asset": "USDT", "notional": 200 }"#;
        let cfg: ScanConfig = serde_json::from_str(json).unwrap();
        assert_eq!(cfg.metric, RankMetric::Trades);
        assert_eq!(cfg.quote_filter(), Some("USDT"));
        assert_eq!(cfg.notional, Some(200));
        assert_eq!(cfg.top, 5);
    }

    #[test]
    fn null_spread_depth_disables_the_fallback() {
        let cfg: ScanConfig = serde_json::from_str(r#"{ "spread_depth": null }"#).unwrap();
        assert_eq!(cfg.spread_depth, None);
    }

    #[test]
    fn no_book_stage_without_notional_or_spread() {
        assert_eq!(ScanConfig::default().validate().unwrap(), None);
    }

    #[test]
    fn notional_seven_fetches_tier_ten_and_keeps_seven() {
        let cfg = ScanConfig {
            notional: Some(7),
            ..ScanConfig::default()
        };
        let plan = cfg.validate().unwrap().unwrap();
        assert_eq!(plan.fetch_depth, 10);
        assert_eq!(plan.retained_levels, 7);
        assert!(plan.notional);
        assert!(!plan.spread);
    }

    #[test]
    fn notional_above_largest_tier_is_rejected() {
        let cfg = ScanConfig {
            notional: Some(6000),
            ..ScanConfig::default()
        };
        let err = cfg.validate().unwrap_err();
        assert!(matches!(err, ScanError::InvalidDepth { requested: 6000, .. }));
    }

    #[test]
    fn spread_only_uses_spread_depth() {
        let cfg = ScanConfig {
            spread: true,
            ..ScanConfig::default()
        };
        let plan = cfg.validate().unwrap().unwrap();
        assert_eq!(plan.retained_levels, 100);
        assert_eq!(plan.fetch_depth, 100);
        assert!(plan.spread);
        assert!(!plan.notional);
    }

    #[test]
    fn spread_without_any_depth_is_a_configuration_error() {
        let cfg = ScanConfig {
            spread: true,
            spread_depth: None,
            ..ScanConfig::default()
        };
        assert!(matches!(cfg.validate(), Err(ScanError::MissingDepth)));
    }

    #[test]
    fn zero_values_are_rejected() {
        for cfg in [
            ScanConfig {
                top: 0,
                ..ScanConfig::default()
            },
            ScanConfig {
                workers: 0,
                ..ScanConfig::default()
            },
            ScanConfig {
                notional: Some(0),
                ..ScanConfig::default()
            },
            ScanConfig {
                lookback_hours: 0,
                ..ScanConfig::default()
            },
            ScanConfig {
                interval_secs: 0,
                ..ScanConfig::default()
            },
            ScanConfig {
                request_timeout_secs: 0,
                ..ScanConfig::default()
            },
        ] {
            assert!(matches!(cfg.validate(), Err(ScanError::Config(_))));
        }
    }

    #[test]
    fn huge_lookback_is_rejected_before_any_cycle() {
        let cfg = ScanConfig {
            lookback_hours: u32::MAX,
            ..ScanConfig::default()
        };
        assert!(matches!(cfg.validate(), Err(ScanError::Config(_))));
    }

    #[test]
    fn longest_accepted_lookback_yields_a_window() {
        let cfg = ScanConfig {
            lookback_hours: MAX_LOOKBACK_HOURS,
            ..ScanConfig::default()
        };
        assert!(cfg.validate().is_ok());
        let (start, end) =
            crate::market_data::candles::lookback_window(chrono::Utc::now(), cfg.lookback_hours)
                .unwrap();
        assert!(start < end);
    }

    #[test]
    fn blank_quote_asset_means_no_filter() {
        let cfg = ScanConfig {
            quote_asset: Some("  ".into()),
            ..ScanConfig::default()
        };
        assert_eq!(cfg.quote_filter(), None);
    }

    #[test]
    fn load_reads_json_file() {
        let path = std::env::temp_dir().join(format!("spot-scanner-{}.json", std::process::id()));
        std::fs::write(&path, r#"{ "top": 10, "daemon": true }"#).unwrap();
        let cfg = ScanConfig::load(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(cfg.top, 10);
        assert!(cfg.daemon);
    }

    #[test]
    fn load_missing_file_is_an_error() {
        assert!(ScanConfig::load("/definitely/not/here.json").is_err());
    }
}
