// =============================================================================
// Rate-Limit Tracker — monitors Binance request weight during fan-out
// =============================================================================
//
// A full-catalog scan issues one klines request per symbol, so a single cycle
// can spend a large share of the per-minute request weight. The tracker reads
// `X-MBX-USED-WEIGHT-1M` after every response and warns when usage crosses
// the threshold. It never delays or retries requests.
// =============================================================================

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use tracing::{debug, warn};

/// Binance spot request-weight ceiling per minute.
const WEIGHT_LIMIT_1M: u32 = 6000;
/// Soft warning threshold.
const WEIGHT_WARN_THRESHOLD: u32 = 4800;

/// Thread-safe weight tracker backed by atomic counters.
pub struct RateLimitTracker {
    used_weight_1m: AtomicU32,
    responses: AtomicU64,
}

/// Point-in-time view of the tracker, logged after each cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitSnapshot {
    pub used_weight_1m: u32,
    pub weight_limit_1m: u32,
    pub responses: u64,
}

impl RateLimitTracker {
    pub fn new() -> Self {
        Self {
            used_weight_1m: AtomicU32::new(0),
            responses: AtomicU64::new(0),
        }
    }

    /// Update counters from the headers of one response.
    pub fn update_from_headers(&self, headers: &reqwest::header::HeaderMap) {
        self.responses.fetch_add(1, Ordering::Relaxed);

        let Some(weight) = headers
            .get("X-MBX-USED-WEIGHT-1M")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse::<u32>().ok())
        else {
            return;
        };

        let prev = self.used_weight_1m.swap(weight, Ordering::Relaxed);
        if weight >= WEIGHT_WARN_THRESHOLD && prev < WEIGHT_WARN_THRESHOLD {
            warn!(
                used_weight = weight,
                limit = WEIGHT_LIMIT_1M,
                "request weight crossed warning threshold; narrow the quote filter or lower --workers"
            );
        }
        debug!(used_weight_1m = weight, "rate-limit weight updated from header");
    }

    pub fn snapshot(&self) -> RateLimitSnapshot {
        RateLimitSnapshot {
            used_weight_1m: self.used_weight_1m.load(Ordering::Relaxed),
            weight_limit_1m: WEIGHT_LIMIT_1M,
            responses: self.responses.load(Ordering::Relaxed),
        }
    }
}

impl Default for RateLimitTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for RateLimitTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimitTracker")
            .field("used_weight_1m", &self.used_weight_1m.load(Ordering::Relaxed))
            .field("responses", &self.responses.load(Ordering::Relaxed))
            .finish()
    }
}
