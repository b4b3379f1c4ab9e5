// =============================================================================
// Scan errors — every fatal condition the pipeline can hit
// =============================================================================
//
// Components never exit the process. They return a `ScanError` and `main`
// decides what the exit code is. Empty per-symbol results are not errors at
// all: the fetchers drop those symbols and count them.
// =============================================================================

use thiserror::Error;

/// Categorised pipeline failure.
#[derive(Debug, Error)]
pub enum ScanError {
    /// The endpoint could not be reached (DNS, TCP, TLS, timeout).
    #[error("could not connect to {url}: {reason}. Please check your connection")]
    Connectivity { url: String, reason: String },

    /// The endpoint answered with a non-success HTTP status.
    #[error("request to {url} returned HTTP {status}: {body}")]
    Status {
        url: String,
        status: u16,
        body: String,
    },

    /// The body could not be decoded into the expected structure.
    #[error("malformed response from {endpoint}: {reason}")]
    Malformed { endpoint: String, reason: String },

    /// Requested order-book depth is above the largest supported tier.
    #[error("the maximum number of top bids/asks you can request is {max} (requested {requested})")]
    InvalidDepth { requested: u32, max: u32 },

    /// Spread was requested but no depth was configured to measure it over.
    #[error("spread requested but neither a notional count nor a spread depth is set")]
    MissingDepth,

    /// Any other invalid setting.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// A fetch task panicked or was aborted before producing a result.
    #[error("fetch task failed to complete: {0}")]
    Task(String),
}

impl ScanError {
    pub fn malformed(endpoint: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Malformed {
            endpoint: endpoint.into(),
            reason: reason.into(),
        }
    }

    /// Whether the failure was detected before any network call was made.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::InvalidDepth { .. } | Self::MissingDepth | Self::Config(_)
        )
    }
}

pub type ScanResult<T> = Result<T, ScanError>;
