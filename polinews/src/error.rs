use std::time::Duration;

use thiserror::Error;

/// Why a provider could not contribute to the current aggregation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum UnavailableReason {
    #[error("missing credentials")]
    MissingCredentials,

    #[error("authentication rejected (HTTP {0})")]
    Unauthorized(u16),

    #[error("rate limited")]
    RateLimited,

    #[error("timed out after {0:?}")]
    TimedOut(Duration),

    #[error("unexpected HTTP status {0}")]
    Status(u16),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("adapter task aborted: {0}")]
    Aborted(String),
}

/// A single provider failed for this call. Recovered locally by the aggregator.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("provider {provider} unavailable: {reason}")]
pub struct ProviderUnavailable {
    pub provider: String,
    pub reason: UnavailableReason,
}

impl ProviderUnavailable {
    pub fn new(provider: impl Into<String>, reason: UnavailableReason) -> Self {
        Self {
            provider: provider.into(),
            reason,
        }
    }
}

#[derive(Debug, Error)]
pub enum AggregateError {
    /// Every attempted provider failed; there is no partial data at all.
    #[error("aggregation failed: all {} providers were unavailable", .failures.len())]
    AggregationFailed { failures: Vec<ProviderUnavailable> },

    #[error("invalid aggregation request: {0}")]
    InvalidRequest(String),
}

pub type ProviderResult<T> = std::result::Result<T, ProviderUnavailable>;
