//! Provider error types.
//!
//! The enum itself is defined in `clbprep-core` so the orchestrator can
//! classify failures; this module maps HTTP outcomes onto it.

pub use clbprep_core::error::ProviderError;

/// Seconds to wait when a 429 carries no usable `retry-after` header.
const DEFAULT_RETRY_AFTER_SECS: u64 = 5;

/// Map a transport-level reqwest failure.
pub(crate) fn from_transport(error: reqwest::Error, timeout_secs: u64) -> ProviderError {
    if error.is_timeout() {
        ProviderError::Timeout(timeout_secs)
    } else {
        ProviderError::NetworkError(error.to_string())
    }
}

/// Retry-after hint of a 429 response, in milliseconds.
pub(crate) fn retry_after_ms(response: &reqwest::Response) -> u64 {
    response
        .headers()
        .get("retry-after")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .unwrap_or(DEFAULT_RETRY_AFTER_SECS)
        .saturating_mul(1000)
}
