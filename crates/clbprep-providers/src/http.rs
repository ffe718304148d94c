//! Plumbing shared by the HTTP backends.

use std::time::Duration;

use anyhow::Context;
use serde::de::DeserializeOwned;

use clbprep_core::traits::MediaPart;

use crate::error::{retry_after_ms, ProviderError};

pub(crate) fn client(timeout_secs: u64) -> anyhow::Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .context("failed to build HTTP client")
}

/// Pass a 2xx/3xx response through and map everything else.
///
/// `detail` may pull a readable message out of a backend's error body; the
/// raw body is used when it returns `None`.
pub(crate) async fn check_status(
    response: reqwest::Response,
    model: &str,
    detail: fn(&str) -> Option<String>,
) -> Result<reqwest::Response, ProviderError> {
    let status = response.status().as_u16();
    match status {
        s if s < 400 => Ok(response),
        429 => Err(ProviderError::RateLimited {
            retry_after_ms: retry_after_ms(&response),
        }),
        404 => Err(ProviderError::ModelNotFound(model.to_string())),
        _ => {
            let body = response.text().await.unwrap_or_default();
            let message = detail(&body).unwrap_or(body);
            if status == 401 {
                Err(ProviderError::AuthenticationFailed(message))
            } else {
                Err(ProviderError::ApiError { status, message })
            }
        }
    }
}

pub(crate) fn raw_body(_: &str) -> Option<String> {
    None
}

/// Decode a success body; a shape mismatch is an API error, not a transport one.
pub(crate) async fn read_json<T: DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, ProviderError> {
    response.json().await.map_err(|e| ProviderError::ApiError {
        status: 0,
        message: format!("failed to parse response: {e}"),
    })
}

/// The prompt followed by one text line per attachment. Payloads are never
/// inlined.
pub(crate) fn with_media_references<'a>(
    prompt: &str,
    media: impl IntoIterator<Item = &'a MediaPart>,
) -> String {
    let mut text = prompt.to_string();
    for part in media {
        text.push_str("\n\nAttached media: ");
        text.push_str(&part.describe());
    }
    text
}
