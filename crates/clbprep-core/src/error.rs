//! Error types for the assessment pipeline.
//!
//! `ProviderError` lives here rather than in `clbprep-providers` so the
//! orchestrator can downcast provider failures and classify them for retry
//! decisions without string matching.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// Fixed message shown when the model produced nothing usable.
pub const MODEL_OUTPUT_MISSING_MESSAGE: &str = "Failed to get assessment from AI model.";

/// Errors that can occur when interacting with a generation service.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The API returned a 429 rate limit response.
    #[error("rate limited, retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },

    /// Authentication failed (invalid API key).
    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),

    /// The requested model was not found.
    #[error("model not found: {0}")]
    ModelNotFound(String),

    /// The API returned an error response.
    #[error("API error (HTTP {status}): {message}")]
    ApiError { status: u16, message: String },

    /// The request timed out.
    #[error("request timed out after {0}s")]
    Timeout(u64),

    /// A network error occurred.
    #[error("network error: {0}")]
    NetworkError(String),
}

impl ProviderError {
    /// Returns `true` if this error is permanent and should not be retried.
    pub fn is_permanent(&self) -> bool {
        matches!(
            self,
            ProviderError::AuthenticationFailed(_) | ProviderError::ModelNotFound(_)
        )
    }

    /// Returns the retry-after delay in milliseconds, if applicable.
    pub fn retry_after_ms(&self) -> Option<u64> {
        match self {
            ProviderError::RateLimited { retry_after_ms } => Some(*retry_after_ms),
            _ => None,
        }
    }
}

/// Field-keyed validation messages for a rejected submission.
///
/// Keys are the wire (camelCase) field names so a form can render the
/// messages inline next to the offending input.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationErrors {
    fields: BTreeMap<String, Vec<String>>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a message against a field.
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.fields
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Messages recorded for a single field.
    pub fn field(&self, name: &str) -> Option<&[String]> {
        self.fields.get(name).map(Vec::as_slice)
    }

    pub fn fields(&self) -> &BTreeMap<String, Vec<String>> {
        &self.fields
    }

    /// `Ok(())` when nothing was recorded, otherwise `Err(self)`.
    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, messages) in &self.fields {
            for message in messages {
                if !first {
                    write!(f, "; ")?;
                }
                write!(f, "{field}: {message}")?;
                first = false;
            }
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

/// A prompt template could not be rendered.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TemplateError {
    #[error("template '{template}' has no binding for placeholder '{placeholder}'")]
    MissingBinding {
        template: &'static str,
        placeholder: String,
    },

    #[error("template '{template}' has an unterminated placeholder")]
    Unterminated { template: &'static str },
}

/// Failures surfaced by the `assess_*` caller functions.
#[derive(Debug, Error)]
pub enum AssessmentError {
    /// The submission failed input constraints. Nothing was sent to the model.
    #[error("invalid submission: {0}")]
    Validation(ValidationErrors),

    /// The generation service could not be reached or rejected the request.
    #[error("model unavailable: {0}")]
    ModelUnavailable(#[source] ProviderError),

    /// The service answered but produced no parseable structured output.
    #[error("{}", MODEL_OUTPUT_MISSING_MESSAGE)]
    ModelOutputMissing,

    /// The service produced JSON that does not satisfy the output schema.
    #[error("model output rejected: {0}")]
    ModelOutputInvalid(String),

    /// A prompt template could not be rendered.
    #[error(transparent)]
    Template(#[from] TemplateError),
}

impl AssessmentError {
    /// Whether resubmitting the same request later could succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            AssessmentError::ModelUnavailable(e) => !e.is_permanent(),
            _ => false,
        }
    }

    /// Field errors, when the failure was a validation rejection.
    pub fn field_errors(&self) -> Option<&ValidationErrors> {
        match self {
            AssessmentError::Validation(errors) => Some(errors),
            _ => None,
        }
    }
}

impl From<ValidationErrors> for AssessmentError {
    fn from(errors: ValidationErrors) -> Self {
        AssessmentError::Validation(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn permanent_provider_errors() {
        assert!(ProviderError::AuthenticationFailed("bad".into()).is_permanent());
        assert!(ProviderError::ModelNotFound("x".into()).is_permanent());
        assert!(!ProviderError::Timeout(120).is_permanent());
        assert_eq!(
            ProviderError::RateLimited {
                retry_after_ms: 5000
            }
            .retry_after_ms(),
            Some(5000)
        );
    }

    #[test]
    fn output_missing_message_is_fixed() {
        assert_eq!(
            AssessmentError::ModelOutputMissing.to_string(),
            "Failed to get assessment from AI model."
        );
    }

    #[test]
    fn retryable_classification() {
        let transient = AssessmentError::ModelUnavailable(ProviderError::NetworkError("x".into()));
        let permanent =
            AssessmentError::ModelUnavailable(ProviderError::AuthenticationFailed("x".into()));
        assert!(transient.is_retryable());
        assert!(!permanent.is_retryable());
        assert!(!AssessmentError::ModelOutputMissing.is_retryable());
    }

    #[test]
    fn validation_errors_display_is_sorted() {
        let mut errors = ValidationErrors::new();
        errors.add("promptText", "must not be empty");
        errors.add("audioDataUri", "must not be empty");
        assert_eq!(
            errors.to_string(),
            "audioDataUri: must not be empty; promptText: must not be empty"
        );
        assert!(errors.into_result().is_err());
        assert!(ValidationErrors::new().into_result().is_ok());
    }
}
