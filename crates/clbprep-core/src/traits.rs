//! Generation-service trait and its request/response types.
//!
//! Implemented by the backends in `clbprep-providers`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Trait for text-generation backends that produce structured assessments.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Human-readable provider name (e.g. "openai").
    fn name(&self) -> &str;

    /// Generate a completion for a prompt.
    ///
    /// Transport and HTTP failures should be returned as
    /// [`ProviderError`](crate::error::ProviderError) so callers can classify
    /// them.
    async fn generate(&self, request: &GenerateRequest) -> anyhow::Result<GenerateResponse>;

    /// List available models for this provider.
    fn available_models(&self) -> Vec<ModelInfo>;
}

/// Request to generate a completion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateRequest {
    /// Model identifier (e.g. "gpt-4.1-mini").
    pub model: String,
    /// The rendered prompt.
    pub prompt: String,
    /// Optional system prompt override.
    #[serde(default)]
    pub system_prompt: Option<String>,
    /// Media referenced by the prompt (recordings for speaking).
    #[serde(default)]
    pub media: Vec<MediaPart>,
    /// JSON schema the output must satisfy, when structured output is wanted.
    #[serde(default)]
    pub output_schema: Option<OutputSchema>,
    /// Maximum tokens to generate.
    pub max_tokens: u32,
    /// Sampling temperature.
    pub temperature: f64,
}

/// A named JSON schema used as a generation contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputSchema {
    /// Identifier some APIs require (letters, digits, `_`, `-`).
    pub name: String,
    pub schema: serde_json::Value,
}

/// A media reference attached to a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaPart {
    /// `data:` URI or remote URL.
    pub url: String,
    /// MIME type, when known.
    #[serde(default)]
    pub content_type: Option<String>,
}

impl MediaPart {
    /// Build a media part, taking the MIME type from a `data:` URI if present.
    /// Surrounding whitespace is dropped.
    pub fn from_uri(uri: &str) -> Self {
        let uri = uri.trim();
        let content_type = uri
            .strip_prefix("data:")
            .and_then(|rest| rest.split([';', ',']).next())
            .filter(|mime| !mime.is_empty())
            .map(str::to_string);
        Self {
            url: uri.to_string(),
            content_type,
        }
    }

    /// Base64 payload of a `data:...;base64,` URI.
    pub fn base64_payload(&self) -> Option<&str> {
        let rest = self.url.strip_prefix("data:")?;
        let (meta, payload) = rest.split_once(',')?;
        meta.ends_with(";base64").then_some(payload)
    }

    /// Short description for text-only backends; never includes the payload.
    pub fn describe(&self) -> String {
        match (&self.content_type, self.url.starts_with("data:")) {
            (Some(mime), true) => format!("inline {mime} recording"),
            (None, true) => "inline recording".to_string(),
            (_, false) => self.url.clone(),
        }
    }
}

/// Response from a generation request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateResponse {
    /// The raw response content.
    pub content: String,
    /// Model that actually generated the response.
    pub model: String,
    /// Token usage.
    pub token_usage: TokenUsage,
    /// Latency in milliseconds.
    pub latency_ms: u64,
}

/// Token accounting for a single generation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
    pub estimated_cost_usd: f64,
}

/// Information about an available model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelInfo {
    /// Model identifier.
    pub id: String,
    /// Human-readable model name.
    pub name: String,
    /// Provider name.
    pub provider: String,
    /// Maximum context window size in tokens.
    pub max_context: u32,
    /// Cost per 1K input tokens in USD.
    pub cost_per_1k_input: f64,
    /// Cost per 1K output tokens in USD.
    pub cost_per_1k_output: f64,
}

/// Default system prompt for assessment requests.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are an experienced examiner for French as a second language (TEF Canada, TCF Canada) who rates learners against the Canadian Language Benchmarks. Write all feedback in English, quote the learner's French where useful, and respond ONLY with a JSON object matching the requested schema.";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn media_part_reads_data_uri_mime() {
        let part = MediaPart::from_uri("data:audio/webm;base64,GkXf");
        assert_eq!(part.content_type.as_deref(), Some("audio/webm"));
        assert_eq!(part.base64_payload(), Some("GkXf"));
        assert_eq!(part.describe(), "inline audio/webm recording");
    }

    #[test]
    fn media_part_remote_url() {
        let part = MediaPart::from_uri("https://cdn.example.com/answer.mp3");
        assert!(part.content_type.is_none());
        assert!(part.base64_payload().is_none());
        assert_eq!(part.describe(), "https://cdn.example.com/answer.mp3");
    }

    #[test]
    fn padded_data_uri_is_still_described_without_payload() {
        let part = MediaPart::from_uri("  data:audio/webm;base64,SECRETPAYLOAD\n");
        assert_eq!(part.url, "data:audio/webm;base64,SECRETPAYLOAD");
        assert_eq!(part.content_type.as_deref(), Some("audio/webm"));
        assert_eq!(part.describe(), "inline audio/webm recording");
    }
}
