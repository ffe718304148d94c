//! Offline provider for tests and the `type = "mock"` config entry.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use clbprep_core::traits::{GenerateRequest, GenerateResponse, LlmProvider, ModelInfo, TokenUsage};

/// Answers from canned replies without network access.
///
/// Rules are checked in insertion order; the first whose needle occurs in the
/// prompt wins, and the fallback answers everything else.
pub struct MockProvider {
    rules: Vec<(String, String)>,
    fallback: String,
    calls: AtomicU32,
    last_request: Mutex<Option<GenerateRequest>>,
}

impl MockProvider {
    pub fn with_fixed_response(response: &str) -> Self {
        Self {
            rules: Vec::new(),
            fallback: response.to_string(),
            calls: AtomicU32::new(0),
            last_request: Mutex::new(None),
        }
    }

    /// Always replies with empty content, which no assessment can parse.
    pub fn silent() -> Self {
        Self::with_fixed_response("")
    }

    /// Reply with `response` to prompts containing `needle`.
    pub fn with_rule(mut self, needle: &str, response: &str) -> Self {
        self.rules.push((needle.to_string(), response.to_string()));
        self
    }

    pub fn call_count(&self) -> u32 {
        self.calls.load(Ordering::Relaxed)
    }

    pub fn last_request(&self) -> Option<GenerateRequest> {
        self.last_request
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }

    fn reply_for(&self, prompt: &str) -> &str {
        self.rules
            .iter()
            .find(|(needle, _)| prompt.contains(needle.as_str()))
            .map_or(self.fallback.as_str(), |(_, reply)| reply.as_str())
    }
}

/// About four bytes per token; good enough for usage figures nobody bills.
fn approx_tokens(text: &str) -> u32 {
    (text.len() / 4) as u32
}

#[async_trait]
impl LlmProvider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    async fn generate(&self, request: &GenerateRequest) -> anyhow::Result<GenerateResponse> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        if let Ok(mut last) = self.last_request.lock() {
            *last = Some(request.clone());
        }

        let content = self.reply_for(&request.prompt).to_string();
        let prompt_tokens = approx_tokens(&request.prompt);
        let completion_tokens = approx_tokens(&content);

        Ok(GenerateResponse {
            content,
            model: request.model.clone(),
            token_usage: TokenUsage {
                prompt_tokens,
                completion_tokens,
                total_tokens: prompt_tokens + completion_tokens,
                estimated_cost_usd: 0.0,
            },
            latency_ms: 1,
        })
    }

    fn available_models(&self) -> Vec<ModelInfo> {
        vec![ModelInfo {
            id: "mock-model".into(),
            name: "Canned replies".into(),
            provider: "mock".into(),
            max_context: 100_000,
            cost_per_1k_input: 0.0,
            cost_per_1k_output: 0.0,
        }]
    }
}
