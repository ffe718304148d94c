//! Ollama (local model) provider.

use std::time::Instant;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use clbprep_core::traits::{
    GenerateRequest, GenerateResponse, LlmProvider, ModelInfo, TokenUsage, DEFAULT_SYSTEM_PROMPT,
};

use crate::error::{from_transport, ProviderError};
use crate::http;

const DEFAULT_BASE_URL: &str = "http://localhost:11434";
// Local models are slow on CPU.
const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// Ollama local model provider.
pub struct OllamaProvider {
    base_url: String,
    client: reqwest::Client,
}

impl OllamaProvider {
    pub fn new(base_url: &str) -> anyhow::Result<Self> {
        let base = if base_url.is_empty() {
            DEFAULT_BASE_URL
        } else {
            base_url
        };

        Ok(Self {
            base_url: base.trim_end_matches('/').to_string(),
            client: http::client(DEFAULT_TIMEOUT_SECS)?,
        })
    }

    fn unreachable(&self) -> ProviderError {
        ProviderError::NetworkError(format!(
            "Ollama not reachable at {}. Is it running? Start with: ollama serve",
            self.base_url
        ))
    }

    fn transport_error(&self, error: reqwest::Error) -> ProviderError {
        if error.is_connect() {
            self.unreachable()
        } else {
            from_transport(error, DEFAULT_TIMEOUT_SECS)
        }
    }
}

#[derive(Serialize)]
struct OllamaRequest {
    model: String,
    messages: Vec<OllamaMessage>,
    stream: bool,
    /// JSON schema for structured output.
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<serde_json::Value>,
    options: OllamaOptions,
}

#[derive(Serialize)]
struct OllamaMessage {
    role: &'static str,
    content: String,
}

#[derive(Serialize)]
struct OllamaOptions {
    temperature: f64,
    num_predict: u32,
}

#[derive(Deserialize)]
struct OllamaResponse {
    message: OllamaResponseMessage,
    model: String,
    #[serde(default)]
    prompt_eval_count: Option<u32>,
    #[serde(default)]
    eval_count: Option<u32>,
}

#[derive(Deserialize)]
struct OllamaResponseMessage {
    #[serde(default)]
    content: String,
}

#[derive(Deserialize)]
struct OllamaTagsResponse {
    models: Vec<OllamaModelEntry>,
}

#[derive(Deserialize)]
struct OllamaModelEntry {
    name: String,
}

#[async_trait]
impl LlmProvider for OllamaProvider {
    fn name(&self) -> &str {
        "ollama"
    }

    #[instrument(skip(self, request), fields(model = %request.model))]
    async fn generate(&self, request: &GenerateRequest) -> anyhow::Result<GenerateResponse> {
        let start = Instant::now();

        let system_prompt = request
            .system_prompt
            .clone()
            .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string());

        if !request.media.is_empty() {
            tracing::warn!(
                parts = request.media.len(),
                "ollama cannot consume media; passing references only"
            );
        }

        let body = OllamaRequest {
            model: request.model.clone(),
            messages: vec![
                OllamaMessage {
                    role: "system",
                    content: system_prompt,
                },
                OllamaMessage {
                    role: "user",
                    content: http::with_media_references(&request.prompt, &request.media),
                },
            ],
            stream: false,
            format: request.output_schema.as_ref().map(|s| s.schema.clone()),
            options: OllamaOptions {
                temperature: request.temperature,
                num_predict: request.max_tokens,
            },
        };

        let response = self
            .client
            .post(format!("{}/api/chat", self.base_url))
            .json(&body)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let response = http::check_status(response, &request.model, http::raw_body)
            .await
            .map_err(|e| match e {
                ProviderError::ModelNotFound(model) => ProviderError::ModelNotFound(format!(
                    "Model '{model}' not found locally. Pull it with: ollama pull {model}"
                )),
                other => other,
            })?;
        let reply: OllamaResponse = http::read_json(response).await?;

        let prompt_tokens = reply.prompt_eval_count.unwrap_or(0);
        let completion_tokens = reply.eval_count.unwrap_or(0);

        Ok(GenerateResponse {
            content: reply.message.content,
            model: reply.model,
            token_usage: TokenUsage {
                prompt_tokens,
                completion_tokens,
                total_tokens: prompt_tokens + completion_tokens,
                estimated_cost_usd: 0.0,
            },
            latency_ms: start.elapsed().as_millis() as u64,
        })
    }

    fn available_models(&self) -> Vec<ModelInfo> {
        // Sync context; the CLI calls list_models_async for the live list.
        vec![]
    }
}

impl OllamaProvider {
    /// Fetch the models pulled on the Ollama instance.
    pub async fn list_models_async(&self) -> anyhow::Result<Vec<ModelInfo>> {
        let response = self
            .client
            .get(format!("{}/api/tags", self.base_url))
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;
        let response = http::check_status(response, "", http::raw_body).await?;
        let tags: OllamaTagsResponse = http::read_json(response).await?;

        Ok(tags
            .models
            .into_iter()
            .map(|m| ModelInfo {
                id: m.name.clone(),
                name: m.name,
                provider: "ollama".into(),
                max_context: 0,
                cost_per_1k_input: 0.0,
                cost_per_1k_output: 0.0,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clbprep_core::schema::output_schema;
    use clbprep_core::Skill;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn request(model: &str) -> GenerateRequest {
        GenerateRequest {
            model: model.into(),
            prompt: "Évaluez cette réponse.".into(),
            system_prompt: None,
            media: vec![],
            output_schema: Some(output_schema(Skill::Listening)),
            max_tokens: 1024,
            temperature: 0.0,
        }
    }

    #[tokio::test]
    async fn schema_sent_as_format() {
        let server = MockServer::start().await;

        let response_body = serde_json::json!({
            "message": {"role": "assistant", "content": "{\"score\": 40}"},
            "model": "llama3.1:8b",
            "prompt_eval_count": 30,
            "eval_count": 15
        });

        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .and(body_partial_json(serde_json::json!({
                "stream": false,
                "format": {"required": ["feedback", "score", "suggestions"]},
                "options": {"num_predict": 1024}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(&response_body))
            .mount(&server)
            .await;

        let provider = OllamaProvider::new(&server.uri()).unwrap();
        let response = provider.generate(&request("llama3.1:8b")).await.unwrap();
        assert_eq!(response.content, "{\"score\": 40}");
        assert_eq!(response.token_usage.total_tokens, 45);
        assert_eq!(response.token_usage.estimated_cost_usd, 0.0);
    }

    #[tokio::test]
    async fn model_not_found() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(ResponseTemplate::new(404).set_body_string("model not found"))
            .mount(&server)
            .await;

        let provider = OllamaProvider::new(&server.uri()).unwrap();
        let err = provider.generate(&request("nonexistent")).await.unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[tokio::test]
    async fn dynamic_model_listing() {
        let server = MockServer::start().await;

        let response_body = serde_json::json!({
            "models": [
                {"name": "llama3.1:8b", "size": 4900000000_u64},
                {"name": "mistral:7b", "size": 4100000000_u64}
            ]
        });

        Mock::given(method("GET"))
            .and(path("/api/tags"))
            .respond_with(ResponseTemplate::new(200).set_body_json(&response_body))
            .mount(&server)
            .await;

        let provider = OllamaProvider::new(&server.uri()).unwrap();
        let models = provider.list_models_async().await.unwrap();
        assert_eq!(models.len(), 2);
        assert_eq!(models[0].id, "llama3.1:8b");
    }

    #[tokio::test]
    async fn stopped_server_gets_a_start_hint() {
        let server = MockServer::start().await;
        let uri = server.uri();
        drop(server);

        let provider = OllamaProvider::new(&uri).unwrap();
        let err = provider.list_models_async().await.unwrap_err();
        assert!(err.to_string().contains("ollama serve"));
    }
}
