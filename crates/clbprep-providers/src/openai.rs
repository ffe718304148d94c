//! OpenAI-compatible chat completions provider.

use std::time::Instant;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use clbprep_core::traits::{
    GenerateRequest, GenerateResponse, LlmProvider, MediaPart, ModelInfo, TokenUsage,
    DEFAULT_SYSTEM_PROMPT,
};

use crate::error::from_transport;
use crate::http;

const DEFAULT_BASE_URL: &str = "https://api.openai.com";
const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// OpenAI-compatible API provider.
pub struct OpenAiProvider {
    api_key: String,
    base_url: String,
    org_id: Option<String>,
    client: reqwest::Client,
}

impl OpenAiProvider {
    pub fn new(
        api_key: &str,
        base_url: Option<String>,
        org_id: Option<String>,
    ) -> anyhow::Result<Self> {
        Ok(Self {
            api_key: api_key.to_string(),
            base_url: base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            org_id,
            client: http::client(DEFAULT_TIMEOUT_SECS)?,
        })
    }
}

#[derive(Serialize)]
struct OpenAiRequest {
    model: String,
    max_tokens: u32,
    temperature: f64,
    messages: Vec<OpenAiMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<serde_json::Value>,
}

#[derive(Serialize)]
struct OpenAiMessage {
    role: &'static str,
    content: OpenAiContent,
}

#[derive(Serialize)]
#[serde(untagged)]
enum OpenAiContent {
    Text(String),
    Parts(Vec<OpenAiPart>),
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum OpenAiPart {
    Text { text: String },
    InputAudio { input_audio: OpenAiAudio },
}

#[derive(Serialize)]
struct OpenAiAudio {
    data: String,
    format: &'static str,
}

#[derive(Deserialize)]
struct OpenAiResponse {
    choices: Vec<OpenAiChoice>,
    #[serde(default)]
    usage: OpenAiUsage,
    model: String,
}

#[derive(Deserialize)]
struct OpenAiChoice {
    message: OpenAiChoiceMessage,
}

#[derive(Deserialize)]
struct OpenAiChoiceMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    refusal: Option<String>,
}

#[derive(Deserialize, Default)]
struct OpenAiUsage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
    #[serde(default)]
    total_tokens: u32,
}

/// String length bounds that strict structured outputs reject. Empty text is
/// caught when the reply is checked instead.
const UNSUPPORTED_STRICT_KEYWORDS: [&str; 2] = ["minLength", "maxLength"];

/// Copy of `schema` without the keywords strict mode refuses.
fn strict_schema(schema: &serde_json::Value) -> serde_json::Value {
    match schema {
        serde_json::Value::Object(map) => map
            .iter()
            .filter(|(key, _)| !UNSUPPORTED_STRICT_KEYWORDS.contains(&key.as_str()))
            .map(|(key, value)| (key.clone(), strict_schema(value)))
            .collect(),
        serde_json::Value::Array(items) => items.iter().map(strict_schema).collect(),
        other => other.clone(),
    }
}

/// Audio format name the API accepts for a MIME type.
fn audio_format(content_type: Option<&str>) -> Option<&'static str> {
    match content_type? {
        "audio/wav" | "audio/x-wav" | "audio/wave" => Some("wav"),
        "audio/mpeg" | "audio/mp3" => Some("mp3"),
        _ => None,
    }
}

/// Build the user message: inline audio where the API supports it, a text
/// reference otherwise.
fn user_content(prompt: &str, media: &[MediaPart]) -> OpenAiContent {
    if media.is_empty() {
        return OpenAiContent::Text(prompt.to_string());
    }

    let mut referenced = Vec::new();
    let mut audio = Vec::new();
    for part in media {
        match (audio_format(part.content_type.as_deref()), part.base64_payload()) {
            (Some(format), Some(data)) => audio.push(OpenAiPart::InputAudio {
                input_audio: OpenAiAudio {
                    data: data.to_string(),
                    format,
                },
            }),
            _ => referenced.push(part),
        }
    }

    let text = http::with_media_references(prompt, referenced);
    OpenAiContent::Parts(std::iter::once(OpenAiPart::Text { text }).chain(audio).collect())
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    #[instrument(skip(self, request), fields(model = %request.model))]
    async fn generate(&self, request: &GenerateRequest) -> anyhow::Result<GenerateResponse> {
        let start = Instant::now();

        let system_prompt = request
            .system_prompt
            .clone()
            .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string());

        let response_format = request.output_schema.as_ref().map(|schema| {
            serde_json::json!({
                "type": "json_schema",
                "json_schema": {
                    "name": schema.name,
                    "schema": strict_schema(&schema.schema),
                    "strict": true,
                }
            })
        });

        let body = OpenAiRequest {
            model: request.model.clone(),
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            messages: vec![
                OpenAiMessage {
                    role: "system",
                    content: OpenAiContent::Text(system_prompt),
                },
                OpenAiMessage {
                    role: "user",
                    content: user_content(&request.prompt, &request.media),
                },
            ],
            response_format,
        };

        let mut req = self
            .client
            .post(format!("{}/v1/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("content-type", "application/json");

        if let Some(org) = &self.org_id {
            req = req.header("OpenAI-Organization", org);
        }

        let response = req
            .json(&body)
            .send()
            .await
            .map_err(|e| from_transport(e, DEFAULT_TIMEOUT_SECS))?;

        let response = http::check_status(response, &request.model, http::raw_body).await?;
        let reply: OpenAiResponse = http::read_json(response).await?;

        let content = match reply.choices.into_iter().next().map(|c| c.message) {
            Some(OpenAiChoiceMessage {
                content,
                refusal: Some(refusal),
            }) => {
                tracing::warn!(%refusal, "model refused the request");
                content.unwrap_or_default()
            }
            Some(message) => message.content.unwrap_or_default(),
            None => String::new(),
        };

        let OpenAiUsage {
            prompt_tokens,
            completion_tokens,
            total_tokens,
        } = reply.usage;

        Ok(GenerateResponse {
            content,
            model: reply.model,
            token_usage: TokenUsage {
                prompt_tokens,
                completion_tokens,
                total_tokens,
                // GPT-4.1 mini list price, $0.40 in / $1.60 out per million tokens.
                estimated_cost_usd: (prompt_tokens as f64 * 0.4 + completion_tokens as f64 * 1.6)
                    / 1_000_000.0,
            },
            latency_ms: start.elapsed().as_millis() as u64,
        })
    }

    fn available_models(&self) -> Vec<ModelInfo> {
        vec![
            ModelInfo {
                id: "gpt-4.1".into(),
                name: "GPT-4.1".into(),
                provider: "openai".into(),
                max_context: 1_000_000,
                cost_per_1k_input: 0.002,
                cost_per_1k_output: 0.008,
            },
            ModelInfo {
                id: "gpt-4.1-mini".into(),
                name: "GPT-4.1 Mini".into(),
                provider: "openai".into(),
                max_context: 1_000_000,
                cost_per_1k_input: 0.0004,
                cost_per_1k_output: 0.0016,
            },
            ModelInfo {
                id: "gpt-4o-audio-preview".into(),
                name: "GPT-4o Audio".into(),
                provider: "openai".into(),
                max_context: 128_000,
                cost_per_1k_input: 0.0025,
                cost_per_1k_output: 0.01,
            },
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProviderError;
    use clbprep_core::schema::output_schema;
    use clbprep_core::Skill;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn request(model: &str) -> GenerateRequest {
        GenerateRequest {
            model: model.into(),
            prompt: "Évaluez cette réponse.".into(),
            system_prompt: None,
            media: vec![],
            output_schema: None,
            max_tokens: 1024,
            temperature: 0.0,
        }
    }

    #[tokio::test]
    async fn successful_generation_with_schema() {
        let server = MockServer::start().await;

        let response_body = serde_json::json!({
            "choices": [{"message": {"content": "{\"score\": 70}", "role": "assistant"}, "index": 0}],
            "model": "gpt-4.1-mini",
            "usage": {"prompt_tokens": 40, "completion_tokens": 15, "total_tokens": 55}
        });

        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("Authorization", "Bearer test-key"))
            .and(body_partial_json(serde_json::json!({
                "response_format": {
                    "type": "json_schema",
                    "json_schema": {"name": "reading_assessment"}
                }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(&response_body))
            .mount(&server)
            .await;

        let provider = OpenAiProvider::new("test-key", Some(server.uri()), None).unwrap();
        let mut req = request("gpt-4.1-mini");
        req.output_schema = Some(output_schema(Skill::Reading));

        let response = provider.generate(&req).await.unwrap();
        assert_eq!(response.content, "{\"score\": 70}");
        assert_eq!(response.token_usage.total_tokens, 55);
    }

    #[tokio::test]
    async fn wav_recording_sent_as_input_audio() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(body_partial_json(serde_json::json!({
                "messages": [
                    {"role": "system"},
                    {"role": "user", "content": [
                        {"type": "text"},
                        {"type": "input_audio", "input_audio": {"data": "UklGRg==", "format": "wav"}}
                    ]}
                ]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{"message": {"content": "{}"}}],
                "model": "gpt-4o-audio-preview"
            })))
            .mount(&server)
            .await;

        let provider = OpenAiProvider::new("key", Some(server.uri()), None).unwrap();
        let mut req = request("gpt-4o-audio-preview");
        req.media = vec![MediaPart::from_uri("data:audio/wav;base64,UklGRg==")];

        let response = provider.generate(&req).await.unwrap();
        assert_eq!(response.model, "gpt-4o-audio-preview");
    }

    #[test]
    fn strict_schema_drops_length_bounds_only() {
        let schema = output_schema(Skill::Speaking).schema;
        assert!(schema.to_string().contains("minLength"));

        let strict = strict_schema(&schema);
        let text = strict.to_string();
        assert!(!text.contains("minLength"));
        assert!(text.contains("minItems"));
        assert_eq!(strict["properties"]["score"]["maximum"], 100);
        assert_eq!(strict["required"], schema["required"]);
    }

    #[test]
    fn unsupported_media_becomes_text_reference() {
        let content = user_content(
            "prompt",
            &[MediaPart::from_uri("data:audio/webm;base64,GkXf")],
        );
        let json = serde_json::to_value(&content).unwrap();
        assert_eq!(json.as_array().unwrap().len(), 1);
        let text = json[0]["text"].as_str().unwrap();
        assert!(text.contains("inline audio/webm recording"));
        assert!(!text.contains("GkXf"));
    }

    #[tokio::test]
    async fn null_content_yields_empty_string() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{"message": {"content": null, "refusal": "I can't help with that."}}],
                "model": "gpt-4.1-mini"
            })))
            .mount(&server)
            .await;

        let provider = OpenAiProvider::new("key", Some(server.uri()), None).unwrap();
        let response = provider.generate(&request("gpt-4.1-mini")).await.unwrap();
        assert!(response.content.is_empty());
    }

    #[tokio::test]
    async fn error_response() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(500).set_body_string("internal error"))
            .mount(&server)
            .await;

        let provider = OpenAiProvider::new("key", Some(server.uri()), None).unwrap();
        let err = provider
            .generate(&request("gpt-4.1-mini"))
            .await
            .unwrap_err();
        let provider_error = err.downcast::<ProviderError>().unwrap();
        assert!(matches!(
            provider_error,
            ProviderError::ApiError { status: 500, .. }
        ));
    }

    #[tokio::test]
    async fn rate_limiting_reads_retry_after() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "7"))
            .mount(&server)
            .await;

        let provider = OpenAiProvider::new("key", Some(server.uri()), None).unwrap();
        let err = provider
            .generate(&request("gpt-4.1-mini"))
            .await
            .unwrap_err();
        let provider_error = err.downcast::<ProviderError>().unwrap();
        assert_eq!(provider_error.retry_after_ms(), Some(7000));
    }

    #[tokio::test]
    async fn huge_retry_after_saturates() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(
                ResponseTemplate::new(429).insert_header("retry-after", "18446744073709551615"),
            )
            .mount(&server)
            .await;

        let provider = OpenAiProvider::new("key", Some(server.uri()), None).unwrap();
        let err = provider
            .generate(&request("gpt-4.1-mini"))
            .await
            .unwrap_err();
        let provider_error = err.downcast::<ProviderError>().unwrap();
        assert_eq!(provider_error.retry_after_ms(), Some(u64::MAX));
    }
}
