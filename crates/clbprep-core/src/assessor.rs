//! Flow orchestrator and caller-facing entry points.
//!
//! `Assessor` validates a submission, renders its prompt, calls the
//! generation service with the skill's output schema and turns the reply into
//! a typed result or a typed failure.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::instrument;

use crate::error::{AssessmentError, ProviderError};
use crate::flow::{has_offline_fixture, render_prompt, AssessmentFlow};
use crate::model::{
    Assessment, ListeningAssessment, ListeningInput, ReadingAssessment, ReadingInput, Skill,
    SpeakingAssessment, SpeakingInput, WritingAssessment, WritingInput,
};
use crate::schema::{extract_json_object, output_schema};
use crate::traits::{GenerateRequest, LlmProvider, DEFAULT_SYSTEM_PROMPT};

/// Settings for the orchestrator.
#[derive(Debug, Clone)]
pub struct AssessorConfig {
    /// Model identifier passed to the provider.
    pub model: String,
    /// Sampling temperature.
    pub temperature: f64,
    /// Max tokens for generation.
    pub max_tokens: u32,
    /// Optional system prompt override.
    pub system_prompt: Option<String>,
    /// Skills answered from offline fixtures instead of the model.
    pub offline: BTreeSet<Skill>,
    /// Retries on transient provider errors. Output errors are never retried.
    pub max_retries: u32,
    /// Delay before the first retry; doubles on each subsequent one.
    pub retry_delay: Duration,
}

impl Default for AssessorConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4.1-mini".to_string(),
            temperature: 0.2,
            max_tokens: 2048,
            system_prompt: None,
            offline: BTreeSet::new(),
            max_retries: 0,
            retry_delay: Duration::from_secs(1),
        }
    }
}

/// A skill was configured offline but has no fixture to serve.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("{0} has no offline fixture; only speaking and writing can run offline")]
pub struct NoOfflineFixture(pub Skill);

/// Runs assessment flows against one generation provider.
pub struct Assessor {
    provider: Arc<dyn LlmProvider>,
    config: AssessorConfig,
}

impl Assessor {
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        config: AssessorConfig,
    ) -> Result<Self, NoOfflineFixture> {
        if let Some(skill) = config.offline.iter().find(|s| !has_offline_fixture(**s)) {
            return Err(NoOfflineFixture(*skill));
        }
        Ok(Self { provider, config })
    }

    pub fn config(&self) -> &AssessorConfig {
        &self.config
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    pub fn is_offline(&self, skill: Skill) -> bool {
        self.config.offline.contains(&skill)
    }

    pub async fn assess_speaking(
        &self,
        input: SpeakingInput,
    ) -> Result<SpeakingAssessment, AssessmentError> {
        self.assess(input).await
    }

    pub async fn assess_writing(
        &self,
        input: WritingInput,
    ) -> Result<WritingAssessment, AssessmentError> {
        self.assess(input).await
    }

    pub async fn assess_reading(
        &self,
        input: ReadingInput,
    ) -> Result<ReadingAssessment, AssessmentError> {
        self.assess(input).await
    }

    pub async fn assess_listening(
        &self,
        input: ListeningInput,
    ) -> Result<ListeningAssessment, AssessmentError> {
        self.assess(input).await
    }

    /// Validate, then run the flow. The provider is never called for an
    /// invalid submission.
    pub async fn assess<F: AssessmentFlow>(&self, input: F) -> Result<F::Output, AssessmentError> {
        input.validate()?;
        self.run(&input).await
    }

    /// Run a flow for an already-validated request.
    #[instrument(skip(self, request), fields(skill = %F::SKILL, model = %self.config.model))]
    pub async fn run<F: AssessmentFlow>(&self, request: &F) -> Result<F::Output, AssessmentError> {
        if self.is_offline(F::SKILL) {
            if let Some(fixture) = F::offline_fixture() {
                tracing::info!("returning offline fixture, model not called");
                return Ok(fixture);
            }
        }

        let generate = GenerateRequest {
            model: self.config.model.clone(),
            prompt: render_prompt(request)?,
            system_prompt: Some(
                self.config
                    .system_prompt
                    .clone()
                    .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string()),
            ),
            media: request.media(),
            output_schema: Some(output_schema(F::SKILL)),
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
        };

        let start = Instant::now();
        let response = self.generate_with_retry(&generate).await?;
        tracing::debug!(
            latency_ms = response.latency_ms,
            tokens = response.token_usage.total_tokens,
            "model replied"
        );

        let output = parse_output::<F>(&response.content).inspect_err(|e| {
            tracing::warn!("rejected model output: {e}");
        })?;
        tracing::info!(
            score = output.score().value(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "assessment complete"
        );
        Ok(output)
    }

    async fn generate_with_retry(
        &self,
        request: &GenerateRequest,
    ) -> Result<crate::traits::GenerateResponse, AssessmentError> {
        let mut retry_delay = self.config.retry_delay;
        let mut attempt = 0;
        loop {
            match self.provider.generate(request).await {
                Ok(response) => return Ok(response),
                Err(e) => {
                    let error = classify_provider_error(e);
                    if attempt >= self.config.max_retries || !error.is_retryable() {
                        return Err(error);
                    }
                    attempt += 1;
                    if let AssessmentError::ModelUnavailable(pe) = &error {
                        if let Some(ms) = pe.retry_after_ms() {
                            retry_delay = Duration::from_millis(ms).min(MAX_RETRY_DELAY);
                        }
                    }
                    tracing::warn!(
                        attempt,
                        delay_ms = retry_delay.as_millis() as u64,
                        "retrying after: {error}"
                    );
                    tokio::time::sleep(retry_delay).await;
                    retry_delay = retry_delay.saturating_mul(2).min(MAX_RETRY_DELAY);
                }
            }
        }
    }
}

/// Upper bound on any single wait, including server-requested ones.
const MAX_RETRY_DELAY: Duration = Duration::from_secs(60);

fn classify_provider_error(error: anyhow::Error) -> AssessmentError {
    match error.downcast::<ProviderError>() {
        Ok(provider_error) => AssessmentError::ModelUnavailable(provider_error),
        Err(other) => AssessmentError::ModelUnavailable(ProviderError::NetworkError(format!(
            "{other:#}"
        ))),
    }
}

/// Turn raw model content into a checked result.
pub fn parse_output<F: AssessmentFlow>(content: &str) -> Result<F::Output, AssessmentError> {
    let value = extract_json_object(content).ok_or(AssessmentError::ModelOutputMissing)?;
    let output: F::Output = serde_json::from_value(value)
        .map_err(|e| AssessmentError::ModelOutputInvalid(e.to_string()))?;
    check_output(&output)?;
    Ok(output)
}

fn check_output<A: Assessment>(output: &A) -> Result<(), AssessmentError> {
    if output
        .transcription()
        .is_some_and(|text| text.trim().is_empty())
    {
        return Err(AssessmentError::ModelOutputInvalid(
            "empty transcription".into(),
        ));
    }
    let empty: Vec<&str> = output
        .feedback_dimensions()
        .into_iter()
        .filter(|(_, text)| text.trim().is_empty())
        .map(|(name, _)| name)
        .collect();
    if !empty.is_empty() {
        return Err(AssessmentError::ModelOutputInvalid(format!(
            "empty feedback for: {}",
            empty.join(", ")
        )));
    }
    if output.suggestions().iter().all(|s| s.trim().is_empty()) {
        return Err(AssessmentError::ModelOutputInvalid(
            "no improvement suggestions".into(),
        ));
    }
    Ok(())
}
