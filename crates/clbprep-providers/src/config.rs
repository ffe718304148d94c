//! Configuration loading and provider factory.

use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use clbprep_core::flow::has_offline_fixture;
use clbprep_core::traits::LlmProvider;
use clbprep_core::{Assessor, AssessorConfig, Skill};

use crate::anthropic::AnthropicProvider;
use crate::mock::MockProvider;
use crate::ollama::OllamaProvider;
use crate::openai::OpenAiProvider;

/// Configuration for a single generation provider. `Debug` never prints keys.
#[derive(Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ProviderConfig {
    OpenAI {
        api_key: String,
        #[serde(default)]
        base_url: Option<String>,
        #[serde(default)]
        org_id: Option<String>,
    },
    Anthropic {
        api_key: String,
        #[serde(default)]
        base_url: Option<String>,
    },
    Ollama {
        #[serde(default = "default_ollama_url")]
        base_url: String,
    },
    /// Canned reply for demos and offline testing.
    Mock {
        #[serde(default)]
        response: String,
    },
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderConfig::OpenAI {
                api_key: _,
                base_url,
                org_id,
            } => f
                .debug_struct("OpenAI")
                .field("api_key", &"***")
                .field("base_url", base_url)
                .field("org_id", org_id)
                .finish(),
            ProviderConfig::Anthropic {
                api_key: _,
                base_url,
            } => f
                .debug_struct("Anthropic")
                .field("api_key", &"***")
                .field("base_url", base_url)
                .finish(),
            ProviderConfig::Ollama { base_url } => f
                .debug_struct("Ollama")
                .field("base_url", base_url)
                .finish(),
            ProviderConfig::Mock { response } => f
                .debug_struct("Mock")
                .field("response_len", &response.len())
                .finish(),
        }
    }
}

fn default_ollama_url() -> String {
    "http://localhost:11434".to_string()
}

/// Top-level clbprep configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClbprepConfig {
    /// Provider configurations keyed by name.
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,
    /// Provider used for assessments.
    #[serde(default = "default_provider")]
    pub default_provider: String,
    /// Model used for assessments.
    #[serde(default = "default_model")]
    pub default_model: String,
    /// Sampling temperature.
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    /// Max tokens per generation.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Optional system prompt override.
    #[serde(default)]
    pub system_prompt: Option<String>,
    /// Retries on transient provider errors (0 = single attempt).
    #[serde(default)]
    pub max_retries: u32,
    /// Delay before the first retry in milliseconds.
    #[serde(default = "default_retry_delay")]
    pub retry_delay_ms: u64,
    /// Skills answered from offline fixtures instead of the model.
    #[serde(default)]
    pub offline: Vec<Skill>,
    /// Max concurrent assessments in batch mode.
    #[serde(default = "default_parallelism")]
    pub parallelism: usize,
}

fn default_provider() -> String {
    "openai".to_string()
}
fn default_model() -> String {
    "gpt-4.1-mini".to_string()
}
fn default_temperature() -> f64 {
    0.2
}
fn default_max_tokens() -> u32 {
    2048
}
fn default_retry_delay() -> u64 {
    1000
}
fn default_parallelism() -> usize {
    4
}

impl Default for ClbprepConfig {
    fn default() -> Self {
        Self {
            providers: HashMap::new(),
            default_provider: default_provider(),
            default_model: default_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            system_prompt: None,
            max_retries: 0,
            retry_delay_ms: default_retry_delay(),
            offline: Vec::new(),
            parallelism: default_parallelism(),
        }
    }
}

impl ClbprepConfig {
    /// Check settings that serde cannot express.
    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(
            (0.0..=2.0).contains(&self.temperature),
            "temperature must be between 0.0 and 2.0"
        );
        anyhow::ensure!(self.max_tokens > 0, "max_tokens must be at least 1");
        anyhow::ensure!(self.parallelism >= 1, "parallelism must be at least 1");
        if let Some(skill) = self.offline.iter().find(|s| !has_offline_fixture(**s)) {
            anyhow::bail!(
                "'{skill}' cannot run offline: only speaking and writing have offline fixtures"
            );
        }
        Ok(())
    }

    /// Orchestrator settings derived from this configuration.
    pub fn assessor_config(&self) -> AssessorConfig {
        AssessorConfig {
            model: self.default_model.clone(),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            system_prompt: self.system_prompt.clone(),
            offline: self.offline.iter().copied().collect::<BTreeSet<_>>(),
            max_retries: self.max_retries,
            retry_delay: Duration::from_millis(self.retry_delay_ms),
        }
    }
}

/// Expand `${NAME}` references from the environment. Unset variables expand
/// to nothing; an unterminated `${` is kept as written.
fn resolve_env_vars(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(open) = rest.find("${") {
        let Some(len) = rest[open + 2..].find('}') else {
            break;
        };
        out.push_str(&rest[..open]);
        let name = &rest[open + 2..open + 2 + len];
        out.push_str(&std::env::var(name).unwrap_or_default());
        rest = &rest[open + 3 + len..];
    }
    out.push_str(rest);
    out
}

impl ProviderConfig {
    /// Expand env references in every string that can hold a credential or
    /// endpoint. Mock replies are taken literally.
    fn expand_env(&mut self) {
        let expand = |value: &mut String| *value = resolve_env_vars(value);
        match self {
            ProviderConfig::OpenAI {
                api_key,
                base_url,
                org_id,
            } => {
                expand(api_key);
                base_url.iter_mut().for_each(expand);
                org_id.iter_mut().for_each(expand);
            }
            ProviderConfig::Anthropic { api_key, base_url } => {
                expand(api_key);
                base_url.iter_mut().for_each(expand);
            }
            ProviderConfig::Ollama { base_url } => expand(base_url),
            ProviderConfig::Mock { .. } => {}
        }
    }

    fn api_key_mut(&mut self) -> Option<&mut String> {
        match self {
            ProviderConfig::OpenAI { api_key, .. } | ProviderConfig::Anthropic { api_key, .. } => {
                Some(api_key)
            }
            ProviderConfig::Ollama { .. } | ProviderConfig::Mock { .. } => None,
        }
    }
}

/// Env variables that set a hosted provider's key, with the entry created
/// when the file does not configure that provider.
fn key_overrides() -> [(&'static str, &'static str, ProviderConfig); 2] {
    [
        (
            "CLBPREP_ANTHROPIC_KEY",
            "anthropic",
            ProviderConfig::Anthropic {
                api_key: String::new(),
                base_url: None,
            },
        ),
        (
            "CLBPREP_OPENAI_KEY",
            "openai",
            ProviderConfig::OpenAI {
                api_key: String::new(),
                base_url: None,
                org_id: None,
            },
        ),
    ]
}

/// Load configuration from well-known paths.
///
/// Search order:
/// 1. `clbprep.toml` in the current directory
/// 2. `~/.config/clbprep/config.toml`
///
/// Environment variable overrides: `CLBPREP_OPENAI_KEY`, `CLBPREP_ANTHROPIC_KEY`.
pub fn load_config() -> Result<ClbprepConfig> {
    load_config_from(None)
}

/// Load config from an explicit path, or search the default locations.
pub fn load_config_from(path: Option<&Path>) -> Result<ClbprepConfig> {
    let config_path = if let Some(p) = path {
        if p.exists() {
            Some(p.to_path_buf())
        } else {
            anyhow::bail!("config file not found: {}", p.display());
        }
    } else {
        let local = PathBuf::from("clbprep.toml");
        if local.exists() {
            Some(local)
        } else {
            dirs_path()
                .map(|home| home.join("config.toml"))
                .filter(|global| global.exists())
        }
    };

    let mut config = match config_path {
        Some(path) => {
            tracing::debug!("loading config from {}", path.display());
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read config: {}", path.display()))?;
            toml::from_str::<ClbprepConfig>(&content)
                .with_context(|| format!("failed to parse config: {}", path.display()))?
        }
        None => ClbprepConfig::default(),
    };

    for provider in config.providers.values_mut() {
        provider.expand_env();
    }
    for (var, name, blank) in key_overrides() {
        let Ok(key) = std::env::var(var) else {
            continue;
        };
        // A same-named entry of another type keeps its own settings.
        if let Some(slot) = config.providers.entry(name.into()).or_insert(blank).api_key_mut() {
            *slot = key;
        }
    }

    config.validate()?;
    Ok(config)
}

fn dirs_path() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("clbprep"))
}

/// Create a provider instance from its configuration.
pub fn create_provider(config: &ProviderConfig) -> Result<Box<dyn LlmProvider>> {
    Ok(match config {
        ProviderConfig::Anthropic { api_key, base_url } => {
            Box::new(AnthropicProvider::new(api_key, base_url.clone())?)
        }
        ProviderConfig::OpenAI {
            api_key,
            base_url,
            org_id,
        } => Box::new(OpenAiProvider::new(
            api_key,
            base_url.clone(),
            org_id.clone(),
        )?),
        ProviderConfig::Ollama { base_url } => Box::new(OllamaProvider::new(base_url)?),
        ProviderConfig::Mock { response } => Box::new(MockProvider::with_fixed_response(response)),
    })
}

/// Build an assessor for the configured default provider.
pub fn build_assessor(config: &ClbprepConfig) -> Result<Assessor> {
    let provider_config = config
        .providers
        .get(&config.default_provider)
        .with_context(|| {
            format!(
                "provider '{}' not found in config. Available: {:?}",
                config.default_provider,
                config.providers.keys().collect::<Vec<_>>()
            )
        })?;
    let provider: Arc<dyn LlmProvider> = Arc::from(create_provider(provider_config)?);
    Ok(Assessor::new(provider, config.assessor_config())?)
}
