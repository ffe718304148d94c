//! clbprep-providers — Generation-service backends.
//!
//! Implements the `LlmProvider` trait for Anthropic, OpenAI-compatible APIs
//! and Ollama, plus a mock, and loads the `clbprep.toml` configuration that
//! picks one of them.

pub mod anthropic;
pub mod config;
pub mod error;
mod http;
pub mod mock;
pub mod ollama;
pub mod openai;

pub use config::{build_assessor, create_provider, load_config, ClbprepConfig, ProviderConfig};
pub use error::ProviderError;
