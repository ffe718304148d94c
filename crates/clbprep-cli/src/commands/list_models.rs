//! The `clbprep list-models` command.

use std::path::PathBuf;

use anyhow::Result;

use clbprep_core::traits::ModelInfo;
use clbprep_providers::config::load_config_from;
use clbprep_providers::ollama::OllamaProvider;
use clbprep_providers::{create_provider, ProviderConfig};

async fn models_for(config: &ProviderConfig) -> Result<Vec<ModelInfo>> {
    match config {
        // Ollama reports what is pulled locally.
        ProviderConfig::Ollama { base_url } => {
            OllamaProvider::new(base_url)?.list_models_async().await
        }
        other => Ok(create_provider(other)?.available_models()),
    }
}

pub async fn execute(provider_filter: Option<String>, config_path: Option<PathBuf>) -> Result<()> {
    let config = load_config_from(config_path.as_deref())?;

    let mut names: Vec<&String> = config.providers.keys().collect();
    names.sort();

    let mut found_any = false;

    for name in names {
        if let Some(filter) = &provider_filter {
            if name != filter {
                continue;
            }
        }

        let models = match models_for(&config.providers[name]).await {
            Ok(models) => models,
            Err(e) => {
                eprintln!("Provider {name}: {e:#}");
                continue;
            }
        };

        if !models.is_empty() {
            found_any = true;
            let marker = if *name == config.default_provider {
                " (default)"
            } else {
                ""
            };
            println!("Provider: {name}{marker}");
            for model in &models {
                println!(
                    "  {} - {} ({}K context, ${:.4}/{:.4} per 1K tokens)",
                    model.id,
                    model.name,
                    model.max_context / 1000,
                    model.cost_per_1k_input,
                    model.cost_per_1k_output,
                );
            }
            println!();
        }
    }

    if !found_any {
        println!("No providers configured. Run `clbprep init` to create a config file.");
    }

    Ok(())
}
