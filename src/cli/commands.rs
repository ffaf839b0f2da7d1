//! Read-only CLI commands: `config`, `history` and `models`

use super::output::Output;
use crate::StudyAssistant;
use crate::llm::ProviderRegistry;
use crate::llm::gemini::{GeminiModelInfo, normalize_model_name};
use crate::memory::NO_HISTORY_MESSAGE;
use crate::utils::toml_config::{DatabaseBackend, ProviderConfig, StudyBotConfig};
use std::path::Path;

/// Print a configuration summary; returns false when `--validate` finds a problem
pub fn show_config(
    config: &StudyBotConfig,
    path: &Path,
    full: bool,
    validate: bool,
    output: &Output,
) -> bool {
    output.header("Configuration");
    output.kv("File", &path.display().to_string());

    output.subheader("Server");
    output.kv("Address", &config.bind_address());
    output.kv("Log level", &config.server.log_level);

    output.subheader("Database");
    output.kv("Backend", config.database.backend.as_str());
    match config.database.backend {
        DatabaseBackend::MongoDB => {
            output.kv("URI from", &config.database.mongodb_uri_env);
            output.kv(
                "Collection",
                &format!(
                    "{}.{}",
                    config.database.mongodb_database, config.database.mongodb_collection
                ),
            );
        }
        _ => output.kv("URL", &config.database.url),
    }

    output.subheader("Assistant");
    output.kv("Model", &config.assistant.model);
    output.kv("History limit", &config.assistant.history_limit.to_string());
    output.kv("Memory", if config.assistant.use_memory { "on" } else { "off" });

    if full {
        output.subheader("Providers");
        let mut providers: Vec<_> = config.providers.iter().collect();
        providers.sort_by_key(|(name, _)| name.as_str());
        for (name, provider) in providers {
            let detail = match provider {
                ProviderConfig::Gemini { default_model, .. } => default_model.as_str(),
                ProviderConfig::Ollama { default_model, .. } => default_model.as_str(),
                ProviderConfig::OpenAI { default_model, .. } => default_model.as_str(),
            };
            output.list_item(&format!("{} ({}, {})", name, provider.kind(), detail));
        }

        output.subheader("Models");
        let mut models: Vec<_> = config.models.iter().collect();
        models.sort_by_key(|(name, _)| name.as_str());
        for (name, model) in models {
            output.list_item(&format!(
                "{} -> {}/{} (temperature {})",
                name, model.provider, model.model, model.temperature
            ));
        }

        output.subheader("System prompt");
        for line in config.assistant.system_prompt.lines() {
            output.list_item(line);
        }
    }

    if !validate {
        return true;
    }

    output.subheader("Validation");
    match config.validate_with_warnings() {
        Ok(warnings) if warnings.is_empty() => {
            output.success("Configuration is valid");
            true
        }
        Ok(warnings) => {
            for warning in &warnings {
                output.warning(&warning.message);
            }
            output.success("Configuration is valid (with warnings)");
            true
        }
        Err(e) => {
            output.error(&format!("Configuration is invalid: {}", e));
            false
        }
    }
}

/// Print a user's recent conversation
pub async fn show_history(
    assistant: &StudyAssistant,
    user: &str,
    limit: Option<usize>,
    output: &Output,
) -> anyhow::Result<()> {
    let turns = assistant.history(user, limit).await?;

    output.header(&format!("History for {}", user.trim()));
    if turns.is_empty() {
        output.info(NO_HISTORY_MESSAGE);
        return Ok(());
    }

    for turn in &turns {
        output.subheader(&turn.timestamp.format("%Y-%m-%d %H:%M:%S UTC").to_string());
        output.speaker("User", &turn.user_message);
        output.speaker("Assistant", &turn.bot_response);
    }
    output.newline();
    output.info(&format!("{} turn(s)", turns.len()));
    Ok(())
}

/// Every Gemini model in a listing, sorted by name
pub fn gemini_models(models: Vec<GeminiModelInfo>) -> Vec<GeminiModelInfo> {
    let mut models: Vec<_> = models
        .into_iter()
        .filter(|m| m.name.contains("gemini"))
        .collect();
    models.sort_by(|a, b| a.name.cmp(&b.name));
    models
}

/// List the Gemini models the configured key can reach
pub async fn list_models(
    registry: &ProviderRegistry,
    model_name: &str,
    output: &Output,
) -> anyhow::Result<()> {
    let client = registry.create_gemini_client(model_name)?;
    let models = gemini_models(client.list_models().await?);

    output.header("Available Gemini models");
    if models.is_empty() {
        output.warning("No Gemini models were returned for this API key");
        return Ok(());
    }

    output.table_header(&["Model", "Display name", "Chat"]);
    for model in &models {
        let chat = if model.supports_generate_content() {
            "yes"
        } else {
            "no"
        };
        output.table_row(&[
            normalize_model_name(&model.name),
            model.display_name.as_str(),
            chat,
        ]);
    }
    output.newline();
    output.info(&format!(
        "Currently configured: {}",
        registry.model_id(model_name).unwrap_or(model_name)
    ));
    Ok(())
}
