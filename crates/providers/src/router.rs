//! Backend selection: builds the configured language model backend.

use std::sync::Arc;
use std::time::Duration;

use aide_config::{AppConfig, ConfigError};
use aide_core::synthesizer::Synthesizer;
use tracing::info;

use crate::openai_compat::OpenAiCompatSynthesizer;

/// Build the language model backend from configuration.
///
/// Fails with [`ConfigError::MissingCredential`] when the model cannot be
/// reached at all; the caller treats that as fatal at startup.
pub fn build_from_config(config: &AppConfig) -> Result<Arc<dyn Synthesizer>, ConfigError> {
    config.require_llm_credentials()?;

    let llm = &config.llm;
    let api_key = llm.api_key.clone().unwrap_or_default();

    let synthesizer = if llm.is_azure() {
        let endpoint = llm
            .api_url
            .clone()
            .ok_or_else(|| ConfigError::MissingCredential {
                what: "llm.api_url".into(),
                hint: "set AZURE_OPENAI_ENDPOINT".into(),
            })?;
        OpenAiCompatSynthesizer::azure(endpoint, &llm.model, &llm.api_version, api_key)
    } else {
        let base_url = llm
            .api_url
            .clone()
            .unwrap_or_else(|| default_base_url(&llm.provider));
        OpenAiCompatSynthesizer::new(&llm.provider, base_url, api_key, &llm.model)
    };

    info!(provider = %llm.provider, model = %llm.model, "Language model backend ready");

    Ok(Arc::new(
        synthesizer
            .with_temperature(llm.temperature)
            .with_max_tokens(llm.max_tokens)
            .with_timeout(Duration::from_secs(llm.timeout_secs)),
    ))
}

/// Get the default base URL for well-known providers.
fn default_base_url(provider_name: &str) -> String {
    match provider_name {
        "openrouter" => "https://openrouter.ai/api/v1".into(),
        "openai" => "https://api.openai.com/v1".into(),
        "ollama" => "http://localhost:11434/v1".into(),
        "groq" => "https://api.groq.com/openai/v1".into(),
        "together" => "https://api.together.xyz/v1".into(),
        _ => "https://api.openai.com/v1".into(),
    }
}
