pub mod ask;
pub mod chat;
pub mod doctor;
pub mod onboard;
pub mod snapshot;

use std::path::Path;

use aide_agent::Assistant;
use aide_config::{AppConfig, ConfigError};

/// Load configuration and build the assistant, with setup hints on failure.
pub(crate) fn start(config_path: Option<&Path>) -> Result<Assistant, Box<dyn std::error::Error>> {
    let config = AppConfig::load_with(config_path).map_err(|e| format!("Failed to load config: {e}"))?;

    match Assistant::from_config(&config) {
        Ok(assistant) => Ok(assistant),
        Err(e @ ConfigError::MissingCredential { .. }) => {
            eprintln!();
            eprintln!("  ERROR: {e}");
            eprintln!();
            eprintln!("  Set one of these environment variables:");
            eprintln!("    AZURE_OPENAI_KEY + AZURE_OPENAI_ENDPOINT + AZURE_OPENAI_DEPLOYMENT_NAME");
            eprintln!("    OPENAI_API_KEY   (with provider = \"openai\")");
            eprintln!("    AIDE_API_KEY     (any provider)");
            eprintln!();
            eprintln!("  Or add it to your config file:");
            eprintln!("    {}", AppConfig::config_path().display());
            eprintln!();
            Err("No language model credentials. See above for setup instructions.".into())
        }
        Err(e) => Err(e.into()),
    }
}
