//! Configuration loading, validation, and management for Aide.
//!
//! Loads configuration from `~/.aide/config.toml` (or `--config` /
//! `AIDE_CONFIG`) with environment variable overrides. Validates all
//! settings once at startup.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.aide/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Name the assistant uses for itself in the system prompt
    #[serde(default = "default_assistant_name")]
    pub assistant_name: String,

    /// Replaces the built-in system instructions entirely
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt_override: Option<String>,

    /// Language model endpoint and credentials
    #[serde(default)]
    pub llm: LlmConfig,

    /// Conversational memory settings
    #[serde(default)]
    pub memory: MemoryConfig,

    /// Context assembly settings
    #[serde(default)]
    pub context: ContextConfig,

    /// Google Calendar source
    #[serde(default)]
    pub calendar: CalendarConfig,

    /// Notion source
    #[serde(default)]
    pub notion: NotionConfig,

    /// Obsidian vault source
    #[serde(default)]
    pub obsidian: ObsidianConfig,

    /// Local knowledge folder
    #[serde(default)]
    pub knowledge: KnowledgeConfig,
}

fn default_assistant_name() -> String {
    "Aide".into()
}

/// Redact a secret for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("assistant_name", &self.assistant_name)
            .field(
                "system_prompt_override",
                &self.system_prompt_override.as_ref().map(|_| "<custom>"),
            )
            .field("llm", &self.llm)
            .field("memory", &self.memory)
            .field("context", &self.context)
            .field("calendar", &self.calendar)
            .field("notion", &self.notion)
            .field("obsidian", &self.obsidian)
            .field("knowledge", &self.knowledge)
            .finish()
    }
}

/// `[llm]` section.
#[derive(Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// `azure`, `openai`, `openrouter`, `ollama`, or any OpenAI-compatible name
    #[serde(default = "default_llm_provider")]
    pub provider: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Base URL; for Azure this is the resource endpoint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    /// Model name, or deployment name for Azure
    #[serde(default = "default_model")]
    pub model: String,

    /// Azure REST API version
    #[serde(default = "default_api_version")]
    pub api_version: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Upper bound on one model call
    #[serde(default = "default_llm_timeout")]
    pub timeout_secs: u64,
}

fn default_llm_provider() -> String {
    "azure".into()
}
fn default_model() -> String {
    "gpt-4o".into()
}
fn default_api_version() -> String {
    "2024-02-01".into()
}
fn default_temperature() -> f32 {
    0.7
}
fn default_max_tokens() -> u32 {
    1024
}
fn default_llm_timeout() -> u64 {
    60
}

impl std::fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmConfig")
            .field("provider", &self.provider)
            .field("api_key", &redact(&self.api_key))
            .field("api_url", &self.api_url)
            .field("model", &self.model)
            .field("api_version", &self.api_version)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: default_llm_provider(),
            api_key: None,
            api_url: None,
            model: default_model(),
            api_version: default_api_version(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_llm_timeout(),
        }
    }
}

impl LlmConfig {
    pub fn is_azure(&self) -> bool {
        self.provider.eq_ignore_ascii_case("azure")
    }

    /// Local backends run without a key.
    pub fn requires_api_key(&self) -> bool {
        !self.provider.eq_ignore_ascii_case("ollama")
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.trim().is_empty())
    }
}

/// `[memory]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    /// Maximum number of turns kept (one exchange = two turns)
    #[serde(default = "default_memory_capacity")]
    pub capacity: usize,
}

/// Largest accepted `memory.capacity`, in turns.
pub const MAX_MEMORY_CAPACITY: usize = 1000;

fn default_memory_capacity() -> usize {
    8
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            capacity: default_memory_capacity(),
        }
    }
}

/// `[context]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextConfig {
    /// Truncation threshold for a context block, in characters
    #[serde(default = "default_max_chars")]
    pub max_chars: usize,

    /// Upper bound on one context provider call
    #[serde(default = "default_provider_timeout")]
    pub provider_timeout_secs: u64,
}

fn default_max_chars() -> usize {
    4000
}
fn default_provider_timeout() -> u64 {
    15
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            max_chars: default_max_chars(),
            provider_timeout_secs: default_provider_timeout(),
        }
    }
}

/// `[calendar]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalendarConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Stored OAuth token (JSON with `token`, `refresh_token`, `client_id`,
    /// `client_secret`, `expiry`) produced by a prior consent flow
    #[serde(default = "default_token_path")]
    pub token_path: String,

    /// Events requested per calendar
    #[serde(default = "default_calendar_max_results")]
    pub max_results: u32,

    #[serde(default = "default_calendar_api_url")]
    pub api_url: String,

    #[serde(default = "default_token_url")]
    pub token_url: String,
}

fn default_true() -> bool {
    true
}
fn default_token_path() -> String {
    "~/.aide/google_token.json".into()
}
fn default_calendar_max_results() -> u32 {
    25
}
fn default_calendar_api_url() -> String {
    "https://www.googleapis.com/calendar/v3".into()
}
fn default_token_url() -> String {
    "https://oauth2.googleapis.com/token".into()
}

impl Default for CalendarConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            token_path: default_token_path(),
            max_results: default_calendar_max_results(),
            api_url: default_calendar_api_url(),
            token_url: default_token_url(),
        }
    }
}

impl CalendarConfig {
    pub fn token_file(&self) -> PathBuf {
        expand_tilde(&self.token_path)
    }
}

/// `[notion]` section.
#[derive(Clone, Serialize, Deserialize)]
pub struct NotionConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Pages listed from databases whose title contains "emails"
    #[serde(default = "default_email_page_size")]
    pub email_page_size: u32,

    #[serde(default = "default_notion_api_url")]
    pub api_url: String,
}

fn default_email_page_size() -> u32 {
    5
}
fn default_notion_api_url() -> String {
    "https://api.notion.com/v1".into()
}

impl std::fmt::Debug for NotionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotionConfig")
            .field("api_key", &redact(&self.api_key))
            .field("email_page_size", &self.email_page_size)
            .field("api_url", &self.api_url)
            .finish()
    }
}

impl Default for NotionConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            email_page_size: default_email_page_size(),
            api_url: default_notion_api_url(),
        }
    }
}

/// `[obsidian]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObsidianConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vault_path: Option<String>,

    /// Characters excerpted from each matching note
    #[serde(default = "default_snippet_chars")]
    pub snippet_chars: usize,
}

fn default_snippet_chars() -> usize {
    500
}

impl Default for ObsidianConfig {
    fn default() -> Self {
        Self {
            vault_path: None,
            snippet_chars: default_snippet_chars(),
        }
    }
}

impl ObsidianConfig {
    /// The vault directory, with quotes stripped and `~` expanded.
    pub fn vault_dir(&self) -> Option<PathBuf> {
        self.vault_path
            .as_deref()
            .map(|p| p.trim().trim_matches(|c: char| c == '"' || c == '\''))
            .filter(|p| !p.is_empty())
            .map(expand_tilde)
    }
}

/// `[knowledge]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeConfig {
    #[serde(default = "default_knowledge_dir")]
    pub dir: String,
}

fn default_knowledge_dir() -> String {
    "~/.aide/knowledge".into()
}

impl Default for KnowledgeConfig {
    fn default() -> Self {
        Self {
            dir: default_knowledge_dir(),
        }
    }
}

impl KnowledgeConfig {
    pub fn knowledge_dir(&self) -> PathBuf {
        expand_tilde(&self.dir)
    }
}

impl AppConfig {
    /// Load configuration from `AIDE_CONFIG` or the default path
    /// (`~/.aide/config.toml`), then apply environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_with(None)
    }

    /// Load configuration from an explicit path if given, falling back to
    /// `AIDE_CONFIG` and then the default path.
    ///
    /// Environment variables take the highest priority:
    /// - `AIDE_API_KEY`, then `AZURE_OPENAI_KEY`, then `OPENAI_API_KEY`
    /// - `AZURE_OPENAI_ENDPOINT`, `AZURE_OPENAI_DEPLOYMENT_NAME`
    /// - `AIDE_MODEL`, `NOTION_API_KEY`, `OBSIDIAN_VAULT_PATH`
    pub fn load_with(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = Self::resolve_path(path);

        let mut config = Self::load_from(&path)?;
        config.apply_env_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// The file [`AppConfig::load_with`] reads: `path` if given, then
    /// `AIDE_CONFIG`, then the default path.
    pub fn resolve_path(path: Option<&Path>) -> PathBuf {
        Self::resolve_path_with(path, |key| std::env::var(key).ok())
    }

    fn resolve_path_with<F>(path: Option<&Path>, lookup: F) -> PathBuf
    where
        F: Fn(&str) -> Option<String>,
    {
        path.map(Path::to_path_buf)
            .or_else(|| {
                lookup("AIDE_CONFIG")
                    .filter(|v| !v.trim().is_empty())
                    .map(PathBuf::from)
            })
            .unwrap_or_else(Self::config_path)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides through `lookup`. Blank values are ignored.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = var("AIDE_API_KEY") {
            self.llm.api_key = Some(key);
        } else if let Some(key) = var("AZURE_OPENAI_KEY") {
            self.llm.api_key = Some(key);
            self.llm.provider = "azure".into();
        } else if let Some(key) = var("OPENAI_API_KEY") {
            self.llm.api_key = Some(key);
        }

        if let Some(endpoint) = var("AZURE_OPENAI_ENDPOINT") {
            self.llm.api_url = Some(endpoint);
            self.llm.provider = "azure".into();
        }
        if let Some(deployment) = var("AZURE_OPENAI_DEPLOYMENT_NAME") {
            self.llm.model = deployment;
            self.llm.provider = "azure".into();
        }
        if let Some(model) = var("AIDE_MODEL") {
            self.llm.model = model;
        }

        if let Some(key) = var("NOTION_API_KEY") {
            self.notion.api_key = Some(key);
        }
        if let Some(vault) = var("OBSIDIAN_VAULT_PATH") {
            self.obsidian.vault_path = Some(vault);
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".aide")
    }

    /// Get the default configuration file path.
    pub fn config_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(ConfigError::ValidationError(
                "llm.temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if self.llm.timeout_secs == 0 || self.context.provider_timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "timeouts must be at least 1 second".into(),
            ));
        }

        if self.memory.capacity < 2 {
            return Err(ConfigError::ValidationError(
                "memory.capacity must hold at least one exchange (2 turns)".into(),
            ));
        }

        if self.memory.capacity > MAX_MEMORY_CAPACITY {
            return Err(ConfigError::ValidationError(format!(
                "memory.capacity must be at most {MAX_MEMORY_CAPACITY} turns"
            )));
        }

        if self.context.max_chars < 64 {
            return Err(ConfigError::ValidationError(
                "context.max_chars must be at least 64".into(),
            ));
        }

        Ok(())
    }

    /// Check that the language model can be called at all.
    ///
    /// Fatal for the whole pipeline; surfaced once at startup.
    pub fn require_llm_credentials(&self) -> Result<(), ConfigError> {
        if self.llm.requires_api_key() && !self.llm.has_api_key() {
            return Err(ConfigError::MissingCredential {
                what: "llm.api_key".into(),
                hint: "set AIDE_API_KEY (or AZURE_OPENAI_KEY / OPENAI_API_KEY) or add api_key to [llm]".into(),
            });
        }
        if self.llm.is_azure() && self.llm.api_url.is_none() {
            return Err(ConfigError::MissingCredential {
                what: "llm.api_url".into(),
                hint: "set AZURE_OPENAI_ENDPOINT or add api_url to [llm]".into(),
            });
        }
        Ok(())
    }

    /// Generate a default config TOML string (for the `onboard` command).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            assistant_name: default_assistant_name(),
            system_prompt_override: None,
            llm: LlmConfig::default(),
            memory: MemoryConfig::default(),
            context: ContextConfig::default(),
            calendar: CalendarConfig::default(),
            notion: NotionConfig::default(),
            obsidian: ObsidianConfig::default(),
            knowledge: KnowledgeConfig::default(),
        }
    }
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &str) -> PathBuf {
    if path == "~" {
        dirs_home()
    } else if let Some(rest) = path.strip_prefix("~/").or_else(|| path.strip_prefix("~\\")) {
        dirs_home().join(rest)
    } else {
        PathBuf::from(path)
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),

    #[error("Missing {what}: {hint}")]
    MissingCredential { what: String, hint: String },
}
