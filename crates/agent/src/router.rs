//! Tool router: picks at most one context provider per question.
//!
//! The dispatch table is an ordered list of [`ToolSpec`]s. A question is
//! lowercased and tested against each entry's triggers in declaration order;
//! the first entry with a matching trigger wins. No match means "no tool" and
//! the model answers from memory and general knowledge.

use std::sync::Arc;
use std::time::{Duration, Instant};

use aide_config::AppConfig;
use aide_core::context::{ContextProvider, ContextResult};
use aide_core::error::ProviderError;
use aide_tools::{
    CalendarProvider, DailyBriefProvider, KnowledgeFileProvider, NotionProvider, ObsidianProvider,
};
use tracing::{debug, info, warn};

/// A condition on the lowercased question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Trigger {
    /// The keyword or phrase occurs anywhere.
    Contains(String),
    /// The question starts with this text (leading whitespace ignored).
    StartsWith(String),
}

impl Trigger {
    pub fn contains(keyword: &str) -> Self {
        Self::Contains(keyword.to_lowercase())
    }

    pub fn starts_with(prefix: &str) -> Self {
        Self::StartsWith(prefix.to_lowercase())
    }

    /// `lowered` must already be lowercase.
    pub fn matches(&self, lowered: &str) -> bool {
        match self {
            Self::Contains(keyword) => lowered.contains(keyword.as_str()),
            Self::StartsWith(prefix) => lowered.trim_start().starts_with(prefix.as_str()),
        }
    }
}

/// One entry of the dispatch table.
pub struct ToolSpec {
    triggers: Vec<Trigger>,
    provider: Arc<dyn ContextProvider>,
}

impl ToolSpec {
    pub fn new(provider: Arc<dyn ContextProvider>, triggers: Vec<Trigger>) -> Self {
        Self { triggers, provider }
    }

    /// An entry using the built-in triggers for the provider's tool name.
    pub fn with_default_triggers(provider: Arc<dyn ContextProvider>) -> Self {
        let triggers = default_triggers(provider.name());
        Self::new(provider, triggers)
    }

    pub fn name(&self) -> &str {
        self.provider.name()
    }

    pub fn source_name(&self) -> &str {
        self.provider.source_name()
    }

    pub fn triggers(&self) -> &[Trigger] {
        &self.triggers
    }

    pub fn matches(&self, lowered: &str) -> bool {
        self.triggers.iter().any(|t| t.matches(lowered))
    }

    /// Fetch context, bounded by `timeout`. Errors and timeouts become
    /// "not found"; a late result is dropped with the abandoned future.
    pub async fn invoke(&self, query: &str, timeout: Duration) -> ContextResult {
        let started = Instant::now();
        let outcome = tokio::time::timeout(timeout, self.provider.fetch(query)).await;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        let error = match outcome {
            Ok(Ok(result)) => {
                debug!(tool = %self.name(), found = result.found, elapsed_ms, "Context fetched");
                return result;
            }
            Ok(Err(e)) => e,
            Err(_) => ProviderError::Timeout {
                source_name: self.source_name().to_string(),
                timeout_secs: timeout.as_secs(),
            },
        };

        warn!(tool = %self.name(), error = %error, elapsed_ms, "Context provider failed; answering without context");
        ContextResult::not_found(self.source_name())
    }
}

impl std::fmt::Debug for ToolSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolSpec")
            .field("name", &self.name())
            .field("triggers", &self.triggers)
            .finish()
    }
}

/// The ordered dispatch table.
#[derive(Debug, Default)]
pub struct ToolRouter {
    specs: Vec<ToolSpec>,
}

impl ToolRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry; earlier entries take priority.
    pub fn register(&mut self, spec: ToolSpec) {
        self.specs.push(spec);
    }

    pub fn with(mut self, spec: ToolSpec) -> Self {
        self.register(spec);
        self
    }

    /// The first entry whose triggers match, if any. Never fails.
    pub fn route(&self, question: &str) -> Option<&ToolSpec> {
        let lowered = question.to_lowercase();
        self.specs.iter().find(|spec| spec.matches(&lowered))
    }

    /// Registered tool names in priority order.
    pub fn tool_names(&self) -> Vec<&str> {
        self.specs.iter().map(ToolSpec::name).collect()
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}

/// Built-in triggers per tool name.
pub fn default_triggers(tool_name: &str) -> Vec<Trigger> {
    let keywords: &[&str] = match tool_name {
        "daily_brief" => &["snapshot", "summary", "daily brief", "what's up"],
        "obsidian" => &["obsidian", "vault", "my notes", "remember", "research on"],
        "notion" => &["notion", "assignments", "tasks", "dashboard", "email"],
        "calendar" => &[
            "calendar", "schedule", "meeting", "event", "priorities", "busy", "monday", "tuesday",
            "wednesday", "thursday", "friday", "saturday", "sunday", "today", "tomorrow", "week",
            "year",
        ],
        "knowledge_file" => return vec![Trigger::starts_with("read ")],
        _ => &[],
    };
    keywords.iter().map(|k| Trigger::contains(k)).collect()
}

/// Build the dispatch table from configuration, in priority order:
/// daily brief, Obsidian, Notion, calendar, knowledge file.
///
/// Sources that are not configured are left out with a warning.
pub fn build_from_config(config: &AppConfig) -> ToolRouter {
    let calendar = configured(CalendarProvider::from_config(&config.calendar));
    let notion = configured(NotionProvider::from_config(&config.notion));
    let obsidian = configured(ObsidianProvider::from_config(&config.obsidian));

    let knowledge = KnowledgeFileProvider::from_config(&config.knowledge);
    if !knowledge.root().is_dir() {
        warn!(
            dir = %knowledge.root().display(),
            "Knowledge folder does not exist; 'read <file>' will find nothing"
        );
    }
    let knowledge: Arc<dyn ContextProvider> = Arc::new(knowledge);

    let mut router = ToolRouter::new();

    if calendar.is_some() || notion.is_some() {
        let brief: Arc<dyn ContextProvider> =
            Arc::new(DailyBriefProvider::new(calendar.clone(), notion.clone()));
        router.register(ToolSpec::with_default_triggers(brief));
    } else {
        warn!("Daily brief disabled: neither calendar nor Notion is configured");
    }

    for provider in [obsidian, notion, calendar].into_iter().flatten() {
        router.register(ToolSpec::with_default_triggers(provider));
    }
    router.register(ToolSpec::with_default_triggers(knowledge));

    info!(tools = ?router.tool_names(), "Tool router ready");
    router
}

fn configured<P>(built: Result<P, ProviderError>) -> Option<Arc<dyn ContextProvider>>
where
    P: ContextProvider + 'static,
{
    match built {
        Ok(provider) => Some(Arc::new(provider)),
        Err(e) => {
            warn!("{e}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct Named(&'static str);

    #[async_trait]
    impl ContextProvider for Named {
        fn name(&self) -> &str {
            self.0
        }
        fn source_name(&self) -> &str {
            self.0
        }
        async fn fetch(&self, _query: &str) -> Result<ContextResult, ProviderError> {
            Ok(ContextResult::found(self.0, "ok"))
        }
    }

    struct Failing;

    #[async_trait]
    impl ContextProvider for Failing {
        fn name(&self) -> &str {
            "failing"
        }
        fn source_name(&self) -> &str {
            "Failing"
        }
        async fn fetch(&self, _query: &str) -> Result<ContextResult, ProviderError> {
            Err(ProviderError::Api {
                source_name: "Failing".into(),
                status_code: 500,
                message: "boom".into(),
            })
        }
    }

    struct Slow;

    #[async_trait]
    impl ContextProvider for Slow {
        fn name(&self) -> &str {
            "slow"
        }
        fn source_name(&self) -> &str {
            "Slow"
        }
        async fn fetch(&self, _query: &str) -> Result<ContextResult, ProviderError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(ContextResult::found("Slow", "too late"))
        }
    }

    fn full_router() -> ToolRouter {
        let mut router = ToolRouter::new();
        for name in ["daily_brief", "obsidian", "notion", "calendar", "knowledge_file"] {
            router.register(ToolSpec::with_default_triggers(Arc::new(Named(name))));
        }
        router
    }

    fn routed(router: &ToolRouter, question: &str) -> Option<String> {
        router.route(question).map(|spec| spec.name().to_string())
    }

    #[test]
    fn routes_by_keyword() {
        let router = full_router();
        assert_eq!(routed(&router, "What's on my calendar?").as_deref(), Some("calendar"));
        assert_eq!(routed(&router, "Any new EMAIL?").as_deref(), Some("notion"));
        assert_eq!(routed(&router, "search my Obsidian vault").as_deref(), Some("obsidian"));
        assert_eq!(routed(&router, "give me a summary").as_deref(), Some("daily_brief"));
        assert_eq!(routed(&router, "read Resume.md").as_deref(), Some("knowledge_file"));
    }

    #[test]
    fn no_trigger_means_no_tool() {
        let router = full_router();
        assert!(router.route("hello").is_none());
        assert!(router.route("").is_none());
    }

    #[test]
    fn declaration_order_resolves_overlaps() {
        let router = full_router();
        // "tasks" (notion) and "today" (calendar) both match
        assert_eq!(routed(&router, "what tasks do I have today").as_deref(), Some("notion"));
        // "summary" (daily_brief) beats "week" (calendar)
        assert_eq!(routed(&router, "summary of my week").as_deref(), Some("daily_brief"));
        // "my notes" (obsidian) beats the "read " prefix
        assert_eq!(routed(&router, "read my notes").as_deref(), Some("obsidian"));
    }

    #[test]
    fn summarize_is_not_a_daily_brief_keyword() {
        let router = full_router();
        assert_eq!(routed(&router, "summarize my notes on rust").as_deref(), Some("obsidian"));
        assert_eq!(
            routed(&router, "summarize my research on transformers").as_deref(),
            Some("obsidian")
        );
        assert_eq!(
            routed(&router, crate::session::SNAPSHOT_QUESTION).as_deref(),
            Some("daily_brief")
        );
    }

    #[test]
    fn prefix_trigger_only_matches_at_start() {
        let router = full_router();
        assert!(router.route("I already read the book").is_none());
        assert_eq!(routed(&router, "   READ todo.txt").as_deref(), Some("knowledge_file"));
    }

    #[test]
    fn tool_names_keep_priority_order() {
        assert_eq!(
            full_router().tool_names(),
            vec!["daily_brief", "obsidian", "notion", "calendar", "knowledge_file"]
        );
    }

    #[tokio::test]
    async fn invoke_degrades_errors_to_not_found() {
        let spec = ToolSpec::new(Arc::new(Failing), vec![Trigger::contains("x")]);
        let result = spec.invoke("x", Duration::from_secs(5)).await;
        assert!(!result.found);
        assert_eq!(result.source_name, "Failing");
    }

    #[tokio::test(start_paused = true)]
    async fn invoke_times_out() {
        let spec = ToolSpec::new(Arc::new(Slow), vec![Trigger::contains("x")]);
        let result = spec.invoke("x", Duration::from_secs(15)).await;
        assert!(!result.found);
        assert!(result.text.is_empty());
    }

    #[test]
    fn build_from_config_skips_unconfigured_sources() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = AppConfig::default();
        config.calendar.enabled = false;
        config.knowledge.dir = dir.path().display().to_string();

        let router = build_from_config(&config);
        assert_eq!(router.tool_names(), vec!["knowledge_file"]);
    }

    #[test]
    fn build_from_config_registers_in_priority_order() {
        let dir = tempfile::tempdir().unwrap();
        let token = dir.path().join("token.json");
        std::fs::write(&token, r#"{"token": "t"}"#).unwrap();

        let mut config = AppConfig::default();
        config.calendar.token_path = token.display().to_string();
        config.notion.api_key = Some("secret".into());
        config.obsidian.vault_path = Some(dir.path().display().to_string());
        config.knowledge.dir = dir.path().display().to_string();

        let router = build_from_config(&config);
        assert_eq!(
            router.tool_names(),
            vec!["daily_brief", "obsidian", "notion", "calendar", "knowledge_file"]
        );
    }
}
