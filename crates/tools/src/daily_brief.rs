//! Daily brief: today's calendar plus Notion tasks and emails, fetched
//! together and merged into one block with a heading per source.

use std::sync::Arc;

use aide_core::context::{ContextProvider, ContextResult};
use aide_core::error::ProviderError;
use async_trait::async_trait;
use tracing::warn;

const SOURCE: &str = "Daily brief";

/// Queries sent to the underlying sources.
const CALENDAR_QUERY: &str = "today";
const NOTION_QUERY: &str = "tasks and emails";

pub struct DailyBriefProvider {
    calendar: Option<Arc<dyn ContextProvider>>,
    notion: Option<Arc<dyn ContextProvider>>,
}

impl DailyBriefProvider {
    /// Either source may be absent when it is not configured.
    pub fn new(
        calendar: Option<Arc<dyn ContextProvider>>,
        notion: Option<Arc<dyn ContextProvider>>,
    ) -> Self {
        Self { calendar, notion }
    }
}

async fn section(
    heading: &str,
    provider: Option<&Arc<dyn ContextProvider>>,
    query: &str,
) -> (String, bool) {
    let Some(provider) = provider else {
        return (format!("## {heading}\n{heading} is not configured."), false);
    };

    match provider.fetch(query).await {
        Ok(result) if result.found => (format!("## {heading}\n{}", result.text.trim_end()), true),
        Ok(_) => (format!("## {heading}\n{heading} is not available right now."), false),
        Err(e) => {
            warn!(source = heading, error = %e, "Daily brief source failed");
            (format!("## {heading}\n{heading} is not available right now ({e})."), false)
        }
    }
}

#[async_trait]
impl ContextProvider for DailyBriefProvider {
    fn name(&self) -> &str {
        "daily_brief"
    }

    fn source_name(&self) -> &str {
        SOURCE
    }

    async fn fetch(&self, _query: &str) -> Result<ContextResult, ProviderError> {
        let ((calendar, calendar_ok), (notion, notion_ok)) = tokio::join!(
            section("Calendar", self.calendar.as_ref(), CALENDAR_QUERY),
            section("Notion", self.notion.as_ref(), NOTION_QUERY),
        );

        if !calendar_ok && !notion_ok {
            return Ok(ContextResult::not_found(SOURCE));
        }

        Ok(ContextResult::found(
            SOURCE,
            format!("{calendar}\n\n{notion}"),
        ))
    }
}
