//! Notion context provider.
//!
//! Lists page titles from every database shared with the integration.
//! Databases whose title contains "emails" are treated as an inbox and
//! only their most recent pages are listed, as subjects.

use aide_config::NotionConfig;
use aide_core::context::{ContextProvider, ContextResult};
use aide_core::error::ProviderError;
use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use crate::http::{plain_text, send_json};

const SOURCE: &str = "Notion";
const NOTION_VERSION: &str = "2022-06-28";

pub struct NotionProvider {
    api_url: String,
    api_key: String,
    email_page_size: u32,
    client: reqwest::Client,
}

impl NotionProvider {
    pub fn new(api_url: impl Into<String>, api_key: impl Into<String>, email_page_size: u32) -> Self {
        Self {
            api_url: api_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            email_page_size,
            client: reqwest::Client::new(),
        }
    }

    /// Build from the `[notion]` section. Fails without an API key.
    pub fn from_config(config: &NotionConfig) -> Result<Self, ProviderError> {
        let api_key = config
            .api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| ProviderError::NotConfigured {
                source_name: SOURCE.into(),
                reason: "set NOTION_API_KEY or add api_key to [notion]".into(),
            })?;
        Ok(Self::new(&config.api_url, api_key, config.email_page_size))
    }

    fn post(&self, path: &str, body: Value) -> reqwest::RequestBuilder {
        self.client
            .post(format!("{}/{path}", self.api_url))
            .bearer_auth(&self.api_key)
            .header("Notion-Version", NOTION_VERSION)
            .json(&body)
    }

    /// Databases shared with the integration, as `(id, title)`.
    async fn databases(&self) -> Result<Vec<(String, String)>, ProviderError> {
        let body = send_json(
            SOURCE,
            self.post(
                "search",
                serde_json::json!({"filter": {"value": "database", "property": "object"}}),
            ),
        )
        .await?;

        Ok(results(&body)
            .iter()
            .filter_map(|db| {
                let id = db.get("id")?.as_str()?.to_string();
                let title = db
                    .get("title")
                    .and_then(plain_text)
                    .unwrap_or("Untitled Database")
                    .to_string();
                Some((id, title))
            })
            .collect())
    }

    async fn page_titles(
        &self,
        database_id: &str,
        page_size: Option<u32>,
    ) -> Result<Vec<String>, ProviderError> {
        let body = match page_size {
            Some(n) => serde_json::json!({"page_size": n}),
            None => serde_json::json!({}),
        };
        let response = send_json(SOURCE, self.post(&format!("databases/{database_id}/query"), body)).await?;
        Ok(results(&response).iter().filter_map(page_title).collect())
    }
}

#[async_trait]
impl ContextProvider for NotionProvider {
    fn name(&self) -> &str {
        "notion"
    }

    fn source_name(&self) -> &str {
        SOURCE
    }

    async fn fetch(&self, _query: &str) -> Result<ContextResult, ProviderError> {
        let databases = self.databases().await?;
        debug!(count = databases.len(), "Notion databases found");

        if databases.is_empty() {
            return Ok(ContextResult::found(
                SOURCE,
                "No databases are shared with the Notion integration.",
            ));
        }

        let mut out = String::new();
        for (id, title) in databases {
            if is_inbox(&title) {
                out.push_str(&format!("--- Recent Emails from '{title}' ---\n"));
                for subject in self.page_titles(&id, Some(self.email_page_size)).await? {
                    out.push_str(&format!("- Subject: {subject}\n"));
                }
            } else {
                out.push_str(&format!("--- Items from '{title}' ---\n"));
                for item in self.page_titles(&id, None).await? {
                    out.push_str(&format!("- {item}\n"));
                }
            }
            out.push('\n');
        }

        Ok(ContextResult::found(SOURCE, out.trim_end()))
    }
}

fn results(body: &Value) -> &[Value] {
    body.get("results")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default()
}

fn is_inbox(title: &str) -> bool {
    title.to_lowercase().contains("emails")
}

/// The text of a page's title property, whatever that property is named.
fn page_title(page: &Value) -> Option<String> {
    page.get("properties")?
        .as_object()?
        .values()
        .find(|prop| prop.get("type").and_then(Value::as_str) == Some("title"))
        .and_then(|prop| prop.get("title"))
        .and_then(plain_text)
        .map(String::from)
}
