//! Context provider trait: the abstraction over information sources.
//!
//! A context provider takes the user's question and returns a small, bounded
//! blob of text from one external source (calendar, task database, note
//! vault, local files). Providers are invoked at most once per exchange and
//! their output is never cached.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ProviderError;

/// What a context provider produced for one question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextResult {
    /// Whether usable context was produced.
    pub found: bool,

    /// The context text (empty when `found` is false).
    pub text: String,

    /// Label for the context block (e.g. "Calendar").
    pub source_name: String,
}

impl ContextResult {
    /// Context was produced.
    pub fn found(source_name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            found: true,
            text: text.into(),
            source_name: source_name.into(),
        }
    }

    /// No usable context; the model answers from memory and general knowledge.
    pub fn not_found(source_name: impl Into<String>) -> Self {
        Self {
            found: false,
            text: String::new(),
            source_name: source_name.into(),
        }
    }
}

/// The core ContextProvider trait.
///
/// Implementations return `Err` for failures; the router boundary turns any
/// error (or timeout) into [`ContextResult::not_found`] so a failing source
/// never aborts an exchange.
#[async_trait]
pub trait ContextProvider: Send + Sync {
    /// The unique tool name (e.g. "calendar", "notion").
    fn name(&self) -> &str;

    /// Human-readable label used for the context block.
    fn source_name(&self) -> &str;

    /// Fetch context relevant to `query`.
    async fn fetch(&self, query: &str) -> Result<ContextResult, ProviderError>;
}
