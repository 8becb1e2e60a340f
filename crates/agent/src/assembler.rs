//! Prompt assembly: system instructions, optional context block, memory
//! window, and the current question.
//!
//! # Layout
//!
//! 1. **System** instructions (persona, response style, constraints)
//! 2. **Context** block labeled with its source, only when context was found
//! 3. **Memory** turns, oldest first
//! 4. **Question**
//!
//! Assembly is deterministic: identical inputs produce identical requests.

use aide_config::AppConfig;
use aide_core::context::ContextResult;
use aide_core::message::Turn;
use aide_core::synthesizer::{ContextBlock, PromptRequest};
use tracing::debug;

/// Appended to context that was cut down to fit the threshold.
pub const TRUNCATION_MARKER: &str = "\n[... context truncated]";

/// The built-in system instructions for an assistant called `name`.
pub fn default_instructions(name: &str) -> String {
    format!(
        "You are {name}, a helpful and concise productivity assistant. \
         Answer the user's question directly and insightfully, using the \
         conversation so far and any context provided from their tools. \
         If the context says a source had nothing, say so plainly instead of \
         guessing. Keep answers short unless the user asks for detail."
    )
}

/// Cut `text` to at most `max_chars` characters, marker included.
///
/// Returns the text and whether it was truncated.
pub fn truncate_context(text: &str, max_chars: usize) -> (String, bool) {
    if text.chars().count() <= max_chars {
        return (text.to_string(), false);
    }

    let marker_chars = TRUNCATION_MARKER.chars().count();
    if max_chars <= marker_chars {
        return (TRUNCATION_MARKER.chars().take(max_chars).collect(), true);
    }

    let keep = max_chars - marker_chars;
    let mut out: String = text.chars().take(keep).collect();
    out.push_str(TRUNCATION_MARKER);
    (out, true)
}

/// Builds a [`PromptRequest`] for each exchange.
#[derive(Debug, Clone)]
pub struct PromptAssembler {
    system_instructions: String,
    max_context_chars: usize,
}

impl PromptAssembler {
    pub fn new(system_instructions: impl Into<String>, max_context_chars: usize) -> Self {
        Self {
            system_instructions: system_instructions.into(),
            max_context_chars,
        }
    }

    /// Instructions come from `system_prompt_override` when set, otherwise
    /// the built-in template with the configured assistant name.
    pub fn from_config(config: &AppConfig) -> Self {
        let instructions = config
            .system_prompt_override
            .clone()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| default_instructions(&config.assistant_name));
        Self::new(instructions, config.context.max_chars)
    }

    pub fn system_instructions(&self) -> &str {
        &self.system_instructions
    }

    pub fn max_context_chars(&self) -> usize {
        self.max_context_chars
    }

    /// Assemble the request. A context block is included only when the
    /// result was found and carries text.
    pub fn assemble(
        &self,
        question: &str,
        memory_snapshot: Vec<Turn>,
        context: Option<&ContextResult>,
    ) -> PromptRequest {
        let context = context
            .filter(|result| result.found && !result.text.trim().is_empty())
            .map(|result| {
                let (text, truncated) = truncate_context(&result.text, self.max_context_chars);
                if truncated {
                    debug!(
                        source = %result.source_name,
                        original_chars = result.text.chars().count(),
                        max_chars = self.max_context_chars,
                        "Context truncated"
                    );
                }
                ContextBlock {
                    label: result.source_name.clone(),
                    text,
                    truncated,
                }
            });

        PromptRequest {
            system_instructions: self.system_instructions.clone(),
            memory_snapshot,
            context,
            user_question: question.to_string(),
        }
    }
}
