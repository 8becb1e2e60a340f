//! Synthesizer trait: the abstraction over the hosted language model.
//!
//! A Synthesizer takes one fully assembled [`PromptRequest`] and returns one
//! answer. Implementations: OpenAI-compatible endpoints and Azure OpenAI
//! deployments (see `aide-providers`).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::SynthesisError;
use crate::message::{ChatMessage, Turn};

/// Labeled context inserted between the system instructions and memory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextBlock {
    /// Where the context came from (e.g. "Calendar").
    pub label: String,

    /// The (possibly truncated) context text.
    pub text: String,

    /// Whether `text` was cut down to fit the threshold.
    pub truncated: bool,
}

/// Everything the model sees for one exchange. Built fresh, used once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptRequest {
    pub system_instructions: String,

    /// Prior turns, oldest first.
    pub memory_snapshot: Vec<Turn>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<ContextBlock>,

    pub user_question: String,
}

impl PromptRequest {
    /// Render the request as chat messages in prompt order: system
    /// instructions, context block, memory turns, current question.
    pub fn to_messages(&self) -> Vec<ChatMessage> {
        let mut messages = Vec::with_capacity(self.memory_snapshot.len() + 3);
        messages.push(ChatMessage::system(&self.system_instructions));

        if let Some(block) = &self.context {
            messages.push(ChatMessage::system(format!(
                "Use the following context from {} to answer the user's question. \
                 If it does not contain the answer, say so.\n\n--- {} ---\n{}\n--- end of {} ---",
                block.label, block.label, block.text, block.label
            )));
        }

        messages.extend(self.memory_snapshot.iter().map(Turn::to_message));
        messages.push(ChatMessage::user(&self.user_question));
        messages
    }
}

/// A successful model answer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Completion {
    /// The answer text, never empty.
    pub text: String,

    /// Which model actually responded.
    pub model: String,

    pub usage: Option<Usage>,
}

/// Token usage information.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// The core Synthesizer trait.
///
/// The session controller calls `complete()` without knowing which backend
/// is configured.
#[async_trait]
pub trait Synthesizer: Send + Sync {
    /// A human-readable name for this backend (e.g. "azure", "openrouter").
    fn name(&self) -> &str;

    /// Send the prompt and wait for the full answer.
    async fn complete(&self, request: &PromptRequest) -> Result<Completion, SynthesisError>;
}
