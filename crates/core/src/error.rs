//! Error types for the Aide domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error enum; configuration errors live
//! in `aide-config` next to the loader that produces them.

use thiserror::Error;

// --- Bounded context errors ---

/// A context source (calendar, Notion, vault, knowledge folder) failed.
///
/// Never aborts an exchange: the router boundary degrades it to
/// "no context".
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("{source_name} is not configured: {reason}")]
    NotConfigured { source_name: String, reason: String },

    #[error("{source_name} request failed: {message} (status: {status_code})")]
    Api {
        source_name: String,
        status_code: u16,
        message: String,
    },

    #[error("{source_name} is unreachable: {reason}")]
    Network { source_name: String, reason: String },

    #[error("{source_name} returned an unexpected payload: {reason}")]
    InvalidResponse { source_name: String, reason: String },

    #[error("{source_name} timed out after {timeout_secs}s")]
    Timeout { source_name: String, timeout_secs: u64 },

    #[error("{source_name} I/O failure: {reason}")]
    Io { source_name: String, reason: String },

    #[error("Invalid query for {source_name}: {reason}")]
    InvalidQuery { source_name: String, reason: String },
}

/// The language model call failed.
///
/// Surfaced to the user as the answer text; the exchange is not recorded.
#[derive(Debug, Clone, Error)]
pub enum SynthesisError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Rate limited by the model provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Request timed out after {0}s")]
    Timeout(u64),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Model returned an empty response")]
    EmptyResponse,
}

impl SynthesisError {
    /// The plain-text message shown to the user in place of an answer.
    pub fn user_message(&self) -> String {
        match self {
            Self::AuthenticationFailed(_) => format!(
                "I can't reach the language model because its credentials were rejected ({self}). Check your API key."
            ),
            Self::RateLimited { .. } => {
                format!("The language model is busy right now ({self}). Please try again shortly.")
            }
            Self::Timeout(_) => {
                format!("The language model took too long to answer ({self}). Please try again.")
            }
            _ => format!("Sorry, I couldn't get an answer from the language model: {self}"),
        }
    }
}
