//! Per-session lifecycle states.

use serde::{Deserialize, Serialize};

/// Where the session controller is in the current exchange.
///
/// `Idle` is the only state in which a new question is accepted; every other
/// state means an exchange is in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    #[default]
    Idle,
    Routing,
    FetchingContext,
    Synthesizing,
    UpdatingMemory,
}

impl SessionState {
    pub fn is_busy(&self) -> bool {
        !matches!(self, SessionState::Idle)
    }

    /// Short status line for front ends.
    pub fn label(&self) -> &'static str {
        match self {
            SessionState::Idle => "ready",
            SessionState::Routing => "thinking",
            SessionState::FetchingContext => "gathering context",
            SessionState::Synthesizing => "writing an answer",
            SessionState::UpdatingMemory => "remembering",
        }
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}
