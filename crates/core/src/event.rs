//! Domain events emitted by the session controller.
//!
//! The command-line front end subscribes to render progress ("checking your
//! calendar..."), and tests subscribe to assert on the exchange lifecycle.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;

/// All domain events in the system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DomainEvent {
    /// A question was accepted and an exchange began
    ExchangeStarted {
        question_preview: String,
        timestamp: DateTime<Utc>,
    },

    /// The router picked a context provider (or none)
    ToolSelected {
        tool_name: Option<String>,
        timestamp: DateTime<Utc>,
    },

    /// A context provider returned
    ContextFetched {
        source_name: String,
        found: bool,
        duration_ms: u64,
        timestamp: DateTime<Utc>,
    },

    /// The language model call failed; memory was left untouched
    SynthesisFailed {
        error_message: String,
        timestamp: DateTime<Utc>,
    },

    /// An exchange finished and both turns were recorded
    ExchangeCompleted {
        model: String,
        tokens_used: u32,
        memory_len: usize,
        timestamp: DateTime<Utc>,
    },

    /// A question was refused before any work was done (busy or empty)
    ExchangeRejected {
        reason: String,
        timestamp: DateTime<Utc>,
    },
}

/// A broadcast-based event bus for domain events.
///
/// Uses `tokio::sync::broadcast` for multi-consumer pub/sub.
pub struct EventBus {
    sender: broadcast::Sender<Arc<DomainEvent>>,
}

impl EventBus {
    /// Create a new event bus with the given capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all subscribers.
    pub fn publish(&self, event: DomainEvent) {
        // No subscribers is fine
        let _ = self.sender.send(Arc::new(event));
    }

    /// Subscribe to receive events.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<DomainEvent>> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(64)
    }
}
