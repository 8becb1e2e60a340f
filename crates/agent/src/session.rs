//! The session controller.
//!
//! [`Assistant`] runs one exchange at a time:
//!
//! 1. **Route** the question to at most one context provider
//! 2. **Fetch** context, bounded by the provider timeout
//! 3. **Assemble** the prompt from instructions, context, and memory
//! 4. **Synthesize** the answer, bounded by the synthesis timeout
//! 5. **Record** the question and answer in memory
//!
//! A question that arrives while an exchange is in flight is answered with
//! [`BUSY_MESSAGE`]. A failed synthesis returns a plain-text error and leaves
//! memory untouched.

use std::sync::Arc;
use std::time::{Duration, Instant};

use aide_config::{AppConfig, ConfigError};
use aide_core::error::SynthesisError;
use aide_core::event::{DomainEvent, EventBus};
use aide_core::message::Turn;
use aide_core::session::SessionState;
use aide_core::synthesizer::Synthesizer;
use chrono::Utc;
use tokio::sync::{Mutex, broadcast, watch};
use tracing::{debug, info, warn};

use crate::assembler::PromptAssembler;
use crate::memory::ConversationMemory;
use crate::router::{self, ToolRouter};

/// Returned when a question arrives during another exchange.
pub const BUSY_MESSAGE: &str = "I'm still working on your previous request. Please wait a moment.";

/// Returned for an empty or whitespace-only question.
pub const EMPTY_MESSAGE: &str = "Please enter a command.";

/// The canned question behind [`Assistant::get_snapshot`].
pub const SNAPSHOT_QUESTION: &str = "Summarize my day: give me my daily snapshot.";

const DEFAULT_PROVIDER_TIMEOUT: Duration = Duration::from_secs(15);
const DEFAULT_SYNTHESIS_TIMEOUT: Duration = Duration::from_secs(60);
const PREVIEW_CHARS: usize = 60;

pub struct Assistant {
    router: ToolRouter,
    /// Also the exchange guard: held for the whole exchange.
    memory: Mutex<ConversationMemory>,
    assembler: PromptAssembler,
    synthesizer: Arc<dyn Synthesizer>,
    provider_timeout: Duration,
    synthesis_timeout: Duration,
    state: watch::Sender<SessionState>,
    events: Arc<EventBus>,
}

/// Puts the session back to `Idle` however the exchange ends.
struct ExchangeState<'a> {
    state: &'a watch::Sender<SessionState>,
}

impl<'a> ExchangeState<'a> {
    fn enter(state: &'a watch::Sender<SessionState>) -> Self {
        state.send_replace(SessionState::Routing);
        Self { state }
    }

    fn set(&self, next: SessionState) {
        debug!(state = %next, "Session state");
        self.state.send_replace(next);
    }
}

impl Drop for ExchangeState<'_> {
    fn drop(&mut self) {
        self.state.send_replace(SessionState::Idle);
    }
}

impl Assistant {
    pub fn new(
        router: ToolRouter,
        synthesizer: Arc<dyn Synthesizer>,
        assembler: PromptAssembler,
        memory_capacity: usize,
    ) -> Self {
        let (state, _) = watch::channel(SessionState::Idle);
        Self {
            router,
            memory: Mutex::new(ConversationMemory::new(memory_capacity)),
            assembler,
            synthesizer,
            provider_timeout: DEFAULT_PROVIDER_TIMEOUT,
            synthesis_timeout: DEFAULT_SYNTHESIS_TIMEOUT,
            state,
            events: Arc::new(EventBus::default()),
        }
    }

    pub fn with_provider_timeout(mut self, timeout: Duration) -> Self {
        self.provider_timeout = timeout;
        self
    }

    pub fn with_synthesis_timeout(mut self, timeout: Duration) -> Self {
        self.synthesis_timeout = timeout;
        self
    }

    pub fn with_event_bus(mut self, events: Arc<EventBus>) -> Self {
        self.events = events;
        self
    }

    /// Startup initialisation: language model, context providers, prompt
    /// template and memory bound, all from configuration.
    ///
    /// Fails when the configuration is invalid or the language model cannot
    /// be configured; missing context sources are skipped with a warning.
    pub fn from_config(config: &AppConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let synthesizer = aide_providers::build_from_config(config)?;
        let router = router::build_from_config(config);
        let assistant = Self::new(
            router,
            synthesizer,
            PromptAssembler::from_config(config),
            config.memory.capacity,
        )
        .with_provider_timeout(Duration::from_secs(config.context.provider_timeout_secs))
        .with_synthesis_timeout(Duration::from_secs(config.llm.timeout_secs));

        info!(
            name = %config.assistant_name,
            model = %config.llm.model,
            tools = ?assistant.tool_names(),
            "Assistant ready"
        );
        Ok(assistant)
    }

    /// Answer one question. Always returns non-empty text.
    pub async fn process_command(&self, question: &str) -> String {
        let question = question.trim();
        if question.is_empty() {
            self.reject("empty question");
            return EMPTY_MESSAGE.to_string();
        }

        let Ok(guard) = self.memory.try_lock() else {
            self.reject("busy");
            return BUSY_MESSAGE.to_string();
        };
        let exchange = ExchangeState::enter(&self.state);
        // Bound after `exchange` so the lock is released before `Idle` is published
        let mut memory = guard;

        self.events.publish(DomainEvent::ExchangeStarted {
            question_preview: question.chars().take(PREVIEW_CHARS).collect(),
            timestamp: Utc::now(),
        });

        let tool = self.router.route(question);
        debug!(tool = tool.map(|t| t.name()), "Routed question");
        self.events.publish(DomainEvent::ToolSelected {
            tool_name: tool.map(|t| t.name().to_string()),
            timestamp: Utc::now(),
        });

        let context = match tool {
            Some(spec) => {
                exchange.set(SessionState::FetchingContext);
                let started = Instant::now();
                let result = spec.invoke(question, self.provider_timeout).await;
                self.events.publish(DomainEvent::ContextFetched {
                    source_name: result.source_name.clone(),
                    found: result.found,
                    duration_ms: started.elapsed().as_millis() as u64,
                    timestamp: Utc::now(),
                });
                Some(result)
            }
            None => None,
        };

        exchange.set(SessionState::Synthesizing);
        let request = self
            .assembler
            .assemble(question, memory.snapshot(), context.as_ref());

        let outcome = match tokio::time::timeout(
            self.synthesis_timeout,
            self.synthesizer.complete(&request),
        )
        .await
        {
            Ok(outcome) => outcome,
            Err(_) => Err(SynthesisError::Timeout(self.synthesis_timeout.as_secs())),
        };

        let completion = match outcome {
            Ok(completion) => completion,
            Err(e) => {
                warn!(error = %e, synthesizer = self.synthesizer.name(), "Synthesis failed");
                self.events.publish(DomainEvent::SynthesisFailed {
                    error_message: e.to_string(),
                    timestamp: Utc::now(),
                });
                return e.user_message();
            }
        };

        exchange.set(SessionState::UpdatingMemory);
        memory.record_exchange(question, completion.text.clone());

        self.events.publish(DomainEvent::ExchangeCompleted {
            model: completion.model.clone(),
            tokens_used: completion.usage.map(|u| u.total_tokens).unwrap_or(0),
            memory_len: memory.len(),
            timestamp: Utc::now(),
        });

        completion.text
    }

    /// The daily snapshot, through the same pipeline as any question.
    pub async fn get_snapshot(&self) -> String {
        self.process_command(SNAPSHOT_QUESTION).await
    }

    pub fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    pub fn events(&self) -> Arc<EventBus> {
        Arc::clone(&self.events)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Arc<DomainEvent>> {
        self.events.subscribe()
    }

    /// Current memory window, or `None` while an exchange holds it.
    pub fn memory_snapshot(&self) -> Option<Vec<Turn>> {
        self.memory.try_lock().ok().map(|memory| memory.snapshot())
    }

    pub fn tool_names(&self) -> Vec<&str> {
        self.router.tool_names()
    }

    pub fn synthesizer_name(&self) -> &str {
        self.synthesizer.name()
    }

    /// Teardown: waits for any exchange in flight, then clears memory.
    pub async fn shutdown(&self) {
        let mut memory = self.memory.lock().await;
        memory.clear();
        self.state.send_replace(SessionState::Idle);
        info!("Assistant shut down");
    }

    fn reject(&self, reason: &str) {
        debug!(reason, "Question rejected");
        self.events.publish(DomainEvent::ExchangeRejected {
            reason: reason.to_string(),
            timestamp: Utc::now(),
        });
    }
}
