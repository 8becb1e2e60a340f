//! # Aide Core
//!
//! Domain types, traits, and error definitions for the Aide desktop assistant.
//! This crate has **no I/O of its own**; it defines the domain model that the
//! other crates implement against.
//!
//! ## Design Philosophy
//!
//! Both outbound seams are traits defined here:
//! - [`ContextProvider`] for the information sources (calendar, tasks, notes)
//! - [`Synthesizer`] for the hosted language model
//!
//! Implementations live in `aide-tools` and `aide-providers`. The session
//! controller in `aide-agent` only ever sees the traits, so every piece can
//! be replaced by a scripted stub in tests.

pub mod context;
pub mod error;
pub mod event;
pub mod message;
pub mod session;
pub mod synthesizer;

// Re-export key types at crate root for ergonomics
pub use context::{ContextProvider, ContextResult};
pub use error::{ProviderError, SynthesisError};
pub use event::{DomainEvent, EventBus};
pub use message::{ChatMessage, Role, Turn};
pub use session::SessionState;
pub use synthesizer::{Completion, ContextBlock, PromptRequest, Synthesizer, Usage};
