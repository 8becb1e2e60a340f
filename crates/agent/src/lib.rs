//! The exchange pipeline behind Aide.
//!
//! Every question runs through the same path:
//!
//! 1. **Route** it to at most one context provider ([`ToolRouter`])
//! 2. **Fetch** context from that provider, degrading to none on failure
//! 3. **Assemble** the prompt ([`PromptAssembler`]) from instructions,
//!    context, and [`ConversationMemory`]
//! 4. **Synthesize** the answer and record the exchange ([`Assistant`])

pub mod assembler;
pub mod memory;
pub mod router;
pub mod session;

pub use assembler::{PromptAssembler, TRUNCATION_MARKER, truncate_context};
pub use memory::ConversationMemory;
pub use router::{ToolRouter, ToolSpec, Trigger};
pub use session::{Assistant, BUSY_MESSAGE, EMPTY_MESSAGE, SNAPSHOT_QUESTION};
