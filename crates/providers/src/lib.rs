//! Language model backends for Aide.
//!
//! All backends implement the `aide_core::Synthesizer` trait.
//! [`build_from_config`] selects and constructs the configured one.

pub mod openai_compat;
pub mod router;

pub use openai_compat::OpenAiCompatSynthesizer;
pub use router::build_from_config;
