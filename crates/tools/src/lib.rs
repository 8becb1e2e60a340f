//! Context providers for Aide.
//!
//! Each provider reads one external source and returns a small block of
//! text for the prompt:
//! calendar events, Notion databases, Obsidian notes, a file from the
//! knowledge folder, or a combined daily brief.
//!
//! Providers that cannot run with the current configuration refuse to build
//! (`from_config` returns `ProviderError::NotConfigured`), so the router
//! only ever dispatches to sources that are set up.

pub mod calendar;
pub mod daily_brief;
mod http;
pub mod knowledge_file;
pub mod notion;
pub mod obsidian;

pub use calendar::CalendarProvider;
pub use daily_brief::DailyBriefProvider;
pub use knowledge_file::KnowledgeFileProvider;
pub use notion::NotionProvider;
pub use obsidian::ObsidianProvider;
