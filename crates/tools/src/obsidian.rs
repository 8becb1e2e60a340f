//! Obsidian vault context provider.
//!
//! Strips routing phrases and stop words from the question. With nothing
//! left, lists every note in the vault; otherwise returns an excerpt of each
//! note containing all remaining terms.

use std::path::{Path, PathBuf};

use aide_config::ObsidianConfig;
use aide_core::context::{ContextProvider, ContextResult};
use aide_core::error::ProviderError;
use async_trait::async_trait;
use tracing::debug;

const SOURCE: &str = "Obsidian";

/// Multi-word routing phrases, removed before splitting.
const ROUTING_PHRASES: &[&str] = &[
    "my notes",
    "remember about",
    "research on",
    "anything about",
    "search for",
];

const STOP_WORDS: &[&str] = &[
    "obsidian", "vault", "notes", "note", "remember", "in", "my", "about", "what", "are", "is",
    "a", "an", "the", "do", "i", "have", "on", "for", "of", "to", "me", "show", "find", "any",
    "say", "does", "tell", "list",
];

pub struct ObsidianProvider {
    vault: PathBuf,
    snippet_chars: usize,
}

impl ObsidianProvider {
    pub fn new(vault: impl Into<PathBuf>, snippet_chars: usize) -> Self {
        Self {
            vault: vault.into(),
            snippet_chars,
        }
    }

    /// Build from the `[obsidian]` section. Fails without a vault path.
    pub fn from_config(config: &ObsidianConfig) -> Result<Self, ProviderError> {
        let vault = config.vault_dir().ok_or_else(|| ProviderError::NotConfigured {
            source_name: SOURCE.into(),
            reason: "set OBSIDIAN_VAULT_PATH or add vault_path to [obsidian]".into(),
        })?;
        Ok(Self::new(vault, config.snippet_chars))
    }
}

#[async_trait]
impl ContextProvider for ObsidianProvider {
    fn name(&self) -> &str {
        "obsidian"
    }

    fn source_name(&self) -> &str {
        SOURCE
    }

    async fn fetch(&self, query: &str) -> Result<ContextResult, ProviderError> {
        let terms = search_terms(query);
        debug!(?terms, vault = %self.vault.display(), "Searching vault");

        let vault = self.vault.clone();
        let snippet_chars = self.snippet_chars;
        let text = tokio::task::spawn_blocking(move || search_vault(&vault, &terms, snippet_chars))
            .await
            .map_err(|e| ProviderError::Io {
                source_name: SOURCE.into(),
                reason: e.to_string(),
            })?
            .map_err(|e| ProviderError::Io {
                source_name: SOURCE.into(),
                reason: e.to_string(),
            })?;

        Ok(ContextResult::found(SOURCE, text))
    }
}

/// The lowercase terms left after removing routing phrases and stop words.
pub fn search_terms(query: &str) -> Vec<String> {
    let mut cleaned = query.to_lowercase();
    for phrase in ROUTING_PHRASES {
        cleaned = cleaned.replace(phrase, " ");
    }

    cleaned
        .split_whitespace()
        .map(|word| word.trim_matches(|c: char| !c.is_alphanumeric() && c != '-' && c != '_'))
        .filter(|word| !word.is_empty() && !STOP_WORDS.contains(word))
        .map(String::from)
        .collect()
}

fn search_vault(vault: &Path, terms: &[String], snippet_chars: usize) -> std::io::Result<String> {
    if !vault.is_dir() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("vault not found at {}", vault.display()),
        ));
    }

    let mut notes = Vec::new();
    collect_notes(vault, &mut notes)?;
    notes.sort();

    if terms.is_empty() {
        if notes.is_empty() {
            return Ok("The vault appears to be empty.".into());
        }
        let mut out = String::from("Notes in the vault:\n");
        for note in &notes {
            let rel = note.strip_prefix(vault).unwrap_or(note.as_path());
            out.push_str(&format!("- {}\n", rel.display()));
        }
        return Ok(out);
    }

    let mut out = format!("Notes containing '{}':\n", terms.join(" "));
    let mut matched = 0;
    for note in &notes {
        // Skip unreadable or non-UTF-8 files instead of failing the search
        let Ok(content) = std::fs::read_to_string(note) else {
            continue;
        };
        let haystack = content.to_lowercase();
        if terms.iter().all(|term| haystack.contains(term.as_str())) {
            let name = note.file_name().unwrap_or_default().to_string_lossy();
            out.push_str(&format!(
                "\n--- Start of note: {name} ---\n{}\n",
                excerpt(&content, snippet_chars)
            ));
            matched += 1;
        }
    }

    if matched == 0 {
        return Ok(format!(
            "No notes contain all of the terms: {}.",
            terms.join(", ")
        ));
    }
    Ok(out)
}

fn collect_notes(dir: &Path, notes: &mut Vec<PathBuf>) -> std::io::Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        let file_type = entry.file_type()?;
        if file_type.is_dir() {
            // .obsidian holds app settings, not notes
            if !entry.file_name().to_string_lossy().starts_with('.') {
                collect_notes(&path, notes)?;
            }
        } else if path.extension().is_some_and(|ext| ext == "md") {
            notes.push(path);
        }
    }
    Ok(())
}

fn excerpt(content: &str, max_chars: usize) -> String {
    match content.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &content[..cut]),
        None => content.to_string(),
    }
}
