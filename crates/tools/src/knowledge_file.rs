//! Knowledge file reader: `read <filename>` loads one file from the
//! knowledge folder.

use std::path::{Path, PathBuf};

use aide_config::KnowledgeConfig;
use aide_core::context::{ContextProvider, ContextResult};
use aide_core::error::ProviderError;
use async_trait::async_trait;
use regex_lite::Regex;
use tracing::debug;

const SOURCE: &str = "Knowledge file";

pub struct KnowledgeFileProvider {
    /// Directory files are read from; nothing outside it is reachable.
    root: PathBuf,
}

impl KnowledgeFileProvider {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn from_config(config: &KnowledgeConfig) -> Self {
        Self::new(config.knowledge_dir())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve `filename` inside the knowledge folder, rejecting anything
    /// that would land outside it.
    fn resolve(&self, filename: &str) -> Result<PathBuf, ProviderError> {
        let invalid = |reason: String| ProviderError::InvalidQuery {
            source_name: SOURCE.into(),
            reason,
        };

        if filename.chars().all(|c| c == '.') {
            return Err(invalid(format!("'{filename}' is not a file name")));
        }

        let candidate = self.root.join(filename);
        if !candidate.exists() {
            return Ok(candidate);
        }

        // Symlinks may still point elsewhere
        let root = self
            .root
            .canonicalize()
            .map_err(|e| invalid(format!("knowledge folder: {e}")))?;
        let resolved = candidate
            .canonicalize()
            .map_err(|e| invalid(format!("{filename}: {e}")))?;
        if !resolved.starts_with(&root) {
            return Err(invalid(format!("'{filename}' is outside the knowledge folder")));
        }
        Ok(resolved)
    }
}

/// Extract the filename from a `read <filename>` question.
pub fn requested_filename(query: &str) -> Option<String> {
    let re = Regex::new(r"(?i)\bread\s+([\w.\-]+)").ok()?;
    re.captures(query)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim_end_matches('.').to_string())
        .filter(|name| !name.is_empty())
}

#[async_trait]
impl ContextProvider for KnowledgeFileProvider {
    fn name(&self) -> &str {
        "knowledge_file"
    }

    fn source_name(&self) -> &str {
        SOURCE
    }

    async fn fetch(&self, query: &str) -> Result<ContextResult, ProviderError> {
        let filename = requested_filename(query).ok_or_else(|| ProviderError::InvalidQuery {
            source_name: SOURCE.into(),
            reason: "no filename after 'read'".into(),
        })?;

        let path = self.resolve(&filename)?;
        debug!(file = %path.display(), "Reading knowledge file");

        match tokio::fs::read_to_string(&path).await {
            Ok(content) => Ok(ContextResult::found(
                format!("{SOURCE} '{filename}'"),
                format!("Contents of '{filename}':\n---\n{content}\n---"),
            )),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(ContextResult::found(
                SOURCE,
                format!(
                    "There is no file named '{filename}' in the knowledge folder ({}).",
                    self.root.display()
                ),
            )),
            Err(e) => Err(ProviderError::Io {
                source_name: SOURCE.into(),
                reason: format!("{filename}: {e}"),
            }),
        }
    }
}
