//! Signature catalog: the ordered list of crawler user-agent tokens and their
//! display names.
//!
//! The catalog is built once at start-up (built-in defaults, or a JSON file
//! named by `BOTWATCH_SIGNATURES_PATH`) and shared read-only afterwards.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// One known crawler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    /// Literal substring recognised in a user agent (e.g. "GPTBot")
    pub token: String,
    /// Human-readable bot name (e.g. "OpenAI GPT")
    pub name: String,
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read signature file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse signature file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("signature #{index} has an empty token")]
    EmptyToken { index: usize },
    #[error("signature token '{token}' is declared twice")]
    DuplicateToken { token: String },
    #[error("signature catalog is empty")]
    Empty,
}

const DEFAULT_SIGNATURES: &[(&str, &str)] = &[
    ("GPTBot", "OpenAI GPT"),
    ("ChatGPT-User", "ChatGPT"),
    ("Google-Extended", "Google Bard/Gemini"),
    ("PerplexityBot", "Perplexity AI"),
    ("ClaudeBot", "Anthropic Claude"),
    ("claude-web", "Anthropic Claude"),
    ("CCBot", "Common Crawl"),
    ("Diffbot", "Diffbot"),
    ("anthropic-ai", "Anthropic Claude"),
    ("Bytespider", "ByteDance AI"),
    ("Applebot-Extended", "Apple Intelligence"),
    ("cohere-ai", "Cohere AI"),
    ("YouBot", "You.com AI"),
];

/// Immutable, ordered token → display-name mapping.
///
/// Declaration order is significant: the classifier reports the first token
/// that matches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureCatalog {
    entries: Vec<Signature>,
}

impl SignatureCatalog {
    /// Builds a catalog, rejecting empty or repeated tokens (compared case-insensitively).
    pub fn new(entries: Vec<Signature>) -> Result<Self, CatalogError> {
        if entries.is_empty() {
            return Err(CatalogError::Empty);
        }

        let mut seen = std::collections::HashSet::new();
        for (index, entry) in entries.iter().enumerate() {
            let token = entry.token.trim();
            if token.is_empty() {
                return Err(CatalogError::EmptyToken { index });
            }
            if !seen.insert(token.to_ascii_lowercase()) {
                return Err(CatalogError::DuplicateToken {
                    token: token.to_string(),
                });
            }
        }

        let entries = entries
            .into_iter()
            .map(|entry| Signature {
                token: entry.token.trim().to_string(),
                name: entry.name,
            })
            .collect();

        Ok(Self { entries })
    }

    /// Loads a catalog from a JSON array of `{"token", "name"}` objects.
    pub fn load_from(path: &Path) -> Result<Self, CatalogError> {
        let display = path.display().to_string();
        let content = std::fs::read_to_string(path).map_err(|source| CatalogError::Read {
            path: display.clone(),
            source,
        })?;
        let entries: Vec<Signature> =
            serde_json::from_str(&content).map_err(|source| CatalogError::Parse {
                path: display,
                source,
            })?;
        Self::new(entries)
    }

    /// Uses `path` when given, otherwise the built-in catalog.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, CatalogError> {
        match path {
            Some(path) => Self::load_from(path),
            None => Ok(Self::default()),
        }
    }

    /// Display name for `token`, or the token itself when it is not catalogued.
    pub fn display_name<'a>(&'a self, token: &'a str) -> &'a str {
        self.entries
            .iter()
            .find(|entry| entry.token == token)
            .map(|entry| {
                if entry.name.trim().is_empty() {
                    entry.token.as_str()
                } else {
                    entry.name.as_str()
                }
            })
            .unwrap_or(token)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Signature> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for SignatureCatalog {
    fn default() -> Self {
        Self {
            entries: DEFAULT_SIGNATURES
                .iter()
                .map(|(token, name)| Signature {
                    token: (*token).to_string(),
                    name: (*name).to_string(),
                })
                .collect(),
        }
    }
}
