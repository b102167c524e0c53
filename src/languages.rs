//! Display metadata for OCR language codes.
//!
//! The registry only feeds the language picker; OCR requests are not
//! checked against it.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use utoipa::ToSchema;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct LanguageEntry {
    pub code: String,
    pub name: String,
    pub script: String,
}

impl LanguageEntry {
    pub fn new(code: &str, name: &str, script: &str) -> Self {
        Self {
            code: code.to_string(),
            name: name.to_string(),
            script: script.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct LanguagesFile {
    languages: Vec<LanguageEntry>,
}

/// Where the registry contents came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistrySource {
    Configured { path: PathBuf },
    Default { reason: String },
}

#[derive(Debug, Clone)]
pub struct LanguageRegistry {
    languages: Vec<LanguageEntry>,
    source: RegistrySource,
}

impl LanguageRegistry {
    /// Reads `{"languages": [...]}` from `path`. An unreadable or malformed
    /// file is logged and replaced by the English-only default.
    pub fn load(path: &Path) -> Self {
        let parsed = std::fs::read_to_string(path)
            .map_err(|e| e.to_string())
            .and_then(|raw| {
                serde_json::from_str::<LanguagesFile>(&raw).map_err(|e| e.to_string())
            });

        match parsed {
            Ok(file) => {
                info!(
                    "Loaded {} language(s) from {}",
                    file.languages.len(),
                    path.display()
                );
                Self {
                    languages: file.languages,
                    source: RegistrySource::Configured {
                        path: path.to_path_buf(),
                    },
                }
            }
            Err(reason) => {
                warn!(
                    "Could not load {}: {}. Using default languages.",
                    path.display(),
                    reason
                );
                Self::fallback(reason)
            }
        }
    }

    pub fn fallback(reason: String) -> Self {
        Self {
            languages: vec![LanguageEntry::new("eng", "English", "Latin")],
            source: RegistrySource::Default { reason },
        }
    }

    pub fn from_entries(languages: Vec<LanguageEntry>) -> Self {
        Self {
            languages,
            source: RegistrySource::Configured {
                path: PathBuf::new(),
            },
        }
    }

    pub fn list(&self) -> &[LanguageEntry] {
        &self.languages
    }

    pub fn source(&self) -> &RegistrySource {
        &self.source
    }
}
