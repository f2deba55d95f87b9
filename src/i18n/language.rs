//! Language type: the two storefront display languages.

use serde::{Deserialize, Serialize};

/// A supported display language.
///
/// English is the canonical language: every dictionary key is an English
/// phrase and every stored preference defaults to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    Id,
}

impl Language {
    /// All supported languages, canonical first.
    pub const ALL: [Language; 2] = [Language::En, Language::Id];

    /// Parse an ISO 639-1 code (case-insensitive, surrounding whitespace ignored).
    ///
    /// # Returns
    /// * `Some(Language)` for "en" or "id"
    /// * `None` for anything else
    pub fn from_code(code: &str) -> Option<Language> {
        match code.trim().to_ascii_lowercase().as_str() {
            "en" => Some(Language::En),
            "id" => Some(Language::Id),
            _ => None,
        }
    }

    /// Get the ISO 639-1 language code.
    pub fn code(&self) -> &'static str {
        match self {
            Language::En => "en",
            Language::Id => "id",
        }
    }

    /// Get the English name of the language.
    pub fn name(&self) -> &'static str {
        match self {
            Language::En => "English",
            Language::Id => "Indonesian",
        }
    }

    /// Get the native name of the language.
    pub fn native_name(&self) -> &'static str {
        match self {
            Language::En => "English",
            Language::Id => "Bahasa Indonesia",
        }
    }

    /// The other supported language.
    pub fn opposite(&self) -> Language {
        match self {
            Language::En => Language::Id,
            Language::Id => Language::En,
        }
    }

    /// Check if this is the canonical (dictionary key) language.
    pub fn is_canonical(&self) -> bool {
        *self == Language::En
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}
