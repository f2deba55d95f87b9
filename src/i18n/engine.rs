//! Dictionary-backed translation between English and Indonesian.
//!
//! Translation never fails: text without a dictionary match comes back
//! unchanged. Lookup order is exact phrase, then word-by-word substitution for
//! multi-word text, then identity.

use crate::i18n::detector;
use crate::i18n::{Language, TranslationDictionary, TranslationMetrics};
use std::sync::{PoisonError, RwLock};
use tracing::debug;

/// Shared, runtime-extensible translation engine.
///
/// The dictionary sits behind an `RwLock`: lookups take a read lock,
/// [`TranslationEngine::add_translation`] updates both directions under a
/// single write lock. Share it by `Arc` or plain reference; there is no
/// global instance.
#[derive(Debug)]
pub struct TranslationEngine {
    dictionary: RwLock<TranslationDictionary>,
    metrics: TranslationMetrics,
}

impl Default for TranslationEngine {
    fn default() -> Self {
        Self::new(TranslationDictionary::storefront())
    }
}

impl TranslationEngine {
    pub fn new(dictionary: TranslationDictionary) -> Self {
        Self {
            dictionary: RwLock::new(dictionary),
            metrics: TranslationMetrics::new(),
        }
    }

    /// Translate `text` into `target`, or into the opposite of its detected
    /// language when `target` is `None`.
    pub fn translate(&self, text: &str, target: Option<Language>) -> String {
        if text.trim().is_empty() {
            return text.to_string();
        }

        // A poisoned lock still holds a consistent map: insertions never panic midway
        let dictionary = self
            .dictionary
            .read()
            .unwrap_or_else(PoisonError::into_inner);

        let target = target.unwrap_or_else(|| {
            detector::detect_language(text, &dictionary).opposite()
        });
        let lookup = |phrase: &str| match target {
            Language::Id => dictionary.to_indonesian(phrase),
            Language::En => dictionary.to_english(phrase),
        };

        if let Some(translated) = lookup(text) {
            self.metrics.record_exact_hit();
            return translated.to_string();
        }

        // Split on single spaces so rejoining keeps the original spacing
        let words: Vec<&str> = text.split(' ').collect();
        if words.iter().filter(|word| !word.is_empty()).count() > 1 {
            let mut changed = false;
            let translated: Vec<&str> = words
                .iter()
                .map(|&word| match lookup(word) {
                    Some(hit) => {
                        changed = true;
                        hit
                    }
                    None => word,
                })
                .collect();

            if changed {
                self.metrics.record_word_hit();
                return translated.join(" ");
            }
        }

        debug!("No {} translation for '{}', returning it unchanged", target, text);
        self.metrics.record_fallback();
        text.to_string()
    }

    /// Heuristically detect the language of `text`.
    pub fn detect_language(&self, text: &str) -> Language {
        let dictionary = self
            .dictionary
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        detector::detect_language(text, &dictionary)
    }

    /// Add a pair to both directions. Empty arguments are ignored.
    pub fn add_translation(&self, english: &str, indonesian: &str) -> bool {
        let mut dictionary = self
            .dictionary
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        dictionary.insert(english, indonesian)
    }

    /// Check whether `text` is a key in either direction.
    pub fn is_translatable(&self, text: &str) -> bool {
        let dictionary = self
            .dictionary
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        dictionary.contains_english(text) || dictionary.contains_indonesian(text)
    }

    /// Snapshot of the current dictionary.
    pub fn dictionary(&self) -> TranslationDictionary {
        self.dictionary
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn metrics(&self) -> &TranslationMetrics {
        &self.metrics
    }
}
