//! Internationalization (i18n) module for the English/Indonesian storefront.
//!
//! # Architecture
//!
//! - `language`: The two supported display languages
//! - `dictionary`: Bidirectional phrase table with the built-in storefront entries
//! - `detector`: Heuristic language detection by weighted token scoring
//! - `engine`: Thread-safe translation with word-level and identity fallback
//! - `preference`: Persisted display-language choice
//! - `metrics`: Translation coverage counters
//!
//! # Example
//!
//! ```rust,ignore
//! use storefront_core::i18n::{Language, TranslationEngine};
//!
//! let engine = TranslationEngine::default();
//! assert_eq!(engine.translate("Add to Cart", Some(Language::Id)), "Tambah ke Keranjang");
//! assert_eq!(engine.translate("Keranjang", None), "Cart");
//! ```

mod detector;
mod dictionary;
mod engine;
mod language;
mod metrics;
mod preference;

pub use detector::{detect_language, score_text, LanguageScores, DICTIONARY_BONUS};
pub use dictionary::{DictionaryError, TranslationDictionary, STOREFRONT_PHRASES};
pub use engine::TranslationEngine;
pub use language::Language;
pub use metrics::{MetricsReport, TranslationMetrics};
pub use preference::LanguagePreference;
