//! Heuristic English/Indonesian language detection.
//!
//! Each whitespace-separated token is scored against a fixed set of weighted
//! patterns per language, plus a bonus when the token is a known dictionary
//! phrase. Indonesian wins only on a strictly higher total; ties and empty
//! input resolve to English. This is a display-language affordance and must
//! not gate anything else.

use crate::i18n::{Language, TranslationDictionary};
use regex::Regex;
use std::sync::OnceLock;

/// Score added when a token is an English key or Indonesian value in the dictionary
pub const DICTIONARY_BONUS: u32 = 2;

struct WeightedPattern {
    regex: Regex,
    weight: u32,
}

struct PatternSet {
    indonesian: Vec<WeightedPattern>,
    english: Vec<WeightedPattern>,
}

static PATTERNS: OnceLock<PatternSet> = OnceLock::new();

fn compile(patterns: &[(&str, u32)]) -> Vec<WeightedPattern> {
    patterns
        .iter()
        .map(|(pattern, weight)| WeightedPattern {
            // Patterns are compile-time constants covered by tests
            regex: Regex::new(pattern).expect("detector pattern should compile"),
            weight: *weight,
        })
        .collect()
}

fn patterns() -> &'static PatternSet {
    PATTERNS.get_or_init(|| PatternSet {
        indonesian: compile(&[
            // Open syllables: consonant-vowel pairs ending the word
            (r"^[a-z]*[bcdfghjklmnprstvwy][aiu]$", 1),
            // Common suffix morphemes
            (r"(kan|nya|lah|kah|an)$", 1),
            // Common prefix morphemes
            (r"^(meng|mem|men|me|ber|ter|per|di|ke|se)[a-z]{3,}", 1),
            // Digraphs rare in English words
            (r"(ng|ny)[aiueo]", 1),
            // Stopwords
            (
                r"^(dan|yang|di|ke|dari|untuk|dengan|ini|itu|tidak|ada|saya|anda|kami|kita|akan|sudah|belum|juga|atau|pada|dalam|bisa)$",
                3,
            ),
        ]),
        english: compile(&[
            // Words containing vowel clusters typical of English spelling
            (r"(ee|oo|ea|ou|ai|ie)", 1),
            // Common suffixes
            (r"(ing|ed|tion|ly|ness|ment|er|s)$", 1),
            // Consonant clusters rare in Indonesian
            (r"(th|sh|ch|wh|ck|ph|gh|w[aeiou])", 1),
            // Stopwords and auxiliary verbs
            (
                r"^(the|and|is|are|was|were|of|to|in|for|with|your|you|this|that|have|has|will|can|be|on|at|it|our|my|we|not|do|does|an|a)$",
                3,
            ),
        ]),
    })
}

/// Per-language scores for a piece of text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LanguageScores {
    pub english: u32,
    pub indonesian: u32,
}

impl LanguageScores {
    /// Indonesian only on a strictly higher score.
    pub fn verdict(&self) -> Language {
        if self.indonesian > self.english {
            Language::Id
        } else {
            Language::En
        }
    }
}

/// Score every token of `text` for both languages.
pub fn score_text(text: &str, dictionary: &TranslationDictionary) -> LanguageScores {
    let patterns = patterns();
    let mut scores = LanguageScores::default();

    for token in text.split_whitespace() {
        if dictionary.contains_english(token) {
            scores.english += DICTIONARY_BONUS;
        }
        if dictionary.contains_indonesian(token) {
            scores.indonesian += DICTIONARY_BONUS;
        }

        let normalized: String = token
            .chars()
            .filter(|c| c.is_alphabetic())
            .flat_map(char::to_lowercase)
            .collect();
        if normalized.is_empty() {
            continue;
        }

        scores.indonesian += patterns
            .indonesian
            .iter()
            .filter(|p| p.regex.is_match(&normalized))
            .map(|p| p.weight)
            .sum::<u32>();
        scores.english += patterns
            .english
            .iter()
            .filter(|p| p.regex.is_match(&normalized))
            .map(|p| p.weight)
            .sum::<u32>();
    }

    scores
}

/// Detect whether `text` reads as English or Indonesian.
pub fn detect_language(text: &str, dictionary: &TranslationDictionary) -> Language {
    score_text(text, dictionary).verdict()
}
