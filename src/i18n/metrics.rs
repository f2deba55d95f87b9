//! Translation metrics and observability module.
//!
//! Counts how each `translate` call was resolved so missing dictionary
//! coverage shows up in logs and reports.

use serde::Serialize;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Per-engine translation counters.
#[derive(Debug, Default)]
pub struct TranslationMetrics {
    /// Whole-string dictionary hits
    exact_hits: AtomicUsize,

    /// Multi-word strings where at least one word was substituted
    word_hits: AtomicUsize,

    /// Strings returned unchanged because nothing matched
    fallbacks: AtomicUsize,
}

impl TranslationMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_exact_hit(&self) {
        self.exact_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_word_hit(&self) {
        self.word_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_fallback(&self) {
        self.fallbacks.fetch_add(1, Ordering::Relaxed);
    }

    pub fn exact_hits(&self) -> usize {
        self.exact_hits.load(Ordering::Relaxed)
    }

    pub fn word_hits(&self) -> usize {
        self.word_hits.load(Ordering::Relaxed)
    }

    pub fn fallbacks(&self) -> usize {
        self.fallbacks.load(Ordering::Relaxed)
    }

    /// Generate a metrics report.
    pub fn report(&self) -> MetricsReport {
        let exact = self.exact_hits();
        let words = self.word_hits();
        let fallbacks = self.fallbacks();
        let total = exact + words + fallbacks;

        let coverage_rate = if total > 0 {
            ((exact + words) as f64 / total as f64) * 100.0
        } else {
            0.0
        };

        MetricsReport {
            exact_hits: exact,
            word_hits: words,
            fallbacks,
            total_lookups: total,
            coverage_rate,
        }
    }

    /// Reset all counters to zero.
    pub fn reset(&self) {
        self.exact_hits.store(0, Ordering::Relaxed);
        self.word_hits.store(0, Ordering::Relaxed);
        self.fallbacks.store(0, Ordering::Relaxed);
    }
}

/// Snapshot of translation statistics.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsReport {
    pub exact_hits: usize,
    pub word_hits: usize,
    pub fallbacks: usize,
    pub total_lookups: usize,

    /// Share of lookups that changed the text, as a percentage (0-100)
    pub coverage_rate: f64,
}
