//! Durable display-language preference.

use crate::i18n::Language;
use crate::storage::{read_or_none, KeyValueStore, StorageError, LANGUAGE_KEY};
use std::sync::Arc;
use tracing::{info, warn};

/// Current display language plus the transient animation flag.
///
/// Only the language is persisted; `is_transitioning` lives for the session.
/// Changes are written through immediately, without debouncing.
pub struct LanguagePreference {
    current: Language,
    is_transitioning: bool,
    store: Arc<dyn KeyValueStore>,
}

impl std::fmt::Debug for LanguagePreference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LanguagePreference")
            .field("current", &self.current)
            .field("is_transitioning", &self.is_transitioning)
            .finish_non_exhaustive()
    }
}

impl LanguagePreference {
    /// Restore the stored language, defaulting to English when the value is
    /// missing, unreadable or not a known code.
    pub fn load(store: Arc<dyn KeyValueStore>) -> Self {
        let current = match read_or_none(store.as_ref(), LANGUAGE_KEY) {
            Some(raw) => Language::from_code(&raw).unwrap_or_else(|| {
                warn!("Ignoring unknown stored language '{}'", raw);
                Language::default()
            }),
            None => Language::default(),
        };

        Self {
            current,
            is_transitioning: false,
            store,
        }
    }

    pub fn current(&self) -> Language {
        self.current
    }

    pub fn is_transitioning(&self) -> bool {
        self.is_transitioning
    }

    /// Switch to `language` and persist it.
    pub fn set(&mut self, language: Language) -> Result<(), StorageError> {
        self.current = language;
        self.store.set(LANGUAGE_KEY, language.code())?;
        info!("Display language set to {}", language.name());
        Ok(())
    }

    /// Flip to the other language and mark a transition as in progress.
    pub fn toggle(&mut self) -> Result<Language, StorageError> {
        self.is_transitioning = true;
        let next = self.current.opposite();
        self.set(next)?;
        Ok(next)
    }

    /// Clear the transition flag once the UI has finished animating.
    pub fn finish_transition(&mut self) {
        self.is_transitioning = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    fn store() -> Arc<dyn KeyValueStore> {
        Arc::new(MemoryStore::new())
    }

    #[test]
    fn test_defaults_to_english() {
        let preference = LanguagePreference::load(store());
        assert_eq!(preference.current(), Language::En);
        assert!(!preference.is_transitioning());
    }

    #[test]
    fn test_restores_stored_language() {
        let store = store();
        store.set(LANGUAGE_KEY, "id").unwrap();
        assert_eq!(LanguagePreference::load(store).current(), Language::Id);
    }

    #[test]
    fn test_unknown_stored_value_falls_back() {
        let store = store();
        store.set(LANGUAGE_KEY, "{\"lang\":\"fr\"}").unwrap();
        assert_eq!(LanguagePreference::load(store).current(), Language::En);
    }

    #[test]
    fn test_set_persists_immediately() {
        let store = store();
        let mut preference = LanguagePreference::load(Arc::clone(&store));
        preference.set(Language::Id).unwrap();

        assert_eq!(store.get(LANGUAGE_KEY).unwrap().as_deref(), Some("id"));
        assert_eq!(LanguagePreference::load(store).current(), Language::Id);
    }

    #[test]
    fn test_toggle_and_transition_flag() {
        let mut preference = LanguagePreference::load(store());

        assert_eq!(preference.toggle().unwrap(), Language::Id);
        assert!(preference.is_transitioning());

        preference.finish_transition();
        assert!(!preference.is_transitioning());

        assert_eq!(preference.toggle().unwrap(), Language::En);
    }
}
