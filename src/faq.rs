//! Persisted FAQ page state: which questions are expanded and which category
//! tab is active.

use crate::storage::{
    read_or_none, KeyValueStore, StorageError, FAQ_ACTIVE_CATEGORY_KEY, FAQ_OPEN_ITEMS_KEY,
};
use std::collections::BTreeSet;
use tracing::warn;

pub const DEFAULT_CATEGORY: &str = "all";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FaqState {
    pub open_items: BTreeSet<u32>,
    pub active_category: String,
}

impl Default for FaqState {
    fn default() -> Self {
        Self {
            open_items: BTreeSet::new(),
            active_category: DEFAULT_CATEGORY.to_string(),
        }
    }
}

impl FaqState {
    /// Restore from storage; each key falls back to its default on its own.
    pub fn load(store: &dyn KeyValueStore) -> Self {
        let open_items = read_or_none(store, FAQ_OPEN_ITEMS_KEY)
            .and_then(|raw| match serde_json::from_str::<BTreeSet<u32>>(&raw) {
                Ok(items) => Some(items),
                Err(e) => {
                    warn!("Ignoring malformed FAQ open items '{}': {}", raw, e);
                    None
                }
            })
            .unwrap_or_default();

        let active_category = read_or_none(store, FAQ_ACTIVE_CATEGORY_KEY)
            .filter(|category| !category.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_CATEGORY.to_string());

        Self {
            open_items,
            active_category,
        }
    }

    /// Expand or collapse an item and persist the open set.
    pub fn toggle_item(&mut self, store: &dyn KeyValueStore, id: u32) -> Result<bool, StorageError> {
        let open = if self.open_items.remove(&id) {
            false
        } else {
            self.open_items.insert(id);
            true
        };
        self.save_open_items(store)?;
        Ok(open)
    }

    /// Switch category tab and persist it.
    pub fn set_category(
        &mut self,
        store: &dyn KeyValueStore,
        category: &str,
    ) -> Result<(), StorageError> {
        self.active_category = category.to_string();
        store.set(FAQ_ACTIVE_CATEGORY_KEY, category)
    }

    fn save_open_items(&self, store: &dyn KeyValueStore) -> Result<(), StorageError> {
        // Serializing a set of integers cannot fail
        let json = serde_json::to_string(&self.open_items).unwrap_or_else(|_| "[]".to_string());
        store.set(FAQ_OPEN_ITEMS_KEY, &json)
    }
}
