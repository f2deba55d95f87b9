//! Debounced write-behind persistence for checkout drafts.
//!
//! Each draft section (shipping, payment) has its own storage key and its own
//! pending write. Scheduling a write cancels the pending one for that key and
//! arms a new timer, so a burst of edits produces a single write once input
//! pauses for the debounce window.

use crate::checkout::{CheckoutDraft, Field};
use crate::config::Config;
use crate::storage::{read_or_none, KeyValueStore, CHECKOUT_PAYMENT_KEY, CHECKOUT_SHIPPING_KEY};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

const SHIPPING_FIELDS: &[Field] = &[
    Field::FullName,
    Field::Email,
    Field::Phone,
    Field::Address,
    Field::City,
    Field::ZipCode,
    Field::Country,
    Field::DeliveryMethod,
];

// CVV is deliberately absent: it is never restored
const PAYMENT_FIELDS: &[Field] = &[
    Field::CardNumber,
    Field::ExpiryDate,
    Field::CardholderName,
    Field::SelectedMethod,
];

const SECTION_KEYS: [&str; 2] = [CHECKOUT_SHIPPING_KEY, CHECKOUT_PAYMENT_KEY];

struct PendingWrite {
    value: String,
    generation: u64,
    handle: JoinHandle<()>,
}

/// The store plus the latest generation issued per key.
///
/// Writes and removals happen while holding the generation lock, and a write
/// only lands if its generation is still the latest. A timer that already
/// fired therefore cannot resurrect a section after `clear` or overwrite a
/// newer snapshot.
struct SectionWriter {
    store: Arc<dyn KeyValueStore>,
    generations: Mutex<HashMap<&'static str, u64>>,
}

impl SectionWriter {
    fn next_generation(&self, key: &'static str) -> u64 {
        let mut generations = self
            .generations
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let generation = generations.entry(key).or_insert(0);
        *generation += 1;
        *generation
    }

    fn write_if_current(&self, key: &str, generation: u64, value: &str) {
        let generations = self
            .generations
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if generations.get(key) != Some(&generation) {
            debug!("Skipping superseded write for draft section '{}'", key);
            return;
        }
        match self.store.set(key, value) {
            Ok(()) => debug!("Persisted draft section '{}'", key),
            Err(e) => warn!("Failed to persist draft section '{}': {}", key, e),
        }
    }

    /// Invalidate every outstanding write, then delete the sections.
    fn remove_all(&self) {
        let mut generations = self
            .generations
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        for key in SECTION_KEYS {
            *generations.entry(key).or_insert(0) += 1;
            if let Err(e) = self.store.remove(key) {
                warn!("Failed to clear draft section '{}': {}", key, e);
            }
        }
    }
}

pub struct DraftPersister {
    writer: Arc<SectionWriter>,
    debounce: Duration,
    pending: Mutex<HashMap<&'static str, PendingWrite>>,
}

impl std::fmt::Debug for DraftPersister {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DraftPersister")
            .field("debounce", &self.debounce)
            .finish_non_exhaustive()
    }
}

impl DraftPersister {
    pub fn new(store: Arc<dyn KeyValueStore>, debounce: Duration) -> Self {
        Self {
            writer: Arc::new(SectionWriter {
                store,
                generations: Mutex::new(HashMap::new()),
            }),
            debounce,
            pending: Mutex::new(HashMap::new()),
        }
    }

    /// Persister over `store` using the configured debounce window.
    pub fn from_config(store: Arc<dyn KeyValueStore>, config: &Config) -> Self {
        Self::new(store, config.draft_debounce)
    }

    /// Restore the stored draft (see [`load_draft`]).
    pub fn load(&self) -> CheckoutDraft {
        load_draft(self.writer.store.as_ref())
    }

    /// Snapshot `draft` and (re)arm the delayed write for each section.
    ///
    /// Outside a Tokio runtime the snapshot is written immediately. Inside
    /// one, the write runs on the blocking pool once the window elapses.
    pub fn schedule(&self, draft: &CheckoutDraft) {
        let sections = [
            (CHECKOUT_SHIPPING_KEY, serde_json::to_string(&draft.shipping)),
            (CHECKOUT_PAYMENT_KEY, serde_json::to_string(&draft.payment)),
        ];

        let runtime = tokio::runtime::Handle::try_current().ok();
        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);

        for (key, json) in sections {
            let value = match json {
                Ok(value) => value,
                Err(e) => {
                    warn!("Failed to serialize draft section '{}': {}", key, e);
                    continue;
                }
            };

            if let Some(previous) = pending.remove(key) {
                previous.handle.abort();
            }
            let generation = self.writer.next_generation(key);

            let Some(runtime) = &runtime else {
                self.writer.write_if_current(key, generation, &value);
                continue;
            };

            let writer = Arc::clone(&self.writer);
            let debounce = self.debounce;
            let task_value = value.clone();
            let handle = runtime.spawn(async move {
                tokio::time::sleep(debounce).await;
                let write = tokio::task::spawn_blocking(move || {
                    writer.write_if_current(key, generation, &task_value)
                });
                if let Err(e) = write.await {
                    warn!("Draft write task for '{}' failed: {}", key, e);
                }
            });

            pending.insert(
                key,
                PendingWrite {
                    value,
                    generation,
                    handle,
                },
            );
        }
    }

    /// Cancel pending timers and write their snapshots now.
    pub fn flush(&self) {
        let drained: Vec<_> = self
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain()
            .collect();

        for (key, write_op) in drained {
            write_op.handle.abort();
            self.writer
                .write_if_current(key, write_op.generation, &write_op.value);
        }
    }

    /// Wait for every currently pending write to fire.
    pub async fn settle(&self) {
        let handles: Vec<_> = self
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain()
            .map(|(_, write_op)| write_op.handle)
            .collect();

        // Aborted handles resolve with a cancellation error, which is fine here
        let _ = futures::future::join_all(handles).await;
    }

    /// Drop pending writes and delete the stored draft. Called once an order completes.
    ///
    /// A write already in progress finishes before the sections are removed;
    /// one that has not started yet is skipped.
    pub fn clear(&self) {
        let drained: Vec<_> = self
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain()
            .collect();
        for (_, write_op) in drained {
            write_op.handle.abort();
        }

        self.writer.remove_all();
        debug!("Cleared stored checkout draft");
    }
}

impl Drop for DraftPersister {
    fn drop(&mut self) {
        // Timers die with the persister; keep their snapshots
        self.flush();
    }
}

/// Rebuild a draft from storage.
///
/// Missing or malformed sections are treated as absent. Within a section,
/// only fields holding a non-empty string are restored.
pub fn load_draft(store: &dyn KeyValueStore) -> CheckoutDraft {
    let mut draft = CheckoutDraft::new();
    restore_section(store, CHECKOUT_SHIPPING_KEY, SHIPPING_FIELDS, &mut draft);
    restore_section(store, CHECKOUT_PAYMENT_KEY, PAYMENT_FIELDS, &mut draft);
    draft
}

fn restore_section(
    store: &dyn KeyValueStore,
    key: &str,
    fields: &[Field],
    draft: &mut CheckoutDraft,
) {
    let Some(raw) = read_or_none(store, key) else {
        return;
    };

    let object = match serde_json::from_str::<serde_json::Value>(&raw) {
        Ok(serde_json::Value::Object(object)) => object,
        Ok(_) => {
            warn!("Ignoring stored draft section '{}': not a JSON object", key);
            return;
        }
        Err(e) => {
            warn!("Ignoring malformed stored draft section '{}': {}", key, e);
            return;
        }
    };

    for &field in fields {
        if let Some(value) = object.get(field.name()).and_then(|v| v.as_str()) {
            if !value.is_empty() {
                draft.set(field, value);
            }
        }
    }
}
