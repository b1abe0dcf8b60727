use anyhow::Result;
use tracing::warn;

use crate::db::KeyValueStore;

/// A string value mirrored into a [`KeyValueStore`] on every change.
pub struct PersistentTerm<S: KeyValueStore> {
    store: S,
    key: String,
    value: String,
}

impl<S: KeyValueStore> PersistentTerm<S> {
    /// Reads `key` from the store, falling back to `default` when it is absent, empty or unreadable.
    ///
    /// The resulting value is written back once so the store always holds what the session starts with.
    pub fn load(store: S, key: impl Into<String>, default: &str) -> Self {
        let key = key.into();
        let value = match store.get(&key) {
            Ok(Some(value)) if !value.is_empty() => value,
            Ok(_) => default.to_string(),
            Err(e) => {
                warn!(key = %key, error = %e, "failed to read persisted value, using default");
                default.to_string()
            }
        };

        if let Err(e) = store.set(&key, &value) {
            warn!(key = %key, error = %e, "failed to persist initial value");
        }

        Self { store, key, value }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    // The in-memory value always follows the caller, even if the write fails
    pub fn set(&mut self, value: impl Into<String>) -> Result<()> {
        self.value = value.into();
        self.store.set(&self.key, &self.value)
    }
}
