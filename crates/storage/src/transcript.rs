use snafu::ResultExt;

use super::KeyValueStore;
use super::error::{ParseTranscriptSnafu, SerializeTranscriptSnafu, StorageResult};
use super::types::{ChatEntry, GREETING_SENT_VALUE, TranscriptKeys};

/// Persists the ordered transcript and the greeting flag in a key-value store.
///
/// The infallible operations never surface errors: failures are logged and the
/// in-memory transcript held by the renderer stays authoritative for the session.
pub struct TranscriptStore {
    store: Box<dyn KeyValueStore>,
    keys: TranscriptKeys,
}

impl TranscriptStore {
    pub fn new(store: Box<dyn KeyValueStore>, keys: TranscriptKeys) -> Self {
        Self { store, keys }
    }

    /// Reads the stored transcript; missing or malformed data yields an empty list.
    pub fn load(&self) -> Vec<ChatEntry> {
        match self.try_load() {
            Ok(entries) => entries,
            Err(error) => {
                tracing::error!("failed to load chat history: {error}");
                Vec::new()
            }
        }
    }

    pub fn try_load(&self) -> StorageResult<Vec<ChatEntry>> {
        let Some(raw) = self.store.get(&self.keys.history)? else {
            return Ok(Vec::new());
        };

        serde_json::from_str(&raw).context(ParseTranscriptSnafu {
            stage: "load-transcript",
            key: self.keys.history.clone(),
        })
    }

    /// Overwrites the stored transcript with `entries`.
    pub fn save(&self, entries: &[ChatEntry]) {
        if let Err(error) = self.try_save(entries) {
            tracing::error!("failed to store chat history: {error}");
        }
    }

    pub fn try_save(&self, entries: &[ChatEntry]) -> StorageResult<()> {
        let serialized = serde_json::to_string(entries).context(SerializeTranscriptSnafu {
            stage: "save-transcript",
        })?;
        self.store.set(&self.keys.history, &serialized)
    }

    /// Removes the transcript and the greeting flag as one logical reset.
    pub fn clear(&self) {
        // Attempt both removals even if the first fails.
        for key in [&self.keys.history, &self.keys.greeting] {
            if let Err(error) = self.store.remove(key) {
                tracing::error!("failed to clear '{key}': {error}");
            }
        }
    }

    pub fn greeting_sent(&self) -> bool {
        match self.store.get(&self.keys.greeting) {
            Ok(value) => value.is_some(),
            Err(error) => {
                tracing::error!("failed to read greeting flag: {error}");
                false
            }
        }
    }

    pub fn mark_greeting_sent(&self) {
        if let Err(error) = self.store.set(&self.keys.greeting, GREETING_SENT_VALUE) {
            tracing::error!("failed to store greeting flag: {error}");
        }
    }
}
