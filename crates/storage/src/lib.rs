pub mod error;
pub mod memory;
pub mod transcript;
pub mod types;

pub use error::{StorageError, StorageResult};
pub use memory::MemoryStore;
pub use transcript::TranscriptStore;
pub use types::{
    ChatEntry, DEFAULT_GREETING_KEY, DEFAULT_HISTORY_KEY, EntryKind, EntryRecord,
    GREETING_SENT_VALUE, KindTag, Sender, TranscriptKeys,
};

/// String key-value storage scoped to one browsing context.
///
/// Implementations use interior mutability; the widget runs on a single thread.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> StorageResult<Option<String>>;
    fn set(&self, key: &str, value: &str) -> StorageResult<()>;
    fn remove(&self, key: &str) -> StorageResult<()>;
}
