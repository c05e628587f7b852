use pigeon_storage::{KeyValueStore, StorageError, StorageResult};
use wasm_bindgen::JsValue;
use web_sys::Storage;

/// `window.localStorage` as a [`KeyValueStore`].
pub struct LocalStorage {
    storage: Storage,
}

impl LocalStorage {
    pub fn open(window: &web_sys::Window) -> StorageResult<Self> {
        let storage = window
            .local_storage()
            .map_err(|error| StorageError::Unavailable {
                stage: "open-local-storage",
                details: describe(&error),
            })?
            .ok_or_else(|| StorageError::Unavailable {
                stage: "open-local-storage",
                details: "localStorage is disabled".to_string(),
            })?;

        Ok(Self { storage })
    }
}

impl KeyValueStore for LocalStorage {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        self.storage
            .get_item(key)
            .map_err(|error| StorageError::ReadKey {
                stage: "local-storage-get",
                key: key.to_string(),
                details: describe(&error),
            })
    }

    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        self.storage
            .set_item(key, value)
            .map_err(|error| StorageError::WriteKey {
                stage: "local-storage-set",
                key: key.to_string(),
                details: describe(&error),
            })
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        self.storage
            .remove_item(key)
            .map_err(|error| StorageError::RemoveKey {
                stage: "local-storage-remove",
                key: key.to_string(),
                details: describe(&error),
            })
    }
}

pub(crate) fn describe(error: &JsValue) -> String {
    error
        .as_string()
        .unwrap_or_else(|| format!("{error:?}"))
}
