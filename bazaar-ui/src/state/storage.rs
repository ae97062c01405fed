//! Browser Storage
//!
//! `localStorage` behind the shared [`KeyValueStore`] trait, so the session,
//! selected vendor and recently-viewed list use the same typed, namespaced
//! adapter as the native client.

use bazaar::storage::{KeyValueStore, StorageError, StorageResult, TypedStore};

/// `window.localStorage`
#[derive(Clone)]
pub struct BrowserStore {
    storage: web_sys::Storage,
}

impl BrowserStore {
    /// Open local storage; fails in private mode or outside a window
    pub fn open() -> StorageResult<Self> {
        let window = web_sys::window().ok_or(StorageError::Unavailable)?;
        let storage = window
            .local_storage()
            .map_err(js_error)?
            .ok_or(StorageError::Unavailable)?;
        Ok(Self { storage })
    }
}

impl KeyValueStore for BrowserStore {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        self.storage.get_item(key).map_err(js_error)
    }

    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        // Throws QuotaExceededError when full
        self.storage.set_item(key, value).map_err(js_error)
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        self.storage.remove_item(key).map_err(js_error)
    }

    fn keys(&self, prefix: &str) -> StorageResult<Vec<String>> {
        let len = self.storage.length().map_err(js_error)?;
        let mut keys = Vec::new();
        for i in 0..len {
            if let Some(key) = self.storage.key(i).map_err(js_error)? {
                if key.starts_with(prefix) {
                    keys.push(key);
                }
            }
        }
        Ok(keys)
    }
}

fn js_error(e: wasm_bindgen::JsValue) -> StorageError {
    StorageError::Backend(format!("{:?}", e))
}

/// The app's typed store, if the browser allows storage at all
pub fn typed_store() -> Option<TypedStore<BrowserStore>> {
    match BrowserStore::open() {
        Ok(store) => Some(TypedStore::new(store)),
        Err(e) => {
            web_sys::console::warn_1(&format!("Local storage unavailable: {}", e).into());
            None
        }
    }
}
