use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

/// Synchronous string-keyed storage, the shape of a browser's `localStorage`.
///
/// Reads never fail: a backend that cannot read a key reports it as absent.
/// Writes may fail (disk errors, quota) and must leave the previous value in
/// place when they do.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError>;
    fn remove(&mut self, key: &str) -> Result<(), StoreError>;
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        self.entries.remove(key);
        Ok(())
    }
}

#[cfg(target_arch = "wasm32")]
pub use browser::BrowserStore;

#[cfg(target_arch = "wasm32")]
mod browser {
    use super::{KeyValueStore, StoreError};
    use wasm_bindgen::JsValue;

    /// `window.localStorage` for the current origin.
    pub struct BrowserStore {
        storage: web_sys::Storage,
    }

    fn js_error(err: JsValue) -> StoreError {
        StoreError::Unavailable(format!("{:?}", err))
    }

    impl BrowserStore {
        pub fn local() -> Result<Self, StoreError> {
            let window = web_sys::window()
                .ok_or_else(|| StoreError::Unavailable("no window".into()))?;
            let storage = window.local_storage()
                .map_err(js_error)?
                .ok_or_else(|| StoreError::Unavailable("localStorage disabled".into()))?;
            Ok(Self { storage })
        }
    }

    impl KeyValueStore for BrowserStore {
        fn get(&self, key: &str) -> Option<String> {
            self.storage.get_item(key).ok().flatten()
        }

        fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
            self.storage.set_item(key, value).map_err(js_error)
        }

        fn remove(&mut self, key: &str) -> Result<(), StoreError> {
            self.storage.remove_item(key).map_err(js_error)
        }
    }
}
