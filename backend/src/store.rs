use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use shared::kv::{KeyValueStore, StoreError};
use tracing::{debug, error};

/// A key-value store persisted as one JSON object on disk. Every mutation is
/// written through (temp file + rename) before it returns.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    entries: BTreeMap<String, String>,
}

fn io_error(e: io::Error) -> StoreError {
    StoreError::Io(e.to_string())
}

impl FileStore {
    /// Opens `path`, starting empty when it does not exist. A file that is not
    /// a JSON object of strings is an error and is left as it is.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let entries = match fs::read_to_string(&path) {
            Ok(raw) => serde_json::from_str(&raw).map_err(|e| {
                error!(path = %path.display(), error = %e, "Store file is malformed, refusing to open it");
                StoreError::Serialization(format!("{}: {}", path.display(), e))
            })?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(io_error(e)),
        };
        debug!(path = %path.display(), keys = entries.len(), "Opened store file");
        Ok(Self { path, entries })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self) -> Result<(), StoreError> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir).map_err(io_error)?;
        }
        let raw = serde_json::to_string_pretty(&self.entries)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, raw).map_err(io_error)?;
        fs::rename(&tmp, &self.path).map_err(io_error)
    }

    fn restore(&mut self, key: &str, previous: Option<String>) {
        match previous {
            Some(value) => { self.entries.insert(key.to_string(), value); }
            None => { self.entries.remove(key); }
        }
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        let previous = self.entries.insert(key.to_string(), value.to_string());
        self.flush().map_err(|e| {
            self.restore(key, previous);
            e
        })
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        let Some(previous) = self.entries.remove(key) else { return Ok(()) };
        self.flush().map_err(|e| {
            self.restore(key, Some(previous));
            e
        })
    }
}
