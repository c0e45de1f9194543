//! Durable key-value area used by the favorites store and the daily ledger.
//!
//! Values are serialized JSON documents stored under well-known keys. Reads and writes are
//! synchronous. The file-backed implementation keeps one `<key>.json` file per key inside a
//! data directory; the in-memory one is for embedding and tests.

use crate::errors::{Error, Result};
use std::{
    collections::HashMap,
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};
use tracing::{debug, trace};

/// Storage key holding the favorites set.
pub const FAVORITES_KEY: &str = "favorites";
/// Storage key holding the daily macro ledger.
pub const DAILY_MACROS_KEY: &str = "daily_macros";

/// Synchronous string key-value storage.
pub trait KeyValueStore: Send + Sync {
    /// Reads the value stored under `key`, `None` if nothing is stored.
    ///
    /// # Errors
    /// Returns [`Error::Persistence`] if the backing medium cannot be read.
    fn read(&self, key: &str) -> Result<Option<String>>;

    /// Replaces the value stored under `key`.
    ///
    /// # Errors
    /// Returns [`Error::Persistence`] if the backing medium cannot be written.
    fn write(&self, key: &str, value: &str) -> Result<()>;
}

/// Shared handle to a key-value store, one backend serves both persisted records.
pub type SharedStore = Arc<dyn KeyValueStore>;

/// Key-value store backed by one JSON file per key.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Opens (creating if needed) a store rooted at `dir`.
    ///
    /// # Errors
    /// Returns [`Error::Persistence`] if the directory cannot be created.
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).map_err(|e| Error::Persistence {
            key: dir.display().to_string(),
            message: format!("Failed to create data directory: {e}"),
        })?;
        debug!("Opened file store at {:?}", dir);
        Ok(Self { dir })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl KeyValueStore for FileStore {
    fn read(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key);
        match fs::read_to_string(&path) {
            Ok(contents) => {
                trace!("Read {} bytes from {:?}", contents.len(), path);
                Ok(Some(contents))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Error::Persistence {
                key: key.to_string(),
                message: format!("Failed to read {}: {e}", path.display()),
            }),
        }
    }

    fn write(&self, key: &str, value: &str) -> Result<()> {
        let path = self.path_for(key);
        // Write to a sibling file first so a crash never leaves a half-written record.
        let tmp = self.dir.join(format!("{key}.json.tmp"));
        fs::write(&tmp, value)
            .and_then(|()| fs::rename(&tmp, &path))
            .map_err(|e| Error::Persistence {
                key: key.to_string(),
                message: format!("Failed to write {}: {e}", path.display()),
            })?;
        trace!("Wrote {} bytes to {:?}", value.len(), path);
        Ok(())
    }
}

/// Key-value store kept entirely in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-populated with `entries`.
    #[must_use]
    pub fn with_entries<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            entries: Mutex::new(
                entries
                    .into_iter()
                    .map(|(k, v)| (k.into(), v.into()))
                    .collect(),
            ),
        }
    }

    fn poisoned(key: &str) -> Error {
        Error::Persistence {
            key: key.to_string(),
            message: "memory store lock poisoned".to_string(),
        }
    }
}

impl KeyValueStore for MemoryStore {
    fn read(&self, key: &str) -> Result<Option<String>> {
        let entries = self.entries.lock().map_err(|_| Self::poisoned(key))?;
        Ok(entries.get(key).cloned())
    }

    fn write(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self.entries.lock().map_err(|_| Self::poisoned(key))?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}
