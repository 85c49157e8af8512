//! File-backed key-value store.
//!
//! All entries live in one JSON object:
//! ```json
//! {
//!   "refresh_token": "eyJ...",
//!   "token": "eyJ...",
//!   "user": "{\"id\":1,\"username\":\"alice\"}"
//! }
//! ```
//! Keys are sorted and the file ends with a newline, so rewrites are
//! deterministic.

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use photox_application::ports::{KeyValueStore, StoreError};
use serde::Serialize;
use serde_json::ser::{PrettyFormatter, Serializer};
use tokio::fs;
use tokio::sync::Mutex;
use tracing::debug;

type Entries = BTreeMap<String, String>;

/// Key-value store persisted to a JSON file.
///
/// A missing file reads as empty. Writes go to a sibling temporary file that
/// is then renamed over the original.
#[derive(Debug)]
pub struct FileKeyValueStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileKeyValueStore {
    /// Creates a store backed by `path`. Nothing is read until first use.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// Returns the backing file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_entries(&self) -> Result<Entries, StoreError> {
        match fs::read(&self.path).await {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => Ok(Entries::new()),
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| {
                StoreError::Serialization(format!("{}: {e}", self.path.display()))
            }),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Entries::new()),
            Err(e) => Err(StoreError::Io(e)),
        }
    }

    async fn write_entries(&self, entries: &Entries) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).await?;
        }

        let content = to_json_stable_bytes(entries)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, &content).await?;
        fs::rename(&tmp, &self.path).await?;

        debug!(path = %self.path.display(), entries = entries.len(), "session file written");
        Ok(())
    }
}

fn to_json_stable_bytes<T: Serialize>(value: &T) -> Result<Vec<u8>, StoreError> {
    let mut buffer = Vec::new();
    let formatter = PrettyFormatter::with_indent(b"  ");
    let mut serializer = Serializer::with_formatter(&mut buffer, formatter);
    value
        .serialize(&mut serializer)
        .map_err(|e| StoreError::Serialization(e.to_string()))?;
    buffer.push(b'\n');
    Ok(buffer)
}

#[async_trait]
impl KeyValueStore for FileKeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let _guard = self.lock.lock().await;
        Ok(self.read_entries().await?.remove(key))
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let _guard = self.lock.lock().await;
        let mut entries = self.read_entries().await?;
        entries.insert(key.to_string(), value.to_string());
        self.write_entries(&entries).await
    }

    async fn remove(&self, key: &str) -> Result<bool, StoreError> {
        let _guard = self.lock.lock().await;
        let mut entries = self.read_entries().await?;
        if entries.remove(key).is_none() {
            return Ok(false);
        }
        self.write_entries(&entries).await?;
        Ok(true)
    }
}
