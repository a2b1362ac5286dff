use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use tracing::{debug, warn};

use super::KeyValueStore;
use crate::error::StorageError;

/// Single JSON object on disk, `{ "<key>": "<value>", ... }`.
///
/// The whole document is held in memory and written through on every mutation
/// (temp file + rename, so a crash never leaves a half-written document). The
/// in-memory copy only changes once the write has landed, so a failed write
/// leaves memory and disk agreeing.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    map: Mutex<BTreeMap<String, String>>,
}

fn io_err(path: &Path, e: std::io::Error) -> StorageError {
    StorageError::Io { path: path.display().to_string(), message: e.to_string() }
}

// Missing file is an empty store; an unreadable one is treated the same so a
// corrupt document cannot lock the user out.
fn read_document(path: &Path) -> BTreeMap<String, String> {
    let text = match fs::read_to_string(path) {
        Ok(t) => t,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return BTreeMap::new(),
        Err(e) => {
            warn!(target: "stockgate::store", "cannot read {}: {}; starting empty", path.display(), e);
            return BTreeMap::new();
        }
    };
    match serde_json::from_str::<BTreeMap<String, String>>(&text) {
        Ok(m) => m,
        Err(e) => {
            warn!(target: "stockgate::store", "corrupt store document {}: {}; starting empty", path.display(), e);
            BTreeMap::new()
        }
    }
}

impl FileStore {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
            }
        }
        let map = read_document(&path);
        debug!(target: "stockgate::store", "opened {} with {} keys", path.display(), map.len());
        Ok(Self { path, map: Mutex::new(map) })
    }

    pub fn path(&self) -> &Path { &self.path }

    fn flush(&self, map: &BTreeMap<String, String>) -> Result<(), StorageError> {
        let text = serde_json::to_string_pretty(map)?;
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, text).map_err(|e| io_err(&tmp, e))?;
        fs::rename(&tmp, &self.path).map_err(|e| io_err(&self.path, e))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.map.lock().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut map = self.map.lock();
        let mut next = map.clone();
        next.insert(key.to_string(), value.to_string());
        self.flush(&next)?;
        *map = next;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut map = self.map.lock();
        if !map.contains_key(key) {
            return Ok(());
        }
        let mut next = map.clone();
        next.remove(key);
        self.flush(&next)?;
        *map = next;
        Ok(())
    }
}
