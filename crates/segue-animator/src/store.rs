//! Per-session key-value storage.
//!
//! The history tracker reads and writes raw strings, the same contract as a
//! browser's `sessionStorage`. Two backends ship here: an in-process map that
//! lives as long as the orchestrator, and a JSON file that survives process
//! restarts until it is cleared.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::warn;

use crate::error::StoreError;

/// Namespaced string storage scoped to one browsing session.
pub trait SessionStore {
    fn get_item(&self, key: &str) -> Option<String>;

    fn set_item(&mut self, key: &str, value: &str) -> Result<(), StoreError>;

    fn remove_item(&mut self, key: &str) -> Result<(), StoreError>;
}

impl<S: SessionStore + ?Sized> SessionStore for Box<S> {
    fn get_item(&self, key: &str) -> Option<String> {
        (**self).get_item(key)
    }

    fn set_item(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        (**self).set_item(key, value)
    }

    fn remove_item(&mut self, key: &str) -> Result<(), StoreError> {
        (**self).remove_item(key)
    }
}

/// In-memory store. Ends with the value.
#[derive(Debug, Default, Clone)]
pub struct MemorySessionStore {
    items: HashMap<String, String>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Drop every item, as when the session ends.
    pub fn clear(&mut self) {
        self.items.clear();
    }
}

impl SessionStore for MemorySessionStore {
    fn get_item(&self, key: &str) -> Option<String> {
        self.items.get(key).cloned()
    }

    fn set_item(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.items.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&mut self, key: &str) -> Result<(), StoreError> {
        self.items.remove(key);
        Ok(())
    }
}

/// Session store persisted as a JSON object of string values.
///
/// Writes go through to disk immediately. Concurrent processes sharing one
/// file are not coordinated: the last writer wins.
pub struct FileSessionStore {
    path: PathBuf,
    state: BTreeMap<String, String>,
    dirty: bool,
}

impl FileSessionStore {
    /// Open the store at `path`. A missing file starts an empty session; an
    /// unreadable or malformed one is logged and replaced on the next write.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let state = match fs::read(&path) {
            Ok(data) => match serde_json::from_slice::<BTreeMap<String, String>>(&data) {
                Ok(parsed) => parsed,
                Err(error) => {
                    warn!(?error, ?path, "failed to parse session file; starting fresh");
                    BTreeMap::new()
                }
            },
            Err(error) if error.kind() == io::ErrorKind::NotFound => BTreeMap::new(),
            Err(source) => return Err(StoreError::Io { path, source }),
        };

        Ok(Self {
            path,
            state,
            dirty: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.state.keys().map(String::as_str)
    }

    pub fn save(&mut self) -> Result<(), StoreError> {
        if !self.dirty {
            return Ok(());
        }
        write_document(&self.path, &self.state)?;
        self.dirty = false;
        Ok(())
    }

    /// Reload from disk if the file changed. Returns true if state updated.
    pub fn reload(&mut self) -> bool {
        match fs::read(&self.path) {
            Ok(data) => match serde_json::from_slice::<BTreeMap<String, String>>(&data) {
                Ok(parsed) if parsed != self.state => {
                    self.state = parsed;
                    self.dirty = false;
                    true
                }
                _ => false,
            },
            Err(_) => false,
        }
    }

    /// End the session: drop every item and remove the backing file.
    pub fn clear(&mut self) -> Result<(), StoreError> {
        self.state.clear();
        self.dirty = false;
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StoreError::Io {
                path: self.path.clone(),
                source,
            }),
        }
    }
}

impl SessionStore for FileSessionStore {
    fn get_item(&self, key: &str) -> Option<String> {
        self.state.get(key).cloned()
    }

    fn set_item(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        if self.state.get(key).map(String::as_str) != Some(value) {
            self.state.insert(key.to_string(), value.to_string());
            self.dirty = true;
        }
        self.save()
    }

    fn remove_item(&mut self, key: &str) -> Result<(), StoreError> {
        if self.state.remove(key).is_some() {
            self.dirty = true;
        }
        self.save()
    }
}

impl Drop for FileSessionStore {
    fn drop(&mut self) {
        if self.dirty
            && let Err(error) = write_document(&self.path, &self.state)
        {
            warn!(?error, ?self.path, "failed to persist session store during drop");
        }
    }
}

fn write_document(path: &Path, state: &BTreeMap<String, String>) -> Result<(), StoreError> {
    let io_err = |source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(io_err)?;
    }
    let json = serde_json::to_string_pretty(state)?;
    fs::write(path, json).map_err(io_err)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store_round_trip() {
        let mut store = MemorySessionStore::new();
        assert!(store.get_item("app").is_none());
        store.set_item("app", "[\"Home\"]").unwrap();
        assert_eq!(store.get_item("app").as_deref(), Some("[\"Home\"]"));
        store.remove_item("app").unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn test_file_store_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session").join("history.json");

        {
            let mut store = FileSessionStore::open(&path).unwrap();
            store.set_item("app", "[\"Home\"]").unwrap();
        }

        let store = FileSessionStore::open(&path).unwrap();
        assert_eq!(store.get_item("app").as_deref(), Some("[\"Home\"]"));
        assert_eq!(store.keys().collect::<Vec<_>>(), vec!["app"]);
    }

    #[test]
    fn test_file_store_malformed_starts_fresh() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.json");
        fs::write(&path, "not json").unwrap();

        let mut store = FileSessionStore::open(&path).unwrap();
        assert!(store.get_item("app").is_none());
        store.set_item("app", "[]").unwrap();

        let reopened = FileSessionStore::open(&path).unwrap();
        assert_eq!(reopened.get_item("app").as_deref(), Some("[]"));
    }

    #[test]
    fn test_file_store_clear_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.json");

        let mut store = FileSessionStore::open(&path).unwrap();
        store.set_item("app", "[\"A\"]").unwrap();
        assert!(path.exists());

        store.clear().unwrap();
        assert!(!path.exists());
        assert!(store.get_item("app").is_none());
        store.clear().unwrap();
    }

    #[test]
    fn test_file_store_reload_sees_other_writer() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.json");

        let mut first = FileSessionStore::open(&path).unwrap();
        first.set_item("app", "[\"A\"]").unwrap();

        let mut second = FileSessionStore::open(&path).unwrap();
        second.set_item("app", "[\"B\"]").unwrap();

        assert!(first.reload());
        assert_eq!(first.get_item("app").as_deref(), Some("[\"B\"]"));
        assert!(!first.reload());
    }
}
