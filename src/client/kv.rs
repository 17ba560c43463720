//! Key-value storage behind the client-side stores.

use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
};

use anyhow::Context;
use parking_lot::Mutex;
use tracing::warn;

/// Minimal string store, shaped after browser local storage.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> anyhow::Result<()>;
    fn remove(&self, key: &str) -> anyhow::Result<()>;
}

#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> anyhow::Result<()> {
        self.entries.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> anyhow::Result<()> {
        self.entries.lock().remove(key);
        Ok(())
    }
}

/// All keys live in one JSON object on disk. The file is re-read on every
/// access so separate processes see each other's writes.
pub struct FileStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> HashMap<String, String> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(_) => return HashMap::new(),
        };
        match serde_json::from_str(&raw) {
            Ok(map) => map,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "state file is corrupt; treating as empty");
                HashMap::new()
            }
        }
    }

    fn write(&self, map: &HashMap<String, String>) -> anyhow::Result<()> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)
                .with_context(|| format!("create state dir {}", dir.display()))?;
        }
        let body = serde_json::to_string_pretty(map)?;
        fs::write(&self.path, body)
            .with_context(|| format!("write state file {}", self.path.display()))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        let _guard = self.lock.lock();
        self.load().remove(key)
    }

    fn set(&self, key: &str, value: &str) -> anyhow::Result<()> {
        let _guard = self.lock.lock();
        let mut map = self.load();
        map.insert(key.to_string(), value.to_string());
        self.write(&map)
    }

    fn remove(&self, key: &str) -> anyhow::Result<()> {
        let _guard = self.lock.lock();
        let mut map = self.load();
        if map.remove(key).is_some() {
            self.write(&map)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod kv_tests {
    use super::*;

    #[test]
    fn memory_store_set_get_remove() {
        let kv = MemoryStore::new();
        assert!(kv.get("a").is_none());
        kv.set("a", "1").unwrap();
        assert_eq!(kv.get("a").as_deref(), Some("1"));
        kv.remove("a").unwrap();
        assert!(kv.get("a").is_none());
    }

    #[test]
    fn file_store_persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/state.json");
        FileStore::new(&path).set("k", "[1,2]").unwrap();
        FileStore::new(&path).set("other", "x").unwrap();

        let reopened = FileStore::new(&path);
        assert_eq!(reopened.get("k").as_deref(), Some("[1,2]"));
        reopened.remove("k").unwrap();
        assert!(FileStore::new(&path).get("k").is_none());
        assert_eq!(FileStore::new(&path).get("other").as_deref(), Some("x"));
    }

    #[test]
    fn file_store_treats_corrupt_file_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        fs::write(&path, "not json").unwrap();
        let kv = FileStore::new(&path);
        assert!(kv.get("k").is_none());
        kv.set("k", "v").unwrap();
        assert_eq!(kv.get("k").as_deref(), Some("v"));
    }
}
