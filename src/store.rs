/// Durable key/value backing store for cached records
use anyhow::{Context, Result};
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;

/// A keyed record store. The cache layer owns serialization; the store only
/// moves opaque strings. Writes are single whole-record overwrites, so a
/// reader never observes a partially written value.
pub trait RecordStore: Send + Sync {
    /// Returns the stored value, or None when the key is absent or unreadable.
    fn load(&self, key: &str) -> Option<String>;

    fn save(&self, key: &str, value: &str) -> Result<()>;
}

/// File-backed store: one file per key under a directory, written with a
/// whole-file overwrite.
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        // Keys carry ':' and ',' separators; map anything outside a safe set
        // to '_' so the key works as a file name.
        let sanitized: String = key
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '.' {
                    c
                } else {
                    '_'
                }
            })
            .collect();

        self.dir.join(format!("{}.json", sanitized))
    }
}

impl RecordStore for FileStore {
    fn load(&self, key: &str) -> Option<String> {
        fs::read_to_string(self.path_for(key)).ok()
    }

    fn save(&self, key: &str, value: &str) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create store directory {}", self.dir.display()))?;

        let path = self.path_for(key);
        fs::write(&path, value)
            .with_context(|| format!("Failed to write record {}", path.display()))?;

        Ok(())
    }
}

/// In-memory store for tests and ephemeral deployments. Loss of its contents
/// is recoverable by refetching.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RecordStore for MemoryStore {
    fn load(&self, key: &str) -> Option<String> {
        self.entries.lock().unwrap().get(key).cloned()
    }

    fn save(&self, key: &str, value: &str) -> Result<()> {
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store_roundtrip() {
        let store = MemoryStore::new();
        assert!(store.load("missing").is_none());

        store.save("weatherapp:lastForecast", "{\"x\":1}").unwrap();
        assert_eq!(
            store.load("weatherapp:lastForecast").as_deref(),
            Some("{\"x\":1}")
        );

        // Overwrite replaces the whole record
        store.save("weatherapp:lastForecast", "{\"x\":2}").unwrap();
        assert_eq!(
            store.load("weatherapp:lastForecast").as_deref(),
            Some("{\"x\":2}")
        );
    }

    #[test]
    fn test_file_store_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());

        assert!(store.load("weatherapp:forecast:43.651,-79.347").is_none());

        store
            .save("weatherapp:forecast:43.651,-79.347", "{\"list\":[]}")
            .unwrap();
        assert_eq!(
            store.load("weatherapp:forecast:43.651,-79.347").as_deref(),
            Some("{\"list\":[]}")
        );
    }

    #[test]
    fn test_file_store_sanitizes_keys() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());

        store.save("a:b/c,d", "v").unwrap();

        // The separators must not escape the store directory.
        let entries: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
        let name = entries[0].as_ref().unwrap().file_name();
        assert_eq!(name.to_str().unwrap(), "a_b_c_d.json");
    }
}
