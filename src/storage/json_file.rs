//! File-backed key-value store
//!
//! One JSON document per key inside a base directory. Keys are mapped to
//! file names by replacing path-hostile characters, so arbitrary key
//! strings are safe. Writes go through a temp file + rename to avoid
//! leaving half-written snapshots behind on a crash.

use super::KeyValueStore;
use crate::error::{Result, TheiaError};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Store persisting each key to `<dir>/<key>.json`
#[derive(Debug)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    /// Open a store rooted at `dir`, creating the directory if needed
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        debug!("Opened JSON file store at {}", dir.display());
        Ok(Self { dir })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let safe: String = key
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.dir.join(format!("{}.json", safe))
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key);
        match fs::read_to_string(&path) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(TheiaError::Storage(format!(
                "failed to read {}: {}",
                path.display(),
                e
            ))),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, value).map_err(|e| {
            TheiaError::Storage(format!("failed to write {}: {}", tmp.display(), e))
        })?;
        fs::rename(&tmp, &path).map_err(|e| {
            TheiaError::Storage(format!("failed to commit {}: {}", path.display(), e))
        })?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let path = self.path_for(key);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(TheiaError::Storage(format!(
                "failed to remove {}: {}",
                path.display(),
                e
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_set_get_remove() {
        let dir = TempDir::new().unwrap();
        let store = JsonFileStore::new(dir.path()).unwrap();

        assert_eq!(store.get("corpus").unwrap(), None);

        store.set("corpus", r#"{"version":1}"#).unwrap();
        assert_eq!(
            store.get("corpus").unwrap(),
            Some(r#"{"version":1}"#.to_string())
        );

        store.remove("corpus").unwrap();
        assert_eq!(store.get("corpus").unwrap(), None);
    }

    #[test]
    fn test_keys_with_separators() {
        let dir = TempDir::new().unwrap();
        let store = JsonFileStore::new(dir.path()).unwrap();

        store.set("theia/interactions", "x").unwrap();
        assert_eq!(
            store.get("theia/interactions").unwrap(),
            Some("x".to_string())
        );

        // The slash never becomes a directory separator
        let entries: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn test_values_survive_reopen() {
        let dir = TempDir::new().unwrap();
        {
            let store = JsonFileStore::new(dir.path()).unwrap();
            store.set("stats", "persisted").unwrap();
        }
        let store = JsonFileStore::new(dir.path()).unwrap();
        assert_eq!(store.get("stats").unwrap(), Some("persisted".to_string()));
    }
}
