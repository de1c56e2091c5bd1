//! Persistence layer for the annotation engine
//!
//! State snapshots (corpus statistics, learned category weights,
//! interaction records) are JSON values behind a minimal key-value
//! interface, so the identical engine runs against an in-memory map, a
//! directory of files, or whatever store the host supplies.
//!
//! Snapshots carry a `version` field; loading an incompatible or
//! unparsable snapshot logs a warning and falls back to fresh defaults
//! rather than propagating an error.

pub mod json_file;
pub mod memory;

use crate::error::Result;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

pub use json_file::JsonFileStore;
pub use memory::MemoryStore;

/// Current snapshot schema version
pub const SNAPSHOT_VERSION: u32 = 1;

/// Minimal key-value persistence interface
pub trait KeyValueStore: Send + Sync {
    /// Fetch the value stored under `key`, if any
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Store `value` under `key`, replacing any previous value
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Delete the value stored under `key`; missing keys are not an error
    fn remove(&self, key: &str) -> Result<()>;
}

/// Versioned envelope wrapped around every persisted payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot<T> {
    pub version: u32,
    pub data: T,
}

impl<T> Snapshot<T> {
    pub fn new(data: T) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            data,
        }
    }
}

/// Load a snapshot, falling back to `T::default()` on any failure
///
/// Missing keys, unparsable payloads, and version mismatches all resolve
/// to the default state; the latter two are logged as warnings.
pub fn load_or_default<T: DeserializeOwned + Default>(
    store: &dyn KeyValueStore,
    key: &str,
) -> T {
    let raw = match store.get(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => {
            debug!("No persisted state under '{}', starting fresh", key);
            return T::default();
        }
        Err(e) => {
            warn!("Failed to read '{}' ({}), starting fresh", key, e);
            return T::default();
        }
    };

    match serde_json::from_str::<Snapshot<T>>(&raw) {
        Ok(snapshot) if snapshot.version == SNAPSHOT_VERSION => snapshot.data,
        Ok(snapshot) => {
            warn!(
                "Discarding '{}' snapshot with incompatible version {} (expected {})",
                key, snapshot.version, SNAPSHOT_VERSION
            );
            T::default()
        }
        Err(e) => {
            warn!("Corrupted snapshot under '{}' ({}), starting fresh", key, e);
            T::default()
        }
    }
}

/// Serialize a snapshot and write it to the store
pub fn save<T: Serialize>(store: &dyn KeyValueStore, key: &str, data: &T) -> Result<()> {
    let raw = serde_json::to_string(&Snapshot::new(data))?;
    store.set(key, &raw)
}
