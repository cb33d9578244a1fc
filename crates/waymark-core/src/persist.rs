//! Registry persistence.
//!
//! The accessory list survives restarts through a [`RegistryStore`].
//! Saves happen synchronously inside each registry mutation so a crash
//! immediately after an edit loses nothing; the file is small enough
//! that this never shows up in interaction latency.

use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;

use directories::ProjectDirs;

use crate::error::CoreError;
use crate::model::Accessory;

/// Durable storage for the accessory registry.
///
/// `load` is infallible by contract: a missing or unreadable store is
/// an empty registry, never a startup failure.
pub trait RegistryStore: Send + Sync {
    fn load(&self) -> Vec<Accessory>;
    fn save(&self, accessories: &[Accessory]) -> Result<(), CoreError>;
}

impl<T: RegistryStore + ?Sized> RegistryStore for std::sync::Arc<T> {
    fn load(&self) -> Vec<Accessory> {
        (**self).load()
    }

    fn save(&self, accessories: &[Accessory]) -> Result<(), CoreError> {
        (**self).save(accessories)
    }
}

// ── JsonFileStore ───────────────────────────────────────────────────

/// JSON-file-backed store, the production default.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Platform data directory + `accessories.json`, e.g.
    /// `~/.local/share/waymark/accessories.json` on Linux.
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("com", "waymark", "waymark")
            .map(|dirs| dirs.data_dir().join("accessories.json"))
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }
}

impl RegistryStore for JsonFileStore {
    fn load(&self) -> Vec<Accessory> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Vec::new(),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "registry file unreadable, starting empty");
                return Vec::new();
            }
        };

        match serde_json::from_str(&raw) {
            Ok(accessories) => accessories,
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "registry file corrupt, starting empty");
                Vec::new()
            }
        }
    }

    fn save(&self, accessories: &[Accessory]) -> Result<(), CoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(accessories)?;
        fs::write(&self.path, json)?;
        Ok(())
    }
}

// ── MemoryStore ─────────────────────────────────────────────────────

/// In-memory store for tests and `--ephemeral` runs.
#[derive(Debug, Default)]
pub struct MemoryStore {
    saved: Mutex<Vec<Accessory>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the last save, for test assertions.
    pub fn saved(&self) -> Vec<Accessory> {
        self.saved.lock().map(|g| g.clone()).unwrap_or_default()
    }
}

impl RegistryStore for MemoryStore {
    fn load(&self) -> Vec<Accessory> {
        self.saved()
    }

    fn save(&self, accessories: &[Accessory]) -> Result<(), CoreError> {
        if let Ok(mut guard) = self.saved.lock() {
            *guard = accessories.to_vec();
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::model::DeviceId;
    use pretty_assertions::assert_eq;

    #[test]
    fn file_store_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("accessories.json"));

        let accessories = vec![
            Accessory::new(DeviceId::new("pico-7")),
            Accessory::new(DeviceId::new("pico-9")),
        ];
        store.save(&accessories).unwrap();

        assert_eq!(store.load(), accessories);
    }

    #[test]
    fn missing_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("nope.json"));
        assert!(store.load().is_empty());
    }

    #[test]
    fn corrupt_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("accessories.json");
        fs::write(&path, "{ not json").unwrap();

        let store = JsonFileStore::new(path);
        assert!(store.load().is_empty());
    }

    #[test]
    fn save_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("deep/nested/accessories.json"));
        store.save(&[Accessory::new(DeviceId::new("a"))]).unwrap();
        assert_eq!(store.load().len(), 1);
    }

    #[test]
    fn memory_store_reflects_last_save() {
        let store = MemoryStore::new();
        assert!(store.load().is_empty());

        let accessories = vec![Accessory::new(DeviceId::new("pico-7"))];
        store.save(&accessories).unwrap();
        assert_eq!(store.saved(), accessories);
        assert_eq!(store.load(), accessories);
    }
}
