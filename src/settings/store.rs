//! The flat key/value persistence boundary.
//!
//! The host application owns the real store (a database table in practice);
//! the engine only needs string keys and string values.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::SettingsError;

/// A string-keyed settings store.
pub trait SettingsStore {
    /// Read a value. `Ok(None)` when the key is absent.
    fn get(&self, key: &str) -> Result<Option<String>, SettingsError>;

    /// Insert or replace a value.
    fn set(&mut self, key: &str, value: &str) -> Result<(), SettingsError>;

    /// Remove a key. Removing an absent key is not an error.
    fn remove(&mut self, key: &str) -> Result<(), SettingsError>;

    /// Every stored pair.
    fn entries(&self) -> Result<BTreeMap<String, String>, SettingsError>;

    /// Write several pairs. Stores that can do so apply them all-or-nothing.
    fn set_many(&mut self, pairs: &[(String, String)]) -> Result<(), SettingsError> {
        for (key, value) in pairs {
            self.set(key, value)?;
        }
        Ok(())
    }
}

/// In-memory store for tests and embedding.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    values: BTreeMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SettingsStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, SettingsError> {
        Ok(self.values.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), SettingsError> {
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), SettingsError> {
        self.values.remove(key);
        Ok(())
    }

    fn entries(&self) -> Result<BTreeMap<String, String>, SettingsError> {
        Ok(self.values.clone())
    }
}

/// A store persisted as one pretty-printed JSON object on disk.
///
/// Every write rewrites the file through a temporary sibling and a rename,
/// so a failed write leaves the previous file intact.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
    values: BTreeMap<String, String>,
}

impl JsonFileStore {
    /// Open a store at `path`. A missing file is an empty store.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let path = path.as_ref().to_path_buf();
        let values = if path.exists() {
            let text = fs::read_to_string(&path)?;
            if text.trim().is_empty() {
                BTreeMap::new()
            } else {
                serde_json::from_str(&text)?
            }
        } else {
            BTreeMap::new()
        };
        debug!("Opened settings file {} ({} keys)", path.display(), values.len());
        Ok(Self { path, values })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self, values: &BTreeMap<String, String>) -> Result<(), SettingsError> {
        let json = serde_json::to_string_pretty(values)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl SettingsStore for JsonFileStore {
    fn get(&self, key: &str) -> Result<Option<String>, SettingsError> {
        Ok(self.values.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), SettingsError> {
        let mut next = self.values.clone();
        next.insert(key.to_string(), value.to_string());
        self.flush(&next)?;
        self.values = next;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), SettingsError> {
        if !self.values.contains_key(key) {
            return Ok(());
        }
        let mut next = self.values.clone();
        next.remove(key);
        self.flush(&next)?;
        self.values = next;
        Ok(())
    }

    fn entries(&self) -> Result<BTreeMap<String, String>, SettingsError> {
        Ok(self.values.clone())
    }

    fn set_many(&mut self, pairs: &[(String, String)]) -> Result<(), SettingsError> {
        let mut next = self.values.clone();
        for (key, value) in pairs {
            next.insert(key.clone(), value.clone());
        }
        self.flush(&next)?;
        self.values = next;
        Ok(())
    }
}

/// Export every stored setting as a pretty JSON object.
pub fn export_settings_json(store: &dyn SettingsStore) -> Result<String, SettingsError> {
    let entries = store.entries()?;
    Ok(serde_json::to_string_pretty(&entries)?)
}

/// Import a JSON object of settings, returning how many keys were written.
pub fn import_settings_json(
    store: &mut dyn SettingsStore,
    json: &str,
) -> Result<usize, SettingsError> {
    let settings: BTreeMap<String, String> = serde_json::from_str(json)?;
    let pairs: Vec<(String, String)> = settings.into_iter().collect();
    store.set_many(&pairs)?;
    Ok(pairs.len())
}
