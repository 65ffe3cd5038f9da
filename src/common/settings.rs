use std::{collections::BTreeMap, fmt::Debug, fs, path::{Path, PathBuf}, sync::{Mutex, MutexGuard}};

use anyhow::{Context, Result};
use serde_json::Value;

/// Key/value settings injected into registries that persist user state.
///
/// Known keys:
/// - `redistrict/<registry name>/recent_districts`: most-recently-used district ids (array).
pub trait SettingsStore: Debug + Send + Sync {
    /// Read a value, `None` if the key was never set.
    fn value(&self, key: &str) -> Option<Value>;

    /// Store a value under `key`, replacing any previous value.
    fn set_value(&self, key: &str, value: Value) -> Result<()>;
}

fn locked(values: &Mutex<BTreeMap<String, Value>>) -> MutexGuard<'_, BTreeMap<String, Value>> {
    values.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Settings held in memory only.
#[derive(Debug, Default)]
pub struct MemorySettings {
    values: Mutex<BTreeMap<String, Value>>,
}

impl MemorySettings {
    pub fn new() -> Self { Self::default() }
}

impl SettingsStore for MemorySettings {
    fn value(&self, key: &str) -> Option<Value> { locked(&self.values).get(key).cloned() }

    fn set_value(&self, key: &str, value: Value) -> Result<()> {
        locked(&self.values).insert(key.to_string(), value);
        Ok(())
    }
}

/// Settings persisted as a JSON object, rewritten on every change.
#[derive(Debug)]
pub struct JsonFileSettings {
    path: PathBuf,
    values: Mutex<BTreeMap<String, Value>>,
}

impl JsonFileSettings {
    /// Open a settings file, starting empty if it does not exist yet.
    pub fn open(path: &Path) -> Result<Self> {
        let values = if path.exists() {
            let bytes = fs::read(path)
                .with_context(|| format!("[settings] Failed to read {}", path.display()))?;
            serde_json::from_slice(&bytes)
                .with_context(|| format!("[settings] Failed to parse {}", path.display()))?
        } else {
            BTreeMap::new()
        };
        Ok(Self { path: path.to_path_buf(), values: Mutex::new(values) })
    }

    #[inline] pub fn path(&self) -> &Path { &self.path }
}

impl SettingsStore for JsonFileSettings {
    fn value(&self, key: &str) -> Option<Value> { locked(&self.values).get(key).cloned() }

    fn set_value(&self, key: &str, value: Value) -> Result<()> {
        let mut values = locked(&self.values);
        values.insert(key.to_string(), value);
        let bytes = serde_json::to_vec_pretty(&*values).context("[settings] Failed to serialize settings")?;
        fs::write(&self.path, bytes)
            .with_context(|| format!("[settings] Failed to write {}", self.path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn file_settings_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");

        let settings = JsonFileSettings::open(&path).unwrap();
        assert!(settings.value("a").is_none());
        settings.set_value("a", json!([1, 2])).unwrap();

        let reopened = JsonFileSettings::open(&path).unwrap();
        assert_eq!(reopened.value("a"), Some(json!([1, 2])));
    }
}
