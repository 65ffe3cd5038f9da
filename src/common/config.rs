use std::{fs, path::Path};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::types::PerType;

/// Name of the project configuration file inside a project directory.
pub const CONFIG_FILE: &str = "districtor.json";

/// Per-project configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    /// Target population per district type.
    pub quotas: PerType<Option<i64>>,
    /// Name stamped on scenarios and audit rows; falls back to `$USER`.
    pub author: Option<String>,
    /// Settings file, relative to the project directory.
    pub settings_file: String,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            quotas: PerType::default(),
            author: None,
            settings_file: "settings.json".to_string(),
        }
    }
}

impl ProjectConfig {
    /// Load `districtor.json` from a project directory, or defaults if absent.
    pub fn load(dir: &Path) -> Result<Self> {
        let path = dir.join(CONFIG_FILE);
        if !path.exists() { return Ok(Self::default()) }
        let bytes = fs::read(&path)
            .with_context(|| format!("[config] Failed to read {}", path.display()))?;
        serde_json::from_slice(&bytes)
            .with_context(|| format!("[config] Failed to parse {}", path.display()))
    }

    pub fn save(&self, dir: &Path) -> Result<()> {
        let path = dir.join(CONFIG_FILE);
        let bytes = serde_json::to_vec_pretty(self).context("[config] Failed to serialize config")?;
        fs::write(&path, bytes).with_context(|| format!("[config] Failed to write {}", path.display()))
    }

    /// The acting user's name.
    pub fn author(&self) -> String {
        self.author.clone()
            .or_else(|| std::env::var("USER").ok())
            .unwrap_or_else(|| "unknown".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_take_defaults() {
        let config: ProjectConfig = serde_json::from_str(r#"{"quotas": {"gn": 60000, "gs": null, "m": null}}"#).unwrap();
        assert_eq!(config.quotas.gn, Some(60000));
        assert_eq!(config.settings_file, "settings.json");
    }

    #[test]
    fn explicit_author_wins() {
        let config = ProjectConfig { author: Some("Rangi".into()), ..Default::default() };
        assert_eq!(config.author(), "Rangi");
    }
}
