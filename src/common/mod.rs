mod config;
mod fs;
mod settings;

pub use config::{ProjectConfig, CONFIG_FILE};
pub use fs::{ensure_dir_exists, require_dir_exists, write_atomic};
pub use settings::{JsonFileSettings, MemorySettings, SettingsStore};
