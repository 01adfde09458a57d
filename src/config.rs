//! User settings for the command line tool.
//!
//! Settings live in a JSON file. Every field has a default, so a missing
//! file or a partial file is fine.

use anyhow::{Context as _, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct OpencleanConfig {
    /// Rows shown by `head` when no count is given
    pub head_rows: usize,
    /// Single-character CSV delimiter; inferred from the file extension when unset
    pub csv_delimiter: Option<String>,
    /// Number of most frequent values kept per profiled column
    pub profile_top_k: usize,
    /// Default log filter, overridden by `RUST_LOG`
    pub log_level: String,
    /// Also write logs to a daily rolling file in the data directory
    pub log_to_file: bool,
}

impl Default for OpencleanConfig {
    fn default() -> Self {
        Self {
            head_rows: 10,
            csv_delimiter: None,
            profile_top_k: 10,
            log_level: "info".to_owned(),
            log_to_file: false,
        }
    }
}

/// `<config dir>/openclean/config.json`, or a relative path when the platform
/// has no config directory.
pub fn get_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_default()
        .join("openclean")
        .join("config.json")
}

/// Load settings from `path`. A missing file yields the defaults.
pub fn load_config(path: impl AsRef<Path>) -> Result<OpencleanConfig> {
    let path = path.as_ref();
    if !path.exists() {
        return Ok(OpencleanConfig::default());
    }
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse config file {}", path.display()))
}

pub fn save_config(config: &OpencleanConfig, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create config directory {}", parent.display()))?;
    }
    let content = serde_json::to_string_pretty(config)?;
    std::fs::write(path, content)
        .with_context(|| format!("Failed to write config file {}", path.display()))
}
