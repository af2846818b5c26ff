//! Platform-specific paths and user settings

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::locator::commit::FanOutMode;
use crate::locator::scanner::{self, ScanOptions};

const APP_DIR: &str = "source-locator";

/// Get the registry database path
/// - macOS: ~/Library/Application Support/source-locator/projects.db
/// - Linux: ~/.local/share/source-locator/projects.db
/// - Windows: %APPDATA%/source-locator/projects.db
pub fn registry_db_path() -> Result<PathBuf> {
    let data = dirs::data_dir().context("Could not determine data directory")?;
    Ok(data.join(APP_DIR).join("projects.db"))
}

/// Get the settings file path
/// - macOS: ~/Library/Application Support/source-locator/config.json
/// - Linux: ~/.config/source-locator/config.json
/// - Windows: %APPDATA%/source-locator/config.json
pub fn settings_path() -> Result<PathBuf> {
    let config = dirs::config_dir().context("Could not determine config directory")?;
    Ok(config.join(APP_DIR).join("config.json"))
}

/// User settings, stored as camelCase JSON
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub fan_out: FanOutMode,
    pub max_depth: usize,
    pub search_dirs: Vec<String>,
    pub extensions: Vec<String>,
    pub ignored_dirs: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        let scan = ScanOptions::default();
        Self {
            fan_out: FanOutMode::default(),
            max_depth: scanner::DEFAULT_MAX_DEPTH,
            search_dirs: scan.search_dirs,
            extensions: scan.extensions,
            ignored_dirs: scan.ignored_dirs,
        }
    }
}

impl Settings {
    /// Read settings from `path`; a missing file yields the defaults
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read: {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse: {}", path.display()))
    }

    pub fn scan_options(&self) -> ScanOptions {
        ScanOptions {
            search_dirs: self.search_dirs.clone(),
            extensions: self
                .extensions
                .iter()
                .map(|ext| ext.trim_start_matches('.').to_string())
                .collect(),
            ignored_dirs: self.ignored_dirs.clone(),
            max_depth: self.max_depth,
        }
    }
}
