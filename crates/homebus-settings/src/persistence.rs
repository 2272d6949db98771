//! Settings Persistence
//!
//! Locates the settings file in the platform config directory and falls back
//! to defaults when it does not exist yet.

use crate::config::Settings;
use crate::error::{SettingsError, SettingsResult};
use std::path::{Path, PathBuf};

/// File name used inside the config directory
pub const SETTINGS_FILE: &str = "homebus.toml";

/// Settings persistence layer
#[derive(Debug, Clone)]
pub struct SettingsPersistence {
    path: PathBuf,
    settings: Settings,
}

impl SettingsPersistence {
    /// Default settings file path (`<config dir>/homebus/homebus.toml`)
    pub fn default_path() -> SettingsResult<PathBuf> {
        let mut path = dirs::config_dir()
            .or_else(dirs::home_dir)
            .ok_or_else(|| {
                SettingsError::ConfigDirectory("no config or home directory".to_string())
            })?;
        path.push("homebus");
        path.push(SETTINGS_FILE);
        Ok(path)
    }

    /// Load from the default location
    pub fn load_default() -> SettingsResult<Self> {
        Self::load_or_default(&Self::default_path()?)
    }

    /// Load settings from `path`, using defaults if the file does not exist
    pub fn load_or_default(path: &Path) -> SettingsResult<Self> {
        let settings = if path.exists() {
            tracing::debug!(path = %path.display(), "Loading settings");
            Settings::load_from_file(path)?
        } else {
            tracing::debug!(path = %path.display(), "No settings file, using defaults");
            Settings::default()
        };

        Ok(Self {
            path: path.to_path_buf(),
            settings,
        })
    }

    /// Write settings back to their file, creating the directory if needed
    pub fn save(&self) -> SettingsResult<()> {
        if let Some(dir) = self.path.parent() {
            std::fs::create_dir_all(dir)
                .map_err(|e| SettingsError::ConfigDirectory(format!("{}: {}", dir.display(), e)))?;
        }
        self.settings.save_to_file(&self.path)
    }

    /// File backing these settings
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Get settings
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Get mutable settings
    pub fn settings_mut(&mut self) -> &mut Settings {
        &mut self.settings
    }
}
