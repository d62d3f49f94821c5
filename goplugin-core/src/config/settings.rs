//! Plugin settings.
//!
//! Settings are persisted as JSON. The host may leave the file out entirely;
//! every field has a default matching the official Go download site.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{PluginError, Result};
use crate::toolchain::InstallLayout;

// =============================================================================
// Defaults
// =============================================================================

/// Where release archives are published.
pub const DEFAULT_DOWNLOAD_BASE_URL: &str = "https://go.dev/dl";

/// Plain-text endpoint naming the latest stable release.
pub const DEFAULT_LATEST_VERSION_URL: &str = "https://go.dev/VERSION?m=text";

/// Subdirectory of the user config dir holding the settings file.
const SETTINGS_DIR: &str = "goplugin";

/// Name of the settings file.
const SETTINGS_FILE: &str = "settings.json";

/// Returns the default settings file location.
///
/// e.g. `~/.config/goplugin/settings.json` on Linux. `None` if the platform
/// has no config directory.
pub fn default_settings_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(SETTINGS_DIR).join(SETTINGS_FILE))
}

// =============================================================================
// Plugin Settings
// =============================================================================

/// Plugin settings - persisted as JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PluginSettings {
    /// Base URL release archives are fetched from.
    pub download_base_url: String,

    /// URL answering with the latest version (`go1.23.3` on the first line).
    pub latest_version_url: String,

    /// Hosts downloads may come from (subdomains included).
    pub allowed_hosts: Vec<String>,

    /// How archives are laid out inside a version directory.
    pub layout: InstallLayout,

    /// Undelivered progress updates buffered before the download waits.
    pub progress_capacity: usize,

    /// TCP connect timeout for HTTP requests, in seconds.
    pub connect_timeout_secs: u64,

    /// Executable names cleaned up when an install is already gone.
    pub known_executables: Vec<String>,
}

impl Default for PluginSettings {
    fn default() -> Self {
        Self {
            download_base_url: DEFAULT_DOWNLOAD_BASE_URL.to_string(),
            latest_version_url: DEFAULT_LATEST_VERSION_URL.to_string(),
            allowed_hosts: vec!["go.dev".to_string(), "dl.google.com".to_string()],
            layout: InstallLayout::default(),
            progress_capacity: 1,
            connect_timeout_secs: 30,
            known_executables: vec!["go".to_string(), "gofmt".to_string()],
        }
    }
}

impl PluginSettings {
    /// Load settings from `path`, using defaults for missing values.
    ///
    /// If the file doesn't exist or can't be parsed, returns defaults.
    pub fn load(path: &Path) -> Self {
        let mut settings = match fs::read_to_string(path) {
            Ok(json) => match serde_json::from_str::<PluginSettings>(&json) {
                Ok(loaded) => loaded,
                Err(e) => {
                    tracing::warn!(error = %e, path = %path.display(), "Failed to parse settings, using defaults");
                    Self::default()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Self::default(),
            Err(e) => {
                tracing::warn!(error = %e, path = %path.display(), "Failed to read settings, using defaults");
                Self::default()
            }
        };

        settings.validate();
        settings
    }

    /// Save settings to `path`, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<()> {
        let to_err = |source: std::io::Error| PluginError::SettingsSave {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(to_err)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(|e| to_err(e.into()))?;
        fs::write(path, json).map_err(to_err)?;
        Ok(())
    }

    /// Validate and clamp settings to valid ranges.
    pub fn validate(&mut self) {
        self.progress_capacity = self.progress_capacity.clamp(1, 1024);
        self.connect_timeout_secs = self.connect_timeout_secs.clamp(1, 600);

        if self.download_base_url.trim().is_empty() {
            self.download_base_url = DEFAULT_DOWNLOAD_BASE_URL.to_string();
        }
        if self.latest_version_url.trim().is_empty() {
            self.latest_version_url = DEFAULT_LATEST_VERSION_URL.to_string();
        }
        if self.allowed_hosts.is_empty() {
            self.allowed_hosts = Self::default().allowed_hosts;
        }
        if self.known_executables.is_empty() {
            self.known_executables = Self::default().known_executables;
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_settings_default() {
        let settings = PluginSettings::default();
        assert_eq!(settings.download_base_url, "https://go.dev/dl");
        assert_eq!(settings.latest_version_url, "https://go.dev/VERSION?m=text");
        assert_eq!(settings.layout, InstallLayout::BinOnly);
        assert_eq!(settings.progress_capacity, 1);
        assert_eq!(settings.connect_timeout_secs, 30);
        assert!(settings.allowed_hosts.contains(&"go.dev".to_string()));
        assert_eq!(settings.known_executables, vec!["go", "gofmt"]);
    }

    #[test]
    fn test_settings_save_and_load_roundtrip() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested").join("settings.json");

        let mut original = PluginSettings::default();
        original.layout = InstallLayout::FullTree;
        original.progress_capacity = 16;
        original.download_base_url = "https://dl.google.com/go".to_string();

        original.save(&path).unwrap();
        let loaded = PluginSettings::load(&path);

        assert_eq!(loaded, original);
    }

    #[test]
    fn test_settings_load_returns_defaults_when_missing() {
        let temp = TempDir::new().unwrap();
        let settings = PluginSettings::load(&temp.path().join("absent.json"));
        assert_eq!(settings, PluginSettings::default());
    }

    #[test]
    fn test_settings_load_returns_defaults_on_invalid_json() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("settings.json");
        fs::write(&path, "not valid json {{").unwrap();

        assert_eq!(PluginSettings::load(&path), PluginSettings::default());
    }

    #[test]
    fn test_settings_partial_file_fills_defaults() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("settings.json");
        fs::write(&path, r#"{ "layout": "full_tree" }"#).unwrap();

        let settings = PluginSettings::load(&path);
        assert_eq!(settings.layout, InstallLayout::FullTree);
        assert_eq!(settings.download_base_url, DEFAULT_DOWNLOAD_BASE_URL);
    }

    #[test]
    fn test_settings_validate_clamps() {
        let mut settings = PluginSettings {
            progress_capacity: 0,
            connect_timeout_secs: 100_000,
            download_base_url: "  ".to_string(),
            allowed_hosts: Vec::new(),
            known_executables: Vec::new(),
            ..PluginSettings::default()
        };
        settings.validate();

        assert_eq!(settings.progress_capacity, 1);
        assert_eq!(settings.connect_timeout_secs, 600);
        assert_eq!(settings.download_base_url, DEFAULT_DOWNLOAD_BASE_URL);
        assert_eq!(settings.allowed_hosts, PluginSettings::default().allowed_hosts);
        assert_eq!(settings.known_executables, vec!["go", "gofmt"]);
    }

    #[test]
    fn test_default_settings_path() {
        if let Some(path) = default_settings_path() {
            assert!(path.ends_with("goplugin/settings.json"));
        }
    }
}
