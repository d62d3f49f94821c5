//! Configuration module for the Go plugin.
//!
//! Manages plugin settings stored as JSON.

mod settings;

pub use settings::{
    default_settings_path, PluginSettings, DEFAULT_DOWNLOAD_BASE_URL, DEFAULT_LATEST_VERSION_URL,
};
