//! Goplugin Core Library
//!
//! This crate provides the Go plugin for a multi-language toolchain version
//! manager. It includes:
//!
//! - Release downloads with bounded progress reporting
//! - tar.gz extraction with a path rewrite hook
//! - Version activation through symlinks in a PATH directory
//! - Lenient semver ordering of Go version labels
//! - Configuration management (settings persisted as JSON)

pub mod config;
pub mod error;
pub mod toolchain;

// Re-exports for convenience
pub use config::{default_settings_path, PluginSettings};
pub use error::{PluginError, Result};

// Re-export the facade and its building blocks
pub use toolchain::{
    extract_tar_gz, sort_versions, ExtractSummary, GoPlugin, InstallLayout, PathRewrite,
    Platform, ProgressReceiver,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_is_set() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn exports_are_accessible() {
        fn _check_types(
            _plugin: &GoPlugin,
            _settings: &PluginSettings,
            _layout: InstallLayout,
            _platform: Platform,
            _summary: &ExtractSummary,
            _progress: &ProgressReceiver,
            _error: &PluginError,
        ) {
        }
    }

    #[test]
    fn layout_is_a_path_rewrite() {
        fn _accepts_rewrite<P: PathRewrite>(_rewrite: &P) {}
        _accepts_rewrite(&InstallLayout::BinOnly);
    }
}
