//! Go plugin facade.
//!
//! `GoPlugin` is the entry point the host calls. It coordinates the
//! downloader, extractor, activator and version orderer, and owns the one
//! in-flight download between `download` and `install`.

use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{debug, info, warn};

use super::activator;
use super::downloader::{start_download, validate_url, PendingDownload, ProgressReceiver};
use super::extractor::{extract_tar_gz, ExtractSummary};
use super::types::{executable_name, Platform, PRIMARY_EXECUTABLE};
use super::versions::{parse_latest_version, sort_versions};
use crate::config::PluginSettings;
use crate::error::{PluginError, Result};

/// Manages download, installation and activation of Go versions.
#[derive(Debug)]
pub struct GoPlugin {
    /// Plugin settings (validated).
    settings: PluginSettings,
    /// Currently detected platform.
    platform: Option<Platform>,
    /// Shared HTTP client.
    client: reqwest::Client,
    /// Download started by `download` and consumed by `install`.
    pending: Option<PendingDownload>,
}

impl GoPlugin {
    /// Creates a plugin with the given settings.
    pub fn new(mut settings: PluginSettings) -> Result<Self> {
        settings.validate();

        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(settings.connect_timeout_secs))
            .user_agent(concat!("goplugin/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|source| PluginError::Network {
                url: settings.download_base_url.clone(),
                source,
            })?;

        let platform = Platform::detect();
        info!(
            "GoPlugin initialized. Platform: {:?}, layout: {}",
            platform, settings.layout
        );

        Ok(Self {
            settings,
            platform,
            client,
            pending: None,
        })
    }

    /// Creates a plugin with default settings.
    pub fn with_defaults() -> Result<Self> {
        Self::new(PluginSettings::default())
    }

    /// Overrides the detected platform (for testing).
    #[cfg(test)]
    fn with_platform(mut self, platform: Option<Platform>) -> Self {
        self.platform = platform;
        self
    }

    /// Returns the active settings.
    pub fn settings(&self) -> &PluginSettings {
        &self.settings
    }

    /// Returns the detected platform.
    pub fn platform(&self) -> Option<Platform> {
        self.platform
    }

    /// Returns true while a download awaits `install`.
    pub fn has_pending_download(&self) -> bool {
        self.pending.is_some()
    }

    // ========================================================================
    // Remote Queries
    // ========================================================================

    /// Fetches the latest stable Go version, e.g. `1.23.3`.
    pub async fn get_latest_version(&self) -> Result<String> {
        let url = &self.settings.latest_version_url;
        debug!("Fetching latest version from {}", url);

        let network_err = |source| PluginError::Network {
            url: url.clone(),
            source,
        };

        let response = self.client.get(url).send().await.map_err(network_err)?;

        let status = response.status();
        if !status.is_success() {
            return Err(PluginError::HttpStatus {
                url: url.clone(),
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or("Unknown error").to_string(),
            });
        }

        let body = response.text().await.map_err(network_err)?;
        parse_latest_version(&body)
    }

    /// Builds the release archive URL for `version` on this platform.
    pub fn download_url(&self, version: &str) -> Result<String> {
        let platform = self.platform.ok_or(PluginError::UnsupportedPlatform)?;
        Ok(platform.download_url(&self.settings.download_base_url, version))
    }

    // ========================================================================
    // Installation
    // ========================================================================

    /// Starts downloading `version` in the background.
    ///
    /// The returned receiver yields completion fractions and closes when the
    /// transfer ends. The transfer waits for each update to be received, so
    /// the caller must drain it before calling [`GoPlugin::install`].
    pub async fn download(&mut self, version: &str) -> Result<ProgressReceiver> {
        let url = self.download_url(version)?;
        validate_url(&url, &self.settings.allowed_hosts)?;

        let (progress, pending) =
            start_download(&self.client, &url, self.settings.progress_capacity).await?;

        if let Some(previous) = self.pending.replace(pending) {
            warn!("Discarding unfinished download of {}", previous.url);
        }

        info!("Download of Go {} started", version);
        Ok(progress)
    }

    /// Extracts the finished download into `destination`.
    ///
    /// Waits for the background transfer to complete and takes ownership of
    /// its buffer; a failed transfer is reported here and nothing is written.
    pub async fn install(&mut self, destination: &Path) -> Result<ExtractSummary> {
        let pending = self.pending.take().ok_or(PluginError::NoPendingDownload)?;
        let url = pending.url.clone();
        let content = pending.wait().await?;

        info!(
            "Installing {} ({} bytes) to {}",
            url,
            content.len(),
            destination.display()
        );

        let layout = self.settings.layout;
        let destination: PathBuf = destination.to_path_buf();
        tokio::task::spawn_blocking(move || {
            extract_tar_gz(Cursor::new(content), &destination, &layout)
        })
        .await?
    }

    // ========================================================================
    // Activation
    // ========================================================================

    /// Makes the version in `install_dir` the one found through `path_dir`.
    pub fn use_version(&self, install_dir: &Path, path_dir: &Path) -> Result<()> {
        activator::activate(install_dir, path_dir, self.settings.layout)?;
        Ok(())
    }

    /// Uninstalls the version in `install_dir`, unlinking it first if active.
    pub fn remove(&self, install_dir: &Path, path_dir: &Path, was_active: bool) -> Result<()> {
        activator::deactivate(
            install_dir,
            path_dir,
            was_active,
            self.settings.layout,
            &self.settings.known_executables,
        )
    }

    /// Returns the active version, or an empty string if none is active.
    pub fn get_current_version(&self, install_dir: &Path, path_dir: &Path) -> Result<String> {
        let primary = executable_name(PRIMARY_EXECUTABLE);
        let version =
            activator::current_version(install_dir, path_dir, &primary, self.settings.layout)?;
        Ok(version.unwrap_or_default())
    }

    /// Sorts version labels in ascending order, keeping their spelling.
    pub fn sort<S: AsRef<str>>(&self, versions: &[S]) -> Result<Vec<String>> {
        sort_versions(versions)
    }
}
