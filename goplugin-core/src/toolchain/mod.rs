//! Go toolchain management.
//!
//! Downloads official Go release archives, unpacks them into version
//! directories and switches the active version by symlinking its
//! executables into a directory on the user's PATH.
//!
//! # Architecture
//!
//! - `types`: Core types (Platform, InstallLayout)
//! - `downloader`: Background download with bounded progress reporting
//! - `extractor`: tar.gz extraction with a path rewrite hook
//! - `activator`: Symlink activation, deactivation and current-version lookup
//! - `versions`: Lenient semver parsing and ordering
//! - `plugin`: High-level facade tying the above together
//!
//! # Example
//!
//! ```ignore
//! use goplugin_core::toolchain::GoPlugin;
//!
//! let mut plugin = GoPlugin::with_defaults()?;
//! let version = plugin.get_latest_version().await?;
//!
//! let mut progress = plugin.download(&version).await?;
//! while let Some(fraction) = progress.recv().await {
//!     println!("{:.0}%", fraction * 100.0);
//! }
//!
//! let version_dir = installs.join(&version);
//! plugin.install(&version_dir).await?;
//! plugin.use_version(&version_dir, &path_dir)?;
//! ```

pub mod activator;
pub mod downloader;
pub mod extractor;
pub mod plugin;
pub mod types;
pub mod versions;

// Re-export commonly used types
pub use downloader::{
    progress_channel, start_download, validate_url, PendingDownload, ProgressReceiver,
    ProgressSender, Transfer,
};
pub use extractor::{extract_tar_gz, make_executable, ExtractSummary, PathRewrite};
pub use plugin::GoPlugin;
pub use types::{executable_name, InstallLayout, Platform, ARCHIVE_ROOT, PRIMARY_EXECUTABLE};
pub use versions::{parse_latest_version, parse_version, sort_versions};
