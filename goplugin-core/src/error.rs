//! Error type shared by every plugin operation.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, PluginError>;

/// Errors that can occur while downloading, installing or activating Go.
#[derive(Debug, Error)]
pub enum PluginError {
    #[error("Invalid download URL: {0}")]
    InvalidUrl(String),

    #[error("Go downloads are not available for this platform")]
    UnsupportedPlatform,

    #[error("Request to {url} failed: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Request to {url} failed with status {status}: {reason}")]
    HttpStatus {
        url: String,
        status: u16,
        reason: String,
    },

    #[error("Server did not report a content length")]
    MissingContentLength,

    #[error("Download stream failed: {0}")]
    Transfer(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("Background task ended abnormally: {0}")]
    TransferAborted(#[from] tokio::task::JoinError),

    #[error("No download in progress; call download() before install()")]
    NoPendingDownload,

    #[error("Corrupt or non-archive input: {0}")]
    Decompress(#[source] io::Error),

    #[error("Failed to read archive entries: {0}")]
    ArchiveRead(#[source] io::Error),

    #[error("Unsupported archive entry type {kind} at {path}")]
    UnsupportedEntry { kind: String, path: PathBuf },

    #[error("Archive entry escapes the destination: {0}")]
    UnsafeEntryPath(PathBuf),

    #[error("{op} failed for {path}: {source}")]
    Io {
        op: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Refusing to replace {0}: not a symlink")]
    ActivationConflict(PathBuf),

    #[error("Invalid version {version:?}: {source}")]
    VersionParse {
        version: String,
        #[source]
        source: semver::Error,
    },

    #[error("Unexpected latest-version response: {0:?}")]
    MalformedVersionResponse(String),

    #[error("Failed to save settings to {path}: {source}")]
    SettingsSave {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl PluginError {
    /// Builds an [`PluginError::Io`] for `op` on `path`.
    pub(crate) fn io(op: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            op,
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_names_operation_and_path() {
        let err = PluginError::io(
            "create file",
            "/tmp/go/bin/go",
            io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        );
        let message = err.to_string();
        assert!(message.contains("create file"));
        assert!(message.contains("/tmp/go/bin/go"));
        assert!(message.contains("denied"));
    }

    #[test]
    fn test_http_status_message() {
        let err = PluginError::HttpStatus {
            url: "https://go.dev/dl/go0.0.0.linux-amd64.tar.gz".to_string(),
            status: 404,
            reason: "Not Found".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Request to https://go.dev/dl/go0.0.0.linux-amd64.tar.gz failed with status 404: Not Found"
        );
    }
}
