//! Core types for the Go toolchain plugin.
//!
//! This module defines the platform table used to build download URLs and the
//! install layouts that decide how the release archive maps onto disk.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Component, Path, PathBuf};

/// Top-level directory of every official Go release archive.
pub const ARCHIVE_ROOT: &str = "go";

/// Name of the main Go executable (without platform suffix).
pub const PRIMARY_EXECUTABLE: &str = "go";

// ============================================================================
// Platform Detection
// ============================================================================

/// A platform Go publishes `.tar.gz` releases for (OS + architecture).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Platform {
    LinuxX64,
    LinuxArm64,
    LinuxX86,
    LinuxArmv6l,
    MacosX64,
    MacosArm64,
    FreebsdX64,
}

impl Platform {
    /// Detects the current platform at runtime.
    ///
    /// Returns `None` if Go has no tarball release for this platform.
    pub fn detect() -> Option<Self> {
        #[cfg(all(target_os = "linux", target_arch = "x86_64"))]
        {
            Some(Platform::LinuxX64)
        }
        #[cfg(all(target_os = "linux", target_arch = "aarch64"))]
        {
            Some(Platform::LinuxArm64)
        }
        #[cfg(all(target_os = "linux", target_arch = "x86"))]
        {
            Some(Platform::LinuxX86)
        }
        #[cfg(all(target_os = "linux", target_arch = "arm"))]
        {
            Some(Platform::LinuxArmv6l)
        }
        #[cfg(all(target_os = "macos", target_arch = "x86_64"))]
        {
            Some(Platform::MacosX64)
        }
        #[cfg(all(target_os = "macos", target_arch = "aarch64"))]
        {
            Some(Platform::MacosArm64)
        }
        #[cfg(all(target_os = "freebsd", target_arch = "x86_64"))]
        {
            Some(Platform::FreebsdX64)
        }
        #[cfg(not(any(
            all(target_os = "linux", target_arch = "x86_64"),
            all(target_os = "linux", target_arch = "aarch64"),
            all(target_os = "linux", target_arch = "x86"),
            all(target_os = "linux", target_arch = "arm"),
            all(target_os = "macos", target_arch = "x86_64"),
            all(target_os = "macos", target_arch = "aarch64"),
            all(target_os = "freebsd", target_arch = "x86_64"),
        )))]
        {
            None
        }
    }

    /// Go's `GOOS` name for this platform.
    pub fn go_os(&self) -> &'static str {
        match self {
            Self::LinuxX64 | Self::LinuxArm64 | Self::LinuxX86 | Self::LinuxArmv6l => "linux",
            Self::MacosX64 | Self::MacosArm64 => "darwin",
            Self::FreebsdX64 => "freebsd",
        }
    }

    /// Go's `GOARCH` name for this platform, as used in release file names.
    pub fn go_arch(&self) -> &'static str {
        match self {
            Self::LinuxX64 | Self::MacosX64 | Self::FreebsdX64 => "amd64",
            Self::LinuxArm64 | Self::MacosArm64 => "arm64",
            Self::LinuxX86 => "386",
            Self::LinuxArmv6l => "armv6l",
        }
    }

    /// Builds the release archive URL for `version` under `base_url`.
    ///
    /// e.g. `https://go.dev/dl/go1.23.3.linux-amd64.tar.gz`
    pub fn download_url(&self, base_url: &str, version: &str) -> String {
        format!(
            "{}/go{}.{}-{}.tar.gz",
            base_url.trim_end_matches('/'),
            version,
            self.go_os(),
            self.go_arch()
        )
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.go_os(), self.go_arch())
    }
}

/// Returns `name` with the platform executable suffix appended.
pub fn executable_name(name: &str) -> String {
    format!("{}{}", name, std::env::consts::EXE_SUFFIX)
}

// ============================================================================
// Install Layout
// ============================================================================

/// How a release archive is laid out inside a version directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstallLayout {
    /// Keep only `go/bin/*`, flattened into the version directory.
    #[default]
    BinOnly,
    /// Strip the top-level `go/` directory and keep the whole tree.
    FullTree,
}

impl InstallLayout {
    /// Folder holding the executables, relative to a version directory.
    pub fn bin_subdir(&self) -> &'static Path {
        match self {
            Self::BinOnly => Path::new(""),
            Self::FullTree => Path::new("bin"),
        }
    }

    /// Maps an archive entry path to its location inside the version
    /// directory, or `None` when the entry is not installed.
    pub fn rewrite(&self, entry: &Path) -> Option<PathBuf> {
        let root = Path::new(ARCHIVE_ROOT);
        let kept = match self {
            Self::BinOnly => entry.strip_prefix(root.join("bin")).ok()?,
            Self::FullTree => entry.strip_prefix(root).ok()?,
        };
        let kept: PathBuf = kept
            .components()
            .filter(|c| !matches!(c, Component::CurDir))
            .collect();
        if kept.as_os_str().is_empty() {
            None
        } else {
            Some(kept)
        }
    }
}

impl fmt::Display for InstallLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BinOnly => write!(f, "bin-only"),
            Self::FullTree => write!(f, "full-tree"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_download_url_linux_amd64() {
        let url = Platform::LinuxX64.download_url("https://go.dev/dl", "1.23.3");
        assert_eq!(url, "https://go.dev/dl/go1.23.3.linux-amd64.tar.gz");
    }

    #[test]
    fn test_download_url_trims_trailing_slash() {
        let url = Platform::MacosArm64.download_url("https://dl.google.com/go/", "1.22.4");
        assert_eq!(url, "https://dl.google.com/go/go1.22.4.darwin-arm64.tar.gz");
    }

    #[test]
    fn test_platform_names() {
        assert_eq!(Platform::LinuxX86.to_string(), "linux-386");
        assert_eq!(Platform::LinuxArmv6l.to_string(), "linux-armv6l");
        assert_eq!(Platform::FreebsdX64.to_string(), "freebsd-amd64");
    }

    #[test]
    fn test_platform_detect() {
        let platform = Platform::detect();
        #[cfg(all(target_os = "linux", target_arch = "x86_64"))]
        assert_eq!(platform, Some(Platform::LinuxX64));
        #[cfg(target_os = "windows")]
        assert!(platform.is_none());
        let _ = platform;
    }

    #[test]
    fn test_bin_only_rewrite() {
        let layout = InstallLayout::BinOnly;
        assert_eq!(layout.rewrite(Path::new("go/bin/go")), Some(PathBuf::from("go")));
        assert_eq!(
            layout.rewrite(Path::new("go/bin/gofmt")),
            Some(PathBuf::from("gofmt"))
        );
        assert_eq!(layout.rewrite(Path::new("go/bin")), None);
        assert_eq!(layout.rewrite(Path::new("go/bin/")), None);
        assert_eq!(layout.rewrite(Path::new("go/src/fmt/print.go")), None);
        // Component-wise match, not a string prefix.
        assert_eq!(layout.rewrite(Path::new("go/binary/tool")), None);
    }

    #[test]
    fn test_full_tree_rewrite() {
        let layout = InstallLayout::FullTree;
        assert_eq!(layout.rewrite(Path::new("go")), None);
        assert_eq!(layout.rewrite(Path::new("go/")), None);
        assert_eq!(
            layout.rewrite(Path::new("go/bin/go")),
            Some(PathBuf::from("bin/go"))
        );
        assert_eq!(
            layout.rewrite(Path::new("go/src/fmt/print.go")),
            Some(PathBuf::from("src/fmt/print.go"))
        );
        assert_eq!(layout.rewrite(Path::new("other/file")), None);
    }

    #[test]
    fn test_layout_bin_subdir() {
        assert_eq!(InstallLayout::BinOnly.bin_subdir(), Path::new(""));
        assert_eq!(InstallLayout::FullTree.bin_subdir(), Path::new("bin"));
    }

    #[test]
    fn test_layout_serialization() {
        let json = serde_json::to_string(&InstallLayout::FullTree).unwrap();
        assert_eq!(json, "\"full_tree\"");
        let parsed: InstallLayout = serde_json::from_str("\"bin_only\"").unwrap();
        assert_eq!(parsed, InstallLayout::BinOnly);
    }

    #[test]
    fn test_executable_name() {
        let name = executable_name("go");
        #[cfg(windows)]
        assert_eq!(name, "go.exe");
        #[cfg(not(windows))]
        assert_eq!(name, "go");
    }
}
