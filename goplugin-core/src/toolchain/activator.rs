//! Version activation through symlinks in a PATH directory.
//!
//! The active version is not recorded anywhere else: it is whatever the
//! primary executable's symlink in the PATH directory resolves to. Every
//! installed version lives in its own subdirectory of the install root,
//! named by its version string.

use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use tracing::{debug, info, warn};

use super::extractor::make_executable;
use super::types::InstallLayout;
use crate::error::{PluginError, Result};

/// Lists the names of regular files directly inside `bin_dir`, sorted.
fn executable_names(bin_dir: &Path) -> Result<Vec<String>> {
    let entries = fs::read_dir(bin_dir).map_err(|e| PluginError::io("read directory", bin_dir, e))?;

    let mut names = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| PluginError::io("read directory", bin_dir, e))?;
        let file_type = entry
            .file_type()
            .map_err(|e| PluginError::io("stat", entry.path(), e))?;
        if !file_type.is_file() {
            continue;
        }
        match entry.file_name().into_string() {
            Ok(name) => names.push(name),
            Err(name) => warn!("Skipping non UTF-8 executable name {:?}", name),
        }
    }

    names.sort();
    Ok(names)
}

/// Removes a stale activation symlink at `link`.
///
/// A missing entry is fine. Anything other than a symlink is left alone and
/// reported as [`PluginError::ActivationConflict`].
fn clear_link(link: &Path) -> Result<()> {
    match fs::symlink_metadata(link) {
        Ok(meta) if meta.file_type().is_symlink() => {
            fs::remove_file(link).map_err(|e| PluginError::io("remove symlink", link, e))?;
            debug!("Removed stale symlink {}", link.display());
            Ok(())
        }
        Ok(_) => Err(PluginError::ActivationConflict(link.to_path_buf())),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(PluginError::io("stat", link, e)),
    }
}

#[cfg(unix)]
fn create_symlink(target: &Path, link: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(target, link)
}

#[cfg(windows)]
fn create_symlink(target: &Path, link: &Path) -> io::Result<()> {
    std::os::windows::fs::symlink_file(target, link)
}

/// Points every executable of the version in `install_dir` at `path_dir`.
///
/// Returns the symlinks created. Not atomic across executables; running it
/// again with the same arguments converges on the same state.
pub fn activate(install_dir: &Path, path_dir: &Path, layout: InstallLayout) -> Result<Vec<PathBuf>> {
    let bin_dir = install_dir.join(layout.bin_subdir());
    let bin_dir = fs::canonicalize(&bin_dir).map_err(|e| PluginError::io("resolve", &bin_dir, e))?;

    fs::create_dir_all(path_dir).map_err(|e| PluginError::io("create directory", path_dir, e))?;

    let mut links = Vec::new();
    for name in executable_names(&bin_dir)? {
        let target = bin_dir.join(&name);
        let link = path_dir.join(&name);

        clear_link(&link)?;
        create_symlink(&target, &link).map_err(|e| PluginError::io("create symlink", &link, e))?;
        make_executable(&link)?;

        debug!("Created symlink: {} -> {}", link.display(), target.display());
        links.push(link);
    }

    info!(
        "Activated {} executables from {} in {}",
        links.len(),
        bin_dir.display(),
        path_dir.display()
    );
    Ok(links)
}

/// Uninstalls the version in `install_dir`.
///
/// When `was_active`, the executable symlinks in `path_dir` are removed
/// first. Names come from the install itself, or from `known_executables`
/// if the install is already gone. The install tree is always removed.
pub fn deactivate(
    install_dir: &Path,
    path_dir: &Path,
    was_active: bool,
    layout: InstallLayout,
    known_executables: &[String],
) -> Result<()> {
    if was_active {
        let bin_dir = install_dir.join(layout.bin_subdir());
        let names = match executable_names(&bin_dir) {
            Ok(names) => names,
            Err(PluginError::Io { source, .. }) if source.kind() == io::ErrorKind::NotFound => {
                known_executables.to_vec()
            }
            Err(e) => return Err(e),
        };

        for name in names {
            clear_link(&path_dir.join(name))?;
        }
        info!("Removed activation symlinks from {}", path_dir.display());
    }

    match fs::remove_dir_all(install_dir) {
        Ok(()) => {
            info!("Removed {}", install_dir.display());
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(PluginError::io("remove directory", install_dir, e)),
    }
}

/// Returns the version whose `primary` executable `path_dir` links to.
///
/// `install_dir` may be the install root or a single version directory.
/// `None` when there is no link, the link is dangling, or it points outside
/// `install_dir`.
pub fn current_version(
    install_dir: &Path,
    path_dir: &Path,
    primary: &str,
    layout: InstallLayout,
) -> Result<Option<String>> {
    let link = path_dir.join(primary);
    let target = match fs::canonicalize(&link) {
        Ok(target) => target,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(PluginError::io("resolve", &link, e)),
    };

    let root = match fs::canonicalize(install_dir) {
        Ok(root) => root,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(PluginError::io("resolve", install_dir, e)),
    };

    let Ok(relative) = target.strip_prefix(&root) else {
        debug!(
            "{} points outside {}: {}",
            link.display(),
            root.display(),
            target.display()
        );
        return Ok(None);
    };

    // Drop the executable name and the layout's bin folder; the first
    // remaining component is the version directory. Nothing left means
    // `install_dir` is itself a version directory.
    let exe_dir = relative.parent().unwrap_or(Path::new(""));
    let bin = layout.bin_subdir();
    let version_dir: PathBuf = if exe_dir.ends_with(bin) {
        let keep = exe_dir.components().count() - bin.components().count();
        exe_dir.components().take(keep).collect()
    } else {
        exe_dir.to_path_buf()
    };

    let version_component = version_dir
        .components()
        .next()
        .or_else(|| root.components().next_back());

    Ok(match version_component {
        Some(Component::Normal(name)) => name.to_str().map(str::to_string),
        _ => None,
    })
}
