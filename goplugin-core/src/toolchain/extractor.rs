//! Archive extraction for downloaded Go releases.
//!
//! Release archives are gzip-compressed tarballs. Every entry path is passed
//! through a [`PathRewrite`] strategy before anything touches the disk, which
//! is how the installer drops the top-level `go/` directory or filters the
//! archive down to its executables.

use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, Read, Write};
use std::path::{Component, Path, PathBuf};

use flate2::read::GzDecoder;
use tracing::{debug, info};

use super::types::InstallLayout;
use crate::error::{PluginError, Result};

// ============================================================================
// Path Rewriting
// ============================================================================

/// Maps a stored archive path to its destination-relative path.
///
/// Returning `None`, an empty path or a bare separator skips the entry.
pub trait PathRewrite {
    fn rewrite(&self, entry: &Path) -> Option<PathBuf>;
}

impl<F> PathRewrite for F
where
    F: Fn(&Path) -> Option<PathBuf>,
{
    fn rewrite(&self, entry: &Path) -> Option<PathBuf> {
        self(entry)
    }
}

impl PathRewrite for InstallLayout {
    fn rewrite(&self, entry: &Path) -> Option<PathBuf> {
        InstallLayout::rewrite(self, entry)
    }
}

/// Normalizes a rewritten path to its normal components.
///
/// A leading root is dropped; `..` and drive prefixes are rejected. An empty
/// result means the entry is skipped.
fn sanitize(rewritten: &Path) -> Result<Option<PathBuf>> {
    let mut clean = PathBuf::new();
    for component in rewritten.components() {
        match component {
            Component::Normal(part) => clean.push(part),
            Component::RootDir | Component::CurDir => {}
            Component::ParentDir | Component::Prefix(_) => {
                return Err(PluginError::UnsafeEntryPath(rewritten.to_path_buf()));
            }
        }
    }

    if clean.as_os_str().is_empty() {
        Ok(None)
    } else {
        Ok(Some(clean))
    }
}

// ============================================================================
// Decompression
// ============================================================================

/// Marks I/O errors raised by the gzip layer.
#[derive(Debug)]
struct CorruptInput(io::Error);

impl std::fmt::Display for CorruptInput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl std::error::Error for CorruptInput {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.0)
    }
}

/// Gzip decoder whose read errors are tagged with [`CorruptInput`].
struct Decompressor<R: Read> {
    inner: GzDecoder<R>,
}

impl<R: Read> Read for Decompressor<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner
            .read(buf)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, CorruptInput(e)))
    }
}

fn is_corrupt_input(err: &io::Error) -> bool {
    err.get_ref()
        .is_some_and(|inner| inner.is::<CorruptInput>())
}

/// Classifies an I/O error from the entry iterator.
fn read_error(err: io::Error) -> PluginError {
    if is_corrupt_input(&err) {
        PluginError::Decompress(err)
    } else {
        PluginError::ArchiveRead(err)
    }
}

// ============================================================================
// TAR.GZ Extraction
// ============================================================================

/// Counts of what an extraction wrote and skipped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExtractSummary {
    pub files: usize,
    pub directories: usize,
    pub skipped: usize,
}

/// Extracts a gzip-compressed tarball into `destination`.
///
/// Entries are visited in archive order. Directory entries that already exist
/// are tolerated; anything else already occupying a directory path is an
/// error. Nothing is rolled back on failure.
///
/// # Errors
///
/// - [`PluginError::Decompress`] if the input is not valid gzip data.
/// - [`PluginError::UnsupportedEntry`] for links, devices and other special entries.
/// - [`PluginError::UnsafeEntryPath`] if a rewritten path contains `..`.
/// - [`PluginError::Io`] for filesystem failures, naming the path.
pub fn extract_tar_gz<R, P>(stream: R, destination: &Path, rewrite: &P) -> Result<ExtractSummary>
where
    R: Read,
    P: PathRewrite + ?Sized,
{
    info!("Extracting tar.gz archive to {}", destination.display());

    let mut reader = BufReader::new(Decompressor {
        inner: GzDecoder::new(stream),
    });
    // Surface a bad gzip header before anything is created on disk.
    reader.fill_buf().map_err(PluginError::Decompress)?;

    fs::create_dir_all(destination)
        .map_err(|e| PluginError::io("create directory", destination, e))?;

    let mut archive = tar::Archive::new(reader);
    let mut summary = ExtractSummary::default();

    for entry_result in archive.entries().map_err(read_error)? {
        let mut entry = entry_result.map_err(read_error)?;
        let stored = entry.path().map_err(read_error)?.into_owned();

        let relative = match rewrite.rewrite(&stored) {
            Some(rewritten) => sanitize(&rewritten)?,
            None => None,
        };
        let Some(relative) = relative else {
            debug!("Skipping {}", stored.display());
            summary.skipped += 1;
            continue;
        };

        let dest_path = destination.join(&relative);
        let entry_type = entry.header().entry_type();

        if entry_type.is_dir() {
            create_directory(&dest_path)?;
            summary.directories += 1;
        } else if entry_type.is_file() {
            write_file(&mut entry, &dest_path)?;

            #[cfg(unix)]
            {
                if let Ok(mode) = entry.header().mode() {
                    set_unix_permissions(&dest_path, mode)?;
                }
            }

            summary.files += 1;
        } else {
            return Err(PluginError::UnsupportedEntry {
                kind: format!("{:?}", entry_type),
                path: stored,
            });
        }
    }

    info!(
        "Extraction complete: {} files, {} directories, {} skipped",
        summary.files, summary.directories, summary.skipped
    );
    Ok(summary)
}

fn create_directory(path: &Path) -> Result<()> {
    match fs::symlink_metadata(path) {
        Ok(meta) if meta.is_dir() => {
            debug!("Directory already exists: {}", path.display());
            Ok(())
        }
        Ok(_) => Err(PluginError::io(
            "create directory",
            path,
            io::Error::new(io::ErrorKind::AlreadyExists, "a non-directory entry exists"),
        )),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            fs::create_dir_all(path).map_err(|e| PluginError::io("create directory", path, e))
        }
        Err(e) => Err(PluginError::io("inspect", path, e)),
    }
}

fn write_file<R: Read>(entry: &mut R, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| PluginError::io("create directory", parent, e))?;
    }

    let mut outfile = File::create(path).map_err(|e| PluginError::io("create file", path, e))?;

    if let Err(e) = io::copy(entry, &mut outfile) {
        if is_corrupt_input(&e) {
            return Err(PluginError::Decompress(e));
        }
        return Err(PluginError::io("write file", path, e));
    }

    outfile
        .flush()
        .map_err(|e| PluginError::io("flush file", path, e))?;
    debug!("Extracted {}", path.display());
    Ok(())
}

// ============================================================================
// Unix Permissions
// ============================================================================

#[cfg(unix)]
fn set_unix_permissions(path: &Path, mode: u32) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    if mode & 0o111 != 0 {
        let permissions = fs::Permissions::from_mode((mode & 0o7777) | 0o755);
        fs::set_permissions(path, permissions)
            .map_err(|e| PluginError::io("set permissions", path, e))?;
    }

    Ok(())
}

/// Sets executable permission on a file (Unix only).
///
/// On other platforms, this is a no-op.
#[allow(unused_variables)]
pub fn make_executable(path: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;

        let metadata = fs::metadata(path).map_err(|e| PluginError::io("stat", path, e))?;

        let mut permissions = metadata.permissions();
        let current_mode = permissions.mode();
        permissions.set_mode(current_mode | 0o755);

        fs::set_permissions(path, permissions)
            .map_err(|e| PluginError::io("set permissions", path, e))?;

        debug!("Set executable permission on {}", path.display());
    }

    Ok(())
}
