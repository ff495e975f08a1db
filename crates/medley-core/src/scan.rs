//! Dataset directory enumeration

use crate::error::{Error, Result};
use crate::media::{MediaFormat, MediaKind};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Collect every file under `dir` whose format belongs to `kind`.
///
/// Only the top level is scanned unless `recursive` is set. Entries are
/// sorted by file name within each directory, so repeated fits over the
/// same tree enumerate items in the same order.
pub fn collect_media(dir: &Path, kind: MediaKind, recursive: bool) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(Error::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("dataset directory not found: {}", dir.display()),
        )));
    }

    let max_depth = if recursive { usize::MAX } else { 1 };
    let mut paths = Vec::new();

    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(max_depth)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|e| {
            Error::Io(
                e.into_io_error()
                    .unwrap_or_else(|| std::io::Error::other("directory loop detected")),
            )
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        match MediaFormat::from_path(entry.path()) {
            Ok(format) if format.kind() == kind => paths.push(entry.into_path()),
            _ => log::trace!("Ignoring {}", entry.path().display()),
        }
    }

    log::debug!(
        "Found {} {} files in {}",
        paths.len(),
        kind,
        dir.display()
    );
    Ok(paths)
}

/// Display name of an indexed item
pub fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
