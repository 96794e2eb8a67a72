//! Sequence specification and frame-file discovery
//!
//! A [`SequenceSpec`] names the frames of a sequence either as an explicit
//! numeric range (`prefix` + padded number + `extension`) or as a folder to
//! scan. Resolution turns the spec into an ordered path list without reading
//! any pixel data; for ranges nothing touches the disk at all and missing
//! files only surface at decode time.
//!
//! The resolved order is the one order used everywhere: frame indexing,
//! time mapping and percent mapping all address the same list.

use log::debug;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::SequenceError;

/// Lists candidate frame files in a folder, in a deterministic sorted order.
///
/// `extension` filters case-insensitively when non-empty.
pub trait DirLister: Send + Sync {
    fn list_files(&self, dir: &Path, extension: &str) -> std::io::Result<Vec<PathBuf>>;
}

/// Default lister over `std::fs::read_dir`, sorted by path.
#[derive(Debug, Default)]
pub struct FsDirLister;

impl DirLister for FsDirLister {
    fn list_files(&self, dir: &Path, extension: &str) -> std::io::Result<Vec<PathBuf>> {
        let filter = extension.to_lowercase();
        let mut files: Vec<PathBuf> = fs::read_dir(dir)?
            .flatten()
            .map(|entry| entry.path())
            .filter(|path| path.is_file())
            .filter(|path| {
                if filter.is_empty() {
                    return true;
                }
                path.extension()
                    .and_then(|s| s.to_str())
                    .map(|s| s.to_lowercase() == filter)
                    .unwrap_or(false)
            })
            .collect();
        files.sort();
        Ok(files)
    }
}

/// How a sequence's frame files are named.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SequenceSpec {
    /// Explicit numeric range: `prefix` + frame number + `.` + `extension`,
    /// one frame per integer in `[start, end]`. `digits > 0` zero-pads the
    /// number to that width; `digits == 0` formats it unpadded.
    Range {
        prefix: String,
        extension: String,
        start: i32,
        end: i32,
        digits: usize,
    },
    /// Folder scan, optionally filtered by extension.
    Folder { dir: PathBuf, extension: String },
}

impl SequenceSpec {
    /// Resolve the spec into an ordered list of frame source paths.
    ///
    /// `max_frames` (when positive) truncates folder scans; it has no effect
    /// on explicit ranges.
    pub fn resolve(
        &self,
        lister: &dyn DirLister,
        max_frames: usize,
    ) -> Result<Vec<PathBuf>, SequenceError> {
        match self {
            SequenceSpec::Range { prefix, extension, start, end, digits } => {
                resolve_range(prefix, extension, *start, *end, *digits)
            }
            SequenceSpec::Folder { dir, extension } => {
                resolve_folder(dir, extension, lister, max_frames)
            }
        }
    }
}

fn resolve_range(
    prefix: &str,
    extension: &str,
    start: i32,
    end: i32,
    digits: usize,
) -> Result<Vec<PathBuf>, SequenceError> {
    if end < start {
        return Err(SequenceError::EmptyRange { start, end });
    }

    let mut paths = Vec::with_capacity((end - start + 1) as usize);
    for i in start..=end {
        let name = if digits > 0 {
            format!("{}{:0width$}.{}", prefix, i, extension, width = digits)
        } else {
            format!("{}{}.{}", prefix, i, extension)
        };
        paths.push(PathBuf::from(name));
    }

    debug!("resolved range {}..={} to {} paths", start, end, paths.len());
    Ok(paths)
}

fn resolve_folder(
    dir: &Path,
    extension: &str,
    lister: &dyn DirLister,
    max_frames: usize,
) -> Result<Vec<PathBuf>, SequenceError> {
    if !dir.is_dir() {
        return Err(SequenceError::FolderNotFound(dir.to_path_buf()));
    }

    let mut files = lister
        .list_files(dir, extension)
        .map_err(|_| SequenceError::FolderNotFound(dir.to_path_buf()))?;

    if max_frames > 0 {
        files.truncate(max_frames);
    }
    if files.is_empty() {
        return Err(SequenceError::EmptyDirectory(dir.to_path_buf()));
    }

    debug!("scanned {}: {} frames", dir.display(), files.len());
    Ok(files)
}
