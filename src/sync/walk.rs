//! Depth-bounded directory traversal

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use tracing::trace;

use crate::error::SyncError;
use crate::fs::{EntryKind, FileSystem};

/// How far below the source directory a walk may go
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WalkLimits {
    /// Descend into subdirectories of the source at all
    pub recursive: bool,
    /// Directories at this depth or deeper are never listed
    pub max_depth: usize,
}

impl WalkLimits {
    fn may_descend(&self, depth: usize) -> bool {
        if depth == 0 && !self.recursive {
            return false;
        }
        depth < self.max_depth
    }
}

/// Walk `root` and call `visit(file_name, containing_directory)` once per file.
///
/// Entries of `root` are at depth 0. Directories listed in `excluded` are
/// never entered, whatever their depth. The first error (listing or from
/// `visit`) stops the walk.
pub fn walk<F>(
    fs: &dyn FileSystem,
    root: &Path,
    limits: WalkLimits,
    excluded: &[&Path],
    mut visit: F,
) -> Result<(), SyncError>
where
    F: FnMut(&OsStr, &Path) -> Result<(), SyncError>,
{
    let mut pending: Vec<(PathBuf, usize)> = vec![(root.to_path_buf(), 0)];

    while let Some((dir, depth)) = pending.pop() {
        let entries = fs.read_dir(&dir).map_err(|source| SyncError::Traversal {
            path: dir.clone(),
            source,
        })?;

        for entry in entries {
            match entry.kind {
                EntryKind::File => visit(entry.name.as_os_str(), dir.as_path())?,
                EntryKind::Directory if excluded.contains(&entry.path.as_path()) => {
                    trace!("Skipping destination {}", entry.path.display());
                }
                EntryKind::Directory if limits.may_descend(depth) => {
                    pending.push((entry.path, depth + 1));
                }
                EntryKind::Directory => {
                    trace!("Depth limit reached at {}", entry.path.display());
                }
                EntryKind::Other => {
                    trace!("Ignoring {}", entry.path.display());
                }
            }
        }
    }

    Ok(())
}
