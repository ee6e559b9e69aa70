//! Filesystem access used by the synchronization engine
//!
//! Everything the engine touches on disk goes through [`FileSystem`], so
//! traversal and copy decisions can be exercised against synthetic trees.

use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use filetime::{FileTime, set_file_times};

/// What a directory entry turned out to be
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    /// Regular file, or a symlink resolving to one
    File,
    /// Real directory (symlinked directories are reported as `Other`)
    Directory,
    /// Anything else: sockets, broken links, links to directories
    Other,
}

/// One entry of a directory listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub name: OsString,
    pub path: PathBuf,
    pub kind: EntryKind,
}

/// Filesystem operations consumed by traversal and the copy policy
pub trait FileSystem: Send + Sync {
    /// List the immediate entries of a directory
    fn read_dir(&self, dir: &Path) -> io::Result<Vec<Entry>>;

    /// Last modification time of a file
    fn modified(&self, path: &Path) -> io::Result<SystemTime>;

    /// Whether anything exists at `path`
    fn exists(&self, path: &Path) -> bool;

    /// Create a directory and all missing parents
    fn create_dir_all(&self, path: &Path) -> io::Result<()>;

    /// Copy file contents, permissions and access/modification times
    fn copy_preserving(&self, from: &Path, to: &Path) -> io::Result<()>;
}

/// The real, OS-backed filesystem
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFileSystem;

impl FileSystem for LocalFileSystem {
    fn read_dir(&self, dir: &Path) -> io::Result<Vec<Entry>> {
        let mut entries = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let entry = entry?;
            let path = entry.path();
            let file_type = entry.file_type()?;

            let kind = if file_type.is_symlink() {
                // Links are never descended to avoid cycles; a dangling
                // link is not a file we can copy either.
                match std::fs::metadata(&path) {
                    Ok(target) if target.is_file() => EntryKind::File,
                    _ => EntryKind::Other,
                }
            } else if file_type.is_dir() {
                EntryKind::Directory
            } else if file_type.is_file() {
                EntryKind::File
            } else {
                EntryKind::Other
            };

            entries.push(Entry {
                name: entry.file_name(),
                path,
                kind,
            });
        }
        Ok(entries)
    }

    fn modified(&self, path: &Path) -> io::Result<SystemTime> {
        std::fs::metadata(path)?.modified()
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        std::fs::create_dir_all(path)
    }

    fn copy_preserving(&self, from: &Path, to: &Path) -> io::Result<()> {
        // std::fs::copy already carries the permission bits over
        std::fs::copy(from, to)?;

        let source = std::fs::metadata(from)?;
        set_file_times(
            to,
            FileTime::from_last_access_time(&source),
            FileTime::from_last_modification_time(&source),
        )
    }
}
