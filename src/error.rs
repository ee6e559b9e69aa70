//! Errors raised while running a synchronization pass

use std::io;
use std::path::PathBuf;

/// Failure that aborts the current pass of a task
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// A source directory (or one below it) could not be listed
    #[error("cannot list {}: {source}", path.display())]
    Traversal {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Modification time of a source or destination file was unreadable
    #[error("cannot read modification time of {}: {source}", path.display())]
    Metadata {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The rule's destination directory could not be created
    #[error("cannot create destination {}: {source}", path.display())]
    CreateDestination {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The copy itself failed (permissions, disk full, source vanished)
    #[error("failed to copy {} to {}: {source}", from.display(), to.display())]
    Copy {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl SyncError {
    /// True for listing failures, false for I/O failures around a copy
    pub fn is_traversal(&self) -> bool {
        matches!(self, SyncError::Traversal { .. })
    }

    /// The underlying I/O error
    pub fn io_error(&self) -> &io::Error {
        match self {
            SyncError::Traversal { source, .. }
            | SyncError::Metadata { source, .. }
            | SyncError::CreateDestination { source, .. }
            | SyncError::Copy { source, .. } => source,
        }
    }
}
