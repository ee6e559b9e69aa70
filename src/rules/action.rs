//! Copy policy - deciding whether a matched file is copied, overwritten or skipped

use std::ffi::OsStr;
use std::fmt;
use std::path::{Path, PathBuf};

use tracing::debug;

use super::Rule;
use crate::error::SyncError;
use crate::fs::FileSystem;

/// What a pass does with one (file, rule) pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyDecision {
    /// Destination exists and is at least as new as the source
    Skip,
    /// Destination does not exist yet
    Copy,
    /// Destination exists but the source has a strictly newer mtime
    Overwrite,
}

impl CopyDecision {
    pub fn as_str(&self) -> &'static str {
        match self {
            CopyDecision::Skip => "skip",
            CopyDecision::Copy => "copy",
            CopyDecision::Overwrite => "overwrite",
        }
    }

    /// True when applying the decision writes to the destination
    pub fn writes(&self) -> bool {
        !matches!(self, CopyDecision::Skip)
    }
}

impl fmt::Display for CopyDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A decision together with the paths it applies to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedCopy {
    pub decision: CopyDecision,
    pub source: PathBuf,
    pub destination: PathBuf,
}

/// Decide what to do with `source` for a rule that already matched it
pub fn decide(
    fs: &dyn FileSystem,
    source: &Path,
    rule: &Rule,
    file_name: &OsStr,
) -> Result<PlannedCopy, SyncError> {
    let destination = rule.destination_path(file_name);

    let decision = if !fs.exists(&destination) {
        CopyDecision::Copy
    } else {
        let source_mtime = modified(fs, source)?;
        let destination_mtime = modified(fs, &destination)?;
        if source_mtime > destination_mtime {
            CopyDecision::Overwrite
        } else {
            CopyDecision::Skip
        }
    };

    Ok(PlannedCopy {
        decision,
        source: source.to_path_buf(),
        destination,
    })
}

/// Carry out a planned copy. Skips are a no-op.
pub fn apply(fs: &dyn FileSystem, plan: &PlannedCopy, rule: &Rule) -> Result<(), SyncError> {
    if !plan.decision.writes() {
        return Ok(());
    }

    if rule.creates_destination() && !fs.exists(rule.destination()) {
        debug!("Creating destination {}", rule.destination().display());
        fs.create_dir_all(rule.destination())
            .map_err(|source| SyncError::CreateDestination {
                path: rule.destination().to_path_buf(),
                source,
            })?;
    }

    fs.copy_preserving(&plan.source, &plan.destination)
        .map_err(|source| SyncError::Copy {
            from: plan.source.clone(),
            to: plan.destination.clone(),
            source,
        })
}

fn modified(fs: &dyn FileSystem, path: &Path) -> Result<std::time::SystemTime, SyncError> {
    fs.modified(path).map_err(|source| SyncError::Metadata {
        path: path.to_path_buf(),
        source,
    })
}
