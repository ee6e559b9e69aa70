//! Copy rules - which files go where

mod action;
mod condition;

pub use action::{CopyDecision, PlannedCopy, apply, decide};
pub use condition::Condition;

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

/// A rule that selects files by type and name and copies them to a folder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    destination: PathBuf,
    condition: Condition,
    create_destination: bool,
}

impl Rule {
    /// Create a new rule
    ///
    /// Types and identifiers are lowercased; an empty list matches everything.
    pub fn new<T, I>(destination: impl Into<PathBuf>, file_types: T, identifiers: I) -> Self
    where
        T: IntoIterator,
        T::Item: AsRef<str>,
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        Self {
            destination: destination.into(),
            condition: Condition::new(file_types, identifiers),
            create_destination: true,
        }
    }

    /// Whether the destination folder is created when missing (default: yes)
    pub fn with_create_destination(mut self, create: bool) -> Self {
        self.create_destination = create;
        self
    }

    pub fn destination(&self) -> &Path {
        &self.destination
    }

    pub fn condition(&self) -> &Condition {
        &self.condition
    }

    pub fn creates_destination(&self) -> bool {
        self.create_destination
    }

    /// Check whether a file name satisfies this rule
    pub fn matches(&self, file_name: &str) -> bool {
        self.condition.matches(file_name)
    }

    /// Where a file with this name lands; source subfolders are flattened
    pub fn destination_path(&self, file_name: &OsStr) -> PathBuf {
        self.destination.join(file_name)
    }
}
