//! filerelay - rule-based folder replication daemon
//!
//! Periodically scans source folders and copies every file that matches a
//! rule (file type + name identifier) into the rule's destination, skipping
//! unchanged files and overwriting ones whose source is newer.

pub mod config;
pub mod error;
pub mod events;
pub mod fs;
pub mod logging;
pub mod paths;
pub mod pidfile;
pub mod rules;
pub mod scheduler;
pub mod sync;

pub use config::{Config, ConfigError};
pub use error::SyncError;
pub use events::{EventSink, MemorySink, SyncEvent, TracingSink};
pub use fs::{FileSystem, LocalFileSystem};
pub use paths::expand_path;
pub use rules::{CopyDecision, Rule};
pub use scheduler::{CycleSummary, Scheduler};
pub use sync::{Health, PassReport, SyncTask};

/// Current version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
