//! Sync events and the sinks that receive them
//!
//! The engine never logs through global state directly: every copy, failure
//! and recovery is handed to an [`EventSink`]. [`TracingSink`] forwards to
//! `tracing` for the binaries; [`MemorySink`] keeps events for inspection.

use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Local};
use tracing::{error, info};

use crate::rules::CopyDecision;

/// Severity an event was reported with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventLevel {
    Info,
    Error,
}

/// Something observable that happened during a pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
    /// A file was copied or overwritten
    Transferred {
        task: String,
        action: CopyDecision,
        file_name: String,
        source_directory: PathBuf,
        destination_directory: PathBuf,
        timestamp: DateTime<Local>,
    },

    /// A pass failed and the task is degraded
    Failed {
        task: String,
        error: String,
        timestamp: DateTime<Local>,
    },

    /// A degraded task completed a pass again
    Recovered {
        task: String,
        degraded_since: DateTime<Local>,
        timestamp: DateTime<Local>,
    },
}

impl SyncEvent {
    pub fn task(&self) -> &str {
        match self {
            SyncEvent::Transferred { task, .. }
            | SyncEvent::Failed { task, .. }
            | SyncEvent::Recovered { task, .. } => task,
        }
    }

    pub fn timestamp(&self) -> DateTime<Local> {
        match self {
            SyncEvent::Transferred { timestamp, .. }
            | SyncEvent::Failed { timestamp, .. }
            | SyncEvent::Recovered { timestamp, .. } => *timestamp,
        }
    }
}

/// Receiver of sync events
pub trait EventSink: Send + Sync {
    fn info(&self, event: &SyncEvent);
    fn error(&self, event: &SyncEvent);
}

/// Forwards events to `tracing` with structured fields
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn info(&self, event: &SyncEvent) {
        match event {
            SyncEvent::Transferred {
                task,
                action,
                file_name,
                source_directory,
                destination_directory,
                ..
            } => info!(
                task = %task,
                action = %action,
                from = %source_directory.display(),
                to = %destination_directory.display(),
                "{}: {}",
                capitalize(action.as_str()),
                file_name
            ),
            SyncEvent::Recovered {
                task,
                degraded_since,
                ..
            } => info!(
                task = %task,
                "Task recovered (failing since {})",
                degraded_since.format("%Y-%m-%d %H:%M:%S")
            ),
            SyncEvent::Failed { task, error, .. } => info!(task = %task, "{}", error),
        }
    }

    fn error(&self, event: &SyncEvent) {
        match event {
            SyncEvent::Failed { task, error, .. } => {
                error!(task = %task, "Synchronization failed: {}", error)
            }
            other => error!(task = %other.task(), "{:?}", other),
        }
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Collects events in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<(EventLevel, SyncEvent)>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// All recorded events, oldest first
    pub fn events(&self) -> Vec<(EventLevel, SyncEvent)> {
        self.lock().clone()
    }

    /// Events recorded at error level
    pub fn errors(&self) -> Vec<SyncEvent> {
        self.at(EventLevel::Error)
    }

    /// Events recorded at info level
    pub fn infos(&self) -> Vec<SyncEvent> {
        self.at(EventLevel::Info)
    }

    /// Copy and overwrite events only
    pub fn transfers(&self) -> Vec<SyncEvent> {
        self.lock()
            .iter()
            .filter(|(_, e)| matches!(e, SyncEvent::Transferred { .. }))
            .map(|(_, e)| e.clone())
            .collect()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    fn at(&self, level: EventLevel) -> Vec<SyncEvent> {
        self.lock()
            .iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, e)| e.clone())
            .collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<(EventLevel, SyncEvent)>> {
        self.events.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl EventSink for MemorySink {
    fn info(&self, event: &SyncEvent) {
        self.lock().push((EventLevel::Info, event.clone()));
    }

    fn error(&self, event: &SyncEvent) {
        self.lock().push((EventLevel::Error, event.clone()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_sink_separates_levels() {
        let sink = MemorySink::new();
        let now = Local::now();

        sink.error(&SyncEvent::Failed {
            task: "inbox".into(),
            error: "boom".into(),
            timestamp: now,
        });
        sink.info(&SyncEvent::Recovered {
            task: "inbox".into(),
            degraded_since: now,
            timestamp: now,
        });

        assert_eq!(sink.errors().len(), 1);
        assert_eq!(sink.infos().len(), 1);
        assert!(sink.transfers().is_empty());
        assert_eq!(sink.events()[0].1.task(), "inbox");

        sink.clear();
        assert!(sink.events().is_empty());
    }

    #[test]
    fn test_capitalize() {
        assert_eq!(capitalize("overwrite"), "Overwrite");
        assert_eq!(capitalize(""), "");
    }
}
