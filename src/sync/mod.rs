//! Synchronization tasks - one source folder and the rules applied to it

mod walk;

pub use walk::{WalkLimits, walk};

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, TimeDelta};
use tracing::{debug, trace};

use crate::error::SyncError;
use crate::events::{EventSink, SyncEvent};
use crate::fs::FileSystem;
use crate::rules::{CopyDecision, PlannedCopy, Rule, apply, decide};

/// Default window, in seconds, between repeated reports of a failing task
pub const DEFAULT_ERROR_THROTTLE_SECS: i64 = 300;

/// Health of a task as seen after its most recent pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Health {
    Healthy,
    Degraded {
        /// When the current run of failures started
        since: DateTime<Local>,
        /// When the failure was last written to the log
        last_reported: DateTime<Local>,
    },
}

impl Health {
    pub fn is_healthy(&self) -> bool {
        matches!(self, Health::Healthy)
    }
}

/// Counts from one successful pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassReport {
    pub copied: usize,
    pub overwritten: usize,
    pub skipped: usize,
}

impl PassReport {
    /// Number of files written to a destination
    pub fn transferred(&self) -> usize {
        self.copied + self.overwritten
    }

    fn record(&mut self, decision: CopyDecision) {
        match decision {
            CopyDecision::Copy => self.copied += 1,
            CopyDecision::Overwrite => self.overwritten += 1,
            CopyDecision::Skip => self.skipped += 1,
        }
    }
}

/// Synchronizes one source directory against its rules
#[derive(Debug, Clone)]
pub struct SyncTask {
    name: String,
    source: PathBuf,
    limits: WalkLimits,
    rules: Vec<Rule>,
    error_throttle: TimeDelta,
    health: Health,
}

impl SyncTask {
    /// Create a task that only looks at the top level of `source`
    pub fn new(name: impl Into<String>, source: impl Into<PathBuf>, rules: Vec<Rule>) -> Self {
        Self {
            name: name.into(),
            source: source.into(),
            limits: WalkLimits {
                recursive: false,
                max_depth: 0,
            },
            rules,
            error_throttle: TimeDelta::seconds(DEFAULT_ERROR_THROTTLE_SECS),
            health: Health::Healthy,
        }
    }

    /// Set the depth limit; recursion is enabled when it is above zero
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.limits = WalkLimits {
            recursive: max_depth > 0,
            max_depth,
        };
        self
    }

    /// Override whether subdirectories of the source are entered
    pub fn with_recursive(mut self, recursive: bool) -> Self {
        self.limits.recursive = recursive;
        self
    }

    /// Window during which a still-failing task is not reported again
    pub fn with_error_throttle(mut self, throttle: TimeDelta) -> Self {
        self.error_throttle = throttle;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn limits(&self) -> WalkLimits {
        self.limits
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn health(&self) -> Health {
        self.health
    }

    /// When the current failure was last reported, if the task is degraded
    pub fn last_failure_time(&self) -> Option<DateTime<Local>> {
        match self.health {
            Health::Healthy => None,
            Health::Degraded { last_reported, .. } => Some(last_reported),
        }
    }

    /// Run one pass and report the outcome to `sink`
    pub fn run(
        &mut self,
        fs: &dyn FileSystem,
        sink: &dyn EventSink,
    ) -> Result<PassReport, SyncError> {
        self.run_at(fs, sink, Local::now())
    }

    /// Like [`SyncTask::run`], with `now` used for failure throttling
    pub fn run_at(
        &mut self,
        fs: &dyn FileSystem,
        sink: &dyn EventSink,
        now: DateTime<Local>,
    ) -> Result<PassReport, SyncError> {
        let result = self.pass(fs, sink);

        match (&result, self.health) {
            (Ok(report), Health::Healthy) => {
                trace!(
                    "Pass of '{}' finished: {} copied, {} overwritten, {} unchanged",
                    self.name, report.copied, report.overwritten, report.skipped
                );
            }
            (Ok(_), Health::Degraded { since, .. }) => {
                sink.info(&SyncEvent::Recovered {
                    task: self.name.clone(),
                    degraded_since: since,
                    timestamp: now,
                });
                self.health = Health::Healthy;
            }
            (Err(e), Health::Healthy) => {
                self.report_failure(sink, e, now);
                self.health = Health::Degraded {
                    since: now,
                    last_reported: now,
                };
            }
            (Err(e), Health::Degraded {
                since,
                last_reported,
            }) => {
                if now - last_reported > self.error_throttle {
                    self.report_failure(sink, e, now);
                    self.health = Health::Degraded {
                        since,
                        last_reported: now,
                    };
                } else {
                    debug!("'{}' still failing: {}", self.name, e);
                }
            }
        }

        result
    }

    /// List what a pass would do without writing anything
    pub fn plan(&self, fs: &dyn FileSystem) -> Result<Vec<PlannedCopy>, SyncError> {
        let mut planned = Vec::new();
        let destinations = self.destinations();
        walk(fs, &self.source, self.limits, &destinations, |file_name, dir| {
            let name = file_name.to_string_lossy();
            let source = dir.join(file_name);
            for rule in self.rules.iter().filter(|r| r.matches(&name)) {
                planned.push(decide(fs, &source, rule, file_name)?);
            }
            Ok(())
        })?;
        Ok(planned)
    }

    /// One traversal-and-copy pass; the first error aborts the rest of it
    fn pass(&self, fs: &dyn FileSystem, sink: &dyn EventSink) -> Result<PassReport, SyncError> {
        let mut report = PassReport::default();
        let destinations = self.destinations();

        walk(fs, &self.source, self.limits, &destinations, |file_name, dir| {
            let name = file_name.to_string_lossy();
            let source = dir.join(file_name);

            for rule in self.rules.iter().filter(|r| r.matches(&name)) {
                let plan = decide(fs, &source, rule, file_name)?;
                apply(fs, &plan, rule)?;
                report.record(plan.decision);

                if plan.decision.writes() {
                    sink.info(&SyncEvent::Transferred {
                        task: self.name.clone(),
                        action: plan.decision,
                        file_name: name.to_string(),
                        source_directory: dir.to_path_buf(),
                        destination_directory: rule.destination().to_path_buf(),
                        timestamp: Local::now(),
                    });
                }
            }
            Ok(())
        })?;

        Ok(report)
    }

    /// Destination folders are never scanned, even when they sit inside the source
    fn destinations(&self) -> Vec<&Path> {
        self.rules.iter().map(|r| r.destination()).collect()
    }

    fn report_failure(&self, sink: &dyn EventSink, error: &SyncError, now: DateTime<Local>) {
        sink.error(&SyncEvent::Failed {
            task: self.name.clone(),
            error: error.to_string(),
            timestamp: now,
        });
    }
}
