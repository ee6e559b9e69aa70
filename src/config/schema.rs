//! Configuration schema

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// General settings
    #[serde(default)]
    pub general: GeneralConfig,

    /// Source folders and their rules
    #[serde(default, rename = "task")]
    pub tasks: Vec<TaskConfig>,
}

/// General daemon settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Seconds to sleep between cycles
    #[serde(default = "default_interval")]
    pub interval_secs: u64,

    /// Seconds before a still-failing task is reported again
    #[serde(default = "default_error_throttle")]
    pub error_throttle_secs: u64,

    /// Maximum passes running at once (unset = one per task)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_workers: Option<usize>,

    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Also append log output to this file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_file: Option<PathBuf>,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval(),
            error_throttle_secs: default_error_throttle(),
            max_workers: None,
            log_level: default_log_level(),
            log_file: None,
        }
    }
}

fn default_interval() -> u64 {
    1
}

fn default_error_throttle() -> u64 {
    crate::sync::DEFAULT_ERROR_THROTTLE_SECS as u64
}

fn default_log_level() -> String {
    "info".to_string()
}

/// One source folder to synchronize
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskConfig {
    /// Name used in logs (defaults to the source path)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Folder to scan
    pub source: PathBuf,

    /// How many levels of subfolders to enter
    #[serde(default)]
    pub max_depth: usize,

    /// Enter subfolders at all (defaults to `max_depth > 0`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recursive: Option<bool>,

    /// Rules applied to every file found
    #[serde(default, rename = "rule")]
    pub rules: Vec<RuleConfig>,
}

impl TaskConfig {
    /// Name shown in logs
    pub fn display_name(&self) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| self.source.display().to_string())
    }
}

/// Where matching files are copied
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleConfig {
    /// Destination folder
    pub destination: PathBuf,

    /// Extensions without the dot (empty = any)
    #[serde(default)]
    pub file_types: Vec<String>,

    /// Substrings of the file name, any of which must match (empty = any)
    #[serde(default)]
    pub identifiers: Vec<String>,

    /// Create the destination when missing
    #[serde(default = "default_true")]
    pub create_destination: bool,
}

fn default_true() -> bool {
    true
}
