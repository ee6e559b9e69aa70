//! Configuration management

mod schema;

pub use schema::{Config, GeneralConfig, RuleConfig, TaskConfig};

use anyhow::{Context, Result};
use chrono::TimeDelta;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::paths::expand_path;
use crate::rules::Rule;
use crate::sync::SyncTask;

/// A configuration that parsed but cannot be run
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("general.interval_secs must be at least 1")]
    ZeroInterval,

    #[error("general.max_workers must be at least 1")]
    ZeroWorkers,

    #[error("general.error_throttle_secs is out of range ({0})")]
    ThrottleOutOfRange(u64),

    #[error("task #{index} has an empty source path")]
    EmptySource { index: usize },

    #[error("task name '{0}' is used more than once")]
    DuplicateName(String),

    #[error("task '{task}': rule #{index} has an empty destination")]
    EmptyDestination { task: String, index: usize },

    #[error("task '{task}': rule #{index} has an empty entry in {field}")]
    EmptyFilter {
        task: String,
        index: usize,
        field: &'static str,
    },

    #[error("task '{task}': rule #{index} copies into its own source folder {}", path.display())]
    DestinationIsSource {
        task: String,
        index: usize,
        path: PathBuf,
    },
}

impl Config {
    /// Load configuration from a file or the default location
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = path
            .map(PathBuf::from)
            .or_else(Self::default_path)
            .context("Could not determine config path")?;

        if !config_path.exists() {
            anyhow::bail!(
                "No config found at {} (create one with `filerelay init`)",
                config_path.display()
            );
        }

        let content = std::fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config from {}", config_path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config from {}", config_path.display()))?;

        Ok(config)
    }

    /// Save configuration to a file (with advisory file locking)
    pub fn save(&self, path: Option<&Path>) -> Result<PathBuf> {
        let config_path = path
            .map(PathBuf::from)
            .or_else(Self::default_path)
            .context("Could not determine config path")?;

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;

        let lock_path = config_path.with_extension("toml.lock");
        let lock_file = std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&lock_path)
            .with_context(|| format!("Failed to create lock file: {}", lock_path.display()))?;

        use fs2::FileExt;
        lock_file
            .lock_exclusive()
            .context("Failed to acquire config file lock")?;

        let result = std::fs::write(&config_path, content)
            .with_context(|| format!("Failed to write config to {}", config_path.display()));

        let _ = lock_file.unlock();
        let _ = std::fs::remove_file(&lock_path);

        result.map(|_| config_path)
    }

    /// Get the default config file path
    pub fn default_path() -> Option<PathBuf> {
        let config_base =
            dirs::config_dir().or_else(|| dirs::home_dir().map(|d| d.join(".config")))?;
        Some(config_base.join("filerelay").join("config.toml"))
    }

    /// A small starter configuration written by `filerelay init`
    pub fn sample() -> Self {
        Self {
            general: GeneralConfig::default(),
            tasks: vec![TaskConfig {
                name: Some("pdfs".to_string()),
                source: PathBuf::from("~/Downloads"),
                max_depth: 1,
                recursive: None,
                rules: vec![RuleConfig {
                    destination: PathBuf::from("~/Documents/PDF"),
                    file_types: vec!["pdf".to_string()],
                    identifiers: Vec::new(),
                    create_destination: true,
                }],
            }],
        }
    }

    /// Time to sleep between cycles
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.general.interval_secs)
    }

    /// Window between repeated reports of a failing task
    pub fn error_throttle(&self) -> Result<TimeDelta, ConfigError> {
        let secs = self.general.error_throttle_secs;
        i64::try_from(secs)
            .ok()
            .and_then(TimeDelta::try_seconds)
            .ok_or(ConfigError::ThrottleOutOfRange(secs))
    }

    /// Check everything that parsing alone does not guarantee
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.general.interval_secs == 0 {
            return Err(ConfigError::ZeroInterval);
        }
        if self.general.max_workers == Some(0) {
            return Err(ConfigError::ZeroWorkers);
        }
        self.error_throttle()?;

        let mut names = HashSet::new();
        for (i, task) in self.tasks.iter().enumerate() {
            if task.source.as_os_str().is_empty() {
                return Err(ConfigError::EmptySource { index: i + 1 });
            }

            let name = task.display_name();
            if !names.insert(name.clone()) {
                return Err(ConfigError::DuplicateName(name));
            }

            let source = expand_path(&task.source);
            for (j, rule) in task.rules.iter().enumerate() {
                let index = j + 1;
                if rule.destination.as_os_str().is_empty() {
                    return Err(ConfigError::EmptyDestination {
                        task: name,
                        index,
                    });
                }
                for (field, values) in [
                    ("file_types", &rule.file_types),
                    ("identifiers", &rule.identifiers),
                ] {
                    if values.iter().any(|v| v.trim().trim_start_matches('.').is_empty()) {
                        return Err(ConfigError::EmptyFilter {
                            task: name,
                            index,
                            field,
                        });
                    }
                }
                let destination = expand_path(&rule.destination);
                if destination == source {
                    return Err(ConfigError::DestinationIsSource {
                        task: name,
                        index,
                        path: destination,
                    });
                }
            }
        }

        Ok(())
    }

    /// Validate and turn the task descriptors into runnable tasks
    pub fn build_tasks(&self) -> Result<Vec<SyncTask>, ConfigError> {
        self.validate()?;

        let throttle = self.error_throttle()?;
        let tasks = self
            .tasks
            .iter()
            .map(|task| {
                let rules = task
                    .rules
                    .iter()
                    .map(|rule| {
                        Rule::new(
                            expand_path(&rule.destination),
                            &rule.file_types,
                            &rule.identifiers,
                        )
                        .with_create_destination(rule.create_destination)
                    })
                    .collect();

                let mut built =
                    SyncTask::new(task.display_name(), expand_path(&task.source), rules)
                        .with_max_depth(task.max_depth)
                        .with_error_throttle(throttle);
                if let Some(recursive) = task.recursive {
                    built = built.with_recursive(recursive);
                }
                built
            })
            .collect();

        Ok(tasks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(toml: &str) -> Config {
        toml::from_str(toml).unwrap()
    }

    #[test]
    fn test_build_tasks() {
        let config = parse(
            r#"
            [general]
            error_throttle_secs = 30

            [[task]]
            name = "docs"
            source = "/data/docs"
            max_depth = 2

            [[task.rule]]
            destination = "/data/out"
            file_types = ["PDF"]
            identifiers = ["Cad"]

            [[task]]
            source = "/data/flat"
            max_depth = 4
            recursive = false
        "#,
        );

        let tasks = config.build_tasks().unwrap();
        assert_eq!(tasks.len(), 2);

        assert_eq!(tasks[0].name(), "docs");
        assert!(tasks[0].limits().recursive);
        assert_eq!(tasks[0].limits().max_depth, 2);
        let rule = &tasks[0].rules()[0];
        assert_eq!(rule.destination(), Path::new("/data/out"));
        assert_eq!(rule.condition().file_types(), ["pdf"]);
        assert!(rule.matches("invoice_CAD.pdf"));

        assert_eq!(tasks[1].name(), "/data/flat");
        assert!(!tasks[1].limits().recursive);
    }

    #[test]
    fn test_rejects_zero_interval() {
        let config = parse(
            r#"
            [general]
            interval_secs = 0
        "#,
        );
        assert_eq!(config.validate(), Err(ConfigError::ZeroInterval));
    }

    #[test]
    fn test_rejects_out_of_range_throttle() {
        // 1e17 seconds parses as a TOML integer but does not fit a TimeDelta
        let mut config = parse(
            r#"
            [general]
            error_throttle_secs = 100000000000000000

            [[task]]
            source = "/x"
        "#,
        );
        assert_eq!(
            config.build_tasks().unwrap_err(),
            ConfigError::ThrottleOutOfRange(100_000_000_000_000_000)
        );

        config.general.error_throttle_secs = u64::MAX;
        assert_eq!(
            config.validate(),
            Err(ConfigError::ThrottleOutOfRange(u64::MAX))
        );

        config.general.error_throttle_secs = 86_400;
        assert_eq!(config.error_throttle(), Ok(TimeDelta::days(1)));
    }

    #[test]
    fn test_rejects_duplicate_names() {
        let config = parse(
            r#"
            [[task]]
            name = "a"
            source = "/x"

            [[task]]
            name = "a"
            source = "/y"
        "#,
        );
        assert_eq!(
            config.validate(),
            Err(ConfigError::DuplicateName("a".to_string()))
        );
    }

    #[test]
    fn test_rejects_blank_filters() {
        let config = parse(
            r#"
            [[task]]
            source = "/x"

            [[task.rule]]
            destination = "/y"
            file_types = ["pdf", " "]
        "#,
        );
        assert_eq!(
            config.validate(),
            Err(ConfigError::EmptyFilter {
                task: "/x".to_string(),
                index: 1,
                field: "file_types",
            })
        );
    }

    #[test]
    fn test_rejects_destination_equal_to_source() {
        let config = parse(
            r#"
            [[task]]
            name = "loop"
            source = "/data/in"

            [[task.rule]]
            destination = "/data/in"
        "#,
        );
        assert!(matches!(
            config.validate(),
            Err(ConfigError::DestinationIsSource { index: 1, .. })
        ));
    }

    #[test]
    fn test_load_missing_file_fails() {
        let tmp = tempfile::tempdir().unwrap();
        let err = Config::load(Some(&tmp.path().join("nope.toml"))).unwrap_err();
        assert!(err.to_string().contains("No config found"));
    }

    #[test]
    fn test_save_then_load_sample() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("nested").join("config.toml");

        let written = Config::sample().save(Some(&path)).unwrap();
        assert_eq!(written, path);
        assert!(!path.with_extension("toml.lock").exists());

        let loaded = Config::load(Some(&path)).unwrap();
        assert_eq!(loaded.tasks.len(), 1);
        assert_eq!(loaded.tasks[0].rules[0].file_types, ["pdf"]);
        loaded.validate().unwrap();
    }
}
