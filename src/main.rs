//! filerelay command line
//!
//! Validate and inspect the configuration, or run a single cycle by hand.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;

use filerelay::{Config, LocalFileSystem, Scheduler, SyncTask, pidfile};

#[derive(Parser, Debug)]
#[command(name = "filerelay")]
#[command(author, version, about = "Copy files from source folders into destinations by rule")]
struct Cli {
    /// Path to config file
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Validate config file
    Check,

    /// List tasks and their rules
    List,

    /// Run one cycle over all tasks
    Run {
        /// Only show what would be copied
        #[arg(long)]
        dry_run: bool,

        /// Only run the task with this name
        #[arg(short, long)]
        task: Option<String>,
    },

    /// Show daemon status
    Status,

    /// Write a starter config file
    Init {
        /// Replace an existing config
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    filerelay::logging::init(log_level, None)?;

    match cli.command {
        Commands::Check => match load_tasks(cli.config.as_deref()) {
            Ok((config, tasks)) => {
                let rules: usize = tasks.iter().map(|t| t.rules().len()).sum();
                println!("✓ Config is valid");
                println!("  {} tasks", tasks.len());
                println!("  {} rules", rules);
                println!("  every {}s", config.general.interval_secs);
            }
            Err(e) => {
                eprintln!("✗ Config error: {:#}", e);
                std::process::exit(1);
            }
        },
        Commands::List => {
            let (_, tasks) = load_tasks(cli.config.as_deref())?;
            for task in &tasks {
                let limits = task.limits();
                let depth = if limits.recursive {
                    format!("depth {}", limits.max_depth)
                } else {
                    "top level".to_string()
                };
                println!("{} ({}, {})", task.name(), task.source().display(), depth);
                for (i, rule) in task.rules().iter().enumerate() {
                    let condition = rule.condition();
                    println!(
                        "  [{}] -> {}  types: {}  identifiers: {}",
                        i + 1,
                        rule.destination().display(),
                        join_or_any(condition.file_types()),
                        join_or_any(condition.identifiers()),
                    );
                }
            }
        }
        Commands::Run { dry_run, task } => {
            let (config, mut tasks) = load_tasks(cli.config.as_deref())?;
            if let Some(name) = task {
                tasks.retain(|t| t.name() == name);
                if tasks.is_empty() {
                    anyhow::bail!("No task named '{}'", name);
                }
            }

            if dry_run {
                for task in &tasks {
                    println!("{}:", task.name());
                    match task.plan(&LocalFileSystem) {
                        Ok(planned) => {
                            for plan in planned.iter().filter(|p| p.decision.writes()) {
                                println!(
                                    "  [dry-run] {} {} -> {}",
                                    plan.decision,
                                    plan.source.display(),
                                    plan.destination.display()
                                );
                            }
                        }
                        Err(e) => println!("  error: {}", e),
                    }
                }
            } else {
                let mut scheduler = Scheduler::new(tasks, config.interval());
                if let Some(workers) = config.general.max_workers {
                    scheduler = scheduler.with_max_workers(workers);
                }
                let summary = scheduler.run_cycle().await;
                println!(
                    "{} tasks ok, {} failed, {} files transferred",
                    summary.succeeded, summary.failed, summary.transferred
                );
                if summary.failed > 0 {
                    std::process::exit(1);
                }
            }
        }
        Commands::Status => {
            let path = pidfile::pid_path();
            match pidfile::running_daemon(&path) {
                Some(pid) => {
                    println!("filerelayd is running");
                    println!("   PID: {}", pid);
                    println!("   PID file: {}", path.display());
                }
                None => println!("filerelayd is not running"),
            }
        }
        Commands::Init { force } => {
            let path = cli
                .config
                .or_else(Config::default_path)
                .context("Could not determine config path")?;
            if path.exists() && !force {
                anyhow::bail!(
                    "{} already exists (use --force to replace it)",
                    path.display()
                );
            }
            let written = Config::sample().save(Some(&path))?;
            println!("Wrote {}", written.display());
        }
    }

    Ok(())
}

fn load_tasks(path: Option<&std::path::Path>) -> Result<(Config, Vec<SyncTask>)> {
    let config = Config::load(path)?;
    let tasks = config.build_tasks()?;
    Ok((config, tasks))
}

fn join_or_any(values: &[String]) -> String {
    if values.is_empty() {
        "any".to_string()
    } else {
        values.join(", ")
    }
}
