//! filerelay daemon (filerelayd)
//!
//! Background service that runs the synchronization cycle forever.

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use filerelay::{Config, Scheduler, pidfile};

#[derive(Parser, Debug)]
#[command(name = "filerelayd")]
#[command(author, version, about = "filerelay background daemon")]
struct Cli {
    /// Path to config file
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<std::path::PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Run in the foreground until interrupted
    Run,

    /// Stop a running daemon
    Stop,

    /// Show daemon status
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run => run_daemon(cli.config).await?,
        Commands::Stop => match pidfile::running_daemon(&pidfile::pid_path()) {
            Some(pid) => {
                pidfile::terminate(pid)?;
                println!("Sent stop signal to filerelayd (pid {})", pid);
            }
            None => println!("filerelayd is not running"),
        },
        Commands::Status => match pidfile::running_daemon(&pidfile::pid_path()) {
            Some(pid) => println!("filerelayd is running (pid {})", pid),
            None => println!("filerelayd is not running"),
        },
    }

    Ok(())
}

async fn run_daemon(config_path: Option<std::path::PathBuf>) -> Result<()> {
    let config = Config::load(config_path.as_deref())?;
    let log_file = config
        .general
        .log_file
        .as_deref()
        .map(filerelay::expand_path);
    filerelay::logging::init(&config.general.log_level, log_file.as_deref())?;

    let tasks = config.build_tasks()?;
    info!(
        "Loaded config with {} tasks and {} rules",
        tasks.len(),
        tasks.iter().map(|t| t.rules().len()).sum::<usize>()
    );
    for task in &tasks {
        info!("Source: {} ({})", task.source().display(), task.name());
    }

    let _pid_file = pidfile::PidFile::create(&pidfile::pid_path())?;

    let mut scheduler = Scheduler::new(tasks, config.interval());
    if let Some(workers) = config.general.max_workers {
        scheduler = scheduler.with_max_workers(workers);
    }

    let shutdown = shutdown_signal()?;
    info!("Daemon running. Press Ctrl+C to stop.");
    scheduler.run_until(shutdown).await;
    info!("Shutting down...");

    Ok(())
}

/// Resolves on Ctrl+C, or SIGTERM on Unix.
///
/// The listeners are registered before this returns, so a signal that
/// arrives during the first cycle is not lost.
#[cfg(unix)]
fn shutdown_signal() -> Result<impl Future<Output = ()>> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut interrupt = signal(SignalKind::interrupt()).context("Failed to listen for Ctrl+C")?;
    let mut terminate = signal(SignalKind::terminate()).context("Failed to listen for SIGTERM")?;

    Ok(async move {
        tokio::select! {
            _ = interrupt.recv() => {}
            _ = terminate.recv() => {}
        }
    })
}

#[cfg(not(unix))]
fn shutdown_signal() -> Result<impl Future<Output = ()>> {
    Ok(async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    })
}
