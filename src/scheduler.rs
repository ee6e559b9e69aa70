//! Polling scheduler - runs every task once per cycle, then sleeps

use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use std::task::Poll;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info};

use crate::events::{EventSink, TracingSink};
use crate::fs::{FileSystem, LocalFileSystem};
use crate::sync::{Health, SyncTask};

/// Outcome counts of one cycle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleSummary {
    /// Tasks whose pass completed
    pub succeeded: usize,
    /// Tasks whose pass failed or panicked
    pub failed: usize,
    /// Files copied or overwritten across all tasks
    pub transferred: usize,
}

/// Runs synchronization tasks concurrently on a fixed interval
pub struct Scheduler {
    /// Each task is locked only while lent to a worker
    tasks: Vec<Arc<Mutex<SyncTask>>>,
    fs: Arc<dyn FileSystem>,
    sink: Arc<dyn EventSink>,
    interval: Duration,
    workers: Option<Arc<Semaphore>>,
    cycles: u64,
}

impl Scheduler {
    /// Create a scheduler on the local filesystem that logs through `tracing`
    pub fn new(tasks: Vec<SyncTask>, interval: Duration) -> Self {
        Self {
            tasks: tasks
                .into_iter()
                .map(|t| Arc::new(Mutex::new(t)))
                .collect(),
            fs: Arc::new(LocalFileSystem),
            sink: Arc::new(TracingSink),
            interval,
            workers: None,
            cycles: 0,
        }
    }

    pub fn with_file_system(mut self, fs: Arc<dyn FileSystem>) -> Self {
        self.fs = fs;
        self
    }

    pub fn with_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Cap how many passes run at the same time (default: all of them)
    pub fn with_max_workers(mut self, max_workers: usize) -> Self {
        self.workers = Some(Arc::new(Semaphore::new(max_workers.max(1))));
        self
    }

    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }

    /// Number of completed cycles
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Name and health of every task
    pub fn health(&self) -> Vec<(String, Health)> {
        self.tasks
            .iter()
            .map(|t| {
                let task = t.lock().unwrap_or_else(PoisonError::into_inner);
                (task.name().to_string(), task.health())
            })
            .collect()
    }

    /// Run every task's pass concurrently and wait for all of them
    pub async fn run_cycle(&mut self) -> CycleSummary {
        let mut set = JoinSet::new();

        for task in &self.tasks {
            let task = Arc::clone(task);
            let fs = Arc::clone(&self.fs);
            let sink = Arc::clone(&self.sink);
            let permit = match &self.workers {
                Some(workers) => Arc::clone(workers).acquire_owned().await.ok(),
                None => None,
            };

            set.spawn_blocking(move || {
                let _permit = permit;
                let mut task = task.lock().unwrap_or_else(PoisonError::into_inner);
                task.run(fs.as_ref(), sink.as_ref())
                    .map(|report| report.transferred())
                    .ok()
            });
        }

        let mut summary = CycleSummary::default();
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok(Some(transferred)) => {
                    summary.succeeded += 1;
                    summary.transferred += transferred;
                }
                Ok(None) => summary.failed += 1,
                Err(e) => {
                    summary.failed += 1;
                    error!("Synchronization pass panicked: {}", e);
                }
            }
        }

        self.cycles += 1;
        debug!(
            "Cycle {} done: {} ok, {} failed, {} files transferred",
            self.cycles, summary.succeeded, summary.failed, summary.transferred
        );
        summary
    }

    /// Run cycles until `shutdown` resolves.
    ///
    /// `shutdown` is polled once before the first cycle so signal listeners
    /// are registered by then. After that it is only observed while
    /// sleeping, so a started cycle always finishes.
    pub async fn run_until<F>(&mut self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        let already_stopped =
            std::future::poll_fn(|cx| Poll::Ready(shutdown.as_mut().poll(cx).is_ready())).await;
        if already_stopped {
            info!("Shutdown requested before the first cycle");
            return;
        }

        info!(
            "Synchronizing {} task(s) every {:?}",
            self.tasks.len(),
            self.interval
        );

        loop {
            self.run_cycle().await;

            tokio::select! {
                _ = &mut shutdown => {
                    info!("Stopping after {} cycle(s)", self.cycles);
                    break;
                }
                _ = tokio::time::sleep(self.interval) => {}
            }
        }
    }

    /// Run cycles forever
    pub async fn run(&mut self) {
        self.run_until(std::future::pending()).await;
    }
}
