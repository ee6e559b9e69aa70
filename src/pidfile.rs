//! Pid file of the running daemon

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Default pid file location
pub fn pid_path() -> PathBuf {
    dirs::runtime_dir()
        .or_else(dirs::state_dir)
        .unwrap_or_else(std::env::temp_dir)
        .join("filerelayd.pid")
}

/// Read the pid stored in `path`, if any
pub fn read_pid(path: &Path) -> Option<u32> {
    std::fs::read_to_string(path).ok()?.trim().parse().ok()
}

/// Whether a process with this pid is alive
#[cfg(unix)]
pub fn is_running(pid: u32) -> bool {
    let Ok(pid) = libc::pid_t::try_from(pid) else {
        return false;
    };
    unsafe { libc::kill(pid, 0) == 0 }
}

#[cfg(not(unix))]
pub fn is_running(_pid: u32) -> bool {
    false
}

/// Pid of a live daemon recorded at `path`
pub fn running_daemon(path: &Path) -> Option<u32> {
    read_pid(path).filter(|pid| is_running(*pid))
}

/// Ask the daemon to stop (SIGTERM)
#[cfg(unix)]
pub fn terminate(pid: u32) -> Result<()> {
    let raw = libc::pid_t::try_from(pid).context("pid out of range")?;
    if unsafe { libc::kill(raw, libc::SIGTERM) } != 0 {
        return Err(std::io::Error::last_os_error())
            .with_context(|| format!("Failed to signal process {}", pid));
    }
    Ok(())
}

#[cfg(not(unix))]
pub fn terminate(_pid: u32) -> Result<()> {
    anyhow::bail!("Stopping the daemon is only supported on Unix")
}

/// Pid file owned by this process; removed on drop
#[derive(Debug)]
pub struct PidFile {
    path: PathBuf,
}

impl PidFile {
    /// Write the current pid, refusing if another live daemon holds the file
    pub fn create(path: &Path) -> Result<Self> {
        if let Some(pid) = running_daemon(path) {
            anyhow::bail!("filerelayd is already running (pid {})", pid);
        }
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        std::fs::write(path, std::process::id().to_string())
            .with_context(|| format!("Failed to write pid file {}", path.display()))?;
        Ok(Self {
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for PidFile {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}
