//! "Analysis in flight" marker for an analyzer directory.
//!
//! The engine run itself happens elsewhere. Whoever launches it takes the lock
//! first, so overlapping runs and structural edits during a run are rejected
//! instead of racing on the descriptor and the ordinal-keyed artifacts.

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Contents of the lock file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RunLock {
    pub pid: u32,
    /// Seconds since the Unix epoch.
    pub started_at: u64,
    /// Input file being analyzed, if known.
    pub input: Option<String>,
}

/// Held lock; dropping it releases the lock.
#[derive(Debug)]
pub struct RunTicket {
    path: PathBuf,
    released: bool,
}

impl RunTicket {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn release(mut self) -> Result<()> {
        self.released = true;
        remove_lock(&self.path)
    }
}

impl Drop for RunTicket {
    fn drop(&mut self) {
        if !self.released
            && let Err(err) = remove_lock(&self.path)
        {
            warn!(error = %err, "failed to release analysis lock");
        }
    }
}

/// Take the lock at `path`, failing if another run already holds it.
pub fn acquire_run_lock(path: &Path, input: Option<&str>) -> Result<RunTicket> {
    let lock = RunLock {
        pid: std::process::id(),
        started_at: SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_secs())
            .unwrap_or_default(),
        input: input.map(str::to_string),
    };
    let mut file = match OpenOptions::new().write(true).create_new(true).open(path) {
        Ok(file) => file,
        Err(err) if err.kind() == ErrorKind::AlreadyExists => {
            let holder = read_run_lock(path).ok().flatten();
            return Err(match holder {
                Some(holder) => anyhow!(
                    "analysis already in flight (pid {}, started at {})",
                    holder.pid,
                    holder.started_at
                ),
                None => anyhow!("analysis already in flight ({})", path.display()),
            });
        }
        Err(err) => return Err(err).with_context(|| format!("create {}", path.display())),
    };
    let mut buf = serde_json::to_string_pretty(&lock)?;
    buf.push('\n');
    file.write_all(buf.as_bytes())
        .with_context(|| format!("write {}", path.display()))?;
    debug!(path = %path.display(), pid = lock.pid, "analysis lock taken");
    Ok(RunTicket {
        path: path.to_path_buf(),
        released: false,
    })
}

/// Current lock holder, if any.
pub fn read_run_lock(path: &Path) -> Result<Option<RunLock>> {
    if !path.exists() {
        return Ok(None);
    }
    let contents =
        fs::read_to_string(path).with_context(|| format!("read run lock {}", path.display()))?;
    let lock = serde_json::from_str(&contents)
        .with_context(|| format!("parse run lock {}", path.display()))?;
    Ok(Some(lock))
}

pub fn run_in_flight(path: &Path) -> bool {
    path.exists()
}

/// Remove a lock left behind by a run that died; returns whether one existed.
pub fn clear_run_lock(path: &Path) -> Result<bool> {
    if !path.exists() {
        return Ok(false);
    }
    remove_lock(path)?;
    Ok(true)
}

fn remove_lock(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err).with_context(|| format!("remove {}", path.display())),
    }
}
