//! Identity and exit bookkeeping for the controlled process.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use nix::sys::signal::Signal;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::signal::Signaller;

/// Exit code together with the time it was reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExitRecord {
    /// Exit code reported by the reaper.
    pub code: i32,
    /// When the exit was recorded.
    pub exited_at: DateTime<Utc>,
}

/// Paths and process id of the controlled process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessRecord {
    rootfs: PathBuf,
    bundle: PathBuf,
    pid: Option<u32>,
    exit: Option<ExitRecord>,
}

impl ProcessRecord {
    /// Creates a record with no process attached yet.
    #[must_use]
    pub fn new(rootfs: impl Into<PathBuf>, bundle: impl Into<PathBuf>) -> Self {
        Self {
            rootfs: rootfs.into(),
            bundle: bundle.into(),
            pid: None,
            exit: None,
        }
    }

    /// Root filesystem of the container.
    #[must_use]
    pub fn rootfs(&self) -> &Path {
        &self.rootfs
    }

    /// OCI bundle directory.
    #[must_use]
    pub fn bundle(&self) -> &Path {
        &self.bundle
    }

    /// Process id, set once a spawn succeeded.
    #[must_use]
    pub const fn pid(&self) -> Option<u32> {
        self.pid
    }

    /// Last reported exit, if any.
    #[must_use]
    pub const fn exit(&self) -> Option<ExitRecord> {
        self.exit
    }

    /// Attaches the spawned process id. Only the first call takes effect.
    pub(crate) fn set_pid(&mut self, pid: u32) {
        match self.pid {
            None => self.pid = Some(pid),
            Some(existing) => {
                tracing::warn!(existing, ignored = pid, "pid already recorded");
            }
        }
    }

    /// Records the exit code reported for the process.
    pub(crate) fn set_exited(&mut self, code: i32) {
        self.exit = Some(ExitRecord {
            code,
            exited_at: Utc::now(),
        });
        tracing::info!(pid = ?self.pid, code, "process exited");
    }

    /// Signals the process through `signaller`.
    ///
    /// Without a pid there is nothing to signal and this is a no-op.
    ///
    /// # Errors
    ///
    /// Passes through any delivery failure from `signaller`.
    pub(crate) fn kill(&self, signaller: &dyn Signaller, signal: Signal, all: bool) -> Result<()> {
        let Some(pid) = self.pid else {
            tracing::debug!(signal = %signal, "no pid recorded, nothing to signal");
            return Ok(());
        };
        signaller.deliver(pid, signal, all)
    }
}
