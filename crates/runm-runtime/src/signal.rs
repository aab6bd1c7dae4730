//! Signal delivery to the controlled process.

use nix::errno::Errno;
use nix::sys::signal::{Signal, kill, killpg};
use nix::unistd::Pid;

use crate::error::{Result, RuntimeError};

/// Delivers signals to OS processes.
pub trait Signaller: Send + Sync {
    /// Sends `signal` to `pid`, or to its process group when `all` is set.
    ///
    /// # Errors
    ///
    /// Returns `ProcessNotFound` if the target is gone, `Signal` otherwise.
    fn deliver(&self, pid: u32, signal: Signal, all: bool) -> Result<()>;
}

/// [`Signaller`] backed by `kill(2)` and `killpg(3)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct HostSignaller;

impl Signaller for HostSignaller {
    fn deliver(&self, pid: u32, signal: Signal, all: bool) -> Result<()> {
        let raw = i32::try_from(pid).map_err(|_| RuntimeError::Signal {
            pid,
            source: Errno::EINVAL,
        })?;
        let target = Pid::from_raw(raw);
        let delivered = if all {
            killpg(target, signal)
        } else {
            kill(target, signal)
        };
        match delivered {
            Ok(()) => {
                tracing::debug!(pid, signal = %signal, all, "signal delivered");
                Ok(())
            }
            Err(Errno::ESRCH) => Err(RuntimeError::ProcessNotFound { pid }),
            Err(source) => Err(RuntimeError::Signal { pid, source }),
        }
    }
}
