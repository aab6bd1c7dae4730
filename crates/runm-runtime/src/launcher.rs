//! Building and starting the auxiliary service process.
//!
//! The auxiliary launcher replaces the container entrypoint when the marker
//! is present: `<launcher> serve --rootfs <rootfs>`, with the controller's
//! environment plus, when a port was negotiated, one extra variable.

use std::ffi::OsString;
use std::os::unix::process::CommandExt;
use std::path::{Path, PathBuf};

use nix::sys::signal::Signal;
use runm_common::config::LauncherLocation;
use runm_common::constants::{LAUNCHER_ROOTFS_FLAG, LAUNCHER_SERVE_SUBCOMMAND, PORT_HOST};

use crate::error::{Result, RuntimeError};
use crate::signal::{HostSignaller, Signaller};

/// Program, arguments and extra environment for one auxiliary launch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchCommand {
    program: PathBuf,
    args: Vec<OsString>,
    env: Vec<(String, String)>,
}

impl LaunchCommand {
    /// Creates the `serve --rootfs <rootfs>` invocation of `program`.
    #[must_use]
    pub fn serve(program: impl Into<PathBuf>, rootfs: &Path) -> Self {
        Self {
            program: program.into(),
            args: vec![
                LAUNCHER_SERVE_SUBCOMMAND.into(),
                LAUNCHER_ROOTFS_FLAG.into(),
                rootfs.as_os_str().to_os_string(),
            ],
            env: Vec::new(),
        }
    }

    /// Adds an environment variable on top of the inherited environment.
    pub fn env(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Exports `127.0.0.1:<port>` under `var`.
    pub fn bind_port(&mut self, var: &str, port: u16) -> &mut Self {
        self.env(var, format!("{PORT_HOST}:{port}"))
    }

    /// Program to execute.
    #[must_use]
    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Arguments after the program.
    #[must_use]
    pub fn args(&self) -> &[OsString] {
        &self.args
    }

    /// Variables added to the inherited environment.
    #[must_use]
    pub fn env_vars(&self) -> &[(String, String)] {
        &self.env
    }

    /// Looks up an added variable.
    #[must_use]
    pub fn env_var(&self, key: &str) -> Option<&str> {
        self.env
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Resolves where the launcher binary lives.
///
/// # Errors
///
/// Returns `ExecutableResolution` if the running executable or its
/// directory cannot be determined.
pub fn resolve_launcher(location: &LauncherLocation) -> Result<PathBuf> {
    match location {
        LauncherLocation::Explicit { path } => Ok(path.clone()),
        LauncherLocation::Sibling { name } => {
            let exe = std::env::current_exe()
                .map_err(|source| RuntimeError::ExecutableResolution { source })?;
            let dir = exe
                .parent()
                .ok_or_else(|| RuntimeError::ExecutableResolution {
                    source: std::io::Error::new(
                        std::io::ErrorKind::NotFound,
                        format!("{} has no parent directory", exe.display()),
                    ),
                })?;
            Ok(dir.join(name))
        }
    }
}

/// Starts auxiliary processes.
pub trait Launcher: Send + Sync {
    /// Starts `command` and returns its process id without waiting for it.
    ///
    /// # Errors
    ///
    /// Returns `Spawn` if the process cannot be started.
    fn spawn(&self, command: &LaunchCommand) -> Result<u32>;

    /// Forcibly stops a process previously returned by [`Launcher::spawn`].
    ///
    /// # Errors
    ///
    /// Passes through signal delivery failures.
    fn terminate(&self, pid: u32) -> Result<()>;
}

/// [`Launcher`] that forks real processes.
///
/// Each child leads its own process group, so its pid doubles as the group
/// id for `kill` with `all` set. The child is not waited on here; reaping
/// belongs to the shim's reaper, which reports the exit back through
/// `set_exited`.
#[derive(Debug, Clone, Copy, Default)]
pub struct HostLauncher;

impl Launcher for HostLauncher {
    fn spawn(&self, command: &LaunchCommand) -> Result<u32> {
        tracing::info!(
            program = %command.program().display(),
            args = ?command.args(),
            "spawning auxiliary process"
        );
        let child = std::process::Command::new(command.program())
            .args(command.args())
            .envs(command.env_vars().iter().map(|(k, v)| (k, v)))
            .process_group(0)
            .spawn()
            .map_err(|source| RuntimeError::Spawn {
                program: command.program().to_path_buf(),
                source,
            })?;
        Ok(child.id())
    }

    fn terminate(&self, pid: u32) -> Result<()> {
        tracing::warn!(pid, "terminating auxiliary process");
        HostSignaller.deliver(pid, Signal::SIGKILL, true)
    }
}
