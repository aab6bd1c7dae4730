//! Created-state lifecycle controller for a container's init process.
//!
//! [`InitProcess`] owns the lifecycle [`Status`] and the [`ProcessRecord`].
//! Starting it flips the status to running; if the root filesystem carries
//! the marker, it also launches the auxiliary service in place of the
//! entrypoint, after asking the port broker for a host port.

use std::fmt;

use nix::sys::signal::Signal;
use runm_common::config::ShimConfig;
use runm_common::types::Status;

use crate::broker::{HttpPortBroker, PortAssignment, PortBroker};
use crate::context::Context;
use crate::error::{Result, RuntimeError};
use crate::launcher::{HostLauncher, LaunchCommand, Launcher, resolve_launcher};
use crate::lifecycle::{Effect, Event, Transition, transition};
use crate::record::ProcessRecord;
use crate::signal::{HostSignaller, Signaller};
use crate::{bundle, marker};

/// Lifecycle controller for a single container process.
///
/// Callers serialize access; every mutating operation takes `&mut self`.
pub struct InitProcess {
    status: Status,
    record: ProcessRecord,
    config: ShimConfig,
    broker: Box<dyn PortBroker>,
    launcher: Box<dyn Launcher>,
    signaller: Box<dyn Signaller>,
}

impl InitProcess {
    /// Creates a controller in the `created` status with host collaborators.
    #[must_use]
    pub fn new(record: ProcessRecord, config: ShimConfig) -> Self {
        let broker = HttpPortBroker::new(config.broker_endpoint.clone());
        Self {
            status: Status::Created,
            record,
            config,
            broker: Box::new(broker),
            launcher: Box::new(HostLauncher),
            signaller: Box::new(HostSignaller),
        }
    }

    /// Replaces the port broker client.
    #[must_use]
    pub fn with_broker(mut self, broker: impl PortBroker + 'static) -> Self {
        self.broker = Box::new(broker);
        self
    }

    /// Replaces the process launcher.
    #[must_use]
    pub fn with_launcher(mut self, launcher: impl Launcher + 'static) -> Self {
        self.launcher = Box::new(launcher);
        self
    }

    /// Replaces the signal delivery mechanism.
    #[must_use]
    pub fn with_signaller(mut self, signaller: impl Signaller + 'static) -> Self {
        self.signaller = Box::new(signaller);
        self
    }

    /// Current lifecycle status. Never fails, never mutates.
    #[must_use]
    pub const fn status(&self) -> Status {
        self.status
    }

    /// The owned process record.
    #[must_use]
    pub const fn record(&self) -> &ProcessRecord {
        &self.record
    }

    /// Process id of the auxiliary service, once launched.
    #[must_use]
    pub const fn pid(&self) -> Option<u32> {
        self.record.pid()
    }

    /// Starts the process.
    ///
    /// The status becomes `running` unconditionally before anything else
    /// happens. Without a marker under the root filesystem nothing more is
    /// done here. With it, the auxiliary service is launched and its pid
    /// recorded. A pid already on the record is never replaced, so a repeated
    /// start after a successful launch does not launch again.
    ///
    /// # Errors
    ///
    /// Launch failures are returned unchanged; the status then stays
    /// `running` with no pid, which callers must treat as a failed launch.
    pub async fn start(&mut self, ctx: &Context) -> Result<()> {
        if self.advance("start", Event::Start) != Effect::Launch {
            return Ok(());
        }
        if let Some(pid) = self.record.pid() {
            tracing::debug!(pid, "auxiliary service already launched");
            return Ok(());
        }
        if !marker::has_marker(self.record.rootfs(), &self.config.marker_name) {
            tracing::info!(
                rootfs = %self.record.rootfs().display(),
                "no marker, leaving entrypoint to the runtime"
            );
            return Ok(());
        }

        let pid = self.launch_auxiliary(ctx).await?;
        self.record.set_pid(pid);
        tracing::info!(pid, "auxiliary service started");
        Ok(())
    }

    /// Signals the process and marks it stopped.
    ///
    /// Calling this again once stopped does nothing. With no pid recorded
    /// the status still changes but no signal is sent.
    ///
    /// # Errors
    ///
    /// Passes through signal delivery failures.
    pub fn kill(&mut self, signal: Signal, all: bool) -> Result<()> {
        match self.advance("kill", Event::Kill) {
            Effect::Signal => self.record.kill(self.signaller.as_ref(), signal, all),
            _ => Ok(()),
        }
    }

    /// Records an exit reported by the reaper and forces `stopped`.
    pub fn set_exited(&mut self, code: i32) {
        if let Effect::RecordExit(code) = self.advance("set_exited", Event::Exited(code)) {
            self.record.set_exited(code);
        }
    }

    /// Marks the process deleted. Ordering against kill/exit is the caller's.
    ///
    /// # Errors
    ///
    /// Never fails; no status is checked.
    pub fn delete(&mut self) -> Result<()> {
        let _ = self.advance("delete", Event::Delete);
        Ok(())
    }

    fn advance(&mut self, operation: &'static str, event: Event) -> Effect {
        let Transition { next, effect } = transition(self.status, event);
        tracing::debug!(operation, from = %self.status, to = %next, "status change");
        self.status = next;
        effect
    }

    async fn launch_auxiliary(&self, ctx: &Context) -> Result<u32> {
        let program = resolve_launcher(&self.config.launcher)?;
        let sandbox = bundle::read_sandbox_name(self.record.bundle())?;
        let mut command = LaunchCommand::serve(program, self.record.rootfs());

        match ctx.run(self.broker.request_port(&sandbox)).await? {
            Ok(PortAssignment::Assigned(port)) => {
                let _ = command.bind_port(&self.config.port_env_var, port);
            }
            Ok(PortAssignment::Unassigned { status }) => {
                tracing::info!(sandbox = %sandbox, status, "launching without assigned port");
            }
            Err(RuntimeError::Transport { endpoint, source }) => {
                tracing::warn!(
                    sandbox = %sandbox,
                    endpoint = %endpoint,
                    error = %source,
                    "port broker unreachable, launching without assigned port"
                );
            }
            Err(e) => return Err(e),
        }

        ctx.check()?;
        let pid = self.launcher.spawn(&command)?;
        if let Err(err) = ctx.check() {
            if let Err(kill_err) = self.launcher.terminate(pid) {
                tracing::warn!(pid, error = %kill_err, "failed to terminate cancelled launch");
            }
            return Err(err);
        }
        Ok(pid)
    }
}

impl fmt::Debug for InitProcess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InitProcess")
            .field("status", &self.status)
            .field("record", &self.record)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
