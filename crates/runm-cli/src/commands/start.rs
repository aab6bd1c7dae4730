//! `runm-ctl start`: Start a bundle through the created-state controller.

use std::path::PathBuf;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::time::Duration;

use anyhow::Context as _;
use clap::Args;
use nix::sys::signal::Signal;
use nix::sys::wait::{WaitPidFlag, WaitStatus, waitpid};
use nix::unistd::Pid;
use runm_common::config::ShimConfig;
use runm_common::constants::BUNDLE_ROOTFS_DIR;
use runm_runtime::context::Context;
use runm_runtime::error::RuntimeError;
use runm_runtime::init::InitProcess;
use runm_runtime::record::ProcessRecord;
use runm_runtime::signal::{HostSignaller, Signaller};

use crate::output::{self, StartReport};

/// Arguments for the `start` command.
#[derive(Args, Debug)]
pub struct StartArgs {
    /// OCI bundle directory containing `config.json`.
    #[arg(long)]
    pub bundle: PathBuf,

    /// Root filesystem; defaults to `<bundle>/rootfs`.
    #[arg(long)]
    pub rootfs: Option<PathBuf>,

    /// Give up on the launch after this many seconds.
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Stay attached to the auxiliary service until it exits or Ctrl-C.
    #[arg(long)]
    pub wait: bool,
}

/// Executes the `start` command.
///
/// Ctrl-C during the launch cancels it. With `--wait`, a later Ctrl-C
/// sends SIGTERM to the service, another one SIGKILL, and the exit is
/// recorded before deletion.
///
/// # Errors
///
/// Returns an error if the launch fails or the service cannot be signaled.
pub fn execute(args: StartArgs, config: ShimConfig) -> anyhow::Result<()> {
    let rootfs = args
        .rootfs
        .unwrap_or_else(|| args.bundle.join(BUNDLE_ROOTFS_DIR));
    let mut init = InitProcess::new(ProcessRecord::new(rootfs, &args.bundle), config);

    let ctx = args.timeout.map_or_else(Context::background, |secs| {
        Context::with_timeout(Duration::from_secs(secs))
    });
    let (interrupt_tx, interrupt_rx) = mpsc::channel();
    let token = ctx.token();
    ctrlc::set_handler(move || {
        token.cancel();
        let _ = interrupt_tx.send(());
    })
    .context("failed to install Ctrl-C handler")?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to build async runtime")?;
    runtime
        .block_on(init.start(&ctx))
        .map_err(|e| anyhow::anyhow!("{e}"))?;

    output::print_json(&StartReport::from(&init))?;

    if args.wait {
        if let Some(pid) = init.pid() {
            let code = supervise(&mut init, pid, &interrupt_rx, &HostSignaller)?;
            init.set_exited(code);
            init.delete().map_err(|e| anyhow::anyhow!("{e}"))?;
            output::print_json(&StartReport::from(&init))?;
        }
    }
    Ok(())
}

/// Waits for the service to exit and returns its exit code.
///
/// The first interrupt stops the service through the controller with
/// SIGTERM. The controller is stopped by then, so later interrupts go
/// straight to `escalation` as SIGKILL for the service's process group.
fn supervise(
    init: &mut InitProcess,
    pid: u32,
    interrupt: &mpsc::Receiver<()>,
    escalation: &dyn Signaller,
) -> anyhow::Result<i32> {
    let target = Pid::from_raw(i32::try_from(pid).context("pid out of range")?);
    let mut interrupted = false;
    loop {
        match waitpid(target, Some(WaitPidFlag::WNOHANG)).context("waitpid failed")? {
            WaitStatus::Exited(_, code) => return Ok(code),
            WaitStatus::Signaled(_, signal, _) => return Ok(128 + signal as i32),
            _ => {}
        }
        match interrupt.recv_timeout(Duration::from_millis(100)) {
            Ok(()) => {}
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => {
                std::thread::sleep(Duration::from_millis(100));
                continue;
            }
        }
        if interrupted {
            tracing::warn!(pid, "interrupted again, killing auxiliary service");
            match escalation.deliver(pid, Signal::SIGKILL, true) {
                Ok(()) | Err(RuntimeError::ProcessNotFound { .. }) => {}
                Err(e) => return Err(anyhow::anyhow!("{e}")),
            }
        } else {
            tracing::info!(pid, "interrupted, stopping auxiliary service");
            init.kill(Signal::SIGTERM, false)
                .map_err(|e| anyhow::anyhow!("{e}"))?;
            interrupted = true;
        }
    }
}
