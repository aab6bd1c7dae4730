//! `runm-ctl port`: Ask the port broker for a sandbox's port.

use std::time::Duration;

use anyhow::Context as _;
use clap::Args;
use runm_common::config::ShimConfig;
use runm_common::types::SandboxName;
use runm_runtime::broker::{HttpPortBroker, PortBroker};
use runm_runtime::context::Context;

use crate::output::{self, PortReport};

/// Arguments for the `port` command.
#[derive(Args, Debug)]
pub struct PortArgs {
    /// Sandbox name sent to the broker.
    #[arg(long, default_value = "")]
    pub sandbox: String,

    /// Give up after this many seconds.
    #[arg(long, default_value_t = 10)]
    pub timeout: u64,
}

/// Executes the `port` command.
///
/// Performs a single request; there is no retry.
///
/// # Errors
///
/// Returns an error if the broker is unreachable, times out, or replies
/// with an unusable body.
pub fn execute(args: PortArgs, config: &ShimConfig) -> anyhow::Result<()> {
    let broker = HttpPortBroker::new(config.broker_endpoint.clone());
    let timeout = Duration::from_secs(args.timeout);
    let sandbox = SandboxName::new(args.sandbox);
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to build async runtime")?;

    let assignment = runtime
        .block_on(async {
            let ctx = Context::with_timeout(timeout);
            ctx.run(broker.request_port(&sandbox)).await?
        })
        .map_err(|e| anyhow::anyhow!("{e}"))?;

    output::print_json(&PortReport::new(
        broker.endpoint(),
        &sandbox,
        assignment,
        &config.port_env_var,
    ))
}
