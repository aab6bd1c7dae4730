//! `runm-ctl probe`: Report whether a root filesystem selects the auxiliary launch.

use std::path::PathBuf;

use clap::Args;
use runm_common::config::ShimConfig;
use runm_runtime::marker;

use crate::output::{self, ProbeReport};

/// Arguments for the `probe` command.
#[derive(Args, Debug)]
pub struct ProbeArgs {
    /// Root filesystem to inspect.
    #[arg(long)]
    pub rootfs: PathBuf,
}

/// Executes the `probe` command.
///
/// # Errors
///
/// Returns an error if the report cannot be written.
pub fn execute(args: ProbeArgs, config: &ShimConfig) -> anyhow::Result<()> {
    let present = marker::has_marker(&args.rootfs, &config.marker_name);
    output::print_json(&ProbeReport {
        marker: args.rootfs.join(&config.marker_name),
        present,
    })
}
