//! Report types and JSON output for CLI commands.

use std::path::PathBuf;

use runm_common::constants::PORT_HOST;
use runm_common::types::{SandboxName, Status};
use runm_runtime::broker::PortAssignment;
use runm_runtime::init::InitProcess;
use serde::Serialize;

/// Controller state after `start`.
#[derive(Debug, Serialize)]
pub struct StartReport {
    /// Lifecycle status.
    pub status: Status,
    /// Auxiliary service pid, if one was launched.
    pub pid: Option<u32>,
    /// Recorded exit code, if the service exited.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
}

impl From<&InitProcess> for StartReport {
    fn from(init: &InitProcess) -> Self {
        Self {
            status: init.status(),
            pid: init.pid(),
            exit_code: init.record().exit().map(|e| e.code),
        }
    }
}

/// Result of a marker probe.
#[derive(Debug, Serialize)]
pub struct ProbeReport {
    /// Path that was checked.
    pub marker: PathBuf,
    /// Whether it exists.
    pub present: bool,
}

/// Result of a broker request.
#[derive(Debug, Serialize)]
pub struct PortReport {
    /// Broker endpoint queried.
    pub endpoint: String,
    /// Sandbox the port was requested for.
    pub sandbox: SandboxName,
    /// Assigned host port.
    pub port: Option<u16>,
    /// HTTP status when no port was assigned.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    /// Variable the launcher would receive.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub env: Option<String>,
}

impl PortReport {
    /// Builds the report for `assignment`.
    #[must_use]
    pub fn new(
        endpoint: &str,
        sandbox: &SandboxName,
        assignment: PortAssignment,
        port_env_var: &str,
    ) -> Self {
        let (port, status) = match assignment {
            PortAssignment::Assigned(port) => (Some(port), None),
            PortAssignment::Unassigned { status } => (None, Some(status)),
        };
        Self {
            endpoint: endpoint.to_string(),
            sandbox: sandbox.clone(),
            port,
            status,
            env: port.map(|p| format!("{port_env_var}={PORT_HOST}:{p}")),
        }
    }
}

/// Writes `value` to stdout as pretty JSON.
///
/// # Errors
///
/// Returns an error if serialization fails.
#[allow(clippy::print_stdout)]
pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
