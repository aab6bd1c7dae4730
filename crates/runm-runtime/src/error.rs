//! Error type for lifecycle operations and the auxiliary launch protocol.

use std::path::PathBuf;

use thiserror::Error;

/// Errors produced by the lifecycle controller and its collaborators.
///
/// Every variant raised while launching the auxiliary service is returned
/// unchanged from `start`; nothing here is retried.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// The directory of the running executable could not be determined.
    #[error("cannot resolve launcher location: {source}")]
    ExecutableResolution {
        /// Underlying I/O error from `current_exe`.
        source: std::io::Error,
    },

    /// The bundle's OCI configuration could not be read.
    #[error("cannot read OCI config {path}: {source}")]
    ConfigRead {
        /// Path of the configuration file.
        path: PathBuf,
        /// Underlying parse or I/O error.
        source: oci_spec::OciSpecError,
    },

    /// The coordination request could not be built.
    #[error("cannot build port request for {endpoint}: {source}")]
    RequestConstruction {
        /// Endpoint the request was addressed to.
        endpoint: String,
        /// Underlying client error.
        source: reqwest::Error,
    },

    /// The coordination service could not be reached.
    #[error("port broker at {endpoint} unreachable: {source}")]
    Transport {
        /// Endpoint the request was addressed to.
        endpoint: String,
        /// Underlying client error.
        source: reqwest::Error,
    },

    /// A successful coordination response did not carry a usable port.
    #[error("invalid port broker response: {message}")]
    ResponseDecode {
        /// Description of the decoding failure.
        message: String,
    },

    /// The auxiliary process could not be started.
    #[error("failed to spawn {program}: {source}")]
    Spawn {
        /// Program that failed to start.
        program: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The caller cancelled the operation.
    #[error("operation cancelled")]
    Cancelled,

    /// The caller's deadline passed before the operation finished.
    #[error("deadline exceeded")]
    DeadlineExceeded,

    /// Delivering a signal to the process failed.
    #[error("failed to signal pid {pid}: {source}")]
    Signal {
        /// Target process id.
        pid: u32,
        /// Underlying errno.
        source: nix::Error,
    },

    /// The target process no longer exists.
    #[error("process already finished: pid {pid}")]
    ProcessNotFound {
        /// Target process id.
        pid: u32,
    },
}

/// Convenience alias for runtime results.
pub type Result<T> = std::result::Result<T, RuntimeError>;
