//! Fixed names and addresses shared between the shim and the auxiliary service.

/// Entry under the root filesystem whose presence selects the auxiliary launch.
pub const MARKER_NAME: &str = "model";

/// File name of the auxiliary launcher, expected next to the shim executable.
pub const LAUNCHER_NAME: &str = "runm";

/// Subcommand passed to the launcher to start the long-running service.
pub const LAUNCHER_SERVE_SUBCOMMAND: &str = "serve";

/// Flag that carries the container root filesystem to the launcher.
pub const LAUNCHER_ROOTFS_FLAG: &str = "--rootfs";

/// Default address of the local port coordination service.
pub const DEFAULT_BROKER_ENDPOINT: &str = "http://localhost:9090/";

/// Environment variable through which the negotiated port reaches the launcher.
pub const PORT_ENV_VAR: &str = "OLLAMA_HOST";

/// Loopback host the negotiated port is bound on.
pub const PORT_HOST: &str = "127.0.0.1";

/// OCI annotation holding the name of the sandbox the container belongs to.
pub const SANDBOX_NAME_ANNOTATION: &str = "io.kubernetes.cri.sandbox-name";

/// Name of the OCI runtime configuration file inside a bundle.
pub const OCI_CONFIG_FILENAME: &str = "config.json";

/// Default root filesystem directory inside a bundle.
pub const BUNDLE_ROOTFS_DIR: &str = "rootfs";
