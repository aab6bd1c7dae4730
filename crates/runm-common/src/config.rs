//! Shim configuration model.
//!
//! Everything the created-state controller would otherwise hard-code (the
//! coordination endpoint, where the launcher lives, the marker and the
//! environment variable name) is carried here so it can be substituted.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::constants;
use crate::error::{Result, RunmError};

/// Where the auxiliary launcher binary is found.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum LauncherLocation {
    /// A binary with this name in the directory of the running executable.
    Sibling {
        /// File name of the sibling binary.
        name: String,
    },
    /// An absolute or relative path used as-is.
    Explicit {
        /// Path to the launcher binary.
        path: PathBuf,
    },
}

impl Default for LauncherLocation {
    fn default() -> Self {
        Self::Sibling {
            name: constants::LAUNCHER_NAME.to_string(),
        }
    }
}

/// Root configuration for the shim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShimConfig {
    /// URL of the local port coordination service.
    pub broker_endpoint: String,
    /// Location of the auxiliary launcher.
    pub launcher: LauncherLocation,
    /// Marker entry looked up under the root filesystem.
    pub marker_name: String,
    /// Environment variable that receives `127.0.0.1:<port>`.
    pub port_env_var: String,
}

impl Default for ShimConfig {
    fn default() -> Self {
        Self {
            broker_endpoint: constants::DEFAULT_BROKER_ENDPOINT.to_string(),
            launcher: LauncherLocation::default(),
            marker_name: constants::MARKER_NAME.to_string(),
            port_env_var: constants::PORT_ENV_VAR.to_string(),
        }
    }
}

impl ShimConfig {
    /// Loads a configuration from a JSON file.
    ///
    /// Missing fields take their default values.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, does not parse, or
    /// contains empty names.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| RunmError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks that the names used to build paths and variables are usable.
    ///
    /// # Errors
    ///
    /// Returns `RunmError::Config` if a required value is empty.
    pub fn validate(&self) -> Result<()> {
        if self.broker_endpoint.is_empty() {
            return Err(RunmError::Config {
                message: "broker endpoint is empty".into(),
            });
        }
        if self.marker_name.is_empty() {
            return Err(RunmError::Config {
                message: "marker name is empty".into(),
            });
        }
        if self.port_env_var.is_empty() || self.port_env_var.contains('=') {
            return Err(RunmError::Config {
                message: format!("invalid port variable name: {:?}", self.port_env_var),
            });
        }
        if let LauncherLocation::Sibling { name } = &self.launcher {
            if name.is_empty() || name.contains('/') {
                return Err(RunmError::Config {
                    message: format!("invalid launcher name: {name:?}"),
                });
            }
        }
        Ok(())
    }
}
