//! Reading the OCI bundle materialized on disk.

use std::path::{Path, PathBuf};

use oci_spec::runtime::Spec;
use runm_common::constants::{OCI_CONFIG_FILENAME, SANDBOX_NAME_ANNOTATION};
use runm_common::types::SandboxName;

use crate::error::{Result, RuntimeError};

/// Returns the path of the OCI configuration inside `bundle`.
#[must_use]
pub fn config_path(bundle: &Path) -> PathBuf {
    bundle.join(OCI_CONFIG_FILENAME)
}

/// Reads the bundle's OCI configuration.
///
/// # Errors
///
/// Returns `ConfigRead` if the file is missing or not a valid runtime spec.
pub fn read_spec(bundle: &Path) -> Result<Spec> {
    let path = config_path(bundle);
    Spec::load(&path).map_err(|source| RuntimeError::ConfigRead { path, source })
}

/// Extracts the sandbox name annotation, empty when absent.
#[must_use]
pub fn sandbox_name(spec: &Spec) -> SandboxName {
    spec.annotations()
        .as_ref()
        .and_then(|annotations| annotations.get(SANDBOX_NAME_ANNOTATION))
        .map(SandboxName::new)
        .unwrap_or_default()
}

/// Reads the bundle's configuration and returns its sandbox name.
///
/// # Errors
///
/// Returns `ConfigRead` if the configuration cannot be loaded.
pub fn read_sandbox_name(bundle: &Path) -> Result<SandboxName> {
    let spec = read_spec(bundle)?;
    let name = sandbox_name(&spec);
    if name.is_empty() {
        tracing::debug!(bundle = %bundle.display(), "no sandbox name annotation");
    } else {
        tracing::debug!(bundle = %bundle.display(), sandbox = %name, "read sandbox name");
    }
    Ok(name)
}
