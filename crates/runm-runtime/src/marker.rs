//! Marker detection under a container root filesystem.

use std::path::Path;

/// Returns `true` if `rootfs/name` exists.
///
/// Symlinks are followed; a dangling link, a permission error, or any other
/// stat failure counts as absent.
#[must_use]
pub fn has_marker(rootfs: &Path, name: &str) -> bool {
    let path = rootfs.join(name);
    let present = std::fs::metadata(&path).is_ok();
    tracing::debug!(path = %path.display(), present, "checked for marker");
    present
}
