//! Filesystem and path helpers
//!
//! - [`fs`] - cancellable, retrying reads and sorted directory listings

pub mod fs;

use std::path::Path;

/// Render a relative path with forward slashes on every platform.
///
/// Template identifiers and report paths use this form so output does not
/// depend on the host's separator.
#[must_use]
pub fn normalize_path_for_storage(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
