//! Whole-file reads and atomic whole-file writes.

use crate::error::{PatchError, Result};
use std::fs;
use std::io::Write;
use std::path::Path;
use tempfile::Builder;

pub fn read_source(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|source| PatchError::InputUnavailable {
        path: path.to_path_buf(),
        source,
    })
}

/// Replaces `path` with `content` without ever leaving a half-written file.
///
/// The text goes to a temporary file in the same directory, which is then
/// renamed over the original. The original's permissions are carried over.
/// On failure the temporary file is removed and `path` is untouched.
pub fn write_atomic(path: &Path, content: &str) -> Result<()> {
    let write_failure = |source| PatchError::WriteFailure {
        path: path.to_path_buf(),
        source,
    };

    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    let mut tmp = Builder::new()
        .prefix(".sprigfix-")
        .tempfile_in(dir)
        .map_err(write_failure)?;
    tmp.write_all(content.as_bytes()).map_err(write_failure)?;
    tmp.as_file().sync_all().map_err(write_failure)?;

    if let Ok(metadata) = fs::metadata(path) {
        tmp.as_file()
            .set_permissions(metadata.permissions())
            .map_err(write_failure)?;
    }

    tmp.persist(path).map_err(|e| write_failure(e.error))?;
    Ok(())
}
