// src/export/fs_utils.rs

use crate::errors::{AppError, AppResult};
use std::path::Path;

/// Check that the output file can be written.
///
/// - missing file → Ok
/// - existing file with `force` → Ok (overwritten)
/// - existing file without `force` → Export error, nothing touched
pub(crate) fn ensure_writable(path: &Path, force: bool) -> AppResult<()> {
    if !path.exists() || force {
        return Ok(());
    }

    Err(AppError::Export(format!(
        "'{}' already exists; use --force to overwrite it",
        path.display()
    )))
}
