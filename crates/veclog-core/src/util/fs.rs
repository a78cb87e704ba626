//! Filesystem helpers for store files.

use std::fs;
use std::io;
use std::path::Path;

/// Ensures the parent directory of `path` exists, creating it if needed.
///
/// # Errors
///
/// Returns an error if directory creation fails.
pub fn ensure_parent_dir(path: &Path) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

/// Returns true if a file or directory exists at `path`.
#[must_use]
pub fn file_exists(path: &Path) -> bool {
    path.exists()
}

/// Returns the size of the file at `path` in bytes.
///
/// # Errors
///
/// Returns an error if the file cannot be stat'ed.
pub fn file_size(path: &Path) -> io::Result<u64> {
    Ok(fs::metadata(path)?.len())
}

/// Copies a store file to a backup location.
///
/// A partially written backup is removed on failure.
///
/// # Errors
///
/// Returns an error if the copy fails.
pub fn create_backup(original: &Path, backup: &Path) -> io::Result<u64> {
    match fs::copy(original, backup) {
        Ok(n) => Ok(n),
        Err(e) => {
            let _ = fs::remove_file(backup);
            Err(e)
        }
    }
}
