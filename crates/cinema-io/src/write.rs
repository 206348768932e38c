//! Crash-safe file replacement.
//!
//! Contents go to a temporary file in the destination directory, which
//! is then renamed over the destination. A reader (or a rerun after an
//! interruption) sees either the old file or the new one, never a
//! truncated mix. If anything fails, the temporary file is removed and
//! the destination is untouched.

use std::fs;
use std::io::{self, Write};
use std::path::Path;

use tempfile::NamedTempFile;

/// Atomically replace `path` with `contents`.
///
/// An existing file's permissions are carried over to the replacement.
///
/// # Errors
///
/// Returns any I/O error from creating, writing, syncing, or renaming
/// the temporary file.
pub fn write_atomic(path: &Path, contents: &[u8]) -> io::Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut file = NamedTempFile::new_in(dir)?;
    file.write_all(contents)?;
    if let Ok(existing) = fs::metadata(path) {
        file.as_file().set_permissions(existing.permissions())?;
    }
    file.as_file().sync_all()?;
    file.persist(path).map_err(|err| err.error)?;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn creates_new_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.json");
        write_atomic(&path, b"{}\n").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "{}\n");
    }

    #[test]
    fn replaces_existing_file_entirely() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.json");
        fs::write(&path, "a much longer previous body").unwrap();
        write_atomic(&path, b"short").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "short");
    }

    #[test]
    fn leaves_no_temporary_files_behind() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.json");
        write_atomic(&path, b"1").unwrap();
        write_atomic(&path, b"2").unwrap();
        let entries: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn missing_directory_fails_without_side_effects() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing/a.json");
        assert!(write_atomic(&path, b"x").is_err());
        assert!(!path.exists());
    }

    #[test]
    fn failed_rename_keeps_previous_contents() {
        let dir = tempfile::tempdir().unwrap();
        // A non-empty directory at the destination cannot be replaced by
        // a file rename on any platform.
        let path = dir.path().join("taken");
        fs::create_dir(&path).unwrap();
        fs::write(path.join("keep"), "kept").unwrap();

        assert!(write_atomic(&path, b"x").is_err());
        assert_eq!(fs::read_to_string(path.join("keep")).unwrap(), "kept");
        let entries: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1, "temporary file was not cleaned up");
    }
}
