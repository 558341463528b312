//! Index file I/O.
//!
//! An index file holds exactly one serialized index. Creating never
//! overwrites, and saving replaces the file atomically: the new bytes go to a
//! temporary file in the same directory which is synced and then renamed over
//! the old one, so a crash leaves either the old or the new index on disk.

use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::Path;

use crate::error::{QuireError, Result};

/// Create `path` with `bytes`, failing if it already exists.
pub fn create_new(path: &Path, bytes: &[u8]) -> Result<()> {
    let mut file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .map_err(|e| match e.kind() {
            ErrorKind::AlreadyExists => QuireError::already_exists(path.display().to_string()),
            _ => QuireError::Io(e),
        })?;
    file.write_all(bytes)?;
    file.sync_all()?;
    Ok(())
}

/// Read a whole index file.
pub fn read(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => QuireError::not_found(path.display().to_string()),
        _ => QuireError::Io(e),
    })
}

/// Atomically replace `path` with `bytes`.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut temp = tempfile::Builder::new()
        .prefix(".quire-")
        .suffix(".tmp")
        .tempfile_in(dir)?;
    temp.write_all(bytes)?;
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|e| QuireError::Io(e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_new_refuses_existing() {
        let dir = tempfile::Builder::new().prefix("quire-file").tempdir().unwrap();
        let path = dir.path().join("index.qx");

        create_new(&path, b"first").unwrap();
        let err = create_new(&path, b"second").unwrap_err();
        assert!(matches!(err, QuireError::AlreadyExists(_)));
        assert_eq!(read(&path).unwrap(), b"first");
    }

    #[test]
    fn test_read_missing() {
        let dir = tempfile::Builder::new().prefix("quire-file").tempdir().unwrap();
        let err = read(&dir.path().join("missing.qx")).unwrap_err();
        assert!(matches!(err, QuireError::NotFound(_)));
    }

    #[test]
    fn test_write_atomic_replaces() {
        let dir = tempfile::Builder::new().prefix("quire-file").tempdir().unwrap();
        let path = dir.path().join("index.qx");

        create_new(&path, b"old").unwrap();
        write_atomic(&path, b"new contents").unwrap();
        assert_eq!(read(&path).unwrap(), b"new contents");

        let leftovers = std::fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(leftovers, 1);
    }
}
