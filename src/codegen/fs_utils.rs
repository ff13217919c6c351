//! Filesystem utilities for code generation

use std::fs;
use std::io::{self, Write};
use std::path::Path;
use std::time::UNIX_EPOCH;
use tempfile::NamedTempFile;

/// Write content to a file, creating parent directories if needed.
///
/// The content goes to a temporary file in the same directory which then
/// replaces the target, so readers see either the old or the new file.
pub fn write_file<P: AsRef<Path>, C: AsRef<[u8]>>(path: P, contents: C) -> io::Result<()> {
    let path = path.as_ref();
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    // Create parent directories if they don't exist
    fs::create_dir_all(dir)?;

    let mut temp = NamedTempFile::new_in(dir)?;
    temp.write_all(contents.as_ref())?;
    temp.flush()?;
    temp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Write content only if it differs from what is on disk. Returns whether the
/// file was written; untouched files keep their modification time.
pub fn write_if_changed<P: AsRef<Path>>(path: P, contents: &str) -> io::Result<bool> {
    let path = path.as_ref();
    match fs::read(path) {
        Ok(existing) if existing == contents.as_bytes() => return Ok(false),
        Ok(_) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(e),
    }
    write_file(path, contents)?;
    Ok(true)
}

/// Read a file, treating a missing file as empty
pub fn read_optional<P: AsRef<Path>>(path: P) -> io::Result<Option<String>> {
    match fs::read_to_string(path) {
        Ok(contents) => Ok(Some(contents)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}

/// Modification time in milliseconds since the Unix epoch
pub fn modified_millis<P: AsRef<Path>>(path: P) -> io::Result<u64> {
    let modified = fs::metadata(path)?.modified()?;
    let since_epoch = modified
        .duration_since(UNIX_EPOCH)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    Ok(u64::try_from(since_epoch.as_millis()).unwrap_or(u64::MAX))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_write_file_creates_parents() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a/b/c.rs");
        write_file(&path, "fn main() {}\n").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "fn main() {}\n");
    }

    #[test]
    fn test_write_if_changed() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.rs");
        assert!(write_if_changed(&path, "one").unwrap());
        assert!(!write_if_changed(&path, "one").unwrap());
        assert!(write_if_changed(&path, "two").unwrap());
        assert_eq!(fs::read_to_string(&path).unwrap(), "two");
    }

    #[test]
    fn test_read_optional() {
        let dir = TempDir::new().unwrap();
        assert_eq!(read_optional(dir.path().join("missing")).unwrap(), None);
        fs::write(dir.path().join("present"), "x").unwrap();
        assert_eq!(read_optional(dir.path().join("present")).unwrap().as_deref(), Some("x"));
    }
}
