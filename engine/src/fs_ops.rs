//! Filesystem operations module.
//!
//! Low-level operations for the copy run:
//! - Copying files with modification-time preservation
//! - Idempotent destination-directory creation
//! - Fresh size reads for the identical-skip check and post-copy verification

use std::fs;
use std::io;
use std::path::Path;
use crate::error::EngineError;

/// Copy a file from source to destination, preserving modification time.
///
/// # Returns
/// Number of bytes copied
///
/// # Errors
/// Returns EngineError if the copy fails
pub fn copy_file_with_mtime(src: &Path, dst: &Path) -> Result<u64, EngineError> {
    let mut src_file = fs::File::open(src).map_err(|e| EngineError::ReadError {
        path: src.to_path_buf(),
        source: e,
    })?;

    let src_metadata = src_file.metadata().map_err(|e| EngineError::ReadError {
        path: src.to_path_buf(),
        source: e,
    })?;
    let src_mtime = src_metadata.modified().ok();

    let mut dst_file = fs::File::create(dst).map_err(|e| EngineError::WriteError {
        path: dst.to_path_buf(),
        source: e,
    })?;

    let bytes_copied = io::copy(&mut src_file, &mut dst_file).map_err(|e| {
        if e.kind() == io::ErrorKind::PermissionDenied {
            EngineError::WriteError {
                path: dst.to_path_buf(),
                source: e,
            }
        } else {
            EngineError::ReadError {
                path: src.to_path_buf(),
                source: e,
            }
        }
    })?;

    // Preserve modification time if available; failure here is not fatal.
    if let Some(mtime) = src_mtime {
        let _ = filetime::set_file_mtime(dst, filetime::FileTime::from_system_time(mtime));
    }

    Ok(bytes_copied)
}

/// Ensure a directory exists, creating it (and missing parents) if necessary.
///
/// Idempotent and safe to call repeatedly; the copy run additionally caches
/// created paths to avoid redundant system calls.
///
/// # Errors
/// Returns EngineError if creation fails or the path exists as a non-directory
pub fn ensure_dir_exists(path: &Path) -> Result<(), EngineError> {
    match fs::metadata(path) {
        Ok(metadata) => {
            if metadata.is_dir() {
                Ok(())
            } else {
                Err(EngineError::DirectoryCreationFailed {
                    path: path.to_path_buf(),
                    source: io::Error::new(
                        io::ErrorKind::InvalidInput,
                        "Path exists but is not a directory",
                    ),
                })
            }
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            fs::create_dir_all(path).map_err(|e| EngineError::DirectoryCreationFailed {
                path: path.to_path_buf(),
                source: e,
            })
        }
        Err(e) => Err(EngineError::DirectoryCreationFailed {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}

/// Current size of a file, re-read from the filesystem.
pub fn file_size(path: &Path) -> io::Result<u64> {
    fs::metadata(path).map(|metadata| metadata.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_copy_file_with_mtime() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let src_file = temp_dir.path().join("source.jpg");
        let dst_file = temp_dir.path().join("dest.jpg");

        let mut file = fs::File::create(&src_file).expect("Failed to create source");
        file.write_all(b"test content").expect("Failed to write source");
        drop(file);

        let bytes = copy_file_with_mtime(&src_file, &dst_file).expect("Failed to copy");
        assert_eq!(bytes, 12);

        let content = fs::read_to_string(&dst_file).expect("Failed to read dest");
        assert_eq!(content, "test content");
    }

    #[test]
    fn test_copy_preserves_modification_time() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let src_file = temp_dir.path().join("source.jpg");
        let dst_file = temp_dir.path().join("dest.jpg");

        fs::write(&src_file, b"data").expect("Failed to write source");
        let mtime = filetime::FileTime::from_unix_time(1_600_000_000, 0);
        filetime::set_file_mtime(&src_file, mtime).expect("Failed to set mtime");

        copy_file_with_mtime(&src_file, &dst_file).expect("Failed to copy");

        let dst_mtime = filetime::FileTime::from_last_modification_time(
            &fs::metadata(&dst_file).expect("Failed to stat dest"),
        );
        assert_eq!(dst_mtime.unix_seconds(), 1_600_000_000);
    }

    #[test]
    fn test_copy_missing_source_fails() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let result = copy_file_with_mtime(
            &temp_dir.path().join("missing.jpg"),
            &temp_dir.path().join("dest.jpg"),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_ensure_dir_exists_creates_nested() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let dir = temp_dir.path().join("2024-01-01").join("PHOTOS");

        ensure_dir_exists(&dir).expect("Failed to create dir");
        assert!(dir.is_dir());

        // Second call is a no-op.
        ensure_dir_exists(&dir).expect("Failed on existing dir");
    }

    #[test]
    fn test_ensure_dir_exists_rejects_file() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let path = temp_dir.path().join("not_a_dir");
        fs::write(&path, b"x").expect("Failed to write file");

        assert!(ensure_dir_exists(&path).is_err());
    }

    #[test]
    fn test_file_size_reads_fresh_value() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let path = temp_dir.path().join("f.bin");
        fs::write(&path, b"12345").expect("Failed to write file");
        assert_eq!(file_size(&path).expect("Failed to stat"), 5);

        fs::write(&path, b"123").expect("Failed to rewrite file");
        assert_eq!(file_size(&path).expect("Failed to stat"), 3);
    }
}
