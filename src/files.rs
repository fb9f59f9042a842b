//! File I/O for the compile pipeline.
//!
//! - [`load_all`]: read a set of files in parallel into a path-keyed map
//! - [`write`]: atomic write (temp file + rename) after ensuring the directory
//! - [`is_file`] / [`get_mtime`]: stat helpers used by the watcher

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use rayon::prelude::*;
use rustc_hash::{FxHashMap, FxHashSet};
use tempfile::NamedTempFile;

use crate::error::{BundleError, Result};

/// Read every file in `paths` in parallel.
///
/// Duplicate paths are read once. Completion order is irrelevant: results
/// are keyed by path. The first read failure aborts the whole load.
pub fn load_all(paths: &[PathBuf]) -> Result<FxHashMap<PathBuf, Vec<u8>>> {
    let mut seen = FxHashSet::default();
    let unique: Vec<&PathBuf> = paths.iter().filter(|p| seen.insert(*p)).collect();

    unique
        .par_iter()
        .map(|path| {
            fs::read(path)
                .map(|data| ((*path).clone(), data))
                .map_err(|e| BundleError::Read((*path).clone(), e))
        })
        .collect()
}

/// Write `data` to `path` atomically, creating the parent directory.
///
/// Readers see either the previous file or the complete new one, never a
/// partially written artifact.
pub fn write(path: &Path, data: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    ensure_dir(dir)?;

    let wrap = |e: std::io::Error| BundleError::Write(path.to_path_buf(), e);

    let mut tmp = NamedTempFile::new_in(dir).map_err(wrap)?;
    tmp.write_all(data).map_err(wrap)?;
    tmp.as_file().sync_all().map_err(wrap)?;
    tmp.persist(path).map_err(|e| wrap(e.error))?;
    Ok(())
}

/// Create `dir` (and parents) unless it already is a directory.
pub fn ensure_dir(dir: &Path) -> Result<()> {
    if dir.is_dir() {
        return Ok(());
    }
    fs::create_dir_all(dir).map_err(|e| BundleError::Write(dir.to_path_buf(), e))
}

/// Whether `path` exists and is a regular file.
pub fn is_file(path: &Path) -> bool {
    fs::metadata(path).is_ok_and(|m| m.is_file())
}

/// Get the modification time of a file
///
/// Returns `None` if the file doesn't exist or mtime cannot be read
pub fn get_mtime(path: &Path) -> Option<SystemTime> {
    path.metadata().and_then(|m| m.modified()).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_all_keyed_by_path() {
        let dir = TempDir::new().unwrap();
        let a = dir.path().join("a.js");
        let b = dir.path().join("b.js");
        fs::write(&a, "var a = 1;").unwrap();
        fs::write(&b, "var b = 2;").unwrap();

        let loaded = load_all(&[a.clone(), b.clone(), a.clone()]).unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[&a], b"var a = 1;");
        assert_eq!(loaded[&b], b"var b = 2;");
    }

    #[test]
    fn test_load_all_missing_file() {
        let dir = TempDir::new().unwrap();
        let a = dir.path().join("a.js");
        let missing = dir.path().join("missing.js");
        fs::write(&a, "1").unwrap();

        let err = load_all(&[a, missing.clone()]).unwrap_err();
        match err {
            BundleError::Read(path, _) => assert_eq!(path, missing),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_write_creates_directory() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("nested/deeper/out.css");

        write(&out, b"body{}").unwrap();
        assert_eq!(fs::read(&out).unwrap(), b"body{}");

        write(&out, b"p{}").unwrap();
        assert_eq!(fs::read(&out).unwrap(), b"p{}");
    }

    #[test]
    fn test_write_into_file_parent_fails() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, "not a dir").unwrap();

        let err = write(&blocker.join("out.js"), b"x").unwrap_err();
        assert!(matches!(err, BundleError::Write(..)));
    }

    #[test]
    fn test_stat_helpers() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("a.css");
        fs::write(&file, "").unwrap();

        assert!(is_file(&file));
        assert!(!is_file(dir.path()));
        assert!(!is_file(&dir.path().join("nope.css")));
        assert!(get_mtime(&file).is_some());
        assert!(get_mtime(&dir.path().join("nope.css")).is_none());
    }
}
