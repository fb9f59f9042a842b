//! Path normalization utilities.
//!
//! Bundles key everything by path (file order, fingerprints, watcher
//! lookups), so every path entering a bundle goes through [`real_path`].

use std::path::{Path, PathBuf};

use path_clean::PathClean;

/// Resolve `file` against `base` and normalize it lexically.
///
/// Relative references are joined onto `base`; absolute ones are kept.
/// `.` and `..` segments are folded without touching the filesystem, so the
/// result is stable whether or not the file exists yet.
///
/// # Example
/// ```ignore
/// let p = real_path(Path::new("./vendor/../app.js"), Path::new("/site/assets"));
/// assert_eq!(p, PathBuf::from("/site/assets/app.js"));
/// ```
pub fn real_path(file: &Path, base: &Path) -> PathBuf {
    if file.is_absolute() {
        file.clean()
    } else {
        base.join(file).clean()
    }
}

/// Make a directory absolute against the current working directory.
pub fn absolute_dir(dir: &Path) -> PathBuf {
    if dir.is_absolute() {
        return dir.clean();
    }
    std::env::current_dir()
        .map_or_else(|_| dir.to_path_buf(), |cwd| cwd.join(dir))
        .clean()
}

/// Strip one leading dot from an extension or format name.
#[inline]
pub fn no_dot(name: &str) -> &str {
    name.strip_prefix('.').unwrap_or(name)
}

/// Extension of a path without the dot, or `""`.
#[inline]
pub fn extension_of(path: &Path) -> &str {
    path.extension().and_then(|e| e.to_str()).unwrap_or("")
}
