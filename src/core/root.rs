//! Process-wide default base directory for bundles.

use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock};

use arc_swap::ArcSwap;

use crate::utils::path::absolute_dir;

static DEFAULT_ROOT: LazyLock<ArcSwap<PathBuf>> =
    LazyLock::new(|| ArcSwap::from_pointee(absolute_dir(Path::new("."))));

/// Base directory used when a bundle is created without one.
///
/// Defaults to the current working directory.
#[inline]
pub fn default_root() -> Arc<PathBuf> {
    DEFAULT_ROOT.load_full()
}

/// Replace the default base directory (made absolute against the cwd).
pub fn set_default_root(root: impl AsRef<Path>) {
    DEFAULT_ROOT.store(Arc::new(absolute_dir(root.as_ref())));
}
