//! Bundle: an ordered list of sources compiled into one artifact.
//!
//! # Pipeline
//!
//! ```text
//! files ──load (parallel, keyed)──> raw ──filter (parallel, rejoined in order)──> pieces
//!       ──concat──> merged ──minify (production)──> output ──atomic write──> BuildStamp
//! ```
//!
//! The output name is `fingerprint(join(files, ",")).<ext>`: stable while
//! membership is unchanged. The URL appends the last build timestamp, so
//! it changes on every completed compile even when the name does not.
//!
//! # States
//!
//! `Empty → Populated → Compiling → Compiled → Compiling …`. Plain
//! [`Bundle::compile`] calls may overlap (last finisher wins);
//! [`Bundle::request_compile`] coalesces them through a [`CompileGate`].
//!
//! A watching bundle rebuilds itself once [`Bundle::spawn_watch`] (or
//! [`Bundle::watch_until`]) runs its driver; until then change events only
//! queue up.

mod driver;
mod gate;
mod stamp;


use std::path::{Path, PathBuf};
use std::sync::Arc;

use arc_swap::ArcSwapOption;
use crossbeam::channel::Receiver;
use parking_lot::{Mutex, RwLock};
use rayon::prelude::*;
use rustc_hash::FxHashMap;

use crate::core::{BuildMode, Format, default_root};
use crate::error::{BundleError, Result};
use crate::filter::{FilterContext, FilterFactory, FilterRegistry, Transform, default_registry};
use crate::utils::hash::fingerprint_paths;
use crate::utils::path::{extension_of, real_path};
use crate::watch::{ChangeEvent, Watcher};
use crate::{files, minify};

pub use gate::{CompileGate, GateGuard};
pub use stamp::{BuildClock, BuildStamp};

/// Ordered file list plus the format it is locked to.
#[derive(Debug, Default, Clone)]
struct Members {
    files: Vec<PathBuf>,
    format: Option<Format>,
}

/// Output file name for a file list: `<fingerprint>.<ext>`.
pub fn output_name(files: &[PathBuf], format: &Format) -> String {
    format!("{}.{}", fingerprint_paths(files), format.extension())
}

fn not_utf8(path: &Path, err: std::str::Utf8Error) -> BundleError {
    BundleError::transform(path, format!("not valid UTF-8: {err}"))
}

/// One bundle of script or style sources.
pub struct Bundle {
    base_path: PathBuf,
    mode: BuildMode,
    members: RwLock<Members>,
    filters: RwLock<FilterRegistry>,
    /// Absent in modes without watching, or when the backend failed.
    watcher: Mutex<Option<Watcher>>,
    changes: Option<Receiver<ChangeEvent>>,
    /// Name computed by the latest compile start.
    output_name: ArcSwapOption<String>,
    /// Last successful compile.
    stamp: ArcSwapOption<BuildStamp>,
    clock: BuildClock,
    gate: CompileGate,
}

impl Bundle {
    /// Empty bundle writing to `base_path`, using the default filters.
    pub fn new(base_path: impl AsRef<Path>, mode: BuildMode) -> Self {
        Self::with_registry(base_path, mode, (*default_registry()).clone())
    }

    /// Empty bundle in the process-wide default root.
    pub fn in_default_root(mode: BuildMode) -> Self {
        Self::new(default_root().as_path(), mode)
    }

    /// Empty bundle with its own filter registry.
    pub fn with_registry(base_path: impl AsRef<Path>, mode: BuildMode, filters: FilterRegistry) -> Self {
        let base_path = crate::utils::path::absolute_dir(base_path.as_ref());

        let (watcher, changes) = if mode.watch {
            match Watcher::channel() {
                Ok((watcher, rx)) => (Some(watcher), Some(rx)),
                Err(e) => {
                    crate::log!("watch"; "watcher unavailable, bundle will not rebuild: {}", e);
                    (None, None)
                }
            }
        } else {
            (None, None)
        };

        Self {
            base_path,
            mode,
            members: RwLock::new(Members::default()),
            filters: RwLock::new(filters),
            watcher: Mutex::new(watcher),
            changes,
            output_name: ArcSwapOption::empty(),
            stamp: ArcSwapOption::empty(),
            clock: BuildClock::new(),
            gate: CompileGate::new(),
        }
    }

    /// Bundle populated from `files`, in order.
    ///
    /// Fails on the first file that cannot be added; callers treat this as a
    /// configuration error.
    pub fn with_files<I, P>(base_path: impl AsRef<Path>, files: I, mode: BuildMode) -> Result<Self>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let bundle = Self::new(base_path, mode);
        for file in files {
            bundle.add(file)?;
        }
        Ok(bundle)
    }

    /// Like [`Bundle::with_files`], then compile once.
    ///
    /// The bundle is ready to serve a URL when this returns.
    pub fn compiled<I, P>(base_path: impl AsRef<Path>, files: I, mode: BuildMode) -> Result<Self>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let bundle = Self::with_files(base_path, files, mode)?;
        bundle.compile()?;
        Ok(bundle)
    }

    // ========================================================================
    // Membership
    // ========================================================================

    /// Append a file.
    ///
    /// The path is resolved against the base path. The file must classify
    /// to the bundle's format, and its filter must be available; otherwise
    /// nothing changes.
    pub fn add(&self, file: impl AsRef<Path>) -> Result<&Self> {
        let path = real_path(file.as_ref(), &self.base_path);

        {
            let mut members = self.members.write();
            let filters = self.filters.read();

            let found = filters
                .classify(&path)
                .ok_or_else(|| BundleError::UnknownFormat { path: path.clone() })?;

            if let Some(expected) = &members.format
                && *expected != found
            {
                return Err(BundleError::FormatMismatch {
                    path,
                    expected: expected.clone(),
                    found,
                });
            }

            // first request builds the filter
            filters.resolve(&self.filter_context(extension_of(&path)))?;

            members.format.get_or_insert(found);
            members.files.push(path.clone());
        }

        if let Some(watcher) = self.watcher.lock().as_mut() {
            watcher.watch(&path);
        }
        crate::debug!("bundle"; "added {}", path.display());
        Ok(self)
    }

    /// Remove the first occurrence of a file. No-op when absent.
    ///
    /// The path stays watched while another occurrence remains.
    pub fn remove(&self, file: impl AsRef<Path>) -> &Self {
        let path = real_path(file.as_ref(), &self.base_path);

        let still_listed = {
            let mut members = self.members.write();
            let Some(pos) = members.files.iter().position(|f| *f == path) else {
                return self;
            };
            members.files.remove(pos);
            if members.files.is_empty() {
                members.format = None;
            }
            members.files.contains(&path)
        };

        if !still_listed && let Some(watcher) = self.watcher.lock().as_mut() {
            watcher.unwatch(&path);
        }
        crate::debug!("bundle"; "removed {}", path.display());
        self
    }

    // ========================================================================
    // Compile
    // ========================================================================

    /// Run the full pipeline once and write the artifact.
    ///
    /// Any failure leaves the previously written artifact untouched.
    pub fn compile(&self) -> Result<BuildStamp> {
        let Members { files, format } = self.members.read().clone();
        let Some(format) = format.filter(|_| !files.is_empty()) else {
            return Err(BundleError::Empty);
        };

        let name = output_name(&files, &format);
        self.output_name.store(Some(Arc::new(name.clone())));
        let output_path = self.base_path.join(&name);

        let sources = files::load_all(&files)?;
        let transforms = self.resolve_transforms(&files)?;

        let pieces = files
            .par_iter()
            .zip(transforms.par_iter())
            .map(|(path, transform)| {
                let raw = sources.get(path).map(Vec::as_slice).unwrap_or_default();
                match std::str::from_utf8(raw) {
                    Ok(text) => transform.apply(text, path).map(String::into_bytes),
                    Err(_) if transform.is_identity() => Ok(raw.to_vec()),
                    Err(e) => Err(not_utf8(path, e)),
                }
            })
            .collect::<Result<Vec<Vec<u8>>>>()?;

        let mut merged = pieces.concat();

        if self.mode.minify {
            let text = std::str::from_utf8(&merged).map_err(|e| not_utf8(&output_path, e))?;
            if let Some(minified) = minify::minify_for(&format, text) {
                merged = minified
                    .map_err(|msg| BundleError::transform(&output_path, msg))?
                    .into_bytes();
            }
        }

        files::write(&output_path, &merged)?;

        let stamp = BuildStamp {
            name,
            path: output_path,
            timestamp: self.clock.tick(),
        };
        self.stamp.store(Some(Arc::new(stamp.clone())));
        crate::debug!("bundle"; "wrote {} ({} files)", stamp.path.display(), files.len());
        Ok(stamp)
    }

    /// Compile unless a compile is already running.
    ///
    /// Returns `None` when the request was folded into the running compile,
    /// which will run once more before it finishes. Otherwise returns the
    /// result of the last round. The gate is released even when a
    /// transform panics.
    pub fn request_compile(&self) -> Option<Result<BuildStamp>> {
        let Some(mut guard) = self.gate.begin() else {
            crate::debug!("bundle"; "compile in flight, queued");
            return None;
        };
        let mut result = self.compile();
        while guard.finish() {
            result = self.compile();
        }
        Some(result)
    }

    /// One transform per file, in list order.
    fn resolve_transforms(&self, files: &[PathBuf]) -> Result<Vec<Arc<dyn Transform>>> {
        let filters = self.filters.read();
        let mut by_ext: FxHashMap<&str, Arc<dyn Transform>> = FxHashMap::default();

        files
            .iter()
            .map(|path| {
                let ext = extension_of(path);
                if let Some(t) = by_ext.get(ext) {
                    return Ok(Arc::clone(t));
                }
                let t = filters.resolve(&self.filter_context(ext))?;
                by_ext.insert(ext, Arc::clone(&t));
                Ok(t)
            })
            .collect()
    }

    fn filter_context<'a>(&'a self, extension: &'a str) -> FilterContext<'a> {
        FilterContext {
            extension,
            base_path: &self.base_path,
            mode: self.mode,
        }
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// Cache-busting URL `name?timestamp`, once a compile succeeded.
    ///
    /// The name part follows the latest compile start, so a membership
    /// change shows up as soon as the next compile begins.
    pub fn url(&self) -> Option<String> {
        let stamp = self.stamp.load_full()?;
        let name = self
            .output_name
            .load_full()
            .map_or_else(|| stamp.name.clone(), |n| (*n).clone());
        Some(format!("{}?{}", name, stamp.timestamp))
    }

    /// Last successful compile.
    pub fn stamp(&self) -> Option<BuildStamp> {
        self.stamp.load_full().map(|s| (*s).clone())
    }

    /// Output name computed by the latest compile start.
    pub fn output_name(&self) -> Option<String> {
        self.output_name.load_full().map(|n| (*n).clone())
    }

    /// Timestamp of the last successful write, `0` before.
    pub fn last_build(&self) -> u64 {
        self.clock.last()
    }

    pub fn files(&self) -> Vec<PathBuf> {
        self.members.read().files.clone()
    }

    pub fn format(&self) -> Option<Format> {
        self.members.read().format.clone()
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    pub fn mode(&self) -> BuildMode {
        self.mode
    }

    /// Watcher events, when the bundle is watching.
    pub fn changes(&self) -> Option<Receiver<ChangeEvent>> {
        self.changes.clone()
    }

    pub fn is_watching(&self) -> bool {
        self.watcher.lock().is_some()
    }

    /// Files currently observed by the watcher.
    pub fn watched(&self) -> Vec<PathBuf> {
        self.watcher
            .lock()
            .as_ref()
            .map(Watcher::watched)
            .unwrap_or_default()
    }

    // ========================================================================
    // Formats & filters
    // ========================================================================

    /// Format a file would resolve to in this bundle.
    pub fn format_of(&self, file: impl AsRef<Path>) -> Option<Format> {
        self.filters.read().classify(file.as_ref())
    }

    pub fn is_script_file(&self, file: impl AsRef<Path>) -> bool {
        self.format_of(file).is_some_and(|f| f.is_script())
    }

    pub fn is_style_file(&self, file: impl AsRef<Path>) -> bool {
        self.format_of(file).is_some_and(|f| f.is_style())
    }

    /// Install a filter for this bundle only.
    pub fn register_filter(&self, extension: &str, factory: impl FilterFactory + 'static) -> &Self {
        self.filters.write().register_filter(extension, factory);
        self
    }

    /// Accept `extension` as input for `format` in this bundle only.
    pub fn register_type(&self, format: impl Into<Format>, extension: &str) -> &Self {
        self.filters.write().register_type(format, extension);
        self
    }
}
