//! Per-extension transform filters.
//!
//! ```text
//! extension ──FilterRegistry──> FilterFactory ──build (lazy, once per bundle)──> Transform
//!     │
//!     └──TypeTable──> Format
//! ```
//!
//! A [`FilterFactory`] is split in two steps:
//! - `declare`: cheap and infallible, run at registration so the extension
//!   can be classified right away (`app.coffee` → `js`)
//! - `build`: fallible, deferred until the extension is first needed, so an
//!   absent compiler surfaces as [`BundleError::MissingDependency`] instead of
//!   breaking bundle construction
//!
//! [`BundleError::MissingDependency`]: crate::error::BundleError::MissingDependency

mod preset;
mod registry;
mod types;


use std::path::Path;
use std::sync::Arc;

use crate::core::{BuildMode, Format};
use crate::error::Result;

pub use preset::{CommandFilter, LessFilter, coffee, less, preset, stylus};
pub use registry::{FilterRegistry, default_registry, set_default_registry};
pub use types::TypeTable;

/// Converts one file's raw content into text ready for concatenation.
pub trait Transform: Send + Sync {
    /// `file` is the absolute path of the source, for compilers that
    /// resolve relative imports.
    fn apply(&self, source: &str, file: &Path) -> Result<String>;

    /// Output equals input. Such transforms also accept bytes that are not
    /// UTF-8, which are then copied verbatim.
    fn is_identity(&self) -> bool {
        false
    }
}

impl<F> Transform for F
where
    F: Fn(&str, &Path) -> Result<String> + Send + Sync,
{
    fn apply(&self, source: &str, file: &Path) -> Result<String> {
        self(source, file)
    }
}

/// Pass-through used for extensions without a registered filter.
#[derive(Debug, Clone, Copy, Default)]
pub struct Identity;

impl Transform for Identity {
    fn apply(&self, source: &str, _file: &Path) -> Result<String> {
        Ok(source.to_owned())
    }

    fn is_identity(&self) -> bool {
        true
    }
}

/// What a factory sees of the bundle it builds a transform for.
#[derive(Debug, Clone, Copy)]
pub struct FilterContext<'a> {
    /// Extension being resolved, without the dot.
    pub extension: &'a str,
    /// Base path of the owning bundle.
    pub base_path: &'a Path,
    /// Build mode of the owning bundle.
    pub mode: BuildMode,
}

/// Produces the [`Transform`] for one extension.
pub trait FilterFactory: Send + Sync {
    /// Register the extension→format pairs this filter introduces.
    fn declare(&self, _types: &mut TypeTable) {}

    /// Build the transform for one bundle.
    ///
    /// Called at most once per registry, the first time the extension is
    /// needed. Fails with `MissingDependency` when a collaborator is absent.
    fn build(&self, ctx: &FilterContext<'_>) -> Result<Arc<dyn Transform>>;
}

/// Factory wrapping a plain function, with an optional format declaration.
pub struct FnFilter<F> {
    extension: String,
    format: Option<Format>,
    func: Arc<F>,
}

/// Build a dependency-free filter from a function.
///
/// ```ignore
/// registry.register_filter("upper", from_fn("upper", Some(Format::script()), |src, _| {
///     Ok(src.to_uppercase())
/// }));
/// ```
pub fn from_fn<F>(extension: &str, format: Option<Format>, func: F) -> FnFilter<F>
where
    F: Fn(&str, &Path) -> Result<String> + Send + Sync + 'static,
{
    FnFilter {
        extension: crate::utils::path::no_dot(extension).to_owned(),
        format,
        func: Arc::new(func),
    }
}

impl<F> FilterFactory for FnFilter<F>
where
    F: Fn(&str, &Path) -> Result<String> + Send + Sync + 'static,
{
    fn declare(&self, types: &mut TypeTable) {
        if let Some(format) = &self.format {
            types.register(format.clone(), &self.extension);
        }
    }

    fn build(&self, _ctx: &FilterContext<'_>) -> Result<Arc<dyn Transform>> {
        let func = Arc::clone(&self.func);
        Ok(Arc::new(move |src: &str, file: &Path| func(src, file)))
    }
}
