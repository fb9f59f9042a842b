//! Extension → filter registry with copy-on-extend defaults.
//!
//! The process-wide default lives in an `ArcSwap`: readers take a snapshot,
//! setup code may replace it atomically. Each bundle clones the snapshot
//! when it is created and extends its own copy; the shared tables are only
//! copied when a bundle actually registers something (`Arc::make_mut`).

use std::fmt;
use std::path::Path;
use std::sync::{Arc, LazyLock};

use arc_swap::ArcSwap;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use super::{FilterContext, FilterFactory, Identity, Transform, TypeTable, preset};
use crate::core::Format;
use crate::error::Result;
use crate::utils::path::no_dot;

static DEFAULT_REGISTRY: LazyLock<ArcSwap<FilterRegistry>> =
    LazyLock::new(|| ArcSwap::from_pointee(FilterRegistry::builtin()));

/// Snapshot of the process-wide default registry.
#[inline]
pub fn default_registry() -> Arc<FilterRegistry> {
    DEFAULT_REGISTRY.load_full()
}

/// Replace the process-wide default registry.
///
/// Only bundles created afterwards see the new defaults.
pub fn set_default_registry(registry: FilterRegistry) {
    DEFAULT_REGISTRY.store(Arc::new(registry));
}

/// Maps extensions to filters and formats.
pub struct FilterRegistry {
    factories: Arc<FxHashMap<String, Arc<dyn FilterFactory>>>,
    types: Arc<TypeTable>,
    /// Transforms built by this registry; never shared between clones.
    resolved: Mutex<FxHashMap<String, Arc<dyn Transform>>>,
}

impl Clone for FilterRegistry {
    fn clone(&self) -> Self {
        Self {
            factories: Arc::clone(&self.factories),
            types: Arc::clone(&self.types),
            resolved: Mutex::new(FxHashMap::default()),
        }
    }
}

impl Default for FilterRegistry {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Debug for FilterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut filters: Vec<_> = self.factories.keys().collect();
        filters.sort();
        f.debug_struct("FilterRegistry")
            .field("filters", &filters)
            .field("types", &self.types)
            .finish()
    }
}

impl FilterRegistry {
    /// Built-in formats only, no filters.
    pub fn empty() -> Self {
        Self {
            factories: Arc::new(FxHashMap::default()),
            types: Arc::new(TypeTable::builtin()),
            resolved: Mutex::new(FxHashMap::default()),
        }
    }

    /// Built-in formats plus the `coffee` and `styl` presets.
    pub fn builtin() -> Self {
        let mut registry = Self::empty();
        registry
            .register_filter("coffee", preset::coffee())
            .register_filter("styl", preset::stylus());
        registry
    }

    /// Install a filter for `extension`.
    ///
    /// The factory declares its formats now; its transform is built the
    /// first time the extension is resolved.
    pub fn register_filter(
        &mut self,
        extension: &str,
        factory: impl FilterFactory + 'static,
    ) -> &mut Self {
        self.register_shared(extension, Arc::new(factory))
    }

    /// Install an already shared factory.
    pub fn register_shared(
        &mut self,
        extension: &str,
        factory: Arc<dyn FilterFactory>,
    ) -> &mut Self {
        let extension = no_dot(extension).to_owned();
        factory.declare(Arc::make_mut(&mut self.types));
        self.resolved.get_mut().remove(&extension);
        Arc::make_mut(&mut self.factories).insert(extension, factory);
        self
    }

    /// Accept `extension` as input for `format`.
    pub fn register_type(&mut self, format: impl Into<Format>, extension: &str) -> &mut Self {
        Arc::make_mut(&mut self.types).register(format, extension);
        self
    }

    /// Whether a filter is registered for `extension`.
    pub fn has_filter(&self, extension: &str) -> bool {
        self.factories.contains_key(no_dot(extension))
    }

    pub fn types(&self) -> &TypeTable {
        &self.types
    }

    /// Format of `path`, or `None` when no format accepts its extension.
    pub fn classify(&self, path: &Path) -> Option<Format> {
        self.types.classify(path)
    }

    /// Transform for `ctx.extension`.
    ///
    /// Unregistered extensions pass through unchanged. A registered factory
    /// is built once; a failed build is not cached and is retried on the
    /// next request.
    pub fn resolve(&self, ctx: &FilterContext<'_>) -> Result<Arc<dyn Transform>> {
        let extension = no_dot(ctx.extension);

        let Some(factory) = self.factories.get(extension) else {
            return Ok(Arc::new(Identity));
        };

        let mut resolved = self.resolved.lock();
        if let Some(transform) = resolved.get(extension) {
            return Ok(Arc::clone(transform));
        }

        let transform = factory.build(&FilterContext { extension, ..*ctx })?;
        crate::debug!("filter"; "built filter for .{}", extension);
        resolved.insert(extension.to_owned(), Arc::clone(&transform));
        Ok(transform)
    }
}
