//! Named bundles and the watch loop that keeps them fresh.
//!
//! [`BundleRegistry::watch`] runs one [`Bundle::watch_until`] driver per
//! watching bundle. A failed rebuild is reported and the driver keeps going
//! with the last good artifact.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use rayon::prelude::*;
use tokio::sync::watch;

use crate::bundle::{Bundle, BuildStamp};
use crate::core::BuildMode;
use crate::log;

/// Prefix of the template keys exposing bundle URLs.
pub const TEMPLATE_PREFIX: &str = "crsh_";

/// Default bound for one watch-triggered compile.
pub const DEFAULT_COMPILE_TIMEOUT: Duration = Duration::from_secs(30);

/// Bundles by name, in declaration order.
pub struct BundleRegistry {
    bundles: Vec<(String, Arc<Bundle>)>,
    compile_timeout: Duration,
}

impl BundleRegistry {
    /// Registry without bundles.
    pub fn new() -> Self {
        Self {
            bundles: Vec::new(),
            compile_timeout: DEFAULT_COMPILE_TIMEOUT,
        }
    }

    /// Build every bundle from a `name → files` map.
    ///
    /// Bundles are not compiled yet; call [`BundleRegistry::compile_all`].
    /// Any file that cannot be added fails the whole registry; callers
    /// treat this as a configuration error.
    pub fn from_map<I, K, V, P>(base_path: impl AsRef<Path>, map: I, mode: BuildMode) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let base_path = base_path.as_ref();
        let mut registry = Self::new();

        for (name, files) in map {
            let name = name.into();
            let bundle = Bundle::with_files(base_path, files, mode)
                .with_context(|| format!("invalid bundle `{name}`"))?;
            registry.insert(name, Arc::new(bundle))?;
        }
        Ok(registry)
    }

    /// Add an existing bundle under `name`, after the others.
    pub fn insert(&mut self, name: impl Into<String>, bundle: Arc<Bundle>) -> Result<()> {
        let name = name.into();
        if self.get(&name).is_some() {
            bail!("bundle `{name}` declared twice");
        }
        self.bundles.push((name, bundle));
        Ok(())
    }

    pub fn with_timeout(mut self, compile_timeout: Duration) -> Self {
        self.compile_timeout = compile_timeout;
        self
    }

    pub fn get(&self, name: &str) -> Option<&Arc<Bundle>> {
        self.bundles.iter().find(|(n, _)| n == name).map(|(_, b)| b)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.bundles.iter().map(|(n, _)| n.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Arc<Bundle>)> {
        self.bundles.iter().map(|(n, b)| (n.as_str(), b))
    }

    pub fn len(&self) -> usize {
        self.bundles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bundles.is_empty()
    }

    pub fn compile_timeout(&self) -> Duration {
        self.compile_timeout
    }

    /// `crsh_<name> → url` for every compiled bundle.
    ///
    /// Bundles that never compiled successfully are left out.
    pub fn template_vars(&self) -> BTreeMap<String, String> {
        self.bundles
            .iter()
            .filter_map(|(name, bundle)| Some((template_key(name), bundle.url()?)))
            .collect()
    }

    /// Compile every bundle in parallel, results in declaration order.
    pub fn compile_all(&self) -> Vec<(&str, crate::error::Result<BuildStamp>)> {
        self.bundles
            .par_iter()
            .map(|(name, bundle)| (name.as_str(), bundle.compile()))
            .collect()
    }

    /// Rebuild bundles on change until `shutdown` fires.
    ///
    /// Bundles without a watcher are skipped. Returns once every bundle
    /// driver has stopped.
    pub async fn watch(&self, shutdown: watch::Receiver<bool>) {
        let tasks: Vec<_> = self
            .bundles
            .iter()
            .filter_map(|(name, bundle)| {
                bundle.spawn_watch(name.clone(), self.compile_timeout, shutdown.clone())
            })
            .collect();

        if tasks.is_empty() {
            log!("watch"; "no bundle is watching, nothing to do");
            return;
        }
        log!("watch"; "watching {} bundle(s)", tasks.len());

        for task in tasks {
            if let Err(e) = task.await {
                log!("error"; "watch task failed: {}", e);
            }
        }
    }
}

impl Default for BundleRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Template key for a bundle name.
pub fn template_key(name: &str) -> String {
    format!("{TEMPLATE_PREFIX}{name}")
}
