//! Build mode configuration for production/development builds.

/// Build mode configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildMode {
    /// Whether bundles observe their sources and rebuild on change.
    pub watch: bool,

    /// Whether merged output is minified before it is written.
    pub minify: bool,

    /// Whether style dialect compilers are asked for compressed output.
    pub compress: bool,
}

impl BuildMode {
    /// Production mode: static output, minified, no watcher.
    pub const PRODUCTION: Self = Self {
        watch: false,
        minify: true,
        compress: true,
    };

    /// Development mode: readable output, rebuilt on change.
    pub const DEVELOPMENT: Self = Self {
        watch: true,
        minify: false,
        compress: false,
    };

    /// Pick a mode from the production flag.
    #[inline]
    pub const fn from_production(production: bool) -> Self {
        if production {
            Self::PRODUCTION
        } else {
            Self::DEVELOPMENT
        }
    }
}

impl Default for BuildMode {
    fn default() -> Self {
        Self::DEVELOPMENT
    }
}
