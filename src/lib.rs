//! crsh - merge, filter, minify and fingerprint script/style bundles.
//!
//! ```ignore
//! use crsh::{Bundle, BuildMode};
//!
//! let bundle = Bundle::with_files("public/assets", ["vendor/jquery.js", "app.coffee"], BuildMode::DEVELOPMENT)?;
//! bundle.compile()?;
//! let url = bundle.url(); // Some("9f2c01d4e5b6a7c8.js?1718000000000")
//! ```

pub mod bundle;
pub mod config;
pub mod core;
pub mod error;
pub mod files;
pub mod filter;
pub mod logger;
pub mod minify;
pub mod registry;
pub mod utils;
pub mod watch;

pub use bundle::{Bundle, BuildStamp};
pub use crate::core::{BuildMode, Format, default_root, set_default_root};
pub use error::{BundleError, Result};
pub use filter::{FilterContext, FilterFactory, FilterRegistry, Transform};
pub use registry::BundleRegistry;
