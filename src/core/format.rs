//! Output format of a bundle.

use std::fmt;
use std::sync::Arc;

use serde::Deserialize;

use crate::utils::path::no_dot;

/// Output category a bundle is locked to once its first file is added.
///
/// The name doubles as the output file extension (`js`, `css`, ...).
/// New formats appear through [`FilterRegistry::register_type`].
///
/// [`FilterRegistry::register_type`]: crate::filter::FilterRegistry::register_type
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
#[serde(from = "String")]
pub struct Format(Arc<str>);

impl Format {
    pub const SCRIPT: &'static str = "js";
    pub const STYLE: &'static str = "css";

    pub fn new(name: &str) -> Self {
        Self(Arc::from(no_dot(name)))
    }

    pub fn script() -> Self {
        Self::new(Self::SCRIPT)
    }

    pub fn style() -> Self {
        Self::new(Self::STYLE)
    }

    /// Extension of the output artifact, without the dot.
    #[inline]
    pub fn extension(&self) -> &str {
        &self.0
    }

    #[inline]
    pub fn is_script(&self) -> bool {
        &*self.0 == Self::SCRIPT
    }

    #[inline]
    pub fn is_style(&self) -> bool {
        &*self.0 == Self::STYLE
    }
}

impl From<String> for Format {
    fn from(name: String) -> Self {
        Self::new(&name)
    }
}

impl From<&str> for Format {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
