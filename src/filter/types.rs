//! Format → extension table.

use std::path::Path;

use crate::core::Format;
use crate::utils::path::{extension_of, no_dot};

/// Which extensions each output format accepts.
///
/// Each extension belongs to at most one format; the first registration
/// wins. Lookup order follows registration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeTable {
    formats: Vec<(Format, Vec<String>)>,
}

impl Default for TypeTable {
    fn default() -> Self {
        Self::builtin()
    }
}

impl TypeTable {
    /// `js` accepts `js`, `css` accepts `css`.
    pub fn builtin() -> Self {
        Self {
            formats: vec![
                (Format::script(), vec![Format::SCRIPT.to_owned()]),
                (Format::style(), vec![Format::STYLE.to_owned()]),
            ],
        }
    }

    /// Accept `extension` as input for `format`.
    ///
    /// Returns `false` (and changes nothing) when the extension already
    /// belongs to a different format.
    pub fn register(&mut self, format: impl Into<Format>, extension: &str) -> bool {
        let format = format.into();
        let extension = no_dot(extension);

        if let Some(owner) = self.classify_ext(extension) {
            if *owner != format {
                crate::debug!("filter"; "`{}` already belongs to {}, not {}", extension, owner, format);
            }
            return *owner == format;
        }

        match self.formats.iter_mut().find(|(f, _)| *f == format) {
            Some((_, exts)) => exts.push(extension.to_owned()),
            None => self.formats.push((format, vec![extension.to_owned()])),
        }
        true
    }

    /// Format accepting `extension` (no dot).
    pub fn classify_ext(&self, extension: &str) -> Option<&Format> {
        let extension = no_dot(extension);
        self.formats
            .iter()
            .find(|(_, exts)| exts.iter().any(|e| e == extension))
            .map(|(format, _)| format)
    }

    /// Format accepting the extension of `path`.
    pub fn classify(&self, path: &Path) -> Option<Format> {
        self.classify_ext(extension_of(path)).cloned()
    }

    /// Extensions accepted for `format`, in registration order.
    pub fn extensions(&self, format: &Format) -> &[String] {
        self.formats
            .iter()
            .find(|(f, _)| f == format)
            .map_or(&[], |(_, exts)| exts.as_slice())
    }

    pub fn formats(&self) -> impl Iterator<Item = &Format> {
        self.formats.iter().map(|(f, _)| f)
    }
}
