//! Bundle error taxonomy.
//!
//! Every pipeline failure surfaces to the caller as a [`BundleError`].
//! A failed compile never touches the previously written artifact.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::core::Format;

pub type Result<T, E = BundleError> = std::result::Result<T, E>;

/// Errors raised while populating or compiling a bundle.
#[derive(Debug, Error)]
pub enum BundleError {
    /// A source file could not be read.
    #[error("failed to read `{}`", .0.display())]
    Read(PathBuf, #[source] std::io::Error),

    /// A file's format conflicts with the bundle's established format.
    #[error("can not mix formats: `{}` is {found}, bundle is {expected}", path.display())]
    FormatMismatch {
        path: PathBuf,
        expected: Format,
        found: Format,
    },

    /// No registered format accepts the file's extension.
    #[error("no format accepts `{}`", path.display())]
    UnknownFormat { path: PathBuf },

    /// A filter needs an optional collaborator that is not available.
    #[error("filter `{extension}` requires `{dependency}`, which is not installed")]
    MissingDependency {
        extension: String,
        dependency: String,
    },

    /// A filter or the minifier rejected its input.
    #[error("transform failed for `{}`: {message}", path.display())]
    Transform { path: PathBuf, message: String },

    /// The output directory or file could not be written.
    #[error("failed to write `{}`", .0.display())]
    Write(PathBuf, #[source] std::io::Error),

    /// Compile was requested on a bundle without files.
    #[error("bundle has no files")]
    Empty,

    /// A watch-triggered compile exceeded `compile_timeout`.
    #[error("compile timed out after {}s", .0.as_secs())]
    Timeout(Duration),
}

impl BundleError {
    pub(crate) fn transform(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Transform {
            path: path.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Error, ErrorKind};

    #[test]
    fn test_read_error_display() {
        let err = BundleError::Read(
            PathBuf::from("/site/assets/a.js"),
            Error::new(ErrorKind::NotFound, "file not found"),
        );
        let display = err.to_string();
        assert!(display.contains("failed to read"));
        assert!(display.contains("/site/assets/a.js"));
    }

    #[test]
    fn test_format_mismatch_display() {
        let err = BundleError::FormatMismatch {
            path: PathBuf::from("main.css"),
            expected: Format::script(),
            found: Format::style(),
        };
        assert_eq!(
            err.to_string(),
            "can not mix formats: `main.css` is css, bundle is js"
        );
    }

    #[test]
    fn test_missing_dependency_display() {
        let err = BundleError::MissingDependency {
            extension: "coffee".into(),
            dependency: "coffee".into(),
        };
        assert!(err.to_string().contains("not installed"));
    }
}
