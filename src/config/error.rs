//! Configuration error types.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while loading `crsh.toml`.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file `{}` not found", .0.display())]
    NotFound(PathBuf),

    #[error("IO error when reading `{}`", .0.display())]
    Io(PathBuf, #[source] std::io::Error),

    #[error("config file parsing error")]
    Toml(#[from] toml::de::Error),

    #[error("[{field}] {message}")]
    Validation { field: String, message: String },
}

impl ConfigError {
    pub(crate) fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_display() {
        let err = ConfigError::invalid("filters.ts.command", "must not be empty");
        assert_eq!(err.to_string(), "[filters.ts.command] must not be empty");
    }

    #[test]
    fn test_not_found_display() {
        let err = ConfigError::NotFound(PathBuf::from("crsh.toml"));
        assert!(err.to_string().contains("`crsh.toml` not found"));
    }
}
