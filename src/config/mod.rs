//! Configuration management for `crsh.toml`.
//!
//! # Module Structure
//!
//! ```text
//! config/
//! ├── error      # ConfigError
//! ├── util       # Config file lookup
//! └── mod.rs     # CrshConfig (this file)
//! ```
//!
//! # Fields
//!
//! | Field             | Purpose                                          |
//! |-------------------|--------------------------------------------------|
//! | `root`            | Output dir and base for relative file references |
//! | `mode`            | `development` (watch) or `production` (minify)   |
//! | `compile_timeout` | Seconds a watch-triggered compile may take       |
//! | `defaults`        | Presets enabled for every bundle                 |
//! | `[bundles]`       | `name = [files]`                                 |
//! | `[filters.<ext>]` | External compilers: `format`, `command`          |

mod error;
mod util;

pub use error::ConfigError;

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::core::BuildMode;
use crate::filter::{CommandFilter, FilterRegistry, preset};
use crate::log;
use crate::registry::BundleRegistry;

/// Default config file name.
pub const CONFIG_FILE: &str = "crsh.toml";

/// Named operating mode as written in `crsh.toml`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModeName {
    #[default]
    Development,
    Production,
}

impl From<ModeName> for BuildMode {
    fn from(mode: ModeName) -> Self {
        BuildMode::from_production(mode == ModeName::Production)
    }
}

/// User-declared external filter (`[filters.<ext>]`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterConfig {
    /// Output format the extension compiles to (`js`, `css`, ...).
    pub format: String,
    /// Program and arguments; `{file}` and `{dir}` are substituted.
    pub command: Vec<String>,
    /// Extra arguments in production mode.
    #[serde(default)]
    pub compress_args: Vec<String>,
}

/// Root configuration structure representing `crsh.toml`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CrshConfig {
    /// Absolute path to the config file (internal use only)
    #[serde(skip)]
    pub config_path: PathBuf,

    /// Output directory, relative to the config file's directory
    pub root: PathBuf,

    pub mode: ModeName,

    /// Seconds
    pub compile_timeout: u64,

    /// Presets registered for every bundle
    pub defaults: Vec<String>,

    /// Declaration order is kept
    pub bundles: IndexMap<String, Vec<PathBuf>>,

    pub filters: BTreeMap<String, FilterConfig>,
}

impl Default for CrshConfig {
    fn default() -> Self {
        Self {
            config_path: PathBuf::new(),
            root: PathBuf::from("."),
            mode: ModeName::default(),
            compile_timeout: 30,
            defaults: vec!["coffee".into(), "styl".into()],
            bundles: IndexMap::new(),
            filters: BTreeMap::new(),
        }
    }
}

impl CrshConfig {
    /// Locate and load the config file, searching upward from `start`.
    pub fn load(name: &Path, start: &Path) -> Result<Self> {
        let path = util::find_config_file(name, start)
            .ok_or_else(|| ConfigError::NotFound(name.to_path_buf()))?;
        Self::from_path(&path)
    }

    /// Load configuration from file path with unknown field detection.
    pub fn from_path(path: &Path) -> Result<Self> {
        let content =
            fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;

        let (mut config, ignored) = Self::parse_with_ignored(&content)
            .with_context(|| format!("failed to parse `{}`", path.display()))?;

        if !ignored.is_empty() {
            Self::print_unknown_fields_warning(&ignored, path);
        }

        config.config_path = crate::utils::path::absolute_dir(path);
        config.finalize();
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from a TOML string, without path resolution.
    pub fn from_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).map_err(ConfigError::Toml)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse TOML content, collecting any unknown fields.
    fn parse_with_ignored(content: &str) -> Result<(Self, Vec<String>), ConfigError> {
        let mut ignored = Vec::new();
        let deserializer = toml::Deserializer::new(content);
        let config = serde_ignored::deserialize(deserializer, |path: serde_ignored::Path| {
            ignored.push(path.to_string());
        })?;
        Ok((config, ignored))
    }

    fn print_unknown_fields_warning(fields: &[String], path: &Path) {
        let display_path = path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_else(|| path.to_string_lossy());
        log!("warning"; "unknown fields in {}, ignoring:", display_path);
        for field in fields {
            eprintln!("- {}", field);
        }
    }

    /// Resolve `root` against the config file's directory.
    fn finalize(&mut self) {
        let dir = self.config_dir().to_path_buf();
        self.root = crate::utils::path::real_path(&self.root, &dir);
    }

    /// Directory holding the config file.
    pub fn config_dir(&self) -> &Path {
        self.config_path.parent().unwrap_or(Path::new("."))
    }

    /// Validate preset names and filter declarations.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for name in &self.defaults {
            if preset(name).is_none() {
                return Err(ConfigError::invalid(
                    "defaults",
                    format!("unknown preset `{name}` (expected coffee, styl or less)"),
                ));
            }
        }

        for (ext, filter) in &self.filters {
            let field = format!("filters.{ext}");
            if filter.format.trim().is_empty() {
                return Err(ConfigError::invalid(format!("{field}.format"), "must not be empty"));
            }
            if filter.command.first().is_none_or(|p| p.trim().is_empty()) {
                return Err(ConfigError::invalid(
                    format!("{field}.command"),
                    "must name a program",
                ));
            }
        }

        if self.compile_timeout == 0 {
            return Err(ConfigError::invalid("compile_timeout", "must be at least 1 second"));
        }
        Ok(())
    }

    // ========================================================================
    // cli overrides
    // ========================================================================

    /// Force production mode (`--production`).
    pub fn force_production(&mut self) {
        self.mode = ModeName::Production;
    }

    /// Replace the output root (`--root`), resolved against `cwd`.
    pub fn override_root(&mut self, root: &Path, cwd: &Path) {
        self.root = crate::utils::path::real_path(root, cwd);
    }

    // ========================================================================
    // derived values
    // ========================================================================

    pub fn build_mode(&self) -> BuildMode {
        self.mode.into()
    }

    pub fn compile_timeout(&self) -> Duration {
        Duration::from_secs(self.compile_timeout)
    }

    /// Filter registry shared by every bundle: default presets plus the
    /// user-declared external filters.
    pub fn filter_registry(&self) -> Result<FilterRegistry, ConfigError> {
        let mut registry = FilterRegistry::empty();

        for name in &self.defaults {
            let (ext, factory) = preset(name).ok_or_else(|| {
                ConfigError::invalid("defaults", format!("unknown preset `{name}`"))
            })?;
            registry.register_shared(ext, factory);
        }

        for (ext, filter) in &self.filters {
            let factory = CommandFilter::new(ext, filter.format.as_str(), filter.command.clone())
                .with_compress_args(filter.compress_args.iter().cloned());
            registry.register_shared(ext, Arc::new(factory));
        }

        Ok(registry)
    }

    /// Publish the root and filter registry as process-wide defaults.
    pub fn install_defaults(&self) -> Result<(), ConfigError> {
        crate::filter::set_default_registry(self.filter_registry()?);
        crate::core::set_default_root(&self.root);
        Ok(())
    }

    /// Build every declared bundle in `mode`.
    pub fn bundle_registry(&self, mode: BuildMode) -> Result<BundleRegistry> {
        self.install_defaults()?;
        let registry = BundleRegistry::from_map(&self.root, &self.bundles, mode)?;
        Ok(registry.with_timeout(self.compile_timeout()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const SAMPLE: &str = r#"
root = "public/assets"
mode = "production"
compile_timeout = 5
defaults = ["coffee", "less"]

[bundles]
app = ["vendor/jquery.js", "app.coffee"]
site = ["reset.css"]

[filters.ts]
format = "js"
command = ["esbuild", "--loader=ts"]
"#;

    #[test]
    fn test_from_str_invalid_toml() {
        assert!(CrshConfig::from_str("[bundles\napp = 1").is_err());
    }

    #[test]
    fn test_defaults() {
        let config = CrshConfig::from_str("").unwrap();
        assert_eq!(config.mode, ModeName::Development);
        assert_eq!(config.build_mode(), BuildMode::DEVELOPMENT);
        assert_eq!(config.compile_timeout(), Duration::from_secs(30));
        assert_eq!(config.defaults, ["coffee", "styl"]);
        assert!(config.bundles.is_empty());
    }

    #[test]
    fn test_parse_sample() {
        let config = CrshConfig::from_str(SAMPLE).unwrap();
        assert_eq!(config.build_mode(), BuildMode::PRODUCTION);
        assert_eq!(config.compile_timeout, 5);
        assert_eq!(config.bundles["app"].len(), 2);
        assert_eq!(config.filters["ts"].command[0], "esbuild");
    }

    #[test]
    fn test_bundles_keep_declaration_order() {
        let content = "[bundles]\nzeta = [\"z.js\"]\nalpha = [\"a.js\"]\nmid = [\"m.css\"]";
        let config = CrshConfig::from_str(content).unwrap();
        let names: Vec<_> = config.bundles.keys().map(String::as_str).collect();
        assert_eq!(names, ["zeta", "alpha", "mid"]);
    }

    #[test]
    fn test_filter_registry_from_config() {
        let config = CrshConfig::from_str(SAMPLE).unwrap();
        let registry = config.filter_registry().unwrap();
        assert!(registry.has_filter("coffee"));
        assert!(registry.has_filter("less"));
        assert!(registry.has_filter("ts"));
        assert!(!registry.has_filter("styl"));
        assert_eq!(
            registry.classify(Path::new("main.ts")),
            Some(crate::core::Format::script())
        );
    }

    #[test]
    fn test_unknown_preset_rejected() {
        let err = CrshConfig::from_str("defaults = [\"sass\"]").unwrap_err();
        assert!(err.to_string().contains("unknown preset `sass`"));
    }

    #[test]
    fn test_empty_command_rejected() {
        let content = "[filters.ts]\nformat = \"js\"\ncommand = []";
        let err = CrshConfig::from_str(content).unwrap_err();
        assert!(err.to_string().contains("filters.ts.command"));
    }

    #[test]
    fn test_unknown_fields_detected() {
        let content = "root = \"out\"\nminify = true\n[bundles]\napp = [\"a.js\"]";
        let (config, ignored) = CrshConfig::parse_with_ignored(content).unwrap();
        assert_eq!(config.root, PathBuf::from("out"));
        assert_eq!(ignored, ["minify"]);
    }

    #[test]
    fn test_from_path_resolves_root() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(CONFIG_FILE);
        fs::write(&path, "root = \"public/../assets\"").unwrap();

        let config = CrshConfig::from_path(&path).unwrap();
        assert_eq!(config.root, temp.path().join("assets"));
        assert_eq!(config.config_dir(), temp.path());
    }

    #[test]
    fn test_load_searches_upward() {
        let temp = TempDir::new().unwrap();
        let nested = temp.path().join("a/b");
        fs::create_dir_all(&nested).unwrap();
        fs::write(temp.path().join(CONFIG_FILE), "mode = \"production\"").unwrap();

        let config = CrshConfig::load(Path::new(CONFIG_FILE), &nested).unwrap();
        assert_eq!(config.mode, ModeName::Production);
        assert_eq!(config.root, temp.path());
    }

    #[test]
    fn test_load_missing() {
        let temp = TempDir::new().unwrap();
        let err = CrshConfig::load(Path::new("crsh-missing-config.toml"), temp.path()).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ConfigError>(),
            Some(ConfigError::NotFound(_))
        ));
    }

    #[test]
    fn test_bundle_registry_from_file() {
        let temp = TempDir::new().unwrap();
        let assets = temp.path().join("assets");
        fs::create_dir_all(&assets).unwrap();
        fs::write(assets.join("a.js"), "a;").unwrap();
        fs::write(assets.join("b.js"), "b;").unwrap();
        let path = temp.path().join(CONFIG_FILE);
        fs::write(
            &path,
            "root = \"assets\"\ncompile_timeout = 7\n[bundles]\nvendor = [\"b.js\"]\napp = [\"a.js\", \"b.js\"]",
        )
        .unwrap();

        let config = CrshConfig::from_path(&path).unwrap();
        let mode = BuildMode {
            watch: false,
            ..config.build_mode()
        };
        let registry = config.bundle_registry(mode).unwrap();
        assert_eq!(registry.compile_timeout(), Duration::from_secs(7));
        assert_eq!(registry.names().collect::<Vec<_>>(), ["vendor", "app"]);

        let app = registry.get("app").unwrap();
        assert_eq!(app.files(), vec![assets.join("a.js"), assets.join("b.js")]);
        let stamp = app.compile().unwrap();
        assert_eq!(fs::read_to_string(stamp.path).unwrap(), "a;b;");
    }

    #[test]
    fn test_overrides() {
        let mut config = CrshConfig::from_str("").unwrap();
        config.force_production();
        config.override_root(Path::new("dist"), Path::new("/work"));
        assert_eq!(config.build_mode(), BuildMode::PRODUCTION);
        assert_eq!(config.root, PathBuf::from("/work/dist"));
    }
}
