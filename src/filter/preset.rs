//! Dialect compilers driven as external commands.
//!
//! | preset   | ext      | format | command                                   |
//! |----------|----------|--------|-------------------------------------------|
//! | `coffee` | `coffee` | `js`   | `coffee --stdio --print --compile`        |
//! | `stylus` | `styl`   | `css`  | `stylus --include {dir} [--compress]`     |
//! | `less`   | `less`   | `css`  | `lessc --include-path=<paths> [-x] -`     |
//!
//! Source is piped through stdin; stdout is the compiled text. Arguments may
//! use `{file}` (source path) and `{dir}` (its directory) placeholders.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::{FilterContext, FilterFactory, Transform, TypeTable};
use crate::core::Format;
use crate::error::{BundleError, Result};
use crate::utils::exec::Cmd;

/// Filter running an external command over each file.
#[derive(Debug, Clone)]
pub struct CommandFilter {
    extension: String,
    format: Format,
    command: Vec<String>,
    /// Appended only in modes with `compress` set.
    compress_args: Vec<String>,
}

impl CommandFilter {
    /// `command[0]` is the program, looked up on `PATH` when first needed.
    pub fn new(extension: &str, format: impl Into<Format>, command: Vec<String>) -> Self {
        Self {
            extension: crate::utils::path::no_dot(extension).to_owned(),
            format: format.into(),
            command,
            compress_args: Vec::new(),
        }
    }

    /// Extra arguments used when the build mode asks for compressed output.
    pub fn with_compress_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.compress_args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn program(&self) -> Option<&str> {
        self.command.first().map(String::as_str)
    }
}

impl FilterFactory for CommandFilter {
    fn declare(&self, types: &mut TypeTable) {
        types.register(self.format.clone(), &self.extension);
    }

    fn build(&self, ctx: &FilterContext<'_>) -> Result<Arc<dyn Transform>> {
        let program = self.program().unwrap_or_default();
        let resolved = locate(program, ctx.extension)?;

        let mut args: Vec<String> = self.command.iter().skip(1).cloned().collect();
        if ctx.mode.compress {
            args.extend(self.compress_args.iter().cloned());
        }

        Ok(Arc::new(ExternalTransform {
            program: resolved,
            args,
        }))
    }
}

/// Find `program` on `PATH`, mapping absence to `MissingDependency`.
fn locate(program: &str, extension: &str) -> Result<PathBuf> {
    which::which(program).map_err(|_| BundleError::MissingDependency {
        extension: extension.to_owned(),
        dependency: program.to_owned(),
    })
}

/// A located compiler plus its argument template.
#[derive(Debug)]
struct ExternalTransform {
    program: PathBuf,
    args: Vec<String>,
}

impl Transform for ExternalTransform {
    fn apply(&self, source: &str, file: &Path) -> Result<String> {
        let dir = file.parent().unwrap_or(Path::new("."));
        let args = self.args.iter().map(|arg| expand(arg, file, dir));

        let mut cmd = Cmd::new(&self.program).args(args).stdin(source);
        if dir.is_dir() {
            cmd = cmd.cwd(dir);
        }
        cmd.run_text()
            .map_err(|e| BundleError::transform(file, format!("{e:#}")))
    }
}

/// Substitute `{file}` and `{dir}` placeholders.
fn expand(arg: &str, file: &Path, dir: &Path) -> String {
    arg.replace("{file}", &file.to_string_lossy())
        .replace("{dir}", &dir.to_string_lossy())
}

// ============================================================================
// Presets
// ============================================================================

/// CoffeeScript → script.
pub fn coffee() -> CommandFilter {
    CommandFilter::new(
        "coffee",
        Format::script(),
        ["coffee", "--stdio", "--print", "--compile"]
            .map(String::from)
            .to_vec(),
    )
}

/// Stylus → style. Relative `@import`s resolve against the source's directory.
pub fn stylus() -> CommandFilter {
    CommandFilter::new(
        "styl",
        Format::style(),
        ["stylus", "--include", "{dir}"].map(String::from).to_vec(),
    )
    .with_compress_args(["--compress"])
}

/// Less → style.
///
/// Import paths default to the bundle's base path when none are given.
#[derive(Debug, Clone, Default)]
pub struct LessFilter {
    pub include_paths: Vec<PathBuf>,
    pub compress: bool,
}

/// Less preset with default options.
pub fn less() -> LessFilter {
    LessFilter::default()
}

impl FilterFactory for LessFilter {
    fn declare(&self, types: &mut TypeTable) {
        types.register(Format::style(), "less");
    }

    fn build(&self, ctx: &FilterContext<'_>) -> Result<Arc<dyn Transform>> {
        let program = locate("lessc", ctx.extension)?;

        let paths = if self.include_paths.is_empty() {
            vec![ctx.base_path.to_path_buf()]
        } else {
            self.include_paths.clone()
        };
        let joined = std::env::join_paths(&paths)
            .map(|p| p.to_string_lossy().into_owned())
            .unwrap_or_else(|_| ctx.base_path.to_string_lossy().into_owned());

        let mut args = vec![format!("--include-path={joined}")];
        if self.compress {
            args.push("--compress".to_owned());
        }
        args.push("-".to_owned());

        Ok(Arc::new(ExternalTransform { program, args }))
    }
}

/// Look up a preset by name, returning its extension and factory.
pub fn preset(name: &str) -> Option<(&'static str, Arc<dyn FilterFactory>)> {
    match crate::utils::path::no_dot(name) {
        "coffee" => Some(("coffee", Arc::new(coffee()))),
        "styl" | "stylus" => Some(("styl", Arc::new(stylus()))),
        "less" => Some(("less", Arc::new(less()))),
        _ => None,
    }
}
