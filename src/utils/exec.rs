//! External command execution utilities.
//!
//! Dialect compilers (coffee, stylus, lessc, ...) are driven as filters:
//! source goes in on stdin, compiled text comes back on stdout.
//!
//! # Examples
//!
//! ```ignore
//! use crate::utils::exec::Cmd;
//!
//! let css = Cmd::new("stylus")
//!     .args(["--compress"])
//!     .cwd(base)
//!     .stdin(source)
//!     .run_text()?;
//! ```

use anyhow::{Context, Result, bail};
use std::{
    ffi::{OsStr, OsString},
    io::Write,
    path::{Path, PathBuf},
    process::{Command, Output, Stdio},
};

/// Command builder for external process execution.
#[derive(Debug, Default, Clone)]
pub struct Cmd {
    program: OsString,
    args: Vec<OsString>,
    cwd: Option<PathBuf>,
    stdin_data: Option<Vec<u8>>,
}

impl Cmd {
    /// Create a new command builder.
    pub fn new<S: AsRef<OsStr>>(program: S) -> Self {
        Self {
            program: program.as_ref().to_owned(),
            ..Default::default()
        }
    }

    /// Add a single argument. Empty arguments are skipped.
    pub fn arg<S: AsRef<OsStr>>(mut self, arg: S) -> Self {
        let arg = arg.as_ref();
        if !arg.is_empty() {
            self.args.push(arg.to_owned());
        }
        self
    }

    /// Add multiple arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        for arg in args {
            self = self.arg(arg);
        }
        self
    }

    /// Set working directory.
    pub fn cwd<P: AsRef<Path>>(mut self, dir: P) -> Self {
        self.cwd = Some(dir.as_ref().to_owned());
        self
    }

    /// Set stdin data to pipe to the process.
    pub fn stdin<D: AsRef<[u8]>>(mut self, data: D) -> Self {
        self.stdin_data = Some(data.as_ref().to_vec());
        self
    }

    /// Get the program name for error messages.
    pub fn program_name(&self) -> String {
        self.program.to_string_lossy().to_string()
    }

    /// Execute the command and return its output.
    ///
    /// Fails when the process cannot be spawned or exits unsuccessfully.
    pub fn run(self) -> Result<Output> {
        let name = self.program_name();

        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .stdin(if self.stdin_data.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        if let Some(dir) = &self.cwd {
            cmd.current_dir(dir);
        }

        let mut child = cmd
            .spawn()
            .with_context(|| format!("failed to spawn `{name}`"))?;

        // Write stdin from a separate thread so a chatty child cannot
        // deadlock on a full stdout pipe while we are still writing.
        let writer = match (child.stdin.take(), self.stdin_data) {
            (Some(mut stdin), Some(data)) => {
                Some(std::thread::spawn(move || stdin.write_all(&data)))
            }
            _ => None,
        };

        let output = child
            .wait_with_output()
            .with_context(|| format!("failed to wait for `{name}`"))?;

        // A child that fails early closes stdin under the writer; its own
        // status and stderr are the error worth reporting.
        if !output.status.success() {
            bail!(format_error(&name, &output));
        }

        if let Some(writer) = writer {
            match writer.join() {
                Ok(res) => res.with_context(|| format!("failed to write stdin to `{name}`"))?,
                Err(_) => bail!("stdin writer for `{name}` panicked"),
            }
        }

        Ok(output)
    }

    /// Execute and decode stdout as UTF-8.
    pub fn run_text(self) -> Result<String> {
        let name = self.program_name();
        let output = self.run()?;
        String::from_utf8(output.stdout)
            .with_context(|| format!("`{name}` produced non UTF-8 output"))
    }
}

/// Format a failed command's output for error reporting.
fn format_error(name: &str, output: &Output) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let stderr = stderr.trim();
    if stderr.is_empty() {
        format!("`{name}` failed: {}", output.status)
    } else {
        format!("`{name}` failed: {}\n{stderr}", output.status)
    }
}
