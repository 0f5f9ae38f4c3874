//! Subprocess execution utilities.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use anyhow::{bail, Context, Result};

/// Builder for subprocess execution.
#[derive(Debug, Clone)]
pub struct ProcessBuilder {
    program: PathBuf,
    args: Vec<String>,
}

impl ProcessBuilder {
    /// Create a new process builder for the given program.
    pub fn new(program: impl AsRef<Path>) -> Self {
        ProcessBuilder {
            program: program.as_ref().to_path_buf(),
            args: Vec::new(),
        }
    }

    /// Add a single argument.
    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_string_lossy().into_owned());
        self
    }

    /// Add multiple arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args.extend(
            args.into_iter()
                .map(|s| s.as_ref().to_string_lossy().into_owned()),
        );
        self
    }

    /// Get the program path.
    pub fn get_program(&self) -> &Path {
        &self.program
    }

    /// Get the arguments.
    pub fn get_args(&self) -> &[String] {
        &self.args
    }

    /// Display the command for error messages.
    pub fn display_command(&self) -> String {
        let mut parts = vec![self.program.display().to_string()];
        parts.extend(self.args.iter().cloned());
        parts.join(" ")
    }
}

/// Captured result of a finished process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutput {
    /// Exit code, `None` if killed by a signal
    pub status: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.status == Some(0)
    }
}

/// Something that can run a process to completion.
///
/// The compiler probe goes through this seam so tests can substitute
/// canned compiler output.
pub trait CommandRunner {
    fn run(&mut self, cmd: &ProcessBuilder) -> Result<ProcessOutput>;

    /// Run and require a zero exit status.
    fn run_checked(&mut self, cmd: &ProcessBuilder) -> Result<ProcessOutput> {
        let output = self.run(cmd)?;
        if !output.success() {
            bail!(
                "`{}` failed with exit code {:?}\n{}",
                cmd.display_command(),
                output.status,
                output.stderr
            );
        }
        Ok(output)
    }
}

/// Runs processes on the host system.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&mut self, pb: &ProcessBuilder) -> Result<ProcessOutput> {
        let mut cmd = Command::new(pb.get_program());
        cmd.args(pb.get_args());
        cmd.stdin(Stdio::null());

        tracing::debug!("running `{}`", pb.display_command());

        let output = cmd
            .output()
            .with_context(|| format!("failed to execute `{}`", pb.get_program().display()))?;

        Ok(ProcessOutput {
            status: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// Find an executable in PATH.
pub fn find_executable(name: &str) -> Option<PathBuf> {
    which::which(name).ok()
}

/// Find a C++ compiler.
pub fn find_cxx_compiler() -> Option<PathBuf> {
    // Check CXX environment variable first
    if let Ok(cxx) = std::env::var("CXX") {
        if let Some(path) = find_executable(&cxx) {
            return Some(path);
        }
    }

    // Try common compilers
    for compiler in &["c++", "g++", "clang++"] {
        if let Some(path) = find_executable(compiler) {
            return Some(path);
        }
    }

    None
}
