//! Test utilities and mocks for portcfg unit tests.
//!
//! # Example
//!
//! ```rust,ignore
//! use portcfg::test_support::{MockExecutor, MockProcessOutput};
//!
//! #[test]
//! fn test_example() {
//!     let mut exec = MockExecutor::new();
//!     exec.expect_prefix("g++ -x c++ -E -dM", MockProcessOutput::success("#define __GNUC__ 9\n"));
//!
//!     // Hand `exec` to anything that takes a `CommandRunner`...
//! }
//! ```

pub mod fixtures;

use std::path::{Path, PathBuf};

use anyhow::{bail, Result};

use crate::core::BuildFacts;
use crate::util::process::{CommandRunner, ProcessBuilder, ProcessOutput};

// Re-export fixtures for convenience
pub use fixtures::*;

/// Mock process output for testing command execution.
#[derive(Debug, Clone)]
pub struct MockProcessOutput {
    /// Exit status code (0 = success).
    pub status: i32,
    /// Standard output.
    pub stdout: String,
    /// Standard error.
    pub stderr: String,
}

impl MockProcessOutput {
    /// Create a successful output with the given stdout.
    pub fn success(stdout: impl Into<String>) -> Self {
        MockProcessOutput {
            status: 0,
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    /// Create a failure output with the given stderr and status code.
    pub fn failure(status: i32, stderr: impl Into<String>) -> Self {
        MockProcessOutput {
            status,
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }
}

impl Default for MockProcessOutput {
    fn default() -> Self {
        MockProcessOutput::success("")
    }
}

impl From<MockProcessOutput> for ProcessOutput {
    fn from(mock: MockProcessOutput) -> Self {
        ProcessOutput {
            status: Some(mock.status),
            stdout: mock.stdout,
            stderr: mock.stderr,
        }
    }
}

/// Pattern for matching commands in MockExecutor.
#[derive(Debug, Clone)]
pub enum CommandPattern {
    /// Exact match on full command string.
    Exact(String),
    /// Match if command starts with prefix.
    StartsWith(String),
}

impl CommandPattern {
    /// Check if this pattern matches the given command.
    pub fn matches(&self, cmd: &str) -> bool {
        match self {
            CommandPattern::Exact(s) => cmd == s,
            CommandPattern::StartsWith(s) => cmd.starts_with(s),
        }
    }
}

/// Expectation for a command execution.
#[derive(Debug, Clone)]
struct CommandExpectation {
    pattern: CommandPattern,
    output: MockProcessOutput,
}

/// Mock process executor for testing command execution.
///
/// Records every command it is asked to run and answers with the output
/// of the first matching expectation.
#[derive(Debug, Default)]
pub struct MockExecutor {
    expectations: Vec<CommandExpectation>,
    calls: Vec<String>,
}

impl MockExecutor {
    /// Create a new mock executor.
    pub fn new() -> Self {
        MockExecutor::default()
    }

    /// Add an expectation for an exact command match.
    pub fn expect(&mut self, cmd: &str, output: MockProcessOutput) -> &mut Self {
        self.expect_pattern(CommandPattern::Exact(cmd.to_string()), output)
    }

    /// Add an expectation for a command starting with a prefix.
    pub fn expect_prefix(&mut self, prefix: &str, output: MockProcessOutput) -> &mut Self {
        self.expect_pattern(CommandPattern::StartsWith(prefix.to_string()), output)
    }

    /// Add an expectation with an explicit pattern.
    pub fn expect_pattern(&mut self, pattern: CommandPattern, output: MockProcessOutput) -> &mut Self {
        self.expectations.push(CommandExpectation { pattern, output });
        self
    }

    /// Get all commands that were called.
    pub fn calls(&self) -> &[String] {
        &self.calls
    }
}

impl CommandRunner for MockExecutor {
    fn run(&mut self, cmd: &ProcessBuilder) -> Result<ProcessOutput> {
        let full_cmd = cmd.display_command();
        self.calls.push(full_cmd.clone());

        match self
            .expectations
            .iter()
            .find(|exp| exp.pattern.matches(&full_cmd))
        {
            Some(exp) => Ok(exp.output.clone().into()),
            None => bail!("unexpected command: {}", full_cmd),
        }
    }
}

/// Write `facts` as a TOML fixture file under `dir`.
pub fn write_facts(dir: &Path, name: &str, facts: &BuildFacts) -> PathBuf {
    let path = dir.join(format!("{}.toml", name));
    let text = facts.to_toml().expect("failed to serialize facts");
    std::fs::write(&path, text).expect("failed to write facts file");
    path
}

/// Assertion helpers for testing.
pub mod assertions {
    /// Assert that an error message contains a substring.
    pub fn assert_error_contains<T: std::fmt::Debug>(
        result: anyhow::Result<T>,
        substring: &str,
    ) {
        match result {
            Ok(v) => panic!("expected Err containing '{}', got Ok: {:?}", substring, v),
            Err(e) => {
                let msg = format!("{:#}", e);
                assert!(
                    msg.contains(substring),
                    "error '{}' does not contain '{}'",
                    msg,
                    substring
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_executor_basic() {
        let mut exec = MockExecutor::new();

        exec.expect("g++ --version", MockProcessOutput::success("g++ 12.0.0"));
        exec.expect_prefix("clang++ -x", MockProcessOutput::failure(1, "boom"));

        let result = exec.run(&ProcessBuilder::new("g++").arg("--version")).unwrap();
        assert!(result.success());
        assert_eq!(result.stdout, "g++ 12.0.0");

        let result = exec
            .run(&ProcessBuilder::new("clang++").args(["-x", "c++"]))
            .unwrap();
        assert!(!result.success());
        assert_eq!(exec.calls(), ["g++ --version", "clang++ -x c++"]);
    }

    #[test]
    fn test_mock_executor_unexpected() {
        let mut exec = MockExecutor::new();

        let result = exec.run(&ProcessBuilder::new("unknown"));
        assert!(result.is_err());
    }

    #[test]
    fn test_write_facts_roundtrip() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = write_facts(tmp.path(), "gcc", &modern_gcc());

        assert_eq!(BuildFacts::load(&path).unwrap(), modern_gcc());
    }
}
