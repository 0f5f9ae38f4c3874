//! User-friendly diagnostic messages.
//!
//! Errors carry the root cause, the facts that led to it, and suggested fixes.

use std::fmt;
use std::path::PathBuf;

/// Common suggestion messages for consistent error handling.
pub mod suggestions {
    /// Suggestion when no facts source was given.
    pub const NO_FACTS: &str =
        "help: Pass `--facts <file.toml>`, or `--cc <compiler>` to probe a compiler";

    /// Suggestion when the probe cannot find a compiler.
    pub const NO_COMPILER: &str = "help: Set CXX or pass `--cc <compiler>`";

    /// Suggestion when a symbol name is not recognized.
    pub const UNKNOWN_SYMBOL: &str = "help: Run `portcfg explain --facts <file>` to list every symbol";

    /// Suggestion when a check matrix reports violations.
    pub const CHECK_FAILED: &str = "help: Run `portcfg explain --facts <case>` on a failing case";
}

/// A diagnostic message with optional suggestions.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    /// Primary message
    pub message: String,
    /// Additional context lines
    pub context: Vec<String>,
    /// Suggested fixes
    pub suggestions: Vec<String>,
    /// Related location (file path)
    pub location: Option<PathBuf>,
}

impl Diagnostic {
    /// Create a new error diagnostic.
    pub fn error(message: impl Into<String>) -> Self {
        Diagnostic {
            message: message.into(),
            context: Vec::new(),
            suggestions: Vec::new(),
            location: None,
        }
    }

    /// Add context to the diagnostic.
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context.push(context.into());
        self
    }

    /// Add a suggestion for fixing the issue.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }

    /// Add a file location.
    pub fn with_location(mut self, path: impl Into<PathBuf>) -> Self {
        self.location = Some(path.into());
        self
    }

    /// Format the diagnostic for terminal output.
    pub fn format(&self, color: bool) -> String {
        let mut output = String::new();

        let error = if color { "\x1b[1;31merror\x1b[0m" } else { "error" };

        // Main message
        output.push_str(&format!("{}: {}\n", error, self.message));

        // Location if present
        if let Some(ref path) = self.location {
            output.push_str(&format!("  --> {}\n", path.display()));
        }

        // Context lines
        for ctx in &self.context {
            output.push_str(&format!("  = {}\n", ctx));
        }

        // Suggestions
        if !self.suggestions.is_empty() {
            output.push('\n');
            let help_prefix = if color {
                "\x1b[1;32mhelp\x1b[0m"
            } else {
                "help"
            };
            output.push_str(&format!("{}: consider:\n", help_prefix));
            for (i, suggestion) in self.suggestions.iter().enumerate() {
                output.push_str(&format!("  {}. {}\n", i + 1, suggestion));
            }
        }

        output
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format(false))
    }
}
