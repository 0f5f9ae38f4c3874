//! Resolution error types and diagnostics.

use miette::Diagnostic as MietteDiagnostic;
use thiserror::Error;

use crate::core::CompilerFamily;
use crate::resolver::RuleId;
use crate::util::diagnostic::Diagnostic;

/// Fatal error during capability resolution.
///
/// Only the alignment rule can fail on facts; the other variants signal a
/// malformed rule set.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("cannot define the alignment placeholder for compiler `{family}`")]
    UnsupportedAlignment { family: CompilerFamily },

    #[error("rule `{rule}` ran before its prerequisite `{prerequisite}`")]
    MissingPrerequisite { rule: RuleId, prerequisite: RuleId },

    #[error("cycle detected in rule ordering")]
    RuleCycle { rules: Vec<RuleId> },
}

impl ResolveError {
    /// Convert to a user-friendly diagnostic.
    pub fn to_diagnostic(&self) -> Diagnostic {
        match self {
            ResolveError::UnsupportedAlignment { family } => {
                Diagnostic::error(format!(
                    "cannot define a maximally-aligned type for compiler `{}`",
                    family
                ))
                .with_context("alignment correctness cannot be guessed, so there is no fallback")
                .with_suggestion(format!(
                    "Add an `[thresholds.alignment]` entry for `{}` in .portcfg/config.toml",
                    family
                ))
                .with_suggestion("Build with gcc or clang")
            }

            ResolveError::MissingPrerequisite { rule, prerequisite } => Diagnostic::error(
                format!("rule `{}` needs `{}` to run first", rule, prerequisite),
            )
            .with_context("rule prerequisites were not evaluated in order"),

            ResolveError::RuleCycle { rules } => {
                let names: Vec<_> = rules.iter().map(|r| r.as_str()).collect();
                Diagnostic::error("cycle detected in rule ordering")
                    .with_context(format!("cycle: {}", names.join(" -> ")))
            }
        }
    }
}

/// Structured form of the fatal alignment error.
#[derive(Debug, Error, MietteDiagnostic)]
#[error("no alignment spelling for compiler `{family}`")]
#[diagnostic(
    code(portcfg::resolve::unsupported_alignment),
    help("Add an alignment spelling for `{family}` under [thresholds.alignment]")
)]
pub struct UnsupportedAlignmentError {
    pub family: String,
}

impl ResolveError {
    /// The structured `miette` form, for errors that have one.
    pub fn structured(&self) -> Option<UnsupportedAlignmentError> {
        match self {
            ResolveError::UnsupportedAlignment { family } => Some(UnsupportedAlignmentError {
                family: family.to_string(),
            }),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alignment_diagnostic() {
        let err = ResolveError::UnsupportedAlignment {
            family: CompilerFamily::Msvc,
        };
        let output = err.to_diagnostic().format(false);
        assert!(output.contains("error: cannot define a maximally-aligned type"));
        assert!(output.contains("`msvc`"));
        assert!(output.contains("help: consider:"));
        assert!(output.contains("[thresholds.alignment]"));
    }

    #[test]
    fn test_cycle_diagnostic() {
        let err = ResolveError::RuleCycle {
            rules: vec![RuleId::LateBinding, RuleId::VersionGate],
        };
        let output = err.to_diagnostic().format(false);
        assert!(output.contains("late-binding -> version-gate"));
    }

    #[test]
    fn test_structured_alignment_error() {
        let err = ResolveError::UnsupportedAlignment {
            family: CompilerFamily::Other("tcc".into()),
        };
        assert_eq!(err.structured().unwrap().family, "tcc");
    }
}
