//! Version-gate helper.
//!
//! The gate answers "is the active compiler at least (major, minor)" using
//! the packed `(major << 16) + minor` comparison. An unknown compiler never
//! passes a gate.

use crate::core::{CompilerFact, Version};
use crate::core::symbol::Definition;

/// Reusable "compiler version >= (major, minor)" predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VersionGate {
    active: Option<Version>,
}

impl VersionGate {
    /// Build the gate for the active compiler.
    pub fn for_compiler(compiler: &CompilerFact) -> Self {
        VersionGate {
            active: compiler.family.is_known().then_some(compiler.version),
        }
    }

    /// A gate that never passes.
    pub fn closed() -> Self {
        VersionGate { active: None }
    }

    /// The version being compared against, if the compiler is known.
    pub fn active(&self) -> Option<Version> {
        self.active
    }

    /// Whether the active compiler is at least `min`.
    pub fn prereq(&self, min: Version) -> bool {
        match self.active {
            Some(v) => v.packed() >= min.packed(),
            None => false,
        }
    }

    /// Function-like macro equivalent of [`VersionGate::prereq`] with the
    /// active version baked in.
    pub fn to_definition(&self) -> Definition {
        let body = match self.active {
            Some(v) => format!(
                "(({} << 16) + {} >= ((maj) << 16) + (min))",
                v.major, v.minor
            ),
            None => "0".to_string(),
        };

        Definition::FunctionLike {
            params: vec!["maj".to_string(), "min".to_string()],
            body,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::CompilerFamily;

    #[test]
    fn test_prereq() {
        let gate = VersionGate::for_compiler(&CompilerFact::new(
            CompilerFamily::Gcc,
            Version::new(4, 7),
        ));
        assert!(gate.prereq(Version::new(4, 7)));
        assert!(gate.prereq(Version::new(4, 6)));
        assert!(gate.prereq(Version::new(3, 99)));
        assert!(!gate.prereq(Version::new(4, 8)));
        assert!(!gate.prereq(Version::new(5, 0)));
    }

    #[test]
    fn test_unknown_compiler_never_passes() {
        let gate = VersionGate::for_compiler(&CompilerFact::new(
            CompilerFamily::Other("tcc".into()),
            Version::new(99, 0),
        ));
        assert!(!gate.prereq(Version::new(0, 0)));
        assert_eq!(gate.active(), None);
        assert_eq!(gate.to_definition().expansion(), "0");
    }

    #[test]
    fn test_macro_body() {
        let gate = VersionGate::for_compiler(&CompilerFact::new(
            CompilerFamily::Gcc,
            Version::new(4, 8),
        ));
        assert_eq!(
            gate.to_definition().expansion(),
            "((4 << 16) + 8 >= ((maj) << 16) + (min))"
        );
    }
}
