//! Ordered fallback chains.
//!
//! A chain is a prioritized list of candidates, each guarded by a
//! condition over the facts. The first candidate whose condition holds
//! wins. Chains should end with an `Always` candidate so resolution
//! terminates in a defined value.

use crate::core::{BuildFacts, CompilerFamily, Version};
use crate::resolver::gate::VersionGate;

/// A condition over the compile-time facts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition {
    /// Always holds
    Always,
    /// The active compiler is exactly this family
    Family(CompilerFamily),
    /// The active compiler answers `__has_feature` / `__has_attribute`
    ClangLike,
    /// `__has_attribute(name)` succeeds
    HasAttribute(String),
    /// The version gate passes for this minimum
    CompilerAtLeast(Version),
    /// Every inner condition holds
    All(Vec<Condition>),
}

impl Condition {
    /// Evaluate against the facts and the version gate.
    pub fn holds(&self, facts: &BuildFacts, gate: &VersionGate) -> bool {
        match self {
            Condition::Always => true,
            Condition::Family(family) => &facts.compiler.family == family,
            Condition::ClangLike => facts.compiler.family.is_clang_like(),
            Condition::HasAttribute(name) => facts.features.has_attribute(name),
            Condition::CompilerAtLeast(min) => gate.prereq(*min),
            Condition::All(conds) => conds.iter().all(|c| c.holds(facts, gate)),
        }
    }
}

/// One entry of a fallback chain.
#[derive(Debug, Clone)]
pub struct Candidate<T> {
    pub label: String,
    pub condition: Condition,
    pub value: T,
}

/// The accepted candidate of a chain, with the labels it beat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection<'a, T> {
    pub index: usize,
    pub label: &'a str,
    pub value: &'a T,
    pub rejected: Vec<&'a str>,
}

/// A prioritized list of candidate definitions.
#[derive(Debug, Clone)]
pub struct FallbackChain<T> {
    candidates: Vec<Candidate<T>>,
}

impl<T> Default for FallbackChain<T> {
    fn default() -> Self {
        FallbackChain {
            candidates: Vec::new(),
        }
    }
}

impl<T> FallbackChain<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a candidate at the lowest priority so far.
    pub fn candidate(mut self, label: impl Into<String>, condition: Condition, value: T) -> Self {
        self.candidates.push(Candidate {
            label: label.into(),
            condition,
            value,
        });
        self
    }

    /// Append the unconditional last resort.
    pub fn otherwise(self, label: impl Into<String>, value: T) -> Self {
        self.candidate(label, Condition::Always, value)
    }

    /// Candidate labels in priority order.
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.candidates.iter().map(|c| c.label.as_str())
    }

    /// Pick the first candidate whose condition holds.
    pub fn select(&self, facts: &BuildFacts, gate: &VersionGate) -> Option<Selection<'_, T>> {
        let mut rejected = Vec::new();

        for (index, candidate) in self.candidates.iter().enumerate() {
            if candidate.condition.holds(facts, gate) {
                return Some(Selection {
                    index,
                    label: &candidate.label,
                    value: &candidate.value,
                    rejected,
                });
            }
            rejected.push(candidate.label.as_str());
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain() -> FallbackChain<&'static str> {
        FallbackChain::new()
            .candidate(
                "a",
                Condition::All(vec![
                    Condition::ClangLike,
                    Condition::HasAttribute("attr_a".into()),
                ]),
                "A",
            )
            .candidate(
                "b",
                Condition::All(vec![
                    Condition::ClangLike,
                    Condition::HasAttribute("attr_b".into()),
                ]),
                "B",
            )
            .candidate("c", Condition::Family(CompilerFamily::Gcc), "C")
            .otherwise("empty", "")
    }

    fn clang() -> BuildFacts {
        BuildFacts::for_compiler(CompilerFamily::Clang, Version::new(15, 0))
    }

    #[test]
    fn test_first_match_wins() {
        let mut facts = clang();
        facts.features.attributes.insert("attr_a".into());
        facts.features.attributes.insert("attr_b".into());
        let gate = VersionGate::for_compiler(&facts.compiler);

        let chain = chain();
        let sel = chain.select(&facts, &gate).unwrap();
        assert_eq!(sel.label, "a");
        assert_eq!(*sel.value, "A");
        assert!(sel.rejected.is_empty());
    }

    #[test]
    fn test_falls_through_to_second() {
        let mut facts = clang();
        facts.features.attributes.insert("attr_b".into());
        let gate = VersionGate::for_compiler(&facts.compiler);

        let chain = chain();
        let sel = chain.select(&facts, &gate).unwrap();
        assert_eq!(sel.label, "b");
        assert_eq!(sel.rejected, ["a"]);
    }

    #[test]
    fn test_clang_without_attributes_skips_gcc_spelling() {
        let facts = clang();
        let gate = VersionGate::for_compiler(&facts.compiler);

        let chain = chain();
        let sel = chain.select(&facts, &gate).unwrap();
        assert_eq!(sel.label, "empty");
        assert_eq!(sel.index, 3);
    }

    #[test]
    fn test_gcc_takes_fixed_spelling() {
        let facts = BuildFacts::for_compiler(CompilerFamily::Gcc, Version::new(9, 0));
        let gate = VersionGate::for_compiler(&facts.compiler);

        assert_eq!(chain().select(&facts, &gate).unwrap().label, "c");
    }

    #[test]
    fn test_version_condition() {
        let facts = BuildFacts::for_compiler(CompilerFamily::Gcc, Version::new(4, 6));
        let gate = VersionGate::for_compiler(&facts.compiler);
        let chain = FallbackChain::new()
            .candidate("new", Condition::CompilerAtLeast(Version::new(4, 7)), 1)
            .otherwise("old", 0);

        assert_eq!(*chain.select(&facts, &gate).unwrap().value, 0);
        assert_eq!(chain.labels().collect::<Vec<_>>(), ["new", "old"]);
    }

    #[test]
    fn test_empty_chain_selects_nothing() {
        let facts = clang();
        let gate = VersionGate::closed();
        assert!(FallbackChain::<u8>::new().select(&facts, &gate).is_none());
    }
}
