//! Capability table: the thresholds and spellings the resolver consults.
//!
//! Minimum versions and attribute spellings are data, not branches in the
//! rules. The built-in table records the release history of the supported
//! toolchains; config files may override individual entries.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::core::compiler::{CompilerFamily, LibcFamily, Version};

/// GNU spelling for a maximally aligned type.
pub const GNU_ALIGNED: &str = "__attribute__((aligned))";

/// GNU spelling for the no-return attribute.
pub const GNU_NORETURN: &str = "__attribute__((noreturn))";

/// Lookup table of "family -> minimum version / spelling" entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilityTable {
    /// Spelling that makes a struct maximally aligned, per compiler family.
    /// A family missing here cannot resolve the alignment placeholder.
    pub alignment: BTreeMap<CompilerFamily, String>,

    /// No-return attribute spelling, per compiler family.
    pub noreturn: BTreeMap<CompilerFamily, String>,

    /// First compiler version accepting `final` / `override`.
    pub late_binding: BTreeMap<CompilerFamily, Version>,

    /// First C library release shipping both `preadv` and `pwritev`.
    pub vector_io: BTreeMap<LibcFamily, Version>,

    /// First compiler version predefining `__SANITIZE_ADDRESS__`
    /// (only consulted for families without `__has_feature`).
    pub sanitizer_macro: BTreeMap<CompilerFamily, Version>,
}

impl Default for CapabilityTable {
    fn default() -> Self {
        Self::builtin()
    }
}

impl CapabilityTable {
    /// The built-in table.
    pub fn builtin() -> Self {
        let gnu_like = [
            CompilerFamily::Gcc,
            CompilerFamily::Clang,
            CompilerFamily::AppleClang,
        ];

        CapabilityTable {
            alignment: gnu_like
                .iter()
                .map(|f| (f.clone(), GNU_ALIGNED.to_string()))
                .collect(),
            noreturn: gnu_like
                .iter()
                .map(|f| (f.clone(), GNU_NORETURN.to_string()))
                .collect(),
            late_binding: BTreeMap::from([
                (CompilerFamily::Gcc, Version::new(4, 7)),
                (CompilerFamily::Clang, Version::new(0, 0)),
                (CompilerFamily::AppleClang, Version::new(0, 0)),
            ]),
            vector_io: BTreeMap::from([(LibcFamily::Glibc, Version::new(2, 10))]),
            sanitizer_macro: BTreeMap::from([(CompilerFamily::Gcc, Version::new(4, 8))]),
        }
    }

    pub fn alignment_spelling(&self, family: &CompilerFamily) -> Option<&str> {
        self.alignment.get(family).map(String::as_str)
    }

    pub fn noreturn_spelling(&self, family: &CompilerFamily) -> Option<&str> {
        self.noreturn.get(family).map(String::as_str)
    }

    pub fn late_binding_min(&self, family: &CompilerFamily) -> Option<Version> {
        self.late_binding.get(family).copied()
    }

    pub fn vector_io_min(&self, libc: LibcFamily) -> Option<Version> {
        self.vector_io.get(&libc).copied()
    }

    pub fn sanitizer_macro_min(&self, family: &CompilerFamily) -> Option<Version> {
        self.sanitizer_macro.get(family).copied()
    }

    /// Return a copy of this table with the given overrides applied.
    pub fn with_overrides(&self, overrides: &TableOverrides) -> Self {
        let mut table = self.clone();
        table.merge(overrides);
        table
    }

    /// Apply overrides in place (override entries win).
    pub fn merge(&mut self, overrides: &TableOverrides) {
        extend(&mut self.alignment, &overrides.alignment);
        extend(&mut self.noreturn, &overrides.noreturn);
        extend(&mut self.late_binding, &overrides.late_binding);
        extend(&mut self.vector_io, &overrides.vector_io);
        extend(&mut self.sanitizer_macro, &overrides.sanitizer_macro);
    }
}

fn extend<K: Ord + Clone, V: Clone>(target: &mut BTreeMap<K, V>, source: &BTreeMap<K, V>) {
    for (k, v) in source {
        target.insert(k.clone(), v.clone());
    }
}

/// Partial table used by config files; every map defaults to empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableOverrides {
    pub alignment: BTreeMap<CompilerFamily, String>,
    pub noreturn: BTreeMap<CompilerFamily, String>,
    pub late_binding: BTreeMap<CompilerFamily, Version>,
    pub vector_io: BTreeMap<LibcFamily, Version>,
    pub sanitizer_macro: BTreeMap<CompilerFamily, Version>,
}

impl TableOverrides {
    pub fn is_empty(&self) -> bool {
        self.alignment.is_empty()
            && self.noreturn.is_empty()
            && self.late_binding.is_empty()
            && self.vector_io.is_empty()
            && self.sanitizer_macro.is_empty()
    }

    /// Merge another set of overrides into this one (other takes precedence).
    pub fn merge(&mut self, other: TableOverrides) {
        self.alignment.extend(other.alignment);
        self.noreturn.extend(other.noreturn);
        self.late_binding.extend(other.late_binding);
        self.vector_io.extend(other.vector_io);
        self.sanitizer_macro.extend(other.sanitizer_macro);
    }
}
