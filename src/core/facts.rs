//! Compile-time facts consumed by the capability resolver.
//!
//! A `BuildFacts` value is the whole of what the resolver is allowed to
//! look at. It is produced either from a fixture file or by probing a
//! compiler (see `crate::probe`), and is immutable once built.

use std::collections::BTreeSet;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::core::compiler::{CompilerFamily, LibcFamily, StdLibFamily, Version};

/// Which compiler is processing the source, and at which version.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CompilerFact {
    pub family: CompilerFamily,
    #[serde(default)]
    pub version: Version,
}

impl CompilerFact {
    pub fn new(family: CompilerFamily, version: Version) -> Self {
        CompilerFact { family, version }
    }
}

/// Which C library is linked, and at which release.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LibcFact {
    pub family: LibcFamily,
    #[serde(default)]
    pub version: Version,
}

/// Boolean availability facts, stored as sets of names that are present.
///
/// Anything not listed is treated as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureFacts {
    /// Optional platform headers that exist (e.g. `sched.h`)
    pub headers: BTreeSet<String>,
    /// Optional library functions that exist (e.g. `pthread_yield`)
    pub functions: BTreeSet<String>,
    /// `__has_feature(...)` queries that succeed (clang family only)
    pub compiler_features: BTreeSet<String>,
    /// `__has_attribute(...)` queries that succeed (clang family only)
    pub attributes: BTreeSet<String>,
    /// Instrumentation macros predefined by the compiler (e.g. `__SANITIZE_ADDRESS__`)
    pub predefined: BTreeSet<String>,
}

impl FeatureFacts {
    pub fn has_header(&self, name: &str) -> bool {
        self.headers.contains(name)
    }

    pub fn has_function(&self, name: &str) -> bool {
        self.functions.contains(name)
    }

    pub fn has_feature(&self, name: &str) -> bool {
        self.compiler_features.contains(name)
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.attributes.contains(name)
    }

    pub fn is_predefined(&self, name: &str) -> bool {
        self.predefined.contains(name)
    }
}

/// The complete set of compile-time facts for one build configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildFacts {
    pub compiler: CompilerFact,

    #[serde(default)]
    pub stdlib: StdLibFamily,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub libc: Option<LibcFact>,

    #[serde(default)]
    pub features: FeatureFacts,
}

impl BuildFacts {
    /// Facts for a compiler with no library or feature information.
    pub fn for_compiler(family: CompilerFamily, version: Version) -> Self {
        BuildFacts {
            compiler: CompilerFact::new(family, version),
            stdlib: StdLibFamily::Unknown,
            libc: None,
            features: FeatureFacts::default(),
        }
    }

    /// Load facts from a TOML fixture file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read facts file: {}", path.display()))?;

        Self::from_toml(&contents)
            .with_context(|| format!("failed to parse facts file: {}", path.display()))
    }

    /// Parse facts from a TOML string.
    pub fn from_toml(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Serialize facts to TOML.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("failed to serialize facts")
    }

    /// A one-line summary, e.g. `gcc 4.8 / libstdc++ / glibc 2.17`.
    pub fn summary(&self) -> String {
        let mut s = format!(
            "{} {} / {}",
            self.compiler.family, self.compiler.version, self.stdlib
        );
        if let Some(libc) = &self.libc {
            s.push_str(&format!(" / {} {}", libc.family, libc.version));
        }
        s
    }
}
