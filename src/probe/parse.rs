//! Turning a preprocessor macro dump into `BuildFacts`.

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use regex::Regex;

use crate::core::{
    BuildFacts, CompilerFact, CompilerFamily, FeatureFacts, LibcFact, LibcFamily, StdLibFamily,
    Version,
};
use crate::resolver::rules::ASAN_MACRO;

use super::{marker, MarkerKind, HAS_INCLUDE_MARKER, PROBED_ATTRIBUTES, PROBED_FEATURES, PROBED_HEADERS};

/// Object-like macros from `-E -dM` output, by name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MacroDump {
    macros: BTreeMap<String, String>,
}

impl MacroDump {
    /// Parse `#define NAME VALUE` lines. Function-like macros are skipped.
    pub fn parse(text: &str) -> Result<Self> {
        let re = Regex::new(r"(?m)^\s*#\s*define\s+([A-Za-z_]\w*)(?:[ \t]+([^\r\n]*))?\s*$")
            .context("invalid macro pattern")?;

        let macros = re
            .captures_iter(text)
            .filter_map(|cap| {
                let name = cap.get(1)?.as_str().to_string();
                let value = cap.get(2).map_or("", |m| m.as_str()).trim().to_string();
                Some((name, value))
            })
            .collect();

        Ok(MacroDump { macros })
    }

    pub fn is_defined(&self, name: &str) -> bool {
        self.macros.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.macros.get(name).map(String::as_str)
    }

    /// Integer value of a macro, tolerating `L`/`U` suffixes.
    pub fn number(&self, name: &str) -> Option<u32> {
        let raw = self.get(name)?;
        let digits = raw.trim_end_matches(|c: char| matches!(c, 'l' | 'L' | 'u' | 'U'));
        digits.parse().ok()
    }

    fn version(&self, major: &str, minor: &str) -> Option<Version> {
        Version::checked(self.number(major)?, self.number(minor).unwrap_or(0))
    }

    pub fn len(&self) -> usize {
        self.macros.len()
    }

    pub fn is_empty(&self) -> bool {
        self.macros.is_empty()
    }
}

/// Identify the compiler. Clang also defines `__GNUC__`, so it is checked first.
pub fn compiler(dump: &MacroDump) -> CompilerFact {
    if dump.is_defined("__clang__") {
        let family = if dump.is_defined("__apple_build_version__") {
            CompilerFamily::AppleClang
        } else {
            CompilerFamily::Clang
        };
        let version = dump
            .version("__clang_major__", "__clang_minor__")
            .unwrap_or_default();
        return CompilerFact::new(family, version);
    }

    if let Some(version) = dump.version("__GNUC__", "__GNUC_MINOR__") {
        return CompilerFact::new(CompilerFamily::Gcc, version);
    }

    if let Some(ver) = dump.number("_MSC_VER") {
        // _MSC_VER is MMNN
        return CompilerFact::new(CompilerFamily::Msvc, Version::new(ver / 100, ver % 100));
    }

    CompilerFact::new(CompilerFamily::Other("unknown".into()), Version::default())
}

pub fn stdlib(dump: &MacroDump) -> StdLibFamily {
    if dump.is_defined("_LIBCPP_VERSION") {
        StdLibFamily::Libcxx
    } else if dump.is_defined("__GLIBCXX__") || dump.is_defined("__GLIBCPP__") {
        StdLibFamily::Libstdcxx
    } else if dump.is_defined("_MSVC_STL_VERSION") || dump.is_defined("_CPPLIB_VER") {
        StdLibFamily::MsvcStl
    } else {
        StdLibFamily::Unknown
    }
}

/// Only glibc identifies itself through a macro.
pub fn libc(dump: &MacroDump) -> Option<LibcFact> {
    dump.version("__GLIBC__", "__GLIBC_MINOR__")
        .map(|version| LibcFact {
            family: LibcFamily::Glibc,
            version,
        })
}

pub fn features(dump: &MacroDump) -> FeatureFacts {
    let mut features = FeatureFacts::default();

    let found = |kind, names: &[&str]| -> Vec<String> {
        names
            .iter()
            .filter(|name| dump.is_defined(&marker(kind, name)))
            .map(|name| name.to_string())
            .collect()
    };

    features.headers.extend(found(MarkerKind::Header, PROBED_HEADERS));
    features
        .compiler_features
        .extend(found(MarkerKind::Feature, PROBED_FEATURES));
    features
        .attributes
        .extend(found(MarkerKind::Attribute, PROBED_ATTRIBUTES));

    if dump.is_defined(ASAN_MACRO) {
        features.predefined.insert(ASAN_MACRO.to_string());
    }

    features
}

/// Whether header queries were answerable at all.
pub fn has_include_support(dump: &MacroDump) -> bool {
    dump.is_defined(HAS_INCLUDE_MARKER)
}

/// Build the full set of facts from a macro dump.
pub fn facts(dump: &MacroDump) -> BuildFacts {
    BuildFacts {
        compiler: compiler(dump),
        stdlib: stdlib(dump),
        libc: libc(dump),
        features: features(dump),
    }
}
