//! Compiler and library identity types.
//!
//! These are the identity halves of the compile-time facts: which toolchain
//! is processing the source, at which version, and which C++ standard
//! library and C library it is paired with.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The family of a compiler, independent of its version.
///
/// Families the resolver has no knowledge of are kept as `Other` so that
/// degraded rules can still run and the fatal alignment rule can name the
/// offending toolchain.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum CompilerFamily {
    /// GCC (GNU Compiler Collection)
    Gcc,
    /// Clang/LLVM
    Clang,
    /// Apple Clang (macOS)
    AppleClang,
    /// Microsoft Visual C++
    Msvc,
    /// Any compiler not recognized above
    Other(String),
}

impl CompilerFamily {
    /// Get the family name as a string.
    pub fn as_str(&self) -> &str {
        match self {
            CompilerFamily::Gcc => "gcc",
            CompilerFamily::Clang => "clang",
            CompilerFamily::AppleClang => "apple-clang",
            CompilerFamily::Msvc => "msvc",
            CompilerFamily::Other(name) => name,
        }
    }

    /// Whether this compiler answers `__has_feature` / `__has_attribute` queries.
    pub fn is_clang_like(&self) -> bool {
        matches!(self, CompilerFamily::Clang | CompilerFamily::AppleClang)
    }

    /// Whether this is one of the families the resolver knows by name.
    pub fn is_known(&self) -> bool {
        !matches!(self, CompilerFamily::Other(_))
    }
}

impl FromStr for CompilerFamily {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_lowercase().as_str() {
            "gcc" | "gnu" | "g++" => CompilerFamily::Gcc,
            "clang" | "llvm" | "clang++" => CompilerFamily::Clang,
            "apple-clang" | "appleclang" | "apple_clang" => CompilerFamily::AppleClang,
            "msvc" | "cl" => CompilerFamily::Msvc,
            _ => CompilerFamily::Other(s.to_string()),
        })
    }
}

impl From<String> for CompilerFamily {
    fn from(s: String) -> Self {
        match s.parse() {
            Ok(family) => family,
            Err(never) => match never {},
        }
    }
}

impl From<CompilerFamily> for String {
    fn from(family: CompilerFamily) -> Self {
        family.as_str().to_string()
    }
}

impl fmt::Display for CompilerFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A `major.minor` version, as compilers and C libraries report them.
///
/// Ordering is lexicographic on `(major, minor)`. It matches the packed
/// `(major << 16) + minor` comparison used by the version gate as long as
/// `minor <= Version::MAX_MINOR`, which every parsed version satisfies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Version {
    pub major: u32,
    pub minor: u32,
}

impl Version {
    /// Largest minor that fits the 16-bit minor field of the packed form.
    pub const MAX_MINOR: u32 = 0xFFFF;

    pub const fn new(major: u32, minor: u32) -> Self {
        Version { major, minor }
    }

    /// Like `new`, but `None` when the minor would overflow the packed form.
    pub fn checked(major: u32, minor: u32) -> Option<Self> {
        (minor <= Self::MAX_MINOR).then_some(Version { major, minor })
    }

    /// Pack into the single integer used by the version-gate macro.
    pub fn packed(&self) -> u64 {
        ((self.major as u64) << 16) + self.minor as u64
    }
}

/// Error returned when parsing an invalid `major.minor` version string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionParseError(pub String);

impl fmt::Display for VersionParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid version '{}', expected `major` or `major.minor` (e.g. 4.7)",
            self.0
        )
    }
}

impl std::error::Error for VersionParseError {}

impl FromStr for Version {
    type Err = VersionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || VersionParseError(s.to_string());
        let mut parts = s.trim().split('.');

        let major = parts
            .next()
            .filter(|p| !p.is_empty())
            .ok_or_else(err)?
            .parse()
            .map_err(|_| err())?;

        // Patch levels are accepted and ignored; no gate looks past minor.
        let minor = match parts.next() {
            Some(p) => p.parse().map_err(|_| err())?,
            None => 0,
        };

        Version::checked(major, minor).ok_or_else(err)
    }
}

impl TryFrom<String> for Version {
    type Error = VersionParseError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Version> for String {
    fn from(v: Version) -> Self {
        v.to_string()
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// C++ standard library implementation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StdLibFamily {
    /// GNU libstdc++
    #[serde(rename = "libstdc++", alias = "libstdcxx")]
    Libstdcxx,
    /// LLVM libc++ (uses an inline namespace inside `std`)
    #[serde(rename = "libc++", alias = "libcxx")]
    Libcxx,
    /// Microsoft STL
    #[serde(rename = "msvc-stl", alias = "msvc")]
    MsvcStl,
    /// Not identified
    #[default]
    Unknown,
}

impl StdLibFamily {
    pub fn as_str(&self) -> &'static str {
        match self {
            StdLibFamily::Libstdcxx => "libstdc++",
            StdLibFamily::Libcxx => "libc++",
            StdLibFamily::MsvcStl => "msvc-stl",
            StdLibFamily::Unknown => "unknown",
        }
    }
}

impl fmt::Display for StdLibFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// C library implementation.
///
/// Goes through its string form in serde so it can key TOML tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum LibcFamily {
    /// GNU C library
    Glibc,
    /// musl libc
    Musl,
    /// Anything else (bionic, BSD libc, MSVC CRT)
    Other,
}

impl LibcFamily {
    pub fn as_str(&self) -> &'static str {
        match self {
            LibcFamily::Glibc => "glibc",
            LibcFamily::Musl => "musl",
            LibcFamily::Other => "other",
        }
    }
}

/// Error returned when parsing an unknown C library name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibcFamilyParseError(pub String);

impl fmt::Display for LibcFamilyParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid C library '{}', valid values: glibc, musl, other",
            self.0
        )
    }
}

impl std::error::Error for LibcFamilyParseError {}

impl FromStr for LibcFamily {
    type Err = LibcFamilyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "glibc" | "gnu" => Ok(LibcFamily::Glibc),
            "musl" => Ok(LibcFamily::Musl),
            "other" => Ok(LibcFamily::Other),
            _ => Err(LibcFamilyParseError(s.to_string())),
        }
    }
}

impl TryFrom<String> for LibcFamily {
    type Error = LibcFamilyParseError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<LibcFamily> for String {
    fn from(libc: LibcFamily) -> Self {
        libc.as_str().to_string()
    }
}

impl fmt::Display for LibcFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
