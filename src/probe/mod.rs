//! Direct compiler introspection.
//!
//! A single preprocessor run over a small probe translation unit yields
//! every fact the resolver needs except function availability: the
//! compiler's own identity macros, the library identity macros pulled in
//! by a standard header, and marker macros that the probe defines when a
//! `__has_include`, `__has_feature` or `__has_attribute` query succeeds.

pub mod parse;

use std::io::Write;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};

use crate::core::BuildFacts;
use crate::resolver::names::YIELD_HEADER;
use crate::resolver::rules::{ASAN_FEATURE, ATTR_NO_ADDRESS_SAFETY_ANALYSIS, ATTR_NO_SANITIZE_ADDRESS};
use crate::util::diagnostic::suggestions;
use crate::util::process::{find_cxx_compiler, CommandRunner, ProcessBuilder, SystemRunner};

pub use parse::MacroDump;

/// Prefix of every marker macro the probe defines.
pub const MARKER_PREFIX: &str = "PORTCFG_PROBE_";

/// Defined when the compiler understands `__has_include`.
pub const HAS_INCLUDE_MARKER: &str = "PORTCFG_PROBE_HAS_INCLUDE";

/// Optional headers queried with `__has_include`.
pub const PROBED_HEADERS: &[&str] = &[YIELD_HEADER, "features.h"];

/// Compiler features queried with `__has_feature`.
pub const PROBED_FEATURES: &[&str] = &[ASAN_FEATURE];

/// Attributes queried with `__has_attribute`.
pub const PROBED_ATTRIBUTES: &[&str] = &[ATTR_NO_ADDRESS_SAFETY_ANALYSIS, ATTR_NO_SANITIZE_ADDRESS];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerKind {
    Header,
    Feature,
    Attribute,
}

impl MarkerKind {
    fn as_str(&self) -> &'static str {
        match self {
            MarkerKind::Header => "HEADER",
            MarkerKind::Feature => "FEATURE",
            MarkerKind::Attribute => "ATTRIBUTE",
        }
    }

    fn query(&self, name: &str) -> String {
        match self {
            MarkerKind::Header => format!("__has_include(<{}>)", name),
            MarkerKind::Feature => format!("__has_feature({})", name),
            MarkerKind::Attribute => format!("__has_attribute({})", name),
        }
    }

    fn operator(&self) -> &'static str {
        match self {
            MarkerKind::Header => "__has_include",
            MarkerKind::Feature => "__has_feature",
            MarkerKind::Attribute => "__has_attribute",
        }
    }
}

/// Marker macro name for a successful query, e.g. `PORTCFG_PROBE_HEADER_sched_h`.
pub fn marker(kind: MarkerKind, name: &str) -> String {
    let ident: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    format!("{}{}_{}", MARKER_PREFIX, kind.as_str(), ident)
}

/// The probe translation unit.
pub fn probe_source() -> String {
    let mut src = String::from("/* portcfg compiler probe */\n#include <cstdlib>\n\n");

    src.push_str("#if defined(__has_include)\n");
    src.push_str(&format!("# define {} 1\n", HAS_INCLUDE_MARKER));
    src.push_str("#endif\n\n");

    let groups = [
        (MarkerKind::Header, PROBED_HEADERS),
        (MarkerKind::Feature, PROBED_FEATURES),
        (MarkerKind::Attribute, PROBED_ATTRIBUTES),
    ];

    for (kind, names) in groups {
        src.push_str(&format!("#if defined({})\n", kind.operator()));
        for name in names {
            src.push_str(&format!("# if {}\n", kind.query(name)));
            src.push_str(&format!("#  define {} 1\n", marker(kind, name)));
            src.push_str("# endif\n");
        }
        src.push_str("#endif\n\n");
    }

    src
}

/// How to run the probe.
#[derive(Debug, Clone, Default)]
pub struct ProbeOptions {
    /// Compiler to probe; located automatically when `None`
    pub compiler: Option<PathBuf>,
    /// Extra flags, e.g. `-fsanitize=address` or `-stdlib=libc++`
    pub cflags: Vec<String>,
    /// Functions known to exist
    pub functions: Vec<String>,
}

impl ProbeOptions {
    fn resolve_compiler(&self) -> Result<PathBuf> {
        match &self.compiler {
            Some(cc) => Ok(cc.clone()),
            None => find_cxx_compiler().with_context(|| {
                format!(
                    "no C++ compiler found\n{}\n{}",
                    suggestions::NO_COMPILER,
                    suggestions::NO_FACTS
                )
            }),
        }
    }
}

/// Probe the host compiler.
pub fn probe(opts: &ProbeOptions) -> Result<BuildFacts> {
    probe_with(&mut SystemRunner, opts)
}

/// Probe a compiler through the given runner.
pub fn probe_with(runner: &mut dyn CommandRunner, opts: &ProbeOptions) -> Result<BuildFacts> {
    let compiler = opts.resolve_compiler()?;

    let mut unit = tempfile::Builder::new()
        .prefix("portcfg-probe")
        .suffix(".cpp")
        .tempfile()
        .context("failed to create probe source file")?;
    unit.write_all(probe_source().as_bytes())
        .context("failed to write probe source file")?;
    unit.flush()?;

    let cmd = ProcessBuilder::new(&compiler)
        .args(["-x", "c++", "-E", "-dM"])
        .args(&opts.cflags)
        .arg(unit.path());

    let output = runner
        .run_checked(&cmd)
        .with_context(|| format!("failed to probe compiler `{}`", compiler.display()))?;

    let dump = MacroDump::parse(&output.stdout)?;
    if dump.is_empty() {
        bail!(
            "compiler `{}` produced no macro definitions",
            compiler.display()
        );
    }
    tracing::debug!("probe read {} macros from {}", dump.len(), compiler.display());

    let mut facts = parse::facts(&dump);

    if !facts.compiler.family.is_known() {
        tracing::warn!(
            "could not identify compiler `{}`; resolution will fail",
            compiler.display()
        );
    }
    if !parse::has_include_support(&dump) {
        tracing::warn!("compiler lacks __has_include; optional headers reported absent");
    }

    facts
        .features
        .functions
        .extend(opts.functions.iter().cloned());

    Ok(facts)
}
