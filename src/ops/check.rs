//! Implementation of `portcfg check`.
//!
//! Evaluates a matrix of build configurations and verifies the properties
//! every resolution must satisfy, plus any per-case expectations.
//!
//! ```toml
//! [[case]]
//! name = "gcc-4.6"
//! facts = "gcc-4.6.toml"        # relative to the matrix file
//! undefined = ["PORTCFG_HAVE_PREADV"]
//!
//! [case.expect]
//! PORTCFG_FINAL = ""
//!
//! [[case]]
//! name = "msvc"
//! fatal = true
//!
//! [case.facts.compiler]
//! family = "msvc"
//! version = "19.30"
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::core::{BuildFacts, CapabilityTable, SymbolTable};
use crate::emit::{header, HeaderOptions};
use crate::resolver::rules::NamespaceBracing;
use crate::resolver::{Resolution, ResolveError, Resolver, SymbolNames};
use crate::util::config::Config;

/// A check matrix file.
#[derive(Debug, Clone, Deserialize)]
pub struct Matrix {
    #[serde(rename = "case", default)]
    pub cases: Vec<MatrixCase>,
}

/// Facts of a case: a fixture path or an inline table.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum CaseFacts {
    Path(PathBuf),
    Inline(BuildFacts),
}

/// One configuration in the matrix.
#[derive(Debug, Clone, Deserialize)]
pub struct MatrixCase {
    pub name: String,
    pub facts: CaseFacts,

    /// Expected expansions (`""` for an empty definition)
    #[serde(default)]
    pub expect: BTreeMap<String, String>,

    /// Symbols that must be left undefined
    #[serde(default)]
    pub undefined: Vec<String>,

    /// Resolution must fail
    #[serde(default)]
    pub fatal: bool,
}

impl Matrix {
    /// Load a matrix file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read matrix: {}", path.display()))?;
        let matrix: Matrix = toml::from_str(&contents)
            .with_context(|| format!("failed to parse matrix: {}", path.display()))?;

        if matrix.cases.is_empty() {
            bail!("matrix {} has no [[case]] entries", path.display());
        }
        Ok(matrix)
    }
}

/// A property the resolution failed to satisfy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Property {
    Resolves,
    AlwaysDefined,
    LateBindingPair,
    LateBindingThreshold,
    VectorIoPair,
    VectorIoThreshold,
    SanitizerSuppression,
    BalancedBracing,
    Idempotent,
    GuardedHeader,
    Expectation,
}

impl Property {
    pub fn as_str(&self) -> &'static str {
        match self {
            Property::Resolves => "resolves",
            Property::AlwaysDefined => "always-defined",
            Property::LateBindingPair => "late-binding-pair",
            Property::LateBindingThreshold => "late-binding-threshold",
            Property::VectorIoPair => "vector-io-pair",
            Property::VectorIoThreshold => "vector-io-threshold",
            Property::SanitizerSuppression => "sanitizer-suppression",
            Property::BalancedBracing => "balanced-bracing",
            Property::Idempotent => "idempotent",
            Property::GuardedHeader => "guarded-header",
            Property::Expectation => "expectation",
        }
    }
}

impl fmt::Display for Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single failed property.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PropertyViolation {
    pub case: String,
    pub property: Property,
    pub message: String,
}

impl fmt::Display for PropertyViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: [{}] {}", self.case, self.property, self.message)
    }
}

/// Result of checking one case.
#[derive(Debug, Clone, Serialize)]
pub struct CaseReport {
    pub name: String,
    pub facts: String,
    pub violations: Vec<PropertyViolation>,
}

impl CaseReport {
    pub fn passed(&self) -> bool {
        self.violations.is_empty()
    }
}

/// Result of checking a whole matrix.
#[derive(Debug, Clone, Serialize)]
pub struct CheckReport {
    pub cases: Vec<CaseReport>,
}

impl CheckReport {
    pub fn passed(&self) -> bool {
        self.cases.iter().all(CaseReport::passed)
    }

    pub fn violations(&self) -> impl Iterator<Item = &PropertyViolation> {
        self.cases.iter().flat_map(|c| c.violations.iter())
    }
}

/// Load and check a matrix file.
pub fn check_matrix(path: &Path, config: &Config) -> Result<CheckReport> {
    let matrix = Matrix::load(path)?;
    let base = path.parent().unwrap_or_else(|| Path::new("."));

    let mut cases = Vec::with_capacity(matrix.cases.len());
    for case in matrix.cases {
        let mut facts = match &case.facts {
            CaseFacts::Inline(facts) => facts.clone(),
            CaseFacts::Path(p) => BuildFacts::load(&base.join(p))
                .with_context(|| format!("in case `{}`", case.name))?,
        };
        config.apply_facts(&mut facts);
        cases.push((case, facts));
    }

    Ok(check_cases(&cases, &config.table(), &config.names()))
}

/// Check already-loaded cases in parallel.
pub fn check_cases(
    cases: &[(MatrixCase, BuildFacts)],
    table: &CapabilityTable,
    names: &SymbolNames,
) -> CheckReport {
    tracing::info!("checking {} configurations", cases.len());

    let cases = cases
        .par_iter()
        .map(|(case, facts)| {
            let resolver = Resolver::new(table.clone(), names.clone());
            check_case(&resolver, case, facts)
        })
        .collect();

    CheckReport { cases }
}

struct Checker<'a> {
    case: &'a str,
    violations: Vec<PropertyViolation>,
}

impl Checker<'_> {
    fn require(&mut self, ok: bool, property: Property, message: impl FnOnce() -> String) {
        if !ok {
            self.violations.push(PropertyViolation {
                case: self.case.to_string(),
                property,
                message: message(),
            });
        }
    }
}

fn check_case(resolver: &Resolver, case: &MatrixCase, facts: &BuildFacts) -> CaseReport {
    let mut checker = Checker {
        case: &case.name,
        violations: Vec::new(),
    };

    match resolver.resolve(facts) {
        Ok(resolution) => {
            checker.require(!case.fatal, Property::Resolves, || {
                "expected resolution to fail, but it succeeded".to_string()
            });
            check_properties(&mut checker, resolver, &resolution);
            check_expectations(&mut checker, case, &resolution);
        }
        Err(err) => {
            let expected = case.fatal && matches!(err, ResolveError::UnsupportedAlignment { .. });
            checker.require(expected, Property::Resolves, || format!("resolution failed: {}", err));
        }
    }

    tracing::debug!(
        "{}: {} violations",
        case.name,
        checker.violations.len()
    );

    CaseReport {
        name: case.name.clone(),
        facts: facts.summary(),
        violations: checker.violations,
    }
}

fn check_properties(c: &mut Checker<'_>, resolver: &Resolver, resolution: &Resolution) {
    let names = resolver.names();
    let table = resolver.table();
    let symbols = &resolution.symbols;
    let facts = &resolution.facts;

    for name in names.always_defined() {
        c.require(symbols.is_defined(&name), Property::AlwaysDefined, || {
            format!("{} is not defined", name)
        });
    }

    // final / override
    let fin = resolution.expansion(&names.final_keyword());
    let ovr = resolution.expansion(&names.override_keyword());
    let fin_set = fin.as_deref().is_some_and(|s| !s.is_empty());
    let ovr_set = ovr.as_deref().is_some_and(|s| !s.is_empty());
    c.require(fin_set == ovr_set, Property::LateBindingPair, || {
        format!("final = {:?}, override = {:?}", fin, ovr)
    });
    if let Some(min) = table.late_binding_min(&facts.compiler.family) {
        let expected = facts.compiler.version >= min;
        c.require(fin_set == expected && ovr_set == expected, Property::LateBindingThreshold, || {
            format!(
                "{} {} against minimum {}: keywords {}",
                facts.compiler.family,
                facts.compiler.version,
                min,
                if fin_set { "emitted" } else { "elided" }
            )
        });
    }

    // preadv / pwritev
    let preadv = resolution.expansion(&names.have_preadv());
    let pwritev = resolution.expansion(&names.have_pwritev());
    let pair_ok = match (&preadv, &pwritev) {
        (None, None) => true,
        (Some(a), Some(b)) => a == "1" && b == "1",
        _ => false,
    };
    c.require(pair_ok, Property::VectorIoPair, || {
        format!("preadv = {:?}, pwritev = {:?}", preadv, pwritev)
    });
    let expected_io = facts
        .libc
        .and_then(|libc| Some(libc.version >= table.vector_io_min(libc.family)?))
        .unwrap_or(false);
    c.require(preadv.is_some() == expected_io, Property::VectorIoThreshold, || {
        format!(
            "vector I/O flags {} for {:?}",
            if preadv.is_some() { "defined" } else { "undefined" },
            facts.libc.map(|l| format!("{} {}", l.family, l.version))
        )
    });

    // Sanitizer suppression
    let suppress = resolution
        .expansion(&names.disable_address_sanitizer())
        .unwrap_or_default();
    if resolution.sanitizer_active {
        c.require(suppress.contains("__noinline__"), Property::SanitizerSuppression, || {
            format!("sanitizer active but suppression is {:?}", suppress)
        });
    } else {
        c.require(suppress.is_empty(), Property::SanitizerSuppression, || {
            format!("sanitizer inactive but suppression is {:?}", suppress)
        });
    }

    // Namespace bracing
    let begin = resolution
        .expansion(&names.namespace_std_begin())
        .unwrap_or_default();
    let end = resolution
        .expansion(&names.namespace_std_end())
        .unwrap_or_default();
    c.require(NamespaceBracing::is_balanced(&begin, &end), Property::BalancedBracing, || {
        format!("`{}` ... `{}` is unbalanced", begin, end)
    });

    // Resolving again into the same table is a no-op
    let mut again: SymbolTable = symbols.clone();
    match resolver.resolve_into(facts, &mut again) {
        Ok(outcomes) => {
            let redefined: Vec<&str> = outcomes
                .iter()
                .flat_map(|o| o.defined.iter().map(String::as_str))
                .collect();
            c.require(redefined.is_empty() && &again == symbols, Property::Idempotent, || {
                format!("second pass redefined {}", redefined.join(", "))
            });
        }
        Err(err) => c.require(false, Property::Idempotent, || format!("second pass failed: {}", err)),
    }

    // The rendered header is guarded and its conditionals balance
    let text = header::render(resolution, &HeaderOptions::default());
    let guard = names.include_guard();
    let opens = text
        .lines()
        .filter(|l| l.starts_with("#if ") || l.starts_with("#ifndef ") || l.starts_with("#ifdef "))
        .count();
    let closes = text.lines().filter(|l| l.starts_with("#endif")).count();
    c.require(
        text.contains(&format!("#ifndef {}\n#define {}\n", guard, guard)) && opens == closes,
        Property::GuardedHeader,
        || format!("{} conditionals opened, {} closed", opens, closes),
    );
}

fn check_expectations(c: &mut Checker<'_>, case: &MatrixCase, resolution: &Resolution) {
    for (name, expected) in &case.expect {
        let actual = resolution.expansion(name);
        c.require(actual.as_deref() == Some(expected.as_str()), Property::Expectation, || {
            match &actual {
                Some(actual) => format!("{} expands to {:?}, expected {:?}", name, actual, expected),
                None => format!("{} is undefined, expected {:?}", name, expected),
            }
        });
    }

    for name in &case.undefined {
        c.require(!resolution.symbols.is_defined(name), Property::Expectation, || {
            format!("{} should be undefined", name)
        });
    }
}

/// Format a check report for terminal output.
pub fn format_report(report: &CheckReport) -> String {
    let mut out = String::new();

    for case in &report.cases {
        let status = if case.passed() { "[OK]" } else { "[FAIL]" };
        let _ = writeln!(out, "  {} {} ({})", status, case.name, case.facts);
        for v in &case.violations {
            let _ = writeln!(out, "      {}: {}", v.property, v.message);
        }
    }

    let failed = report.cases.iter().filter(|c| !c.passed()).count();
    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "Result: {} ({}/{} configurations passed)",
        if failed == 0 { "PASSED" } else { "FAILED" },
        report.cases.len() - failed,
        report.cases.len()
    );
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{CompilerFamily, Version};
    use crate::test_support::{fixtures, write_facts};
    use tempfile::TempDir;

    fn case(name: &str, facts: BuildFacts) -> (MatrixCase, BuildFacts) {
        (
            MatrixCase {
                name: name.to_string(),
                facts: CaseFacts::Inline(facts.clone()),
                expect: BTreeMap::new(),
                undefined: Vec::new(),
                fatal: false,
            },
            facts,
        )
    }

    fn run(cases: &[(MatrixCase, BuildFacts)]) -> CheckReport {
        check_cases(cases, &CapabilityTable::builtin(), &SymbolNames::default())
    }

    #[test]
    fn test_fixture_matrix_passes() {
        let report = run(&[
            case("modern-gcc", fixtures::modern_gcc()),
            case("legacy-gcc", fixtures::legacy_gcc()),
            case("sanitized-gcc", fixtures::sanitized_gcc()),
            case("sanitized-clang", fixtures::sanitized_clang()),
            case("libcxx-clang", fixtures::libcxx_clang()),
        ]);

        let violations: Vec<String> = report.violations().map(|v| v.to_string()).collect();
        assert!(report.passed(), "{:#?}", violations);
        assert_eq!(report.cases.len(), 5);
    }

    #[test]
    fn test_expectation_mismatch_is_reported() {
        let (mut c, facts) = case("legacy", fixtures::legacy_gcc());
        c.expect.insert("PORTCFG_FINAL".into(), "final".into());
        c.undefined.push("PORTCFG_NORETURN".into());

        let report = run(&[(c, facts)]);
        let violations: Vec<_> = report.violations().collect();
        assert_eq!(violations.len(), 2);
        assert!(violations.iter().all(|v| v.property == Property::Expectation));
        assert!(violations[0].message.contains("PORTCFG_FINAL expands to \"\""));
    }

    #[test]
    fn test_fatal_cases() {
        let msvc = BuildFacts::for_compiler(CompilerFamily::Msvc, Version::new(19, 30));

        let (mut expected, facts) = case("msvc", msvc.clone());
        expected.fatal = true;
        assert!(run(&[(expected, facts)]).passed());

        let report = run(&[case("msvc", msvc)]);
        let v: Vec<_> = report.violations().collect();
        assert_eq!(v.len(), 1);
        assert_eq!(v[0].property, Property::Resolves);
    }

    #[test]
    fn test_suppression_without_attribute_is_flagged() {
        // Instrumented clang that answers no attribute query
        let mut facts = fixtures::sanitized_clang();
        facts.features.attributes.clear();

        let report = run(&[case("bare-clang", facts)]);
        let v: Vec<_> = report.violations().collect();
        assert_eq!(v.len(), 1);
        assert_eq!(v[0].property, Property::SanitizerSuppression);
    }

    #[test]
    fn test_check_matrix_file() {
        let tmp = TempDir::new().unwrap();
        write_facts(tmp.path(), "old", &fixtures::legacy_gcc());
        let matrix = tmp.path().join("matrix.toml");
        std::fs::write(
            &matrix,
            r#"
[[case]]
name = "old"
facts = "old.toml"
undefined = ["PORTCFG_HAVE_PREADV", "PORTCFG_HAVE_PWRITEV"]

[case.expect]
PORTCFG_OVERRIDE = ""
PORTCFG_NAMESPACE_STD_BEGIN = "namespace std {"

[[case]]
name = "inline"

[case.facts.compiler]
family = "clang"
version = "3.4"
"#,
        )
        .unwrap();

        let report = check_matrix(&matrix, &Config::default()).unwrap();
        assert!(report.passed(), "{}", format_report(&report));
        assert!(format_report(&report).contains("Result: PASSED (2/2 configurations passed)"));
    }

    #[test]
    fn test_threshold_agrees_with_gate_at_widest_minor() {
        let facts = BuildFacts::for_compiler(
            CompilerFamily::Gcc,
            Version::new(4, Version::MAX_MINOR),
        );
        assert!(run(&[case("gcc-4.max", facts)]).passed());

        let facts = BuildFacts::for_compiler(
            CompilerFamily::Gcc,
            Version::new(3, Version::MAX_MINOR),
        );
        let report = run(&[case("gcc-3.max", facts)]);
        assert!(report.passed(), "{}", format_report(&report));
    }

    #[test]
    fn test_overflowing_minor_is_rejected() {
        let tmp = TempDir::new().unwrap();
        let matrix = tmp.path().join("matrix.toml");
        std::fs::write(
            &matrix,
            r#"
[[case]]
name = "bogus"

[case.facts.compiler]
family = "gcc"
version = "3.70000"
"#,
        )
        .unwrap();

        assert!(check_matrix(&matrix, &Config::default()).is_err());
    }

    #[test]
    fn test_empty_matrix_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let matrix = tmp.path().join("matrix.toml");
        std::fs::write(&matrix, "").unwrap();

        assert!(check_matrix(&matrix, &Config::default()).is_err());
    }
}
