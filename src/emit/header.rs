//! Rendering a resolution as a re-includable C/C++ header.
//!
//! Every definition is wrapped in its own `#ifndef` guard and the whole
//! file in an include guard, so including the header twice, or alongside
//! a hand-written definition of the same symbol, is a no-op rather than a
//! redefinition.

use std::collections::HashSet;
use std::fmt::Write as _;

use crate::core::symbol::{Definition, PortableSymbol};
use crate::resolver::names::{YIELD_HEADER, YIELD_NAME};
use crate::resolver::{Resolution, RuleOutcome};

/// Marker line carrying the inputs fingerprint.
pub const FINGERPRINT_MARKER: &str = " * fingerprint: ";

/// Options controlling the header layout.
#[derive(Debug, Clone, Default)]
pub struct HeaderOptions {
    /// Include guard; defaults to `<PREFIX>_PORTABILITY_H_`
    pub include_guard: Option<String>,
    /// Generated config header to include unless `<PREFIX>_NO_CONFIG` is set
    pub config_header: Option<String>,
    /// Fingerprint recorded in the banner
    pub fingerprint: Option<String>,
}

/// Render the header text.
pub fn render(resolution: &Resolution, opts: &HeaderOptions) -> String {
    let names = &resolution.names;
    let guard = opts
        .include_guard
        .clone()
        .unwrap_or_else(|| names.include_guard());

    let mut out = String::new();

    // Banner
    out.push_str("/*\n");
    out.push_str(" * Generated by portcfg. Do not edit.\n");
    let _ = writeln!(out, " * facts: {}", resolution.facts.summary());
    if let Some(fp) = &opts.fingerprint {
        let _ = writeln!(out, "{}{}", FINGERPRINT_MARKER, fp);
    }
    out.push_str(" */\n\n");

    let _ = writeln!(out, "#ifndef {}", guard);
    let _ = writeln!(out, "#define {}", guard);
    out.push('\n');

    // Prelude
    if let Some(config) = &opts.config_header {
        let _ = writeln!(out, "#ifndef {}", names.no_config());
        let _ = writeln!(out, "#include \"{}\"", config);
        out.push_str("#endif\n\n");
    }

    let mut includes = Vec::new();
    if resolution.facts.features.has_header("features.h") {
        includes.push("features.h");
    }
    if resolution.symbols.is_defined(YIELD_NAME) {
        includes.push(YIELD_HEADER);
    }
    for header in &includes {
        let _ = writeln!(out, "#include <{}>", header);
    }
    if !includes.is_empty() {
        out.push('\n');
    }

    // Symbols, grouped by the rule that produced them
    let mut rendered: HashSet<&str> = HashSet::new();
    for outcome in &resolution.outcomes {
        let group: Vec<&PortableSymbol> = outcome
            .defined
            .iter()
            .chain(&outcome.unchanged)
            .filter_map(|name| resolution.symbols.get(name))
            .collect();

        if group.is_empty() {
            render_undefined_note(&mut out, outcome);
            continue;
        }

        let _ = writeln!(out, "// {}: {}", outcome.rule, outcome.decision);
        render_group(&mut out, &group);
        out.push('\n');
        rendered.extend(group.iter().map(|s| s.name.as_str()));
    }

    // Symbols registered outside of any rule outcome
    for symbol in resolution.symbols.iter() {
        if !rendered.contains(symbol.name.as_str()) {
            render_group(&mut out, &[symbol]);
            out.push('\n');
        }
    }

    let _ = writeln!(out, "#endif // {}", guard);
    out
}

/// Extract the fingerprint from previously rendered header text.
pub fn read_fingerprint(text: &str) -> Option<&str> {
    text.lines()
        .find_map(|line| line.strip_prefix(FINGERPRINT_MARKER))
        .map(str::trim)
}

fn render_undefined_note(out: &mut String, outcome: &RuleOutcome) {
    if outcome.undefined.is_empty() {
        return;
    }
    let _ = writeln!(
        out,
        "// {}: {} ({} left undefined)\n",
        outcome.rule,
        outcome.decision,
        outcome.undefined.join(", ")
    );
}

/// Render one or more symbols under a single guard.
///
/// Multi-symbol groups are guarded on all names at once so a pair is
/// either defined together or not at all.
fn render_group(out: &mut String, group: &[&PortableSymbol]) {
    let guard = match group {
        [single] => format!("#ifndef {}", guard_name(single)),
        many => {
            let conds: Vec<String> = many
                .iter()
                .map(|s| format!("!defined({})", guard_name(s)))
                .collect();
            format!("#if {}", conds.join(" && "))
        }
    };

    let _ = writeln!(out, "{}", guard);
    for symbol in group {
        render_symbol(out, symbol);
    }
    out.push_str("#endif\n");
}

fn render_symbol(out: &mut String, symbol: &PortableSymbol) {
    match &symbol.definition {
        Definition::Type(decl) => {
            let _ = writeln!(out, "# define {}", guard_name(symbol));
            let _ = writeln!(out, "{}", decl);
        }
        Definition::FunctionLike { params, body } => {
            let _ = writeln!(out, "# define {}({}) {}", symbol.name, params.join(", "), body);
        }
        Definition::Empty => {
            let _ = writeln!(out, "# define {}", symbol.name);
        }
        def => {
            let _ = writeln!(out, "# define {} {}", symbol.name, def.expansion());
        }
    }
}

/// Types cannot be tested with `#ifdef`, so they get a companion macro.
fn guard_name(symbol: &PortableSymbol) -> String {
    match symbol.definition {
        Definition::Type(_) => format!("{}_DEFINED", symbol.name.to_uppercase()),
        _ => symbol.name.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::Resolver;
    use crate::test_support::fixtures;

    fn render_default(facts: &crate::core::BuildFacts) -> String {
        let resolution = Resolver::default().resolve(facts).unwrap();
        render(&resolution, &HeaderOptions::default())
    }

    #[test]
    fn test_header_has_include_guard() {
        let text = render_default(&fixtures::modern_gcc());
        assert!(text.contains("#ifndef PORTCFG_PORTABILITY_H_\n#define PORTCFG_PORTABILITY_H_"));
        assert!(text.trim_end().ends_with("#endif // PORTCFG_PORTABILITY_H_"));
    }

    #[test]
    fn test_every_define_is_guarded() {
        let text = render_default(&fixtures::sanitized_gcc());
        let lines: Vec<&str> = text.lines().collect();

        for (i, line) in lines.iter().enumerate() {
            if let Some(rest) = line.strip_prefix("# define ") {
                let name = rest.split(|c: char| c == ' ' || c == '(').next().unwrap();
                let guarded = lines[..i]
                    .iter()
                    .rev()
                    .take_while(|l| !l.starts_with("#endif"))
                    .any(|l| {
                        (l.starts_with("#ifndef") || l.starts_with("#if ")) && l.contains(name)
                    });
                assert!(guarded, "`{}` is not guarded:\n{}", name, text);
            }
        }
    }

    #[test]
    fn test_pairs_share_a_guard() {
        let text = render_default(&fixtures::modern_gcc());
        assert!(text.contains("#if !defined(PORTCFG_FINAL) && !defined(PORTCFG_OVERRIDE)"));
        assert!(text.contains("# define PORTCFG_FINAL final\n# define PORTCFG_OVERRIDE override"));
        assert!(text.contains(
            "#if !defined(PORTCFG_NAMESPACE_STD_BEGIN) && !defined(PORTCFG_NAMESPACE_STD_END)"
        ));
    }

    #[test]
    fn test_type_uses_companion_guard() {
        let text = render_default(&fixtures::modern_gcc());
        assert!(text.contains(
            "#ifndef PORTCFG_MAXALIGN_DEFINED\n# define PORTCFG_MAXALIGN_DEFINED\n\
             struct PORTCFG_MaxAlign { char c; } __attribute__((aligned));\n#endif"
        ));
    }

    #[test]
    fn test_yield_alias_pulls_in_sched_h() {
        let text = render_default(&fixtures::modern_gcc());
        assert!(text.contains("#include <sched.h>"));
        assert!(text.contains("# define pthread_yield sched_yield"));
    }

    #[test]
    fn test_config_include_and_fingerprint() {
        let resolution = Resolver::default().resolve(&fixtures::modern_gcc()).unwrap();
        let text = render(
            &resolution,
            &HeaderOptions {
                include_guard: Some("MY_GUARD_H".into()),
                config_header: Some("myproj-config.h".into()),
                fingerprint: Some("0123456789abcdef".into()),
            },
        );

        assert!(text.contains("#ifndef PORTCFG_NO_CONFIG\n#include \"myproj-config.h\"\n#endif"));
        assert!(text.contains("#define MY_GUARD_H"));
        assert_eq!(read_fingerprint(&text), Some("0123456789abcdef"));
    }

    #[test]
    fn test_undefined_flags_are_noted_not_defined() {
        let text = render_default(&fixtures::legacy_gcc());
        assert!(!text.contains("# define PORTCFG_HAVE_PREADV"));
        assert!(text.contains("PORTCFG_HAVE_PREADV, PORTCFG_HAVE_PWRITEV left undefined"));
        assert!(text.contains("# define PORTCFG_DISABLE_ADDRESS_SANITIZER\n"));
    }

    #[test]
    fn test_render_is_deterministic() {
        let facts = fixtures::libcxx_clang();
        assert_eq!(render_default(&facts), render_default(&facts));
    }
}
