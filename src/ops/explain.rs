//! Implementation of `portcfg explain`.
//!
//! Shows, per rule, which facts were consulted and which alternative won,
//! so a reader can tell why a symbol expanded the way it did.

use std::fmt::Write as _;

use anyhow::{bail, Result};

use crate::core::BuildFacts;
use crate::resolver::{Resolution, Resolver, RuleOutcome};
use crate::util::config::Config;
use crate::util::diagnostic::suggestions;

/// Resolve `facts` and explain every rule, or only the rules touching `symbol`.
pub fn explain(facts: &BuildFacts, config: &Config, symbol: Option<&str>) -> Result<String> {
    let resolver = Resolver::new(config.table(), config.names());
    let resolution = resolver.resolve(facts)?;

    match symbol {
        None => Ok(format_all(&resolution)),
        Some(name) => format_symbol(&resolution, name),
    }
}

fn format_all(resolution: &Resolution) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "facts: {}", resolution.facts.summary());
    let _ = writeln!(out, "symbols: {} defined", resolution.symbols.len());

    for outcome in &resolution.outcomes {
        out.push('\n');
        format_outcome(&mut out, outcome);
    }
    out
}

fn format_symbol(resolution: &Resolution, name: &str) -> Result<String> {
    let outcomes = resolution.outcomes_for(name);
    if outcomes.is_empty() {
        bail!("unknown symbol `{}`\n{}", name, suggestions::UNKNOWN_SYMBOL);
    }

    let mut out = String::new();
    match resolution.symbols.get(name) {
        Some(symbol) => {
            let _ = writeln!(out, "{} ({})", symbol, symbol.definition.kind());
        }
        None => {
            let _ = writeln!(out, "{} is undefined", name);
        }
    }

    for outcome in outcomes {
        out.push('\n');
        format_outcome(&mut out, outcome);
    }
    Ok(out)
}

fn format_outcome(out: &mut String, outcome: &RuleOutcome) {
    let _ = writeln!(out, "[{}] {}", outcome.rule, outcome.decision);
    for fact in &outcome.consulted {
        let _ = writeln!(out, "  consulted: {}", fact);
    }
    if !outcome.rejected.is_empty() {
        let _ = writeln!(out, "  rejected: {}", outcome.rejected.join(", "));
    }

    let buckets = [
        ("defined", &outcome.defined),
        ("unchanged", &outcome.unchanged),
        ("undefined", &outcome.undefined),
    ];
    for (label, names) in buckets {
        if !names.is_empty() {
            let _ = writeln!(out, "  {}: {}", label, names.join(", "));
        }
    }
}
