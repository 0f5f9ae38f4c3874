//! Output rendering for resolved symbols.

pub mod header;
pub mod json;

use serde::{Deserialize, Serialize};

use crate::core::{BuildFacts, CapabilityTable};
use crate::resolver::SymbolNames;
use crate::util::hash::Fingerprint;

pub use header::HeaderOptions;

/// Output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Guarded C/C++ header
    #[default]
    Header,
    /// JSON report
    Json,
}

/// Fingerprint of everything that determines the rendered output.
pub fn inputs_fingerprint(
    facts: &BuildFacts,
    table: &CapabilityTable,
    names: &SymbolNames,
    opts: &HeaderOptions,
) -> anyhow::Result<String> {
    let mut fp = Fingerprint::new();
    fp.update_str(env!("CARGO_PKG_VERSION"))
        .update_str(&facts.to_toml()?)
        .update_str(&toml::to_string(table)?)
        .update_str(names.prefix())
        .update_opt(opts.include_guard.as_deref())
        .update_opt(opts.config_header.as_deref());
    Ok(fp.finish_short())
}
