//! Machine-readable rendering of a resolution.

use anyhow::{Context, Result};
use serde::Serialize;

use crate::core::BuildFacts;
use crate::resolver::{Resolution, RuleOutcome};

/// One defined symbol in the JSON report.
#[derive(Debug, Serialize)]
pub struct JsonSymbol<'a> {
    pub name: &'a str,
    pub kind: &'static str,
    pub expansion: String,
}

/// The JSON report.
#[derive(Debug, Serialize)]
pub struct JsonReport<'a> {
    pub facts: &'a BuildFacts,
    pub symbols: Vec<JsonSymbol<'a>>,
    pub undefined: Vec<&'a str>,
    pub sanitizer_active: bool,
    pub outcomes: &'a [RuleOutcome],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fingerprint: Option<&'a str>,
}

impl<'a> JsonReport<'a> {
    pub fn new(resolution: &'a Resolution, fingerprint: Option<&'a str>) -> Self {
        let symbols = resolution
            .symbols
            .iter()
            .map(|s| JsonSymbol {
                name: &s.name,
                kind: s.definition.kind(),
                expansion: s.definition.expansion(),
            })
            .collect();

        let undefined = resolution
            .outcomes
            .iter()
            .flat_map(|o| o.undefined.iter().map(String::as_str))
            .collect();

        JsonReport {
            facts: &resolution.facts,
            symbols,
            undefined,
            sanitizer_active: resolution.sanitizer_active,
            outcomes: &resolution.outcomes,
            fingerprint,
        }
    }
}

/// Render the resolution as pretty-printed JSON.
pub fn render(resolution: &Resolution, fingerprint: Option<&str>) -> Result<String> {
    let report = JsonReport::new(resolution, fingerprint);
    serde_json::to_string_pretty(&report).context("failed to serialize resolution")
}
