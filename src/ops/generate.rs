//! Implementation of `portcfg generate`.

use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::core::BuildFacts;
use crate::emit::{self, header, HeaderOptions, OutputFormat};
use crate::probe::{self, ProbeOptions};
use crate::resolver::{Resolution, Resolver, SymbolNames};
use crate::util::config::Config;

/// Where the facts come from.
#[derive(Debug, Clone)]
pub enum FactsSource {
    /// A TOML fixture file
    File(PathBuf),
    /// Probe a compiler
    Probe(ProbeOptions),
}

impl FactsSource {
    /// Load the facts, adding whatever the config declares.
    pub fn load(&self, config: &Config) -> Result<BuildFacts> {
        let mut facts = match self {
            FactsSource::File(path) => BuildFacts::load(path)?,
            FactsSource::Probe(opts) => probe::probe(opts)?,
        };
        config.apply_facts(&mut facts);
        Ok(facts)
    }
}

/// Options for the generate command.
#[derive(Debug, Clone, Default)]
pub struct GenerateOptions {
    /// Output file (None = stdout)
    pub output: Option<PathBuf>,

    /// Output format (None = config, then header)
    pub format: Option<OutputFormat>,

    /// Symbol prefix (None = config, then `PORTCFG`)
    pub prefix: Option<String>,

    /// Rewrite the output even if its fingerprint is unchanged
    pub force: bool,
}

/// What happened to the output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerateStatus {
    /// Written to the output file
    Written(PathBuf),
    /// Output file already up to date
    Unchanged(PathBuf),
    /// No output file; the caller prints `text`
    Stdout,
}

/// Result of a generate run.
#[derive(Debug)]
pub struct GenerateResult {
    pub resolution: Resolution,
    pub fingerprint: String,
    pub format: OutputFormat,
    pub text: String,
    pub status: GenerateStatus,
}

/// Resolve `facts` and render (and possibly write) the output.
pub fn generate(facts: &BuildFacts, opts: &GenerateOptions, config: &Config) -> Result<GenerateResult> {
    let names = match &opts.prefix {
        Some(prefix) => SymbolNames::new(prefix.clone()),
        None => config.names(),
    };
    let format = opts.format.or(config.output.format).unwrap_or_default();
    let resolver = Resolver::new(config.table(), names);

    let mut header_opts = HeaderOptions {
        include_guard: config.output.include_guard.clone(),
        config_header: config.output.config_header.clone(),
        fingerprint: None,
    };
    let fingerprint =
        emit::inputs_fingerprint(facts, resolver.table(), resolver.names(), &header_opts)?;
    header_opts.fingerprint = Some(fingerprint.clone());

    let resolution = resolver.resolve(facts)?;

    let text = match format {
        OutputFormat::Header => header::render(&resolution, &header_opts),
        OutputFormat::Json => emit::json::render(&resolution, Some(&fingerprint))?,
    };

    let status = match &opts.output {
        None => GenerateStatus::Stdout,
        Some(path) => {
            if !opts.force && existing_fingerprint(path, format).as_deref() == Some(&fingerprint) {
                tracing::info!("{} is up to date", path.display());
                GenerateStatus::Unchanged(path.clone())
            } else {
                if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                    std::fs::create_dir_all(parent).with_context(|| {
                        format!("failed to create output directory: {}", parent.display())
                    })?;
                }
                std::fs::write(path, &text)
                    .with_context(|| format!("failed to write {}", path.display()))?;
                tracing::info!(
                    "wrote {} symbols to {}",
                    resolution.symbols.len(),
                    path.display()
                );
                GenerateStatus::Written(path.clone())
            }
        }
    };

    Ok(GenerateResult {
        resolution,
        fingerprint,
        format,
        text,
        status,
    })
}

/// Fingerprint recorded in a previously generated file, if any.
fn existing_fingerprint(path: &std::path::Path, format: OutputFormat) -> Option<String> {
    let text = std::fs::read_to_string(path).ok()?;
    match format {
        OutputFormat::Header => header::read_fingerprint(&text).map(str::to_string),
        OutputFormat::Json => {
            let value: serde_json::Value = serde_json::from_str(&text).ok()?;
            value.get("fingerprint")?.as_str().map(str::to_string)
        }
    }
}
