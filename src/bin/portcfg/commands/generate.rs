//! `portcfg generate` command

use anyhow::Result;

use crate::cli::GenerateArgs;
use portcfg::ops::{generate, FactsSource, GenerateOptions, GenerateStatus};

pub fn execute(args: GenerateArgs) -> Result<()> {
    let config = super::current_config()?;

    let source = match args.facts {
        Some(path) => FactsSource::File(path),
        None => FactsSource::Probe(args.compiler.into()),
    };
    let facts = source.load(&config)?;

    let opts = GenerateOptions {
        output: args.output,
        format: args.format,
        prefix: args.prefix,
        force: args.force,
    };

    let result = generate(&facts, &opts, &config)?;

    match result.status {
        GenerateStatus::Stdout => print!("{}", result.text),
        GenerateStatus::Written(path) => {
            eprintln!("Generated {} ({})", path.display(), result.fingerprint);
        }
        GenerateStatus::Unchanged(path) => {
            eprintln!("Fresh {} ({})", path.display(), result.fingerprint);
        }
    }

    Ok(())
}
