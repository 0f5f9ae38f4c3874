//! portcfg CLI - compile-time capability detection for C and C++

use std::io::IsTerminal;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use portcfg::ResolveError;

mod cli;
mod commands;

use cli::{Cli, Commands};

fn main() {
    let cli = Cli::parse();
    let color = !cli.no_color && std::io::stderr().is_terminal();

    if let Err(e) = run(cli) {
        match e.downcast_ref::<ResolveError>() {
            Some(err) => report_resolve_error(err, color),
            None => eprintln!("error: {:#}", e),
        }
        std::process::exit(1);
    }
}

fn report_resolve_error(err: &ResolveError, color: bool) {
    match err.structured() {
        Some(structured) if color => eprintln!("{:?}", miette::Report::new(structured)),
        _ => eprint!("{}", err.to_diagnostic().format(color)),
    }
}

fn run(cli: Cli) -> Result<()> {
    let color = !cli.no_color && std::io::stderr().is_terminal();

    // Set up logging
    let filter = if cli.verbose {
        EnvFilter::new("portcfg=debug")
    } else {
        EnvFilter::new("portcfg=info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(!cli.no_color)
        .with_target(false)
        .without_time()
        .init();

    // Execute command
    match cli.command {
        Commands::Generate(args) => commands::generate::execute(args),
        Commands::Probe(args) => commands::probe::execute(args),
        Commands::Check(args) => commands::check::execute(args, color),
        Commands::Explain(args) => commands::explain::execute(args),
        Commands::Completions(args) => commands::completions::execute(args),
    }
}
