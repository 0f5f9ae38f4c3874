//! `portcfg completions` command

use std::io::{self, Write};

use anyhow::Result;
use clap::CommandFactory;

use crate::cli::{Cli, CompletionsArgs};

pub fn execute(args: CompletionsArgs) -> Result<()> {
    let mut cmd = Cli::command();
    let mut out = io::stdout().lock();

    clap_complete::generate(args.shell, &mut cmd, "portcfg", &mut out);
    out.flush()?;

    Ok(())
}
