//! `portcfg probe` command

use anyhow::Result;

use crate::cli::ProbeArgs;
use portcfg::probe::{probe, ProbeOptions};

pub fn execute(args: ProbeArgs) -> Result<()> {
    let config = super::current_config()?;

    let opts: ProbeOptions = args.compiler.into();
    let mut facts = probe(&opts)?;
    config.apply_facts(&mut facts);

    eprintln!("# {}", facts.summary());
    print!("{}", facts.to_toml()?);

    Ok(())
}
