//! `portcfg explain` command

use anyhow::Result;

use crate::cli::ExplainArgs;
use portcfg::core::BuildFacts;
use portcfg::ops::explain;

pub fn execute(args: ExplainArgs) -> Result<()> {
    let config = super::current_config()?;

    let mut facts = BuildFacts::load(&args.facts)?;
    config.apply_facts(&mut facts);

    print!("{}", explain(&facts, &config, args.symbol.as_deref())?);

    Ok(())
}
