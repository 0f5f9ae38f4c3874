//! Command implementations

pub mod check;
pub mod completions;
pub mod explain;
pub mod generate;
pub mod probe;

use anyhow::{Context, Result};

use portcfg::probe::ProbeOptions;
use portcfg::util::config::{global_config_path, load_config, project_config_path, Config};

use crate::cli::CompilerArgs;

/// Load the global config merged with the project config of the current directory.
pub fn current_config() -> Result<Config> {
    let cwd = std::env::current_dir().context("failed to get current directory")?;
    Ok(load_config(
        global_config_path().as_deref(),
        &project_config_path(&cwd),
    ))
}

impl From<CompilerArgs> for ProbeOptions {
    fn from(args: CompilerArgs) -> Self {
        ProbeOptions {
            compiler: args.cc,
            cflags: args.cflags,
            functions: args.functions,
        }
    }
}
