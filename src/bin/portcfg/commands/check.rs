//! `portcfg check` command

use anyhow::{bail, Result};

use crate::cli::CheckArgs;
use portcfg::ops::{check_matrix, format_report};
use portcfg::util::diagnostic::{suggestions, Diagnostic};

pub fn execute(args: CheckArgs, color: bool) -> Result<()> {
    let config = super::current_config()?;
    let report = check_matrix(&args.matrix, &config)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", format_report(&report));
    }

    if report.passed() {
        return Ok(());
    }

    let violations: Vec<_> = report.violations().collect();
    let mut diag = Diagnostic::error(format!(
        "{} property violation{} in {}",
        violations.len(),
        if violations.len() == 1 { "" } else { "s" },
        args.matrix.display()
    ))
    .with_location(&args.matrix)
    .with_suggestion(suggestions::CHECK_FAILED);
    for v in &violations {
        diag = diag.with_context(v.to_string());
    }
    eprint!("{}", diag.format(color));

    bail!("check failed")
}
