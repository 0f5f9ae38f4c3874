//! CLI definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;

use portcfg::emit::OutputFormat;

/// portcfg - compile-time capability detection for C and C++
#[derive(Parser)]
#[command(name = "portcfg")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Resolve a configuration and write the portability header
    Generate(GenerateArgs),

    /// Introspect a compiler and print its facts as TOML
    Probe(ProbeArgs),

    /// Verify a matrix of configurations
    Check(CheckArgs),

    /// Show why symbols resolved the way they did
    Explain(ExplainArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

/// Compiler selection shared by commands that can probe.
#[derive(Args, Clone, Default)]
pub struct CompilerArgs {
    /// C++ compiler to probe (defaults to $CXX, then c++, g++, clang++)
    #[arg(long, env = "CXX")]
    pub cc: Option<PathBuf>,

    /// Extra flag passed to the compiler (repeatable)
    #[arg(long = "cflag", value_name = "FLAG", allow_hyphen_values = true)]
    pub cflags: Vec<String>,

    /// Function known to exist on the target (repeatable)
    #[arg(long = "have-function", value_name = "NAME")]
    pub functions: Vec<String>,
}

#[derive(Args)]
pub struct GenerateArgs {
    /// Facts file (TOML); probe the compiler when omitted
    #[arg(long)]
    pub facts: Option<PathBuf>,

    #[command(flatten)]
    pub compiler: CompilerArgs,

    /// Output file (defaults to stdout)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Output format
    #[arg(long, value_enum)]
    pub format: Option<OutputFormat>,

    /// Symbol prefix
    #[arg(long)]
    pub prefix: Option<String>,

    /// Rewrite the output even if it is up to date
    #[arg(long)]
    pub force: bool,
}

#[derive(Args)]
pub struct ProbeArgs {
    #[command(flatten)]
    pub compiler: CompilerArgs,
}

#[derive(Args)]
pub struct CheckArgs {
    /// Matrix file (TOML)
    pub matrix: PathBuf,

    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args)]
pub struct ExplainArgs {
    /// Facts file (TOML)
    #[arg(long)]
    pub facts: PathBuf,

    /// Only explain this symbol
    pub symbol: Option<String>,
}

#[derive(Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,
}
