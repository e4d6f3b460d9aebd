//! CLI argument definitions.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Arguments shared by every subcommand.
#[derive(Debug, Args)]
pub struct GlobalArgs {
    /// Enable debug logging to stderr.
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    /// Emit machine-readable JSON instead of text.
    #[arg(long, global = true)]
    pub json: bool,
}

/// `lf` -- evaluate last-design quantity documents.
#[derive(Debug, Parser)]
#[command(name = "lf", version, about)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Evaluate every quantity in a document and print the values.
    Eval(EvalArgs),
    /// Resolve a document without evaluating, reporting cycles and
    /// undefined references.
    Check(CheckArgs),
    /// List the raw entries of a document.
    List(ListArgs),
}

#[derive(Debug, Args)]
pub struct EvalArgs {
    /// The quantity document (YAML or TOML).
    pub file: PathBuf,

    /// Restrict output to one variant group.
    #[arg(long, short = 'g')]
    pub group: Option<String>,
}

#[derive(Debug, Args)]
pub struct CheckArgs {
    /// The quantity document (YAML or TOML).
    pub file: PathBuf,
}

#[derive(Debug, Args)]
pub struct ListArgs {
    /// The quantity document (YAML or TOML).
    pub file: PathBuf,
}
