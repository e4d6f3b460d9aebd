//! `lf` -- quantity evaluation CLI for the lastform recompute engine.
//!
//! Parses CLI arguments with clap and dispatches to command handlers.

mod cli;
mod commands;
mod pipeline;

use clap::Parser;

use cli::{Cli, Commands};

fn main() {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    if cli.global.verbose {
        tracing_subscriber::fmt()
            .with_env_filter("lf=debug,lastform_resolve=debug,lastform_graph=debug")
            .with_writer(std::io::stderr)
            .init();
    }

    let result = match &cli.command {
        Commands::Eval(args) => commands::eval::run(&cli.global, args),
        Commands::Check(args) => commands::check::run(&cli.global, args),
        Commands::List(args) => commands::list::run(&cli.global, args),
    };

    // Handle errors: print message and exit with code 1
    if let Err(e) = result {
        if cli.global.json {
            let err_json = serde_json::json!({
                "error": format!("{:#}", e),
            });
            if let Ok(s) = serde_json::to_string_pretty(&err_json) {
                eprintln!("{}", s);
            }
        } else {
            eprintln!("Error: {:#}", e);
        }
        std::process::exit(1);
    }
}
