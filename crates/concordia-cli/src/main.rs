//! # concordia CLI entry point
//!
//! Parses command-line arguments and dispatches to subcommand handlers.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use concordia_cli::check::{run_check, CheckArgs};
use concordia_cli::conforms::{run_conforms, ConformsArgs};
use concordia_cli::validate::{run_validate, ValidateArgs};

/// Concordia schema toolchain.
///
/// Compiles Concordia schema documents, validates data against them, and
/// checks that one schema is a compatible extension of another.
#[derive(Parser, Debug)]
#[command(name = "concordia", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Path to a YAML fetch configuration file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Compile a schema document and report whether it is valid.
    Check(CheckArgs),

    /// Validate data documents against a schema.
    Validate(ValidateArgs),

    /// Check that an extending schema conforms to an original schema.
    Conforms(ConformsArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    tracing::debug!(version = env!("CARGO_PKG_VERSION"), "concordia CLI starting");

    let result = concordia_cli::build_compiler(cli.config.as_deref()).and_then(|compiler| {
        match &cli.command {
            Commands::Check(args) => run_check(args, &compiler),
            Commands::Validate(args) => run_validate(args, &compiler),
            Commands::Conforms(args) => run_conforms(args, &compiler),
        }
    });

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(2)
        }
    }
}
