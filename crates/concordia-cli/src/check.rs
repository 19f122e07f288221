//! # Check Subcommand
//!
//! Compiles a schema document and reports its root kind and top-level
//! fields.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use concordia_schema::Compiler;

/// Arguments for the `concordia check` subcommand.
#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Schema document (JSON or YAML).
    #[arg(value_name = "SCHEMA")]
    pub schema: PathBuf,
}

/// Execute the check subcommand.
///
/// Returns exit code: 0 if the schema compiles, 1 if it is invalid.
pub fn run_check(args: &CheckArgs, compiler: &Compiler) -> Result<u8> {
    match crate::load_schema(compiler, &args.schema)? {
        Ok(schema) => {
            println!("OK: {} ({})", args.schema.display(), schema.kind());
            let names = schema.root().field_names();
            if !names.is_empty() {
                println!("  fields: {}", names.join(", "));
            }
            Ok(0)
        }
        Err(e) => {
            println!("FAIL: {}: {e}", args.schema.display());
            Ok(1)
        }
    }
}
