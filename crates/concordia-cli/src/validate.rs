//! # Validate Subcommand
//!
//! Validates one or more data documents against a schema and prints a
//! `PASS` / `FAIL` line per document followed by a summary.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use concordia_schema::{load_document, Compiler};

/// Arguments for the `concordia validate` subcommand.
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Schema document (JSON or YAML).
    #[arg(value_name = "SCHEMA")]
    pub schema: PathBuf,

    /// Data documents to validate.
    #[arg(value_name = "DATA", required = true, num_args = 1..)]
    pub data: Vec<PathBuf>,
}

/// Execute the validate subcommand.
///
/// Returns exit code: 0 if every document is valid, 1 if the schema or any
/// document is invalid.
pub fn run_validate(args: &ValidateArgs, compiler: &Compiler) -> Result<u8> {
    let schema = match crate::load_schema(compiler, &args.schema)? {
        Ok(schema) => schema,
        Err(e) => {
            println!("FAIL: schema {}: {e}", args.schema.display());
            return Ok(1);
        }
    };

    let mut passed = 0usize;
    for path in &args.data {
        let document = load_document(path)
            .with_context(|| format!("failed to load data {}", path.display()))?;
        match schema.validate_data(document) {
            Ok(_) => {
                passed += 1;
                println!("PASS: {}", path.display());
            }
            Err(e) => println!("FAIL: {}: {e}", path.display()),
        }
    }

    let total = args.data.len();
    println!("Data: {passed}/{total} passed");
    tracing::info!(passed, total, schema = %args.schema.display(), "validation finished");

    if passed == total {
        Ok(0)
    } else {
        Ok(1)
    }
}
