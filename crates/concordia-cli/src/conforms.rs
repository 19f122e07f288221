//! # Conforms Subcommand
//!
//! Checks that an extending schema is a compatible refinement of an
//! original schema.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use concordia_schema::Compiler;

/// Arguments for the `concordia conforms` subcommand.
#[derive(Args, Debug)]
pub struct ConformsArgs {
    /// The extending schema.
    #[arg(value_name = "EXTENDER")]
    pub extender: PathBuf,

    /// The schema being extended.
    #[arg(value_name = "ORIGINAL")]
    pub original: PathBuf,
}

/// Execute the conforms subcommand.
///
/// Returns exit code: 0 if the extender conforms, 1 if it does not or if
/// either schema is invalid.
pub fn run_conforms(args: &ConformsArgs, compiler: &Compiler) -> Result<u8> {
    let extender = match crate::load_schema(compiler, &args.extender)? {
        Ok(schema) => schema,
        Err(e) => {
            println!("FAIL: schema {}: {e}", args.extender.display());
            return Ok(1);
        }
    };
    let original = match crate::load_schema(compiler, &args.original)? {
        Ok(schema) => schema,
        Err(e) => {
            println!("FAIL: schema {}: {e}", args.original.display());
            return Ok(1);
        }
    };

    match extender.conforms_to(&original) {
        Ok(()) => {
            println!(
                "CONFORMS: {} extends {}",
                args.extender.display(),
                args.original.display()
            );
            Ok(0)
        }
        Err(e) => {
            println!(
                "FAIL: {} does not conform to {}: {e}",
                args.extender.display(),
                args.original.display()
            );
            Ok(1)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use concordia_schema::HookRegistry;
    use std::path::Path;
    use std::sync::Arc;

    fn compiler() -> Compiler {
        Compiler::new().with_hooks(Arc::new(HookRegistry::new()))
    }

    fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn narrowing_extender_conforms() {
        let dir = tempfile::tempdir().unwrap();
        let args = ConformsArgs {
            extender: write(
                dir.path(),
                "extender.json",
                r#"{"type":"object","schema":[{"name":"f","type":"number"},{"name":"g","type":"string"}]}"#,
            ),
            original: write(
                dir.path(),
                "original.yaml",
                "type: object\nschema:\n  - name: f\n    type: number\n    optional: true\n",
            ),
        };
        assert_eq!(run_conforms(&args, &compiler()).unwrap(), 0);
    }

    #[test]
    fn widening_extender_fails() {
        let dir = tempfile::tempdir().unwrap();
        let args = ConformsArgs {
            extender: write(
                dir.path(),
                "extender.json",
                r#"{"type":"object","schema":[{"name":"f","type":"number","optional":true}]}"#,
            ),
            original: write(
                dir.path(),
                "original.json",
                r#"{"type":"object","schema":[{"name":"f","type":"number"}]}"#,
            ),
        };
        assert_eq!(run_conforms(&args, &compiler()).unwrap(), 1);
    }

    #[test]
    fn invalid_original_fails() {
        let dir = tempfile::tempdir().unwrap();
        let args = ConformsArgs {
            extender: write(dir.path(), "extender.json", r#"{"type":"object","schema":[]}"#),
            original: write(dir.path(), "original.json", r#"{"type":"object"}"#),
        };
        assert_eq!(run_conforms(&args, &compiler()).unwrap(), 1);
    }
}
