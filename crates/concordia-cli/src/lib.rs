//! # concordia-cli: Command-Line Front End
//!
//! Provides the `concordia` binary over `concordia-schema`.
//!
//! ## Subcommands
//!
//! - `concordia check`: compile a schema document.
//! - `concordia validate`: validate data documents against a schema.
//! - `concordia conforms`: check that one schema extends another.
//!
//! Schema and data files may be JSON or YAML (`.yaml` / `.yml`).
//!
//! ## Exit Codes
//!
//! | Code | Meaning |
//! |------|---------|
//! | 0 | success |
//! | 1 | a schema, data document, or conformance check failed |
//! | 2 | operational error (unreadable file, bad configuration) |

pub mod check;
pub mod conforms;
pub mod validate;

use std::path::Path;

use anyhow::{Context, Result};
use concordia_schema::{load_document, Compiler, ConcordiaError, FetchConfig, RoutingFetcher, Schema};

/// Build a compiler whose references are fetched according to the
/// configuration file, or the environment when no file is given.
pub fn build_compiler(config_path: Option<&Path>) -> Result<Compiler> {
    let config = match config_path {
        Some(path) => FetchConfig::from_yaml_file(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => FetchConfig::from_env().context("invalid fetch configuration in environment")?,
    };
    tracing::debug!(?config, "fetch configuration");
    let fetcher = RoutingFetcher::from_config(&config).context("failed to set up schema fetching")?;
    Ok(Compiler::new().with_fetcher(fetcher))
}

/// Load and compile a schema file.
///
/// The outer error is operational (the file could not be read or parsed);
/// the inner one means the document is not a valid schema.
pub fn load_schema(compiler: &Compiler, path: &Path) -> Result<Result<Schema, ConcordiaError>> {
    let document = load_document(path)
        .with_context(|| format!("failed to load schema {}", path.display()))?;
    Ok(compiler.compile(document))
}
