//! # concordia-schema: Concordia Schema Language
//!
//! Compiles Concordia schema documents, validates JSON data against them,
//! checks that one schema conforms to (extends) another, and resolves
//! externally hosted sub-schemas referenced with `$ref`.
//!
//! ## Pipeline
//!
//! 1. **Compile** ([`compile`], [`reference`]): a schema document is parsed,
//!    checked against the meta-schema node by node, its references are
//!    fetched and compiled, and the result is frozen into a [`Schema`].
//! 2. **Validate data** ([`data`]): [`Schema::validate_data`] walks the
//!    compiled tree alongside a data instance and returns the instance on
//!    success.
//! 3. **Check conformance** ([`conform`]): [`Schema::conforms_to`] compares
//!    two compiled trees.
//!
//! Extension hooks ([`hooks`]) add per-kind rules to steps 1 and 2.
//! Reference transport is pluggable through [`SchemaFetcher`] ([`fetch`]).
//!
//! ```
//! use concordia_schema::{ConcordiaError, DataError, Schema};
//!
//! let schema = Schema::compile(
//!     r#"{"type":"object","schema":[
//!         {"name":"n","type":"number"},
//!         {"name":"s","type":"string","optional":true}
//!     ]}"#,
//! )
//! .unwrap();
//!
//! assert!(schema.validate_data(r#"{"n":3}"#).is_ok());
//! assert!(matches!(
//!     schema.validate_data(r#"{"s":"y"}"#),
//!     Err(ConcordiaError::Data(DataError::MissingField { .. }))
//! ));
//! ```
//!
//! ## Crate Policy
//!
//! - Every failure is a structured error value; nothing panics on
//!   malformed input.
//! - A compiled [`Schema`] is immutable and never performs I/O.
//! - Validation failures are returned, never logged above `debug`.

pub mod compile;
pub mod config;
pub mod conform;
pub mod data;
pub mod document;
pub mod error;
pub mod fetch;
pub mod hooks;
pub mod model;
pub mod reference;

pub use compile::{Compiler, JsonInput, Schema};
pub use config::{ConfigError, FetchConfig};
pub use data::InstancePath;
pub use document::{load_document, DocumentError};
pub use error::{
    ConcordiaError, ConformanceError, DataError, FetchError, HookError, ReferenceError, SchemaError,
};
#[cfg(feature = "http")]
pub use fetch::HttpFetcher;
pub use fetch::{FetchResponse, FileFetcher, NoFetcher, RoutingFetcher, SchemaFetcher, StaticFetcher};
pub use hooks::{DataHook, HookPhase, HookRegistry, SchemaHook};
pub use model::{
    ArrayItems, ArrayShape, FieldDef, NodeBody, Reference, SchemaKind, SchemaNode, Slot,
};
