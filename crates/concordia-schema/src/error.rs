//! # Error Types: Structured Error Hierarchy
//!
//! One `thiserror` enum per failure category, wrapped by [`ConcordiaError`]
//! so callers can branch on the category programmatically.
//!
//! ## Design
//!
//! - Every failure is terminal. Validation stops at the first error and
//!   nothing is retried.
//! - Errors carry structured context (index, field name, instance path,
//!   expected vs actual kind, the offending JSON fragment) rather than a
//!   pre-formatted message.
//! - Errors raised by extension hooks are opaque and surface unchanged.

use thiserror::Error;

use crate::data::InstancePath;
use crate::model::{ArrayShape, SchemaKind};

/// Top-level error type for Concordia operations.
#[derive(Error, Debug)]
pub enum ConcordiaError {
    /// A text input was not valid JSON.
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The schema document violates the meta-schema.
    #[error("invalid schema: {0}")]
    Schema(#[from] SchemaError),

    /// The data instance does not match the compiled schema.
    #[error("invalid data: {0}")]
    Data(#[from] DataError),

    /// A `$ref` could not be resolved.
    #[error("reference error: {0}")]
    Reference(#[from] ReferenceError),

    /// The extending schema does not conform to the original.
    #[error("schema does not conform: {0}")]
    Conformance(#[from] ConformanceError),

    /// An extension hook rejected the schema or the data.
    #[error(transparent)]
    Hook(#[from] HookError),
}

impl ConcordiaError {
    /// The hook failure behind this error, including one raised while
    /// compiling a referenced document.
    pub fn hook_error(&self) -> Option<&HookError> {
        match self {
            Self::Hook(e) => Some(e),
            Self::Reference(e) => match e.root_cause() {
                ReferenceError::Invalid { source, .. } => source.hook_error(),
                _ => None,
            },
            _ => None,
        }
    }
}

/// The schema document is not a well-formed Concordia schema.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    /// The document (or a fragment expected to be a schema) is not a JSON object.
    #[error("the schema must be a JSON object: {fragment}")]
    NotAnObject { fragment: String },

    #[error("the '{keyword}' field is missing: {fragment}")]
    MissingKeyword {
        keyword: &'static str,
        fragment: String,
    },

    #[error("the '{keyword}' field cannot be null: {fragment}")]
    NullKeyword {
        keyword: &'static str,
        fragment: String,
    },

    #[error("the '{keyword}' field's value must be {expected}: {fragment}")]
    WrongKeywordType {
        keyword: &'static str,
        /// Human description of the accepted JSON type(s).
        expected: &'static str,
        fragment: String,
    },

    #[error("type unknown: {type_name}")]
    UnknownType { type_name: String },

    #[error("the root type must be either 'object' or 'array', but it is '{found}'")]
    InvalidRootType { found: SchemaKind },

    #[error("the 'optional' field is not allowed at the root of the definition")]
    OptionalAtRoot,

    #[error("the element at index {index} of the 'schema' field is null: {fragment}")]
    NullElement { index: usize, fragment: String },

    #[error("the element at index {index} of the 'schema' field is not a JSON object: {fragment}")]
    ElementNotObject { index: usize, fragment: String },

    #[error("the 'name' field for the JSON object at index {index} is null: {fragment}")]
    NullFieldName { index: usize, fragment: String },

    #[error("the 'name' field for the JSON object at index {index} is not a string: {fragment}")]
    FieldNameNotString { index: usize, fragment: String },

    /// A field carried neither a `name` nor a `$ref`.
    #[error("the 'name' field for the JSON object at index {index} is missing: {fragment}")]
    MissingFieldName { index: usize, fragment: String },

    /// Two fields at one object level share a name after aggregation.
    #[error("the field '{name}' is defined multiple times: {fragment}")]
    DuplicateField { name: String, fragment: String },
}

/// The data instance does not match the schema.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DataError {
    #[error("the data must be a JSON object or a JSON array, or a string representing one of the two")]
    NotAContainer,

    #[error("{path}: the data is null and not optional")]
    NullNotOptional { path: InstancePath },

    #[error("{path}: the value is not a {expected}: {found}")]
    TypeMismatch {
        path: InstancePath,
        expected: SchemaKind,
        /// The offending value, serialized.
        found: String,
    },

    #[error("{path}: the field '{name}' is missing from the data")]
    MissingField { path: InstancePath, name: String },

    /// Constant-length arrays must match exactly, even when trailing
    /// schema entries are optional.
    #[error("{path}: the schema array and the data array are of different lengths (expected {expected}, found {found})")]
    LengthMismatch {
        path: InstancePath,
        expected: usize,
        found: usize,
    },
}

impl DataError {
    /// Location of the failure inside the data instance, if any.
    pub fn path(&self) -> Option<&InstancePath> {
        match self {
            Self::NotAContainer => None,
            Self::NullNotOptional { path }
            | Self::TypeMismatch { path, .. }
            | Self::MissingField { path, .. }
            | Self::LengthMismatch { path, .. } => Some(path),
        }
    }
}

/// A `$ref` keyword could not be turned into a compiled schema.
#[derive(Error, Debug)]
pub enum ReferenceError {
    #[error("the '$ref' field is null, which is not allowed: {fragment}")]
    Null { fragment: String },

    #[error("the '$ref' field is not a string, which it must be to reference an external schema: {fragment}")]
    NotAString { fragment: String },

    /// The fetch collaborator failed before producing a response.
    #[error("the sub-schema at '{url}' could not be fetched: {source}")]
    Fetch { url: String, source: FetchError },

    /// The fetch collaborator answered with a non-2xx status.
    #[error("the sub-schema at '{url}' could not be retrieved ({status})")]
    Status {
        url: String,
        status: u16,
        body: Option<String>,
    },

    #[error("the sub-schema was not returned from the remote location: {url}")]
    EmptyBody { url: String },

    /// The response was not valid JSON or not a valid schema.
    #[error("the sub-schema at '{url}' is invalid: {source}")]
    Invalid {
        url: String,
        source: Box<ConcordiaError>,
    },

    #[error("the sub-schema at '{url}' must have a root type of '{expected}', but it had a root type of '{found}'")]
    RootKindMismatch {
        url: String,
        expected: SchemaKind,
        found: SchemaKind,
    },

    /// A document (transitively) references itself.
    #[error("reference cycle detected: {}", .chain.join(" -> "))]
    Cycle { chain: Vec<String> },

    /// Wraps a failure that originated at a position of an object's field
    /// list or a constant-length array.
    #[error("the referenced schema was invalid at index {index}: {source}")]
    AtIndex {
        index: usize,
        source: Box<ReferenceError>,
    },
}

impl ReferenceError {
    /// The underlying failure with any [`ReferenceError::AtIndex`] layers removed.
    pub fn root_cause(&self) -> &ReferenceError {
        let mut current = self;
        while let Self::AtIndex { source, .. } = current {
            current = source;
        }
        current
    }

    pub(crate) fn at_index(self, index: usize) -> Self {
        Self::AtIndex {
            index,
            source: Box::new(self),
        }
    }
}

/// The extending schema is not a compatible refinement of the original.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConformanceError {
    #[error("the original schema defined a {expected}, but the extending schema defines a {found}: {fragment}")]
    KindMismatch {
        expected: SchemaKind,
        found: SchemaKind,
        fragment: String,
    },

    #[error("the original schema has a field that is not optional and not found in the extending schema ('{name}'): {fragment}")]
    MissingField { name: String, fragment: String },

    #[error("the original schema did not allow a value to be optional, but the extending schema does: {fragment}")]
    OptionalityWidened { fragment: String },

    #[error("the original schema defined a {expected} array, but the extending schema did not: {fragment}")]
    ArrayShapeMismatch {
        expected: ArrayShape,
        fragment: String,
    },

    #[error("the original schema and the extending schema are different lengths ({original} vs {extender}): {fragment}")]
    LengthMismatch {
        original: usize,
        extender: usize,
        fragment: String,
    },
}

/// An error raised by an extension hook. Concordia never inspects it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct HookError {
    message: String,
}

impl HookError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// A fetch collaborator could not produce a response.
#[derive(Error, Debug)]
pub enum FetchError {
    /// No fetcher handles this URL.
    #[error("cannot fetch '{url}': {reason}")]
    Unsupported { url: String, reason: String },

    #[error("invalid reference URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("io error reading '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[cfg(feature = "http")]
    #[error("HTTP error fetching '{url}': {source}")]
    Http {
        url: String,
        source: reqwest::Error,
    },

    #[cfg(feature = "http")]
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
}
