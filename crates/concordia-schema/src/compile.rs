//! # Meta-Schema Compiler
//!
//! Turns a schema document into an immutable [`Schema`]: parse, check the
//! structure of every node against the Concordia meta-schema, resolve every
//! `$ref`, run the schema-phase hooks, and freeze.
//!
//! ## Per-node order
//!
//! 1. `type` must be present, non-null, a string, and one of the five kinds.
//! 2. Kind-specific structure (`object` field list, `array` element schemas),
//!    recursing into children and resolving references as they appear.
//! 3. The schema-phase hook for the kind, if one is installed.
//! 4. Common options: `doc` must be a string, `optional` a boolean.
//!
//! The document root must additionally be an `object` or `array` and may
//! not carry `optional` at all.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

use crate::error::{ConcordiaError, SchemaError};
use crate::fetch::{NoFetcher, SchemaFetcher};
use crate::hooks::HookRegistry;
use crate::model::{
    ArrayItems, FieldDef, NodeBody, Reference, SchemaKind, SchemaNode, Slot, KEYWORD_DOC,
    KEYWORD_NAME, KEYWORD_OPTIONAL, KEYWORD_SCHEMA, KEYWORD_TYPE,
};

/// A JSON document given either as text or as an already-parsed value.
#[derive(Debug, Clone, PartialEq)]
pub enum JsonInput {
    Text(String),
    Value(Value),
}

impl JsonInput {
    /// Parse text input; pass values through.
    pub fn into_value(self) -> Result<Value, serde_json::Error> {
        match self {
            Self::Text(text) => serde_json::from_str(&text),
            Self::Value(value) => Ok(value),
        }
    }
}

impl From<&str> for JsonInput {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<String> for JsonInput {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&String> for JsonInput {
    fn from(text: &String) -> Self {
        Self::Text(text.clone())
    }
}

impl From<Value> for JsonInput {
    fn from(value: Value) -> Self {
        Self::Value(value)
    }
}

impl From<&Value> for JsonInput {
    fn from(value: &Value) -> Self {
        Self::Value(value.clone())
    }
}

// -- Compiler -----------------------------------------------------------------

/// Compiles schema documents with a given fetcher and hook registry.
///
/// ```
/// use concordia_schema::Compiler;
///
/// let schema = Compiler::new()
///     .compile(r#"{"type":"object","schema":[{"name":"n","type":"number"}]}"#)
///     .unwrap();
/// assert_eq!(schema.root().field_names(), ["n"]);
/// ```
#[derive(Clone)]
pub struct Compiler {
    pub(crate) fetcher: Arc<dyn SchemaFetcher>,
    pub(crate) hooks: Arc<HookRegistry>,
}

impl Default for Compiler {
    fn default() -> Self {
        Self {
            fetcher: Arc::new(NoFetcher),
            hooks: HookRegistry::global(),
        }
    }
}

impl fmt::Debug for Compiler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Compiler")
            .field("hooks", &self.hooks)
            .finish_non_exhaustive()
    }
}

impl Compiler {
    /// A compiler that cannot fetch references and uses the global hook
    /// registry.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_fetcher(self, fetcher: impl SchemaFetcher + 'static) -> Self {
        self.with_shared_fetcher(Arc::new(fetcher))
    }

    /// Use a fetcher the caller keeps a handle to.
    pub fn with_shared_fetcher(mut self, fetcher: Arc<dyn SchemaFetcher>) -> Self {
        self.fetcher = fetcher;
        self
    }

    /// Use `hooks` instead of the global registry.
    pub fn with_hooks(mut self, hooks: Arc<HookRegistry>) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn hooks(&self) -> &Arc<HookRegistry> {
        &self.hooks
    }

    /// Compile a schema document.
    ///
    /// Every `$ref` is fetched at most once per call; the compiled schema
    /// never fetches again.
    pub fn compile(&self, input: impl Into<JsonInput>) -> Result<Schema, ConcordiaError> {
        let value = input.into().into_value()?;
        Session::new(self).compile_document(value)
    }
}

// -- Session ------------------------------------------------------------------

/// State for one top-level compilation: the chain of URLs being resolved
/// and every document already resolved.
pub(crate) struct Session<'c> {
    pub(crate) compiler: &'c Compiler,
    pub(crate) chain: Vec<String>,
    pub(crate) resolved: HashMap<String, Arc<Schema>>,
}

impl<'c> Session<'c> {
    fn new(compiler: &'c Compiler) -> Self {
        Self {
            compiler,
            chain: Vec::new(),
            resolved: HashMap::new(),
        }
    }

    pub(crate) fn compile_document(&mut self, value: Value) -> Result<Schema, ConcordiaError> {
        let object = schema_object(&value)?;
        let kind = read_kind(&value, object)?;
        if !kind.is_container() {
            return Err(SchemaError::InvalidRootType { found: kind }.into());
        }
        if object.contains_key(KEYWORD_OPTIONAL) {
            return Err(SchemaError::OptionalAtRoot.into());
        }
        let root = self.compile_node(&value)?;
        Ok(Schema {
            root,
            hooks: Arc::clone(&self.compiler.hooks),
            fetcher: Arc::clone(&self.compiler.fetcher),
        })
    }

    fn compile_node(&mut self, value: &Value) -> Result<SchemaNode, ConcordiaError> {
        let object = schema_object(value)?;
        let kind = read_kind(value, object)?;
        let body = match kind {
            SchemaKind::Boolean => NodeBody::Boolean,
            SchemaKind::Number => NodeBody::Number,
            SchemaKind::String => NodeBody::String,
            SchemaKind::Object => NodeBody::Object(self.compile_fields(value, object)?),
            SchemaKind::Array => NodeBody::Array(self.compile_items(value, object)?),
        };
        self.compiler.hooks.run_schema_hook(kind, value)?;
        let (doc, optional) = read_options(value, object)?;
        Ok(SchemaNode {
            body,
            doc,
            optional,
            fragment: value.clone(),
        })
    }

    fn compile_fields(
        &mut self,
        value: &Value,
        object: &Map<String, Value>,
    ) -> Result<Vec<FieldDef>, ConcordiaError> {
        let entries = match object.get(KEYWORD_SCHEMA) {
            Some(Value::Array(entries)) => entries,
            other => return Err(schema_keyword_error(value, other, "a JSON array").into()),
        };

        let mut names = HashSet::new();
        let mut fields = Vec::with_capacity(entries.len());
        for (index, entry) in entries.iter().enumerate() {
            let field = element_object(value, entry, index)?;
            match field.get(KEYWORD_NAME) {
                None => {
                    let reference = self
                        .reference(entry, field, Some(SchemaKind::Object), Some(index))?
                        .ok_or_else(|| SchemaError::MissingFieldName {
                            index,
                            fragment: value.to_string(),
                        })?;
                    for name in reference.root().field_names() {
                        claim_name(&mut names, name, value)?;
                    }
                    fields.push(FieldDef::Aggregate(reference));
                }
                Some(Value::String(name)) => {
                    claim_name(&mut names, name, value)?;
                    let slot = self.compile_slot(entry, field, Some(index))?;
                    fields.push(FieldDef::Named {
                        name: name.clone(),
                        slot,
                    });
                }
                Some(Value::Null) => {
                    return Err(SchemaError::NullFieldName {
                        index,
                        fragment: value.to_string(),
                    }
                    .into())
                }
                Some(_) => {
                    return Err(SchemaError::FieldNameNotString {
                        index,
                        fragment: value.to_string(),
                    }
                    .into())
                }
            }
        }
        Ok(fields)
    }

    fn compile_items(
        &mut self,
        value: &Value,
        object: &Map<String, Value>,
    ) -> Result<ArrayItems, ConcordiaError> {
        match object.get(KEYWORD_SCHEMA) {
            Some(Value::Array(elements)) => {
                let mut slots = Vec::with_capacity(elements.len());
                for (index, element) in elements.iter().enumerate() {
                    let element_map = element_object(value, element, index)?;
                    slots.push(self.compile_slot(element, element_map, Some(index))?);
                }
                Ok(ArrayItems::ConstantLength(slots))
            }
            Some(element @ Value::Object(element_map)) => Ok(ArrayItems::ConstantType(Box::new(
                self.compile_slot(element, element_map, None)?,
            ))),
            other => Err(schema_keyword_error(
                value,
                other,
                "either a JSON array or a JSON object",
            )
            .into()),
        }
    }

    /// A `$ref` at this position replaces any local definition.
    fn compile_slot(
        &mut self,
        value: &Value,
        object: &Map<String, Value>,
        index: Option<usize>,
    ) -> Result<Slot, ConcordiaError> {
        match self.reference(value, object, None, index)? {
            Some(reference) => Ok(Slot::Reference(reference)),
            None => Ok(Slot::Local(self.compile_node(value)?)),
        }
    }

    fn reference(
        &mut self,
        value: &Value,
        object: &Map<String, Value>,
        required: Option<SchemaKind>,
        index: Option<usize>,
    ) -> Result<Option<Reference>, ConcordiaError> {
        let target = self.resolve(value, object, required).map_err(|e| match index {
            Some(index) => e.at_index(index),
            None => e,
        })?;
        let Some(target) = target else {
            return Ok(None);
        };
        let (doc, optional) = read_options(value, object)?;
        Ok(Some(Reference {
            url: target.url,
            doc,
            optional,
            fragment: value.clone(),
            schema: target.schema,
        }))
    }
}

fn schema_object(value: &Value) -> Result<&Map<String, Value>, SchemaError> {
    value.as_object().ok_or_else(|| SchemaError::NotAnObject {
        fragment: value.to_string(),
    })
}

fn read_kind(value: &Value, object: &Map<String, Value>) -> Result<SchemaKind, SchemaError> {
    match object.get(KEYWORD_TYPE) {
        Some(Value::String(type_name)) => type_name.parse(),
        None => Err(SchemaError::MissingKeyword {
            keyword: KEYWORD_TYPE,
            fragment: value.to_string(),
        }),
        Some(Value::Null) => Err(SchemaError::NullKeyword {
            keyword: KEYWORD_TYPE,
            fragment: value.to_string(),
        }),
        Some(_) => Err(SchemaError::WrongKeywordType {
            keyword: KEYWORD_TYPE,
            expected: "a string",
            fragment: value.to_string(),
        }),
    }
}

fn read_options(
    value: &Value,
    object: &Map<String, Value>,
) -> Result<(Option<String>, bool), SchemaError> {
    let doc = match object.get(KEYWORD_DOC) {
        None => None,
        Some(Value::String(doc)) => Some(doc.clone()),
        Some(_) => {
            return Err(SchemaError::WrongKeywordType {
                keyword: KEYWORD_DOC,
                expected: "a string",
                fragment: value.to_string(),
            })
        }
    };
    let optional = match object.get(KEYWORD_OPTIONAL) {
        None => false,
        Some(Value::Bool(optional)) => *optional,
        Some(_) => {
            return Err(SchemaError::WrongKeywordType {
                keyword: KEYWORD_OPTIONAL,
                expected: "a boolean",
                fragment: value.to_string(),
            })
        }
    };
    Ok((doc, optional))
}

/// Error for a `schema` keyword that is absent, null, or of the wrong type.
fn schema_keyword_error(value: &Value, found: Option<&Value>, expected: &'static str) -> SchemaError {
    let fragment = value.to_string();
    match found {
        None => SchemaError::MissingKeyword {
            keyword: KEYWORD_SCHEMA,
            fragment,
        },
        Some(Value::Null) => SchemaError::NullKeyword {
            keyword: KEYWORD_SCHEMA,
            fragment,
        },
        Some(_) => SchemaError::WrongKeywordType {
            keyword: KEYWORD_SCHEMA,
            expected,
            fragment,
        },
    }
}

fn element_object<'v>(
    parent: &Value,
    element: &'v Value,
    index: usize,
) -> Result<&'v Map<String, Value>, SchemaError> {
    match element {
        Value::Object(map) => Ok(map),
        Value::Null => Err(SchemaError::NullElement {
            index,
            fragment: parent.to_string(),
        }),
        _ => Err(SchemaError::ElementNotObject {
            index,
            fragment: parent.to_string(),
        }),
    }
}

fn claim_name(names: &mut HashSet<String>, name: &str, parent: &Value) -> Result<(), SchemaError> {
    if names.insert(name.to_string()) {
        Ok(())
    } else {
        Err(SchemaError::DuplicateField {
            name: name.to_string(),
            fragment: parent.to_string(),
        })
    }
}

// -- Schema -------------------------------------------------------------------

/// A compiled, reference-resolved, immutable schema.
///
/// Cloning is cheap relative to compiling: referenced documents are shared.
#[derive(Clone)]
pub struct Schema {
    root: SchemaNode,
    pub(crate) hooks: Arc<HookRegistry>,
    fetcher: Arc<dyn SchemaFetcher>,
}

impl Schema {
    /// Compile with the default [`Compiler`]: no reference fetching and the
    /// global hook registry.
    pub fn compile(input: impl Into<JsonInput>) -> Result<Self, ConcordiaError> {
        Compiler::new().compile(input)
    }

    pub fn root(&self) -> &SchemaNode {
        &self.root
    }

    /// Root kind; always `object` or `array`.
    pub fn kind(&self) -> SchemaKind {
        self.root.kind()
    }

    /// The schema document this was compiled from, including any keywords
    /// Concordia does not interpret.
    pub fn as_value(&self) -> &Value {
        self.root.fragment()
    }

    /// The registry consulted for data-phase hooks.
    pub fn hooks(&self) -> &Arc<HookRegistry> {
        &self.hooks
    }

    /// A compiler configured like the one that built this schema.
    pub(crate) fn compiler(&self) -> Compiler {
        Compiler {
            fetcher: Arc::clone(&self.fetcher),
            hooks: Arc::clone(&self.hooks),
        }
    }
}

impl Serialize for Schema {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.as_value().serialize(serializer)
    }
}

impl fmt::Display for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_value())
    }
}

impl fmt::Debug for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schema")
            .field("root", &self.root)
            .finish_non_exhaustive()
    }
}
