//! # Schema Model: Compiled Concordia Tree
//!
//! The in-memory representation of a validated, reference-resolved schema
//! document. A tree is built once by the [`Compiler`](crate::Compiler) and
//! is never mutated afterwards; every node keeps the JSON fragment it was
//! compiled from so extension hooks and error messages can see exactly
//! what the author wrote, including keywords Concordia itself ignores.
//!
//! ## Shape
//!
//! ```text
//! SchemaNode ─┬─ Boolean | Number | String
//!             ├─ Object ── [FieldDef] ─┬─ Named { name, Slot }
//!             │                        └─ Aggregate(Reference)
//!             └─ Array ─┬─ ConstantType(Slot)
//!                       └─ ConstantLength([Slot])
//!
//! Slot ─┬─ Local(SchemaNode)
//!       └─ Reference ── Arc<Schema>   (independently owned document)
//! ```
//!
//! A resolved reference is a separate compiled [`Schema`] held behind an
//! `Arc`; it never points back into the tree that references it.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use crate::compile::Schema;
use crate::error::SchemaError;

/// Keyword naming the kind of a schema fragment.
pub const KEYWORD_TYPE: &str = "type";
/// Keyword marking a fragment as optional.
pub const KEYWORD_OPTIONAL: &str = "optional";
/// Keyword carrying free-form documentation.
pub const KEYWORD_DOC: &str = "doc";
/// Keyword carrying an object's field list or an array's element schema(s).
pub const KEYWORD_SCHEMA: &str = "schema";
/// Keyword naming a field inside an object's `schema` list.
pub const KEYWORD_NAME: &str = "name";
/// Keyword referencing an externally hosted schema document by URL.
pub const KEYWORD_REFERENCE: &str = "$ref";

/// Keywords with meaning to Concordia. Anything else on a fragment is an
/// extra and is left for extension hooks.
pub const KEYWORDS: [&str; 6] = [
    KEYWORD_TYPE,
    KEYWORD_OPTIONAL,
    KEYWORD_DOC,
    KEYWORD_SCHEMA,
    KEYWORD_NAME,
    KEYWORD_REFERENCE,
];

/// The five Concordia types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaKind {
    /// JSON `true` / `false`.
    Boolean,
    /// Any JSON number.
    Number,
    /// Any JSON string.
    String,
    /// A JSON object with a declared list of fields.
    Object,
    /// A JSON array, either constant-type or constant-length.
    Array,
}

impl SchemaKind {
    /// All kinds, in declaration order.
    pub fn all() -> &'static [SchemaKind] {
        &[
            Self::Boolean,
            Self::Number,
            Self::String,
            Self::Object,
            Self::Array,
        ]
    }

    /// The `type` keyword value for this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Boolean => "boolean",
            Self::Number => "number",
            Self::String => "string",
            Self::Object => "object",
            Self::Array => "array",
        }
    }

    /// Whether this kind may appear at the root of a schema document.
    pub fn is_container(&self) -> bool {
        matches!(self, Self::Object | Self::Array)
    }

    /// Whether a (non-null) JSON value has exactly this kind. No coercion:
    /// a numeric string is not a number.
    pub fn matches(&self, value: &Value) -> bool {
        match self {
            Self::Boolean => value.is_boolean(),
            Self::Number => value.is_number(),
            Self::String => value.is_string(),
            Self::Object => value.is_object(),
            Self::Array => value.is_array(),
        }
    }
}

impl fmt::Display for SchemaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SchemaKind {
    type Err = SchemaError;

    /// Parse a `type` keyword value. Case-sensitive.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "boolean" => Ok(Self::Boolean),
            "number" => Ok(Self::Number),
            "string" => Ok(Self::String),
            "object" => Ok(Self::Object),
            "array" => Ok(Self::Array),
            other => Err(SchemaError::UnknownType {
                type_name: other.to_string(),
            }),
        }
    }
}

/// The two array sub-kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArrayShape {
    /// Every element shares one schema; length is unconstrained.
    ConstantType,
    /// Each position has its own schema; length must match exactly.
    ConstantLength,
}

impl fmt::Display for ArrayShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConstantType => f.write_str("constant-type"),
            Self::ConstantLength => f.write_str("constant-length"),
        }
    }
}

/// One node of a compiled schema tree.
#[derive(Debug, Clone)]
pub struct SchemaNode {
    pub(crate) body: NodeBody,
    pub(crate) doc: Option<String>,
    pub(crate) optional: bool,
    pub(crate) fragment: Value,
}

/// Kind-specific contents of a [`SchemaNode`].
#[derive(Debug, Clone)]
pub enum NodeBody {
    Boolean,
    Number,
    String,
    /// Field definitions in declaration order.
    Object(Vec<FieldDef>),
    Array(ArrayItems),
}

/// Element schema(s) of an array node.
#[derive(Debug, Clone)]
pub enum ArrayItems {
    ConstantType(Box<Slot>),
    ConstantLength(Vec<Slot>),
}

/// A position that holds a schema: either a local definition or a
/// reference to an external document adopted wholesale.
#[derive(Debug, Clone)]
pub enum Slot {
    Local(SchemaNode),
    Reference(Reference),
}

/// One entry of an object's `schema` list.
#[derive(Debug, Clone)]
pub enum FieldDef {
    /// A named field whose data lives under `name`.
    Named { name: String, slot: Slot },
    /// An unnamed `$ref` whose object fields are merged into this level.
    Aggregate(Reference),
}

/// A resolved `$ref`: the referencing fragment plus the compiled document
/// it points at.
#[derive(Debug, Clone)]
pub struct Reference {
    pub(crate) url: String,
    pub(crate) doc: Option<String>,
    pub(crate) optional: bool,
    pub(crate) fragment: Value,
    pub(crate) schema: Arc<Schema>,
}

impl SchemaNode {
    pub fn kind(&self) -> SchemaKind {
        match self.body {
            NodeBody::Boolean => SchemaKind::Boolean,
            NodeBody::Number => SchemaKind::Number,
            NodeBody::String => SchemaKind::String,
            NodeBody::Object(_) => SchemaKind::Object,
            NodeBody::Array(_) => SchemaKind::Array,
        }
    }

    pub fn body(&self) -> &NodeBody {
        &self.body
    }

    pub fn doc(&self) -> Option<&str> {
        self.doc.as_deref()
    }

    /// Whether absent or null data is accepted for this node. An unspecified
    /// `optional` keyword means required.
    pub fn is_optional(&self) -> bool {
        self.optional
    }

    /// The JSON fragment this node was compiled from.
    ///
    /// Each node owns a copy of its fragment, so nested fragments are stored
    /// once per enclosing node.
    pub fn fragment(&self) -> &Value {
        &self.fragment
    }

    /// Keywords on this fragment that Concordia does not interpret.
    pub fn extras(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fragment
            .as_object()
            .into_iter()
            .flat_map(|map| map.iter())
            .filter(|(key, _)| !KEYWORDS.contains(&key.as_str()))
            .map(|(key, value)| (key.as_str(), value))
    }

    /// Field definitions, if this is an object node.
    pub fn fields(&self) -> Option<&[FieldDef]> {
        match &self.body {
            NodeBody::Object(fields) => Some(fields),
            _ => None,
        }
    }

    /// Element schema(s), if this is an array node.
    pub fn items(&self) -> Option<&ArrayItems> {
        match &self.body {
            NodeBody::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Names of the fields at this object level, in declaration order, with
    /// unnamed-reference aggregation flattened in place. Empty for non-objects.
    pub fn field_names(&self) -> Vec<&str> {
        let mut names = Vec::new();
        if let Some(fields) = self.fields() {
            for field in fields {
                match field {
                    FieldDef::Named { name, .. } => names.push(name.as_str()),
                    FieldDef::Aggregate(reference) => {
                        names.extend(reference.root().field_names());
                    }
                }
            }
        }
        names
    }
}

impl ArrayItems {
    pub fn shape(&self) -> ArrayShape {
        match self {
            Self::ConstantType(_) => ArrayShape::ConstantType,
            Self::ConstantLength(_) => ArrayShape::ConstantLength,
        }
    }
}

impl Slot {
    /// The schema node that governs data at this position. For a reference
    /// this is the root of the referenced document.
    pub fn node(&self) -> &SchemaNode {
        match self {
            Self::Local(node) => node,
            Self::Reference(reference) => reference.root(),
        }
    }

    pub fn is_optional(&self) -> bool {
        match self {
            Self::Local(node) => node.optional,
            Self::Reference(reference) => reference.optional,
        }
    }

    /// The fragment written at this position (the `$ref` fragment for a
    /// reference, not the referenced document).
    pub fn fragment(&self) -> &Value {
        match self {
            Self::Local(node) => &node.fragment,
            Self::Reference(reference) => &reference.fragment,
        }
    }

    pub fn reference(&self) -> Option<&Reference> {
        match self {
            Self::Local(_) => None,
            Self::Reference(reference) => Some(reference),
        }
    }
}

impl FieldDef {
    /// The field name, or `None` for an aggregation.
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Named { name, .. } => Some(name),
            Self::Aggregate(_) => None,
        }
    }

    pub fn reference(&self) -> Option<&Reference> {
        match self {
            Self::Named { slot, .. } => slot.reference(),
            Self::Aggregate(reference) => Some(reference),
        }
    }
}

impl Reference {
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn doc(&self) -> Option<&str> {
        self.doc.as_deref()
    }

    pub fn is_optional(&self) -> bool {
        self.optional
    }

    pub fn fragment(&self) -> &Value {
        &self.fragment
    }

    /// The referenced document, compiled.
    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub fn root(&self) -> &SchemaNode {
        self.schema.root()
    }
}
