//! # Data Validator
//!
//! Validates a data instance against a compiled [`Schema`].
//!
//! Validation is fail-fast: the first mismatch is returned with the
//! [`InstancePath`] of the offending value. On success the (parsed) data is
//! handed back unchanged.
//!
//! ## Absent and null
//!
//! An absent value and a JSON `null` are treated alike: valid iff the schema
//! position is optional. The one distinction is at object fields, where a
//! missing required key is reported as [`DataError::MissingField`] and a
//! required key holding `null` as [`DataError::NullNotOptional`].

use std::fmt;

use serde_json::Value;

use crate::compile::{JsonInput, Schema};
use crate::error::{ConcordiaError, DataError};
use crate::hooks::HookRegistry;
use crate::model::{ArrayItems, FieldDef, NodeBody, SchemaNode, Slot};

/// JSON Pointer (RFC 6901) to a value inside a data instance.
///
/// Displays as `(root)` for the document itself.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct InstancePath(String);

impl InstancePath {
    pub fn root() -> Self {
        Self::default()
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// The pointer text; empty for the root.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub(crate) fn key(&self, name: &str) -> Self {
        Self(format!(
            "{}/{}",
            self.0,
            name.replace('~', "~0").replace('/', "~1")
        ))
    }

    pub(crate) fn index(&self, index: usize) -> Self {
        Self(format!("{}/{index}", self.0))
    }
}

impl fmt::Display for InstancePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_root() {
            f.write_str("(root)")
        } else {
            f.write_str(&self.0)
        }
    }
}

impl Schema {
    /// Validate `data`, returning it (parsed, if text was given) on success.
    ///
    /// The top level of the data must be a JSON object or array.
    pub fn validate_data(&self, data: impl Into<JsonInput>) -> Result<Value, ConcordiaError> {
        let value = data.into().into_value()?;
        if !(value.is_object() || value.is_array()) {
            return Err(DataError::NotAContainer.into());
        }
        DataValidator::new(&self.hooks).node(self.root(), false, Some(&value), &InstancePath::root())?;
        Ok(value)
    }
}

struct DataValidator<'h> {
    hooks: &'h HookRegistry,
}

impl<'h> DataValidator<'h> {
    fn new(hooks: &'h HookRegistry) -> Self {
        Self { hooks }
    }

    fn slot(&self, slot: &Slot, data: Option<&Value>, path: &InstancePath) -> Result<(), ConcordiaError> {
        match slot {
            Slot::Local(node) => self.node(node, node.is_optional(), data, path),
            Slot::Reference(reference) => DataValidator::new(&reference.schema().hooks).node(
                reference.root(),
                reference.is_optional(),
                data,
                path,
            ),
        }
    }

    /// `optional` comes from the position, which for a reference is the
    /// `$ref` fragment rather than the referenced root.
    fn node(
        &self,
        node: &SchemaNode,
        optional: bool,
        data: Option<&Value>,
        path: &InstancePath,
    ) -> Result<(), ConcordiaError> {
        let data = data.filter(|value| !value.is_null());
        let kind = node.kind();

        match node.body() {
            NodeBody::Boolean | NodeBody::Number | NodeBody::String => {
                match data {
                    None if !optional => {
                        return Err(DataError::NullNotOptional { path: path.clone() }.into())
                    }
                    Some(value) if !kind.matches(value) => {
                        return Err(mismatch(node, value, path).into())
                    }
                    _ => {}
                }
                self.hooks
                    .run_data_hook(kind, node.fragment(), data.unwrap_or(&Value::Null))?;
            }
            NodeBody::Object(fields) => {
                let Some(value) = data else {
                    return absent(optional, path);
                };
                let Some(map) = value.as_object() else {
                    return Err(mismatch(node, value, path).into());
                };
                for field in fields {
                    match field {
                        FieldDef::Aggregate(reference) => {
                            DataValidator::new(&reference.schema().hooks).node(
                                reference.root(),
                                false,
                                Some(value),
                                path,
                            )?;
                        }
                        FieldDef::Named { name, slot } => match map.get(name) {
                            Some(child) => self.slot(slot, Some(child), &path.key(name))?,
                            None if !slot.is_optional() => {
                                return Err(DataError::MissingField {
                                    path: path.clone(),
                                    name: name.clone(),
                                }
                                .into())
                            }
                            None => {}
                        },
                    }
                }
                self.hooks.run_data_hook(kind, node.fragment(), value)?;
            }
            NodeBody::Array(items) => {
                let Some(value) = data else {
                    return absent(optional, path);
                };
                let Some(elements) = value.as_array() else {
                    return Err(mismatch(node, value, path).into());
                };
                match items {
                    ArrayItems::ConstantLength(slots) => {
                        if slots.len() != elements.len() {
                            return Err(DataError::LengthMismatch {
                                path: path.clone(),
                                expected: slots.len(),
                                found: elements.len(),
                            }
                            .into());
                        }
                        for (index, (slot, element)) in slots.iter().zip(elements).enumerate() {
                            self.slot(slot, Some(element), &path.index(index))?;
                        }
                    }
                    ArrayItems::ConstantType(slot) => {
                        for (index, element) in elements.iter().enumerate() {
                            self.slot(slot, Some(element), &path.index(index))?;
                        }
                    }
                }
                self.hooks.run_data_hook(kind, node.fragment(), value)?;
            }
        }
        Ok(())
    }
}

fn absent(optional: bool, path: &InstancePath) -> Result<(), ConcordiaError> {
    if optional {
        Ok(())
    } else {
        Err(DataError::NullNotOptional { path: path.clone() }.into())
    }
}

fn mismatch(node: &SchemaNode, value: &Value, path: &InstancePath) -> DataError {
    DataError::TypeMismatch {
        path: path.clone(),
        expected: node.kind(),
        found: value.to_string(),
    }
}
