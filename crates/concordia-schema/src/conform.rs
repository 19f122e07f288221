//! # Conformance Checker
//!
//! Decides whether one compiled schema (the extender) is a compatible
//! refinement of another (the original).
//!
//! ## Rules
//!
//! - Kinds must be identical at every compared position.
//! - Objects: every field of the original, with its unnamed-reference
//!   aggregations flattened, must be found by name in the extender (also
//!   searched through its aggregations) unless the original marks it
//!   optional. The extender may add fields.
//! - Arrays: both must be constant-type, or both constant-length with the
//!   same length; element schemas are compared pairwise.
//! - Optionality may be narrowed but never widened: a position the original
//!   requires must stay required.
//!
//! References are resolved at compile time, so both sides are complete
//! trees and referenced documents are compared structurally.

use serde_json::Value;

use crate::compile::{JsonInput, Schema};
use crate::error::{ConcordiaError, ConformanceError};
use crate::model::{ArrayItems, FieldDef, NodeBody, SchemaNode, Slot};

impl Schema {
    /// Check that `self` conforms to (extends) `original`.
    pub fn conforms_to(&self, original: &Schema) -> Result<(), ConformanceError> {
        conform(Side::root(original), Side::root(self))
    }

    /// Compile `original` with this schema's fetcher and hooks, then check
    /// conformance against it.
    pub fn conforms_to_document(
        &self,
        original: impl Into<JsonInput>,
    ) -> Result<(), ConcordiaError> {
        let original = self.compiler().compile(original)?;
        Ok(self.conforms_to(&original)?)
    }
}

/// One side of a comparison: the governing node plus the optionality and
/// fragment of the position it occupies.
#[derive(Clone, Copy)]
struct Side<'a> {
    node: &'a SchemaNode,
    optional: bool,
    fragment: &'a Value,
}

impl<'a> Side<'a> {
    fn root(schema: &'a Schema) -> Self {
        Self {
            node: schema.root(),
            optional: false,
            fragment: schema.as_value(),
        }
    }

    fn slot(slot: &'a Slot) -> Self {
        Self {
            node: slot.node(),
            optional: slot.is_optional(),
            fragment: slot.fragment(),
        }
    }
}

fn conform(original: Side<'_>, extender: Side<'_>) -> Result<(), ConformanceError> {
    let fragment = || extender.fragment.to_string();

    if original.node.kind() != extender.node.kind() {
        return Err(ConformanceError::KindMismatch {
            expected: original.node.kind(),
            found: extender.node.kind(),
            fragment: fragment(),
        });
    }

    match (original.node.body(), extender.node.body()) {
        (NodeBody::Object(original_fields), NodeBody::Object(extender_fields)) => {
            let mut named = Vec::new();
            flatten(original_fields, &mut named);
            for (name, original_slot) in named {
                match find_field(extender_fields, name) {
                    Some(extender_slot) => {
                        conform(Side::slot(original_slot), Side::slot(extender_slot))?
                    }
                    None if original_slot.is_optional() => {}
                    None => {
                        return Err(ConformanceError::MissingField {
                            name: name.to_string(),
                            fragment: fragment(),
                        })
                    }
                }
            }
        }
        (NodeBody::Array(original_items), NodeBody::Array(extender_items)) => {
            match (original_items, extender_items) {
                (ArrayItems::ConstantType(original_slot), ArrayItems::ConstantType(extender_slot)) => {
                    conform(Side::slot(original_slot), Side::slot(extender_slot))?
                }
                (ArrayItems::ConstantLength(original_slots), ArrayItems::ConstantLength(extender_slots)) => {
                    if original_slots.len() != extender_slots.len() {
                        return Err(ConformanceError::LengthMismatch {
                            original: original_slots.len(),
                            extender: extender_slots.len(),
                            fragment: fragment(),
                        });
                    }
                    for (original_slot, extender_slot) in original_slots.iter().zip(extender_slots) {
                        conform(Side::slot(original_slot), Side::slot(extender_slot))?;
                    }
                }
                (original_items, _) => {
                    return Err(ConformanceError::ArrayShapeMismatch {
                        expected: original_items.shape(),
                        fragment: fragment(),
                    })
                }
            }
        }
        // Primitive kinds carry no further structure.
        _ => {}
    }

    if !original.optional && extender.optional {
        return Err(ConformanceError::OptionalityWidened {
            fragment: fragment(),
        });
    }
    Ok(())
}

/// Named fields at one object level, aggregations expanded in place.
fn flatten<'a>(fields: &'a [FieldDef], out: &mut Vec<(&'a str, &'a Slot)>) {
    for field in fields {
        match field {
            FieldDef::Named { name, slot } => out.push((name.as_str(), slot)),
            FieldDef::Aggregate(reference) => {
                if let Some(aggregated) = reference.root().fields() {
                    flatten(aggregated, out);
                }
            }
        }
    }
}

fn find_field<'a>(fields: &'a [FieldDef], name: &str) -> Option<&'a Slot> {
    fields.iter().find_map(|field| match field {
        FieldDef::Named { name: candidate, slot } if candidate == name => Some(slot),
        FieldDef::Named { .. } => None,
        FieldDef::Aggregate(reference) => reference
            .root()
            .fields()
            .and_then(|aggregated| find_field(aggregated, name)),
    })
}
