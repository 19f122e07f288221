//! # Extension Hook Registry
//!
//! Per-kind callbacks that layer custom rules on top of the core
//! structural checks without touching the dispatch code.
//!
//! Each [`SchemaKind`] has two slots, one per [`HookPhase`]:
//!
//! - **Schema phase** runs after the structural checks of a node of that
//!   kind and receives the raw schema fragment.
//! - **Data phase** runs after the per-kind data checks and receives the
//!   schema fragment and the data value. Primitive kinds see `null` when the
//!   datum was absent; object and array hooks are skipped in that case.
//!
//! At most one hook occupies a slot. Installing a hook replaces the one
//! already there; hooks never chain.
//!
//! A [`Compiler`](crate::Compiler) uses [`HookRegistry::global()`] unless
//! another registry is injected with
//! [`Compiler::with_hooks()`](crate::Compiler::with_hooks). The registry is
//! consulted on every validation, so a hook removed after compilation no
//! longer runs for later data validations.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock};

use parking_lot::RwLock;
use serde_json::Value;

use crate::error::HookError;
use crate::model::SchemaKind;

/// Schema-phase callback: receives the raw schema fragment.
pub type SchemaHook = Arc<dyn Fn(&Value) -> Result<(), HookError> + Send + Sync>;

/// Data-phase callback: receives the schema fragment, then the data value.
pub type DataHook = Arc<dyn Fn(&Value, &Value) -> Result<(), HookError> + Send + Sync>;

/// When a hook runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookPhase {
    /// While compiling a schema document.
    Schema,
    /// While validating a data instance.
    Data,
}

impl fmt::Display for HookPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Schema => f.write_str("schema"),
            Self::Data => f.write_str("data"),
        }
    }
}

/// Mapping from (kind, phase) to at most one callback.
///
/// Locks are `parking_lot` and are never held while a hook runs, so a hook
/// may itself install or remove hooks.
#[derive(Default)]
pub struct HookRegistry {
    schema: RwLock<HashMap<SchemaKind, SchemaHook>>,
    data: RwLock<HashMap<SchemaKind, DataHook>>,
}

static GLOBAL: OnceLock<Arc<HookRegistry>> = OnceLock::new();

impl HookRegistry {
    /// An empty registry with no hooks installed.
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide registry.
    pub fn global() -> Arc<HookRegistry> {
        Arc::clone(GLOBAL.get_or_init(|| Arc::new(HookRegistry::new())))
    }

    /// Install the schema-phase hook for `kind`. Returns `true` if a previous
    /// hook was replaced.
    pub fn set_schema_hook<F>(&self, kind: SchemaKind, hook: F) -> bool
    where
        F: Fn(&Value) -> Result<(), HookError> + Send + Sync + 'static,
    {
        self.schema.write().insert(kind, Arc::new(hook)).is_some()
    }

    /// Install the data-phase hook for `kind`. Returns `true` if a previous
    /// hook was replaced.
    pub fn set_data_hook<F>(&self, kind: SchemaKind, hook: F) -> bool
    where
        F: Fn(&Value, &Value) -> Result<(), HookError> + Send + Sync + 'static,
    {
        self.data.write().insert(kind, Arc::new(hook)).is_some()
    }

    /// Uninstall the hook in one slot. Returns `true` if one was installed.
    pub fn remove(&self, kind: SchemaKind, phase: HookPhase) -> bool {
        match phase {
            HookPhase::Schema => self.schema.write().remove(&kind).is_some(),
            HookPhase::Data => self.data.write().remove(&kind).is_some(),
        }
    }

    pub fn is_installed(&self, kind: SchemaKind, phase: HookPhase) -> bool {
        match phase {
            HookPhase::Schema => self.schema.read().contains_key(&kind),
            HookPhase::Data => self.data.read().contains_key(&kind),
        }
    }

    /// Uninstall every hook.
    pub fn clear(&self) {
        self.schema.write().clear();
        self.data.write().clear();
    }

    pub(crate) fn run_schema_hook(&self, kind: SchemaKind, fragment: &Value) -> Result<(), HookError> {
        let hook = self.schema.read().get(&kind).cloned();
        match hook {
            Some(hook) => {
                tracing::trace!(kind = %kind, phase = %HookPhase::Schema, "running hook");
                hook(fragment)
            }
            None => Ok(()),
        }
    }

    pub(crate) fn run_data_hook(
        &self,
        kind: SchemaKind,
        fragment: &Value,
        data: &Value,
    ) -> Result<(), HookError> {
        let hook = self.data.read().get(&kind).cloned();
        match hook {
            Some(hook) => {
                tracing::trace!(kind = %kind, phase = %HookPhase::Data, "running hook");
                hook(fragment, data)
            }
            None => Ok(()),
        }
    }

    fn installed(&self) -> Vec<(SchemaKind, HookPhase)> {
        let mut slots: Vec<_> = self
            .schema
            .read()
            .keys()
            .map(|kind| (*kind, HookPhase::Schema))
            .chain(self.data.read().keys().map(|kind| (*kind, HookPhase::Data)))
            .collect();
        slots.sort_by_key(|(kind, phase)| (*kind, *phase == HookPhase::Data));
        slots
    }
}

impl fmt::Debug for HookRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookRegistry")
            .field("installed", &self.installed())
            .finish()
    }
}
