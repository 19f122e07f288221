//! # Reference Resolver
//!
//! Resolves a `$ref` keyword to a separately compiled [`Schema`].
//!
//! Within one compilation each URL is fetched and compiled once; every later
//! `$ref` to it shares the same `Arc<Schema>`. The URLs currently being
//! compiled form a chain, and a URL that reappears in its own chain is a
//! cycle. Resolution happens only at compile time.

use std::sync::Arc;

use serde_json::{Map, Value};

use crate::compile::{Schema, Session};
use crate::error::{ConcordiaError, ReferenceError};
use crate::model::{SchemaKind, KEYWORD_REFERENCE};

/// A successfully resolved `$ref`.
pub(crate) struct ResolvedTarget {
    pub(crate) url: String,
    pub(crate) schema: Arc<Schema>,
}

impl Session<'_> {
    /// Resolve the `$ref` on `fragment`, if it has one.
    ///
    /// `required` constrains the root kind of the referenced document; it is
    /// `object` for unnamed aggregation.
    pub(crate) fn resolve(
        &mut self,
        fragment: &Value,
        object: &Map<String, Value>,
        required: Option<SchemaKind>,
    ) -> Result<Option<ResolvedTarget>, ReferenceError> {
        let url = match object.get(KEYWORD_REFERENCE) {
            None => return Ok(None),
            Some(Value::String(url)) => url,
            Some(Value::Null) => {
                return Err(ReferenceError::Null {
                    fragment: fragment.to_string(),
                })
            }
            Some(_) => {
                return Err(ReferenceError::NotAString {
                    fragment: fragment.to_string(),
                })
            }
        };

        let schema = self.load(url)?;
        if let Some(expected) = required {
            if schema.kind() != expected {
                return Err(ReferenceError::RootKindMismatch {
                    url: url.clone(),
                    expected,
                    found: schema.kind(),
                });
            }
        }
        Ok(Some(ResolvedTarget {
            url: url.clone(),
            schema,
        }))
    }

    fn load(&mut self, url: &str) -> Result<Arc<Schema>, ReferenceError> {
        if self.chain.iter().any(|pending| pending == url) {
            let mut chain = self.chain.clone();
            chain.push(url.to_string());
            return Err(ReferenceError::Cycle { chain });
        }
        if let Some(schema) = self.resolved.get(url) {
            tracing::trace!(url, "reusing resolved reference");
            return Ok(Arc::clone(schema));
        }

        let response = self
            .compiler
            .fetcher
            .fetch(url)
            .map_err(|source| ReferenceError::Fetch {
                url: url.to_string(),
                source,
            })?;
        let status = response.status;
        if !response.is_success() {
            return Err(ReferenceError::Status {
                url: url.to_string(),
                status,
                body: response.body,
            });
        }
        let body = match response.body {
            Some(body) if !body.is_empty() => body,
            _ => {
                return Err(ReferenceError::EmptyBody {
                    url: url.to_string(),
                })
            }
        };

        let invalid = |source: ConcordiaError| ReferenceError::Invalid {
            url: url.to_string(),
            source: Box::new(source),
        };
        let value: Value = serde_json::from_str(&body).map_err(|e| invalid(e.into()))?;

        self.chain.push(url.to_string());
        let compiled = self.compile_document(value);
        self.chain.pop();

        let schema = match compiled {
            Ok(schema) => Arc::new(schema),
            // Cycles surface unwrapped so the caller sees the full chain.
            Err(ConcordiaError::Reference(e))
                if matches!(e.root_cause(), ReferenceError::Cycle { .. }) =>
            {
                return Err(e)
            }
            Err(e) => return Err(invalid(e)),
        };

        tracing::debug!(url, status, root = %schema.kind(), "resolved schema reference");
        self.resolved.insert(url.to_string(), Arc::clone(&schema));
        Ok(schema)
    }
}
