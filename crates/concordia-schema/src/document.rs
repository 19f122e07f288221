//! Loading schema and data documents from disk.
//!
//! Files ending in `.yaml` or `.yml` are parsed as YAML and converted to the
//! equivalent JSON value; everything else is parsed as JSON.

use std::path::Path;

use serde_json::{Map, Number, Value};
use serde_yaml::Value as Yaml;

use crate::data::InstancePath;

/// Failure to turn a file into a JSON value.
#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("invalid JSON in {path}: {source}")]
    Json {
        path: String,
        source: serde_json::Error,
    },
    #[error("invalid YAML in {path}: {source}")]
    Yaml {
        path: String,
        source: serde_yaml::Error,
    },
    /// The YAML uses something JSON cannot express.
    #[error("cannot convert YAML in {path} to JSON at {location}: {reason}")]
    Conversion {
        path: String,
        location: InstancePath,
        reason: String,
    },
}

/// Whether `path` names a YAML document.
pub fn is_yaml(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|ext| ext.to_str()),
        Some("yaml" | "yml")
    )
}

/// Read a JSON or YAML document into a JSON value.
pub fn load_document(path: &Path) -> Result<Value, DocumentError> {
    let content = std::fs::read_to_string(path).map_err(|source| DocumentError::Read {
        path: path.display().to_string(),
        source,
    })?;

    if is_yaml(path) {
        let yaml: Yaml = serde_yaml::from_str(&content).map_err(|source| DocumentError::Yaml {
            path: path.display().to_string(),
            source,
        })?;
        yaml_to_json_value(yaml, path)
    } else {
        serde_json::from_str(&content).map_err(|source| DocumentError::Json {
            path: path.display().to_string(),
            source,
        })
    }
}

/// Convert a parsed YAML document from `path` into the equivalent JSON
/// value.
///
/// Tags are dropped. Mapping keys must be strings, numbers, or booleans, and
/// floats must be finite.
pub fn yaml_to_json_value(yaml: Yaml, path: &Path) -> Result<Value, DocumentError> {
    YamlConversion { path }.value(yaml, InstancePath::root())
}

struct YamlConversion<'p> {
    path: &'p Path,
}

impl YamlConversion<'_> {
    fn value(&self, yaml: Yaml, at: InstancePath) -> Result<Value, DocumentError> {
        Ok(match yaml {
            Yaml::Null => Value::Null,
            Yaml::Bool(b) => Value::Bool(b),
            Yaml::String(s) => Value::String(s),
            Yaml::Number(n) => Value::Number(self.number(&n, &at)?),
            Yaml::Sequence(items) => Value::Array(
                items
                    .into_iter()
                    .enumerate()
                    .map(|(index, item)| self.value(item, at.index(index)))
                    .collect::<Result<_, _>>()?,
            ),
            Yaml::Mapping(entries) => {
                let mut object = Map::with_capacity(entries.len());
                for (key, item) in entries {
                    let key = match key {
                        Yaml::String(s) => s,
                        Yaml::Number(n) => n.to_string(),
                        Yaml::Bool(b) => b.to_string(),
                        other => {
                            return Err(self.error(&at, format!("unsupported map key {other:?}")))
                        }
                    };
                    let item = self.value(item, at.key(&key))?;
                    object.insert(key, item);
                }
                Value::Object(object)
            }
            Yaml::Tagged(tagged) => self.value(tagged.value, at)?,
        })
    }

    fn number(&self, n: &serde_yaml::Number, at: &InstancePath) -> Result<Number, DocumentError> {
        if let Some(i) = n.as_i64() {
            return Ok(i.into());
        }
        if let Some(u) = n.as_u64() {
            return Ok(u.into());
        }
        n.as_f64()
            .and_then(Number::from_f64)
            .ok_or_else(|| self.error(at, format!("{n} has no JSON representation")))
    }

    fn error(&self, at: &InstancePath, reason: String) -> DocumentError {
        DocumentError::Conversion {
            path: self.path.display().to_string(),
            location: at.clone(),
            reason,
        }
    }
}
