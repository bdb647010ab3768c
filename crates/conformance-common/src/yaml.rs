//! Manifest parsing using yaml-rust2
//!
//! Test fixtures are multi-document YAML files. Each document is converted to
//! a `serde_json::Value` so it can be sent to the API server with server-side
//! apply. Empty documents (stray `---` separators) are dropped.

use serde_json::{Map, Number, Value};
use yaml_rust2::{Yaml, YamlLoader};

use crate::{Error, Result};

/// Parse every non-empty document of a manifest file
///
/// `origin` names the source (usually the file path) in error messages.
pub fn parse_documents(input: &str, origin: &str) -> Result<Vec<Value>> {
    let docs =
        YamlLoader::load_from_str(input).map_err(|e| Error::manifest(origin, e.to_string()))?;

    let mut values = Vec::with_capacity(docs.len());
    for (index, doc) in docs.into_iter().enumerate() {
        let value = yaml_to_json(doc)
            .map_err(|msg| Error::manifest(origin, format!("document {}: {}", index + 1, msg)))?;
        if value.is_null() {
            continue;
        }
        if !value.is_object() {
            return Err(Error::manifest(
                origin,
                format!("document {} is not a mapping", index + 1),
            ));
        }
        values.push(value);
    }
    Ok(values)
}

fn yaml_to_json(yaml: Yaml) -> std::result::Result<Value, String> {
    match yaml {
        Yaml::Null => Ok(Value::Null),
        Yaml::Boolean(b) => Ok(Value::Bool(b)),
        Yaml::Integer(i) => Ok(Value::Number(i.into())),
        Yaml::Real(s) => {
            let f: f64 = s.parse().map_err(|e| format!("invalid number '{s}': {e}"))?;
            Ok(Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null))
        }
        Yaml::String(s) => Ok(Value::String(s)),
        Yaml::Array(items) => items
            .into_iter()
            .map(yaml_to_json)
            .collect::<std::result::Result<Vec<_>, _>>()
            .map(Value::Array),
        Yaml::Hash(map) => map
            .into_iter()
            .map(|(k, v)| {
                let key = match k {
                    Yaml::String(s) | Yaml::Real(s) => s,
                    Yaml::Integer(i) => i.to_string(),
                    Yaml::Boolean(b) => b.to_string(),
                    _ => return Err("unsupported mapping key".to_string()),
                };
                yaml_to_json(v).map(|v| (key, v))
            })
            .collect::<std::result::Result<Map<String, Value>, _>>()
            .map(Value::Object),
        Yaml::Alias(_) => Err("YAML aliases are not supported".to_string()),
        Yaml::BadValue => Err("bad YAML value".to_string()),
    }
}
