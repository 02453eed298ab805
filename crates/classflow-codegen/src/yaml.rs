//! Helpers for building ordered YAML documents.

use serde_yaml::{Mapping, Value};

use classflow_core::class_def::ParamSpec;

/// Build a `name: { type, description?, pattern?, ontologies? }` entry.
pub fn param_entry(param: &ParamSpec) -> Value {
    let mut body = Mapping::new();
    body.insert(Value::from("type"), Value::from(param.param_type.as_str()));
    if let Some(description) = &param.description {
        body.insert(Value::from("description"), Value::from(description.as_str()));
    }
    if let Some(pattern) = &param.pattern {
        body.insert(Value::from("pattern"), Value::from(pattern.as_str()));
    }
    if !param.ontologies.is_empty() {
        body.insert(
            Value::from("ontologies"),
            Value::Sequence(param.ontologies.iter().map(|o| Value::from(o.as_str())).collect()),
        );
    }

    let mut entry = Mapping::new();
    entry.insert(Value::from(param.name.as_str()), Value::Mapping(body));
    Value::Mapping(entry)
}

/// Build a single-key mapping.
pub fn keyed(key: &str, value: Value) -> Value {
    let mut entry = Mapping::new();
    entry.insert(Value::from(key), value);
    Value::Mapping(entry)
}

/// Serialize a mapping to YAML text.
pub fn to_text(root: Mapping) -> anyhow::Result<String> {
    Ok(serde_yaml::to_string(&Value::Mapping(root))?)
}
