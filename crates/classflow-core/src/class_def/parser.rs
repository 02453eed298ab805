//! Parser for class definition YAML files.
//!
//! The schema is dynamically shaped on disk (lists of single-key maps);
//! parsing pins it down to the fixed, ordered records of
//! [`ClassDefinition`] so that ordering and duplicate keys are never
//! silently tolerated.

use std::collections::HashSet;

use serde_yaml::Value;

use crate::class_def::model::{ClassDefinition, InputGroup, OutputChannel, ParamSpec, ParamType};
use crate::error::{ClassflowError, ClassflowResult};

/// Parse a class definition from YAML text.
///
/// `source` is the display name of the definition (file path or URL) and
/// is only used for error reporting.
pub fn parse_class_yaml(text: &str, source: &str) -> ClassflowResult<ClassDefinition> {
    let root: Value = serde_yaml::from_str(text)?;
    let mapping = root
        .as_mapping()
        .ok_or_else(|| ClassflowError::schema(source, "expected a mapping at the top level"))?;

    let name = required_string(mapping, "name", source)?;
    let description = required_string(mapping, "description", source)?;

    let keywords = match mapping.get("keywords") {
        Some(v) => string_sequence(v, &format!("{source}:keywords"))?,
        None => Vec::new(),
    };

    let inputs_val = mapping
        .get("input")
        .ok_or_else(|| ClassflowError::schema(source, "missing required key 'input'"))?;
    let inputs = parse_input_groups(inputs_val, &format!("{source}:input"))?;

    let outputs_val = mapping
        .get("output")
        .ok_or_else(|| ClassflowError::schema(source, "missing required key 'output'"))?;
    let outputs = parse_output_channels(outputs_val, &format!("{source}:output"))?;

    let components = parse_components(mapping.get("components"), source)?;

    let testdata = match mapping.get("testdata") {
        Some(v) => parse_testdata(v, &format!("{source}:testdata"))?,
        None => Vec::new(),
    };

    Ok(ClassDefinition {
        name,
        description,
        keywords,
        inputs,
        outputs,
        components,
        testdata,
    })
}

/// Parse an ordered list of input groups.
///
/// Shared with component signatures, whose `input` key has the same shape.
pub fn parse_input_groups(value: &Value, path: &str) -> ClassflowResult<Vec<InputGroup>> {
    let seq = value
        .as_sequence()
        .ok_or_else(|| ClassflowError::schema(path, "expected a list of input groups"))?;

    let mut groups = Vec::with_capacity(seq.len());
    for (i, entry) in seq.iter().enumerate() {
        let group_path = format!("{path}[{i}]");
        // A bare single-key map is a one-element group.
        let entries: Vec<&Value> = match entry {
            Value::Sequence(items) => items.iter().collect(),
            Value::Mapping(_) => vec![entry],
            _ => {
                return Err(ClassflowError::schema(
                    group_path,
                    "expected a parameter group (list of named parameters)",
                ))
            }
        };

        let mut label = None;
        let mut params = Vec::new();
        for item in entries {
            let Some((key, body)) = single_entry(item, &group_path)? else {
                return Err(ClassflowError::schema(&group_path, "expected a named parameter"));
            };
            // `label: <string>` inside a group names the channel rather
            // than declaring a parameter.
            if key == "label" {
                if let Some(s) = body.as_str() {
                    label = Some(s.to_string());
                    continue;
                }
            }
            params.push(parse_param(&key, body, &group_path)?);
        }

        if params.is_empty() {
            return Err(ClassflowError::schema(group_path, "empty parameter group"));
        }
        check_duplicate_params(&params, &group_path)?;
        groups.push(InputGroup { label, params });
    }

    if groups.is_empty() {
        return Err(ClassflowError::schema(path, "at least one input group is required"));
    }
    Ok(groups)
}

/// Parse an ordered list of named output channels.
///
/// Accepts both the flat form (`- bam: [ <params> ]`) and the original
/// nested form (`- bam: [ [ <params> ] ]`) where the channel body is a
/// list of groups; nesting is collapsed to the first group.
pub fn parse_output_channels(value: &Value, path: &str) -> ClassflowResult<Vec<OutputChannel>> {
    // A plain mapping is accepted as well; insertion order is preserved.
    let entries: Vec<(String, &Value)> = match value {
        Value::Sequence(items) => {
            let mut acc = Vec::with_capacity(items.len());
            for (i, item) in items.iter().enumerate() {
                let entry_path = format!("{path}[{i}]");
                match single_entry(item, &entry_path)? {
                    Some((name, body)) => acc.push((name, body)),
                    None => return Err(ClassflowError::schema(entry_path, "expected a named channel")),
                }
            }
            acc
        }
        Value::Mapping(mapping) => mapping
            .iter()
            .map(|(k, v)| (value_key(k), v))
            .collect(),
        _ => {
            return Err(ClassflowError::schema(
                path,
                "expected a list of named output channels",
            ))
        }
    };

    let mut channels = Vec::with_capacity(entries.len());
    let mut seen = HashSet::new();
    for (name, body) in entries {
        let channel_path = format!("{path}.{name}");
        if !seen.insert(name.clone()) {
            return Err(ClassflowError::schema(channel_path, "duplicate output channel"));
        }
        let params = parse_channel_params(body, &channel_path)?;
        check_duplicate_params(&params, &channel_path)?;
        channels.push(OutputChannel { name, params });
    }

    if channels.is_empty() {
        return Err(ClassflowError::schema(path, "at least one output channel is required"));
    }
    Ok(channels)
}

/// Parse the parameters of one output channel body.
fn parse_channel_params(value: &Value, path: &str) -> ClassflowResult<Vec<ParamSpec>> {
    let seq = value
        .as_sequence()
        .ok_or_else(|| ClassflowError::schema(path, "expected a list of parameters"))?;

    // Nested form: the body is a list of groups; take the first group.
    let items: Vec<&Value> = match seq.first() {
        Some(Value::Sequence(inner)) => inner.iter().collect(),
        _ => seq.iter().collect(),
    };

    let mut params = Vec::new();
    for item in items {
        match single_entry(item, path)? {
            Some((name, body)) => params.push(parse_param(&name, body, path)?),
            None => return Err(ClassflowError::schema(path, "expected a named parameter")),
        }
    }
    if params.is_empty() {
        return Err(ClassflowError::schema(path, "empty output channel"));
    }
    Ok(params)
}

fn parse_components(value: Option<&Value>, source: &str) -> ClassflowResult<Vec<String>> {
    let Some(value) = value else {
        return Ok(Vec::new());
    };
    let path = format!("{source}:components");

    // `components: { modules: [...] }` or a bare list.
    let list = match value {
        Value::Mapping(mapping) => match mapping.get("modules") {
            Some(v) => v,
            None => return Ok(Vec::new()),
        },
        _ => value,
    };

    let components = string_sequence(list, &path)?;
    let mut seen = HashSet::new();
    for id in &components {
        if !seen.insert(id.clone()) {
            return Err(ClassflowError::schema(
                format!("{path}.{id}"),
                "duplicate component identifier",
            ));
        }
    }
    Ok(components)
}

fn parse_testdata(value: &Value, path: &str) -> ClassflowResult<Vec<Vec<String>>> {
    let seq = value
        .as_sequence()
        .ok_or_else(|| ClassflowError::schema(path, "expected a list of fixture groups"))?;

    let mut groups = Vec::with_capacity(seq.len());
    for (i, entry) in seq.iter().enumerate() {
        groups.push(string_sequence(entry, &format!("{path}[{i}]"))?);
    }
    Ok(groups)
}

/// Parse one `name: { type, description?, pattern?, ontologies? }` record.
fn parse_param(name: &str, body: &Value, group_path: &str) -> ClassflowResult<ParamSpec> {
    let path = format!("{group_path}.{name}");
    let mapping = body
        .as_mapping()
        .ok_or_else(|| ClassflowError::schema(&path, "expected a parameter description mapping"))?;

    let type_str = mapping
        .get("type")
        .and_then(|v| v.as_str())
        .ok_or_else(|| ClassflowError::schema(&path, "missing 'type'"))?;
    let param_type = ParamType::from_str(type_str)
        .ok_or_else(|| ClassflowError::schema(&path, format!("unknown type '{type_str}'")))?;

    let description = mapping
        .get("description")
        .and_then(|v| v.as_str())
        .map(|s| s.to_string());
    let pattern = mapping
        .get("pattern")
        .and_then(|v| v.as_str())
        .map(|s| s.to_string());
    let ontologies = match mapping.get("ontologies") {
        Some(v) => string_sequence(v, &format!("{path}.ontologies"))?,
        None => Vec::new(),
    };

    Ok(ParamSpec {
        name: name.to_string(),
        param_type,
        description,
        pattern,
        ontologies,
    })
}

fn check_duplicate_params(params: &[ParamSpec], path: &str) -> ClassflowResult<()> {
    let mut seen = HashSet::new();
    for p in params {
        if !seen.insert(p.name.as_str()) {
            return Err(ClassflowError::schema(
                format!("{path}.{}", p.name),
                "duplicate parameter name",
            ));
        }
    }
    Ok(())
}

/// Extract the single `key: value` entry of a map item.
fn single_entry<'a>(item: &'a Value, path: &str) -> ClassflowResult<Option<(String, &'a Value)>> {
    match item {
        Value::Mapping(mapping) => {
            if mapping.len() != 1 {
                return Err(ClassflowError::schema(
                    path,
                    format!("expected a single-key map, found {} keys", mapping.len()),
                ));
            }
            let (k, v) = mapping.iter().next().unwrap();
            Ok(Some((value_key(k), v)))
        }
        _ => Ok(None),
    }
}

/// Render a YAML key as a string; non-string keys (e.g. quoted globs that
/// parse as something else) are displayed through serde.
fn value_key(key: &Value) -> String {
    match key.as_str() {
        Some(s) => s.to_string(),
        None => serde_yaml::to_string(key).unwrap_or_default().trim().to_string(),
    }
}

fn required_string(mapping: &serde_yaml::Mapping, key: &str, source: &str) -> ClassflowResult<String> {
    mapping
        .get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| ClassflowError::schema(source, format!("missing required key '{key}'")))
}

fn string_sequence(value: &Value, path: &str) -> ClassflowResult<Vec<String>> {
    let seq = value
        .as_sequence()
        .ok_or_else(|| ClassflowError::schema(path, "expected a list of strings"))?;
    seq.iter()
        .map(|v| match v {
            Value::String(s) => Ok(s.clone()),
            Value::Number(n) => Ok(n.to_string()),
            _ => Err(ClassflowError::schema(path, "expected a string")),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALIGNER_YML: &str = r#"
name: aligner
description: Align sequences against a reference.
keywords:
  - align
  - sequence
input:
  - - meta:
        type: map
        description: Groovy map with sample information
    - fasta:
        type: file
        description: Input sequences
        pattern: "*.{fa,fasta}"
output:
  - bam:
      - - meta:
            type: map
            description: Groovy map with sample information
        - "*.bam":
            type: file
            description: Aligned reads
            pattern: "*.bam"
components:
  modules:
    - toola/align
    - toolb/align
testdata:
  - - "[ id:'test' ]"
    - "file(params.test_data['fasta'])"
"#;

    #[test]
    fn test_parse_full_class() {
        let class = parse_class_yaml(ALIGNER_YML, "aligner.yml").unwrap();
        assert_eq!(class.name, "aligner");
        assert_eq!(class.keywords, vec!["align", "sequence"]);
        assert_eq!(class.inputs.len(), 1);
        assert_eq!(class.inputs[0].params.len(), 2);
        assert_eq!(class.inputs[0].channel_name(), "ch_fasta");
        assert_eq!(class.outputs.len(), 1);
        assert_eq!(class.outputs[0].name, "bam");
        assert_eq!(class.outputs[0].params[1].name, "*.bam");
        assert_eq!(class.components, vec!["toola/align", "toolb/align"]);
        assert_eq!(class.testdata.len(), 1);
    }

    #[test]
    fn test_missing_required_key() {
        let yml = r#"
name: x
input:
  - - meta: { type: map }
output:
  - bam:
      - meta: { type: map }
"#;
        let err = parse_class_yaml(yml, "x.yml").unwrap_err();
        match err {
            ClassflowError::Schema { reason, .. } => assert!(reason.contains("description")),
            other => panic!("expected schema error, got {other:?}"),
        }
    }

    #[test]
    fn test_duplicate_param_rejected() {
        let yml = r#"
name: x
description: d
input:
  - - meta: { type: map }
    - fasta: { type: file }
    - fasta: { type: file }
output:
  - bam:
      - meta: { type: map }
"#;
        let err = parse_class_yaml(yml, "x.yml").unwrap_err();
        match err {
            ClassflowError::Schema { path, reason } => {
                assert!(path.contains("fasta"), "path was {path}");
                assert!(reason.contains("duplicate"));
            }
            other => panic!("expected schema error, got {other:?}"),
        }
    }

    #[test]
    fn test_duplicate_component_rejected() {
        let yml = r#"
name: x
description: d
input:
  - - meta: { type: map }
    - fasta: { type: file }
output:
  - bam:
      - meta: { type: map }
components:
  modules:
    - toola/align
    - toola/align
"#;
        let err = parse_class_yaml(yml, "x.yml").unwrap_err();
        assert!(matches!(err, ClassflowError::Schema { .. }));
    }

    #[test]
    fn test_group_label() {
        let yml = r#"
name: x
description: d
input:
  - - label: reads
    - meta: { type: map }
    - fastq: { type: file }
output:
  - bam:
      - meta: { type: map }
"#;
        let class = parse_class_yaml(yml, "x.yml").unwrap();
        assert_eq!(class.inputs[0].label.as_deref(), Some("reads"));
        assert_eq!(class.inputs[0].channel_name(), "ch_reads");
    }

    #[test]
    fn test_unknown_type_rejected() {
        let yml = r#"
name: x
description: d
input:
  - - meta: { type: blob }
output:
  - bam:
      - meta: { type: map }
"#;
        let err = parse_class_yaml(yml, "x.yml").unwrap_err();
        match err {
            ClassflowError::Schema { reason, .. } => assert!(reason.contains("blob")),
            other => panic!("expected schema error, got {other:?}"),
        }
    }
}
