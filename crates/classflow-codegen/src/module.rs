//! Generate a leaf module skeleton implementing a class signature.
//!
//! The scaffold copies the class's input/output contract into a process
//! definition; the tool invocation itself is left for the author to fill
//! in.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::Path;

use anyhow::Result;
use serde::Serialize;
use serde_yaml::{Mapping, Value};
use tracing::debug;

use classflow_core::class_def::model::process_name;
use classflow_core::class_def::{ClassDefinition, ParamSpec};

use crate::yaml::{keyed, param_entry, to_text};

/// A rendered leaf module scaffold.
#[derive(Debug, Clone, Serialize)]
pub struct GeneratedModule {
    /// Component identifier (`tool` or `tool/subtool`).
    pub component: String,
    pub process_name: String,
    pub files: BTreeMap<String, String>,
}

/// Render the module files for a new component of a class.
pub fn generate_module(
    class: &ClassDefinition,
    component: &str,
    author: Option<&str>,
) -> Result<GeneratedModule> {
    let process = process_name(component);
    debug!(class = %class.name, component, "rendering module scaffold");

    let mut files = BTreeMap::new();
    files.insert("main.nf".to_string(), render_main(class, component, &process));
    files.insert(
        "meta.yml".to_string(),
        render_meta(class, component, author)?,
    );
    files.insert(
        "tests/main.nf.test".to_string(),
        render_tests(class, component, &process),
    );

    Ok(GeneratedModule {
        component: component.to_string(),
        process_name: process,
        files,
    })
}

/// Write a generated module under its directory, returning written paths.
pub fn write_module(module: &GeneratedModule, module_dir: &Path) -> Result<Vec<String>> {
    let mut written = Vec::with_capacity(module.files.len());
    for (rel, content) in &module.files {
        let path = module_dir.join(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, content)?;
        written.push(path.display().to_string());
    }
    Ok(written)
}

fn input_declaration(params: &[ParamSpec]) -> String {
    let rendered: Vec<String> = params
        .iter()
        .map(|p| format!("{}({})", p.param_type.qualifier(), p.code_name()))
        .collect();
    if rendered.len() > 1 {
        format!("tuple {}", rendered.join(", "))
    } else {
        rendered.join(", ")
    }
}

fn render_main(class: &ClassDefinition, component: &str, process: &str) -> String {
    let tool = component.split('/').next().unwrap_or(component);
    let mut out = String::new();

    let _ = writeln!(out, "process {process} {{");
    let _ = writeln!(out, "    tag \"$meta.id\"");
    let _ = writeln!(out, "    label 'process_single'");
    out.push('\n');
    let _ = writeln!(out, "    // TODO: declare the conda environment and container for {tool}");
    out.push('\n');
    let _ = writeln!(out, "    input:");
    for group in &class.inputs {
        let _ = writeln!(out, "    {}", input_declaration(&group.params));
    }
    out.push('\n');
    let _ = writeln!(out, "    output:");
    for channel in &class.outputs {
        let _ = writeln!(
            out,
            "    {}, emit: {}",
            input_declaration(&channel.params),
            channel.name
        );
    }
    let _ = writeln!(out, "    path \"versions.yml\", emit: versions");
    out.push('\n');
    let _ = writeln!(out, "    when:");
    let _ = writeln!(out, "    task.ext.when == null || task.ext.when");
    out.push('\n');
    let _ = writeln!(out, "    script:");
    let _ = writeln!(out, "    def args = task.ext.args ?: ''");
    let _ = writeln!(out, "    def prefix = task.ext.prefix ?: \"${{meta.id}}\"");
    let _ = writeln!(out, "    \"\"\"");
    let _ = writeln!(out, "    # TODO: run {tool} here, honouring $args and $prefix");
    out.push('\n');
    let _ = writeln!(out, "    cat <<-END_VERSIONS > versions.yml");
    let _ = writeln!(out, "    \"${{task.process}}\":");
    let _ = writeln!(out, "        {tool}: \\$({tool} --version)");
    let _ = writeln!(out, "    END_VERSIONS");
    let _ = writeln!(out, "    \"\"\"");
    let _ = writeln!(out, "}}");
    out
}

fn render_meta(class: &ClassDefinition, component: &str, author: Option<&str>) -> Result<String> {
    let mut root = Mapping::new();
    root.insert(
        Value::from("name"),
        Value::from(component.replace('/', "_")),
    );
    root.insert(Value::from("description"), Value::from(class.description.as_str()));
    root.insert(
        Value::from("keywords"),
        Value::Sequence(class.keywords.iter().map(|k| Value::from(k.as_str())).collect()),
    );
    root.insert(Value::from("class"), Value::from(class.name.as_str()));

    let inputs: Vec<Value> = class
        .inputs
        .iter()
        .map(|group| Value::Sequence(group.params.iter().map(param_entry).collect()))
        .collect();
    root.insert(Value::from("input"), Value::Sequence(inputs));

    let outputs: Vec<Value> = class
        .outputs
        .iter()
        .map(|channel| {
            keyed(
                &channel.name,
                Value::Sequence(vec![Value::Sequence(
                    channel.params.iter().map(param_entry).collect(),
                )]),
            )
        })
        .collect();
    root.insert(Value::from("output"), Value::Sequence(outputs));

    root.insert(
        Value::from("authors"),
        Value::Sequence(vec![Value::from(author.unwrap_or("@author"))]),
    );

    to_text(root)
}

fn render_tests(class: &ClassDefinition, component: &str, process: &str) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "nextflow_process {{");
    out.push('\n');
    let _ = writeln!(out, "    name \"Test Process {process}\"");
    let _ = writeln!(out, "    script \"../main.nf\"");
    let _ = writeln!(out, "    process \"{process}\"");
    out.push('\n');
    let _ = writeln!(out, "    tag \"modules\"");
    let _ = writeln!(out, "    tag \"{component}\"");
    out.push('\n');
    let _ = writeln!(out, "    test(\"{}\") {{", class.name);
    out.push('\n');
    let _ = writeln!(out, "        when {{");
    let _ = writeln!(out, "            process {{");
    let _ = writeln!(out, "                \"\"\"");
    for (i, group) in class.testdata.iter().enumerate() {
        let _ = writeln!(
            out,
            "                input[{i}] = Channel.of( [ {} ] )",
            group.join(", ")
        );
    }
    let _ = writeln!(out, "                \"\"\"");
    let _ = writeln!(out, "            }}");
    let _ = writeln!(out, "        }}");
    out.push('\n');
    let _ = writeln!(out, "        then {{");
    let _ = writeln!(out, "            assertAll(");
    let _ = writeln!(out, "                {{ assert process.success }},");
    let _ = writeln!(out, "                {{ assert snapshot(process.out).match() }},");
    let _ = writeln!(out, "            )");
    let _ = writeln!(out, "        }}");
    let _ = writeln!(out, "    }}");
    out.push('\n');
    let _ = writeln!(out, "}}");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use classflow_core::class_def::parse_class_yaml;

    const ALIGNER_YML: &str = r#"
name: aligner
description: Align sequences.
keywords:
  - align
input:
  - - meta: { type: map }
    - fasta: { type: file }
output:
  - bam:
      - - meta: { type: map }
        - "*.bam": { type: file, pattern: "*.bam" }
testdata:
  - - "[ id:'test' ]"
    - "file(params.test_data['fasta'])"
"#;

    #[test]
    fn test_module_main_shape() {
        let class = parse_class_yaml(ALIGNER_YML, "aligner.yml").unwrap();
        let module = generate_module(&class, "toola/align", Some("@me")).unwrap();
        assert_eq!(module.process_name, "TOOLA_ALIGN");
        let main = &module.files["main.nf"];
        assert!(main.contains("process TOOLA_ALIGN {"));
        assert!(main.contains("    tuple val(meta), path(fasta)"));
        assert!(main.contains("    tuple val(meta), path(\"*.bam\"), emit: bam"));
        assert!(main.contains("    path \"versions.yml\", emit: versions"));
    }

    #[test]
    fn test_module_rendering_is_deterministic() {
        let class = parse_class_yaml(ALIGNER_YML, "aligner.yml").unwrap();
        let first = generate_module(&class, "toola/align", None).unwrap();
        let second = generate_module(&class, "toola/align", None).unwrap();
        assert_eq!(first.files, second.files);
    }

    #[test]
    fn test_module_meta_carries_class_signature() {
        let class = parse_class_yaml(ALIGNER_YML, "aligner.yml").unwrap();
        let module = generate_module(&class, "toola/align", Some("@me")).unwrap();
        let meta = &module.files["meta.yml"];
        assert!(meta.contains("name: toola_align"));
        assert!(meta.contains("class: aligner"));
        assert!(meta.contains("fasta:"));
        assert!(meta.contains("bam:"));
    }

    #[test]
    fn test_module_test_uses_fixtures() {
        let class = parse_class_yaml(ALIGNER_YML, "aligner.yml").unwrap();
        let module = generate_module(&class, "toola/align", None).unwrap();
        let tests = &module.files["tests/main.nf.test"];
        assert!(tests.contains("nextflow_process {"));
        assert!(tests.contains("input[0] = Channel.of( [ [ id:'test' ], file(params.test_data['fasta']) ] )"));
    }
}
