//! Generate composite subworkflow files from an inferred wiring.
//!
//! Every selected component is invoked unconditionally; records carry a
//! trailing `tool` discriminator and each take channel is branched on it,
//! so choosing a component happens per record, not at generation time.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use anyhow::Result;
use serde::Serialize;
use serde_yaml::{Mapping, Value};
use sha2::{Digest, Sha256};
use tracing::debug;

use classflow_core::class_def::model::sanitize_identifier;
use classflow_core::class_def::{ClassDefinition, ParamSpec, ParamType};
use classflow_core::inference::WorkflowWiring;

use crate::yaml::{keyed, param_entry, to_text};

/// A rendered composite artifact.
///
/// Superseded as a whole whenever the class or the component subset
/// changes; reconciliation always starts from a freshly generated one.
#[derive(Debug, Clone, Serialize)]
pub struct GeneratedWorkflow {
    pub class_name: String,
    /// Component identifiers expanded into the artifact, in class order.
    pub components: Vec<String>,
    /// Content hash of the rendering inputs (class definition plus the
    /// component subset).
    pub input_hash: String,
    /// Artifact-relative path to rendered content.
    pub files: BTreeMap<String, String>,
}

/// Render the subworkflow files for a class and its inferred wiring.
pub fn generate_workflow(
    class: &ClassDefinition,
    wiring: &WorkflowWiring,
    org: &str,
    author: Option<&str>,
) -> Result<GeneratedWorkflow> {
    let components: Vec<String> = wiring.invocations.iter().map(|i| i.component.clone()).collect();
    let input_hash = input_hash(class, &components);
    debug!(class = %class.name, hash = %input_hash, "rendering subworkflow");

    let mut files = BTreeMap::new();
    files.insert("main.nf".to_string(), render_main(class, wiring, org));
    files.insert("meta.yml".to_string(), render_meta(class, wiring, author)?);
    files.insert(
        "tests/main.nf.test".to_string(),
        render_tests(class, wiring, org),
    );

    Ok(GeneratedWorkflow {
        class_name: class.name.clone(),
        components,
        input_hash,
        files,
    })
}

/// Hash of the rendering inputs: a changed class definition or subset
/// yields a different hash, identical inputs always the same one.
pub fn input_hash(class: &ClassDefinition, components: &[String]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(serde_json::to_string(class).unwrap_or_default());
    hasher.update([0u8]);
    hasher.update(components.join(","));
    format!("{:x}", hasher.finalize())
}

fn render_main(class: &ClassDefinition, wiring: &WorkflowWiring, org: &str) -> String {
    let mut out = String::new();
    let workflow_name = class.workflow_name();

    let _ = writeln!(out, "//");
    let _ = writeln!(out, "// {workflow_name}: expanded from class '{}'", class.name);
    let _ = writeln!(out, "//");
    out.push('\n');

    for invocation in &wiring.invocations {
        let _ = writeln!(
            out,
            "include {{ {} }} from '../../../modules/{org}/{}/main'",
            invocation.process_name, invocation.component
        );
    }
    out.push('\n');

    let _ = writeln!(out, "workflow {workflow_name} {{");
    out.push('\n');
    let _ = writeln!(out, "    take:");
    for take in &wiring.takes {
        let _ = writeln!(out, "    {}", take.name);
    }
    out.push('\n');
    let _ = writeln!(out, "    main:");
    out.push('\n');
    let _ = writeln!(out, "    def ch_versions = Channel.empty()");
    for emit in &wiring.emits {
        let _ = writeln!(out, "    def ch_out_{emit} = Channel.empty()");
    }
    out.push('\n');

    // Route each record to the branch of the tool named in its trailing
    // discriminator element.
    for take in &wiring.takes {
        let elements: Vec<String> = take.elements.iter().map(|e| sanitize_identifier(e)).collect();
        let record = elements.join(", ");
        let _ = writeln!(out, "    {}", take.name);
        let _ = writeln!(out, "        .branch {{");
        let _ = writeln!(out, "            {record}, tool ->");
        for invocation in &wiring.invocations {
            let _ = writeln!(
                out,
                "                {}: tool == \"{}\"",
                invocation.branch_name, invocation.branch_name
            );
            let _ = writeln!(out, "                    return [ {record} ]");
        }
        let _ = writeln!(out, "        }}");
        let _ = writeln!(out, "        .set {{ {}_branch }}", take.name);
        out.push('\n');
    }

    for invocation in &wiring.invocations {
        let _ = writeln!(
            out,
            "    {}( {} )",
            invocation.process_name,
            invocation.args.join(", ")
        );
        for (class_channel, component_channel) in &invocation.outputs {
            let _ = writeln!(
                out,
                "    ch_out_{class_channel} = ch_out_{class_channel}.mix({}.out.{component_channel})",
                invocation.process_name
            );
        }
        let _ = writeln!(
            out,
            "    ch_versions = ch_versions.mix({}.out.versions)",
            invocation.process_name
        );
        out.push('\n');
    }

    let _ = writeln!(out, "    emit:");
    for emit in &wiring.emits {
        let _ = writeln!(out, "    {emit} = ch_out_{emit}");
    }
    let _ = writeln!(out, "    versions = ch_versions");
    let _ = writeln!(out, "}}");
    out
}

fn render_meta(
    class: &ClassDefinition,
    wiring: &WorkflowWiring,
    author: Option<&str>,
) -> Result<String> {
    let mut root = Mapping::new();
    root.insert(Value::from("name"), Value::from(class.name.as_str()));
    root.insert(Value::from("description"), Value::from(class.description.as_str()));
    root.insert(
        Value::from("keywords"),
        Value::Sequence(class.keywords.iter().map(|k| Value::from(k.as_str())).collect()),
    );
    root.insert(
        Value::from("components"),
        Value::Sequence(
            wiring
                .invocations
                .iter()
                .map(|i| Value::from(i.component.as_str()))
                .collect(),
        ),
    );

    let mut inputs = Vec::with_capacity(wiring.takes.len());
    for (group, take) in class.inputs.iter().zip(&wiring.takes) {
        let mut structure: Vec<Value> = group.params.iter().map(param_entry).collect();
        structure.push(param_entry(&tool_param()));

        let mut body = Mapping::new();
        body.insert(
            Value::from("description"),
            Value::from(format!(
                "Channel containing: {}, tool",
                take.elements.join(", ")
            )),
        );
        body.insert(Value::from("structure"), Value::Sequence(structure));
        inputs.push(keyed(&take.name, Value::Mapping(body)));
    }
    root.insert(Value::from("input"), Value::Sequence(inputs));

    let mut outputs = Vec::with_capacity(class.outputs.len() + 1);
    for channel in &class.outputs {
        let mut body = Mapping::new();
        body.insert(
            Value::from("description"),
            Value::from(format!("Output channel {}", channel.name)),
        );
        body.insert(
            Value::from("structure"),
            Value::Sequence(channel.params.iter().map(param_entry).collect()),
        );
        outputs.push(keyed(&channel.name, Value::Mapping(body)));
    }
    let mut versions_body = Mapping::new();
    versions_body.insert(
        Value::from("description"),
        Value::from("Channel collecting the version file of every executed tool"),
    );
    versions_body.insert(
        Value::from("structure"),
        Value::Sequence(vec![param_entry(&versions_param())]),
    );
    outputs.push(keyed("versions", Value::Mapping(versions_body)));
    root.insert(Value::from("output"), Value::Sequence(outputs));

    root.insert(
        Value::from("authors"),
        Value::Sequence(vec![Value::from(author.unwrap_or("@author"))]),
    );

    to_text(root)
}

fn render_tests(class: &ClassDefinition, wiring: &WorkflowWiring, org: &str) -> String {
    let workflow_name = class.workflow_name();
    let mut out = String::new();

    let _ = writeln!(out, "nextflow_workflow {{");
    out.push('\n');
    let _ = writeln!(out, "    name \"Test Subworkflow {workflow_name}\"");
    let _ = writeln!(out, "    script \"../main.nf\"");
    let _ = writeln!(out, "    workflow \"{workflow_name}\"");
    out.push('\n');
    let _ = writeln!(out, "    tag \"subworkflows\"");
    let _ = writeln!(out, "    tag \"subworkflows/{}\"", class.name);
    for invocation in &wiring.invocations {
        let _ = writeln!(
            out,
            "    tag \"subworkflows/../../modules/{org}/{}\"",
            invocation.component
        );
    }
    out.push('\n');

    for invocation in &wiring.invocations {
        let _ = writeln!(out, "    test(\"{}\") {{", invocation.component);
        out.push('\n');
        let _ = writeln!(out, "        when {{");
        let _ = writeln!(out, "            workflow {{");
        let _ = writeln!(out, "                \"\"\"");
        for (i, group) in class.testdata.iter().enumerate() {
            let mut literals: Vec<String> = group.clone();
            literals.push(format!("'{}'", invocation.branch_name));
            let _ = writeln!(
                out,
                "                input[{i}] = Channel.of( [ {} ] )",
                literals.join(", ")
            );
        }
        let _ = writeln!(out, "                \"\"\"");
        let _ = writeln!(out, "            }}");
        let _ = writeln!(out, "        }}");
        out.push('\n');
        let _ = writeln!(out, "        then {{");
        let _ = writeln!(out, "            assertAll(");
        let _ = writeln!(out, "                {{ assert workflow.success }},");
        let _ = writeln!(
            out,
            "                {{ assert snapshot(workflow.out).match(\"{}\") }},",
            invocation.component
        );
        let _ = writeln!(out, "            )");
        let _ = writeln!(out, "        }}");
        let _ = writeln!(out, "    }}");
        out.push('\n');
    }

    let _ = writeln!(out, "}}");
    out
}

fn tool_param() -> ParamSpec {
    ParamSpec {
        name: "tool".to_string(),
        param_type: ParamType::String,
        description: Some("The name of the tool to run".to_string()),
        pattern: None,
        ontologies: Vec::new(),
    }
}

fn versions_param() -> ParamSpec {
    ParamSpec {
        name: "versions.yml".to_string(),
        param_type: ParamType::File,
        description: Some("File containing software versions".to_string()),
        pattern: None,
        ontologies: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use classflow_core::class_def::parse_class_yaml;
    use classflow_core::component::parse_component_meta;
    use classflow_core::inference::infer;

    const ALIGNER_YML: &str = r#"
name: aligner
description: Align sequences.
keywords:
  - align
input:
  - - meta: { type: map, description: Sample metadata }
    - fasta: { type: file, description: Input sequences }
output:
  - bam:
      - - meta: { type: map, description: Sample metadata }
        - "*.bam": { type: file, pattern: "*.bam" }
components:
  modules:
    - toola/align
    - toolb/align
    - toolc/align
testdata:
  - - "[ id:'test' ]"
    - "file(params.test_data['fasta'])"
"#;

    const TOOL_META: &str = r#"
input:
  - - meta: { type: map }
    - seqs: { type: file }
output:
  bam:
    - - meta: { type: map }
      - "*.bam": { type: file, pattern: "*.bam" }
"#;

    fn generated(subset: &[&str]) -> GeneratedWorkflow {
        let class = parse_class_yaml(ALIGNER_YML, "aligner.yml").unwrap();
        let descriptors: Vec<_> = subset
            .iter()
            .map(|id| parse_component_meta(TOOL_META, id, "meta.yml").unwrap())
            .collect();
        let wiring = infer(&class, &descriptors).unwrap();
        generate_workflow(&class, &wiring, "acme", Some("@me")).unwrap()
    }

    #[test]
    fn test_rendering_is_deterministic() {
        let first = generated(&["toola/align", "toolb/align"]);
        let second = generated(&["toola/align", "toolb/align"]);
        assert_eq!(first.files, second.files);
        assert_eq!(first.input_hash, second.input_hash);
    }

    #[test]
    fn test_main_nf_shape() {
        let generated = generated(&["toola/align"]);
        let main = &generated.files["main.nf"];
        assert!(main.contains("include { TOOLA_ALIGN } from '../../../modules/acme/toola/align/main'"));
        assert!(main.contains("workflow ALIGNER {"));
        assert!(main.contains("    take:\n    ch_fasta\n"));
        assert!(main.contains("toola_align: tool == \"toola_align\""));
        assert!(main.contains("    TOOLA_ALIGN( ch_fasta_branch.toola_align )"));
        assert!(main.contains("    ch_out_bam = ch_out_bam.mix(TOOLA_ALIGN.out.bam)"));
        assert!(main.contains("    ch_versions = ch_versions.mix(TOOLA_ALIGN.out.versions)"));
        assert!(main.contains("    emit:\n    bam = ch_out_bam\n    versions = ch_versions\n}"));
    }

    #[test]
    fn test_adding_component_only_inserts() {
        let two = generated(&["toola/align", "toolb/align"]);
        let three = generated(&["toola/align", "toolb/align", "toolc/align"]);

        // Every line of the two-component render is still present, in
        // order, in the three-component render.
        let mut remaining: Vec<&str> = three.files["main.nf"].lines().collect();
        for line in two.files["main.nf"].lines() {
            let pos = remaining
                .iter()
                .position(|l| *l == line)
                .unwrap_or_else(|| panic!("line dropped after append: {line}"));
            remaining.drain(..=pos);
        }

        // The invocation blocks of the first two components are untouched.
        assert!(three.files["main.nf"].contains("    TOOLA_ALIGN( ch_fasta_branch.toola_align )"));
        assert!(three.files["main.nf"].contains("    TOOLB_ALIGN( ch_fasta_branch.toolb_align )"));
    }

    #[test]
    fn test_versions_accumulate_once_per_component() {
        let generated = generated(&["toola/align", "toolb/align", "toolc/align"]);
        let main = &generated.files["main.nf"];
        for name in ["TOOLA_ALIGN", "TOOLB_ALIGN", "TOOLC_ALIGN"] {
            let needle = format!("ch_versions = ch_versions.mix({name}.out.versions)");
            assert_eq!(main.matches(&needle).count(), 1, "{name}");
        }
    }

    #[test]
    fn test_hash_tracks_subset() {
        let one = generated(&["toola/align"]);
        let two = generated(&["toola/align", "toolb/align"]);
        assert_ne!(one.input_hash, two.input_hash);
    }

    #[test]
    fn test_meta_yml_documents_tool_element() {
        let generated = generated(&["toola/align"]);
        let meta = &generated.files["meta.yml"];
        assert!(meta.contains("name: aligner"));
        assert!(meta.contains("ch_fasta"));
        assert!(meta.contains("tool:"));
        assert!(meta.contains("versions"));
        assert!(meta.contains("'@me'") || meta.contains("\"@me\"") || meta.contains("- '@me'"));
    }

    #[test]
    fn test_nftest_per_component() {
        let generated = generated(&["toola/align", "toolb/align"]);
        let tests = &generated.files["tests/main.nf.test"];
        assert!(tests.contains("test(\"toola/align\")"));
        assert!(tests.contains("test(\"toolb/align\")"));
        assert!(tests.contains("input[0] = Channel.of( [ [ id:'test' ], file(params.test_data['fasta']), 'toola_align' ] )"));
        assert!(tests.contains("tag \"subworkflows/../../modules/acme/toolb/align\""));
    }
}
