//! Channel inference engine.
//!
//! Derives the take/emit wiring of a composite workflow from a class
//! definition and a resolved component subset. The result is stable under
//! appending components to the class: existing invocations never reorder
//! or rename, so downstream patch application targets predictable
//! regions.

use crate::class_def::model::{ClassDefinition, InputGroup, OutputChannel};
use crate::component::model::{groups_compatible, params_compatible, ComponentDescriptor};
use crate::error::{ClassflowError, ClassflowResult};

/// One take channel of the composite, flattened from an input group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TakeChannel {
    /// Channel name (`ch_fasta`).
    pub name: String,
    /// Element names of the records flowing through the channel, without
    /// the trailing tool discriminator.
    pub elements: Vec<String>,
}

/// One unconditional component invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub component: String,
    pub process_name: String,
    /// Branch arm name carrying this component's records.
    pub branch_name: String,
    /// Argument expression per component input channel: either a branch
    /// access (`ch_fasta_branch.toola_align`) or an empty placeholder for
    /// inputs the class does not provide.
    pub args: Vec<String>,
    /// Mapping of class output channel name to the component's own
    /// channel name for that output.
    pub outputs: Vec<(String, String)>,
}

/// Inferred wiring of a composite workflow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowWiring {
    pub takes: Vec<TakeChannel>,
    /// Class output channel names, in declared order.
    pub emits: Vec<String>,
    pub invocations: Vec<Invocation>,
    /// Components contributing to the versions accumulation channel:
    /// the ordered union over the selection, each exactly once.
    pub versions: Vec<String>,
}

/// Infer the wiring for a class and a resolved component subset.
///
/// Invocation order is re-derived from `ClassDefinition.components`
/// regardless of the order descriptors are supplied in.
pub fn infer(
    class: &ClassDefinition,
    descriptors: &[ComponentDescriptor],
) -> ClassflowResult<WorkflowWiring> {
    if descriptors.is_empty() {
        return Err(ClassflowError::NoComponents(class.name.clone()));
    }

    let mut ordered: Vec<&ComponentDescriptor> = Vec::with_capacity(descriptors.len());
    for desc in descriptors {
        if class.component_index(&desc.id).is_none() {
            return Err(ClassflowError::UnknownComponent(desc.id.clone()));
        }
        ordered.push(desc);
    }
    ordered.sort_by_key(|d| class.component_index(&d.id));

    let takes: Vec<TakeChannel> = class
        .inputs
        .iter()
        .map(|group| TakeChannel {
            name: group.channel_name(),
            elements: group.params.iter().map(|p| p.name.clone()).collect(),
        })
        .collect();

    let mut invocations = Vec::with_capacity(ordered.len());
    let mut versions = Vec::with_capacity(ordered.len());
    for desc in &ordered {
        let args = component_args(desc, &class.inputs, &takes)?;
        let outputs = component_outputs(desc, &class.outputs)?;
        invocations.push(Invocation {
            component: desc.id.clone(),
            process_name: desc.process_name.clone(),
            branch_name: desc.branch_name(),
            args,
            outputs,
        });
        // Structural union: a component contributes to the versions
        // channel exactly once no matter how often it is listed.
        if !versions.contains(&desc.id) {
            versions.push(desc.id.clone());
        }
    }

    Ok(WorkflowWiring {
        takes,
        emits: class.outputs.iter().map(|o| o.name.clone()).collect(),
        invocations,
        versions,
    })
}

/// Match each component input channel against the class input groups and
/// produce the invocation argument list.
///
/// Every class take channel must be consumed by the component; a
/// component input the class does not declare is filled with an empty
/// placeholder of matching shape.
fn component_args(
    desc: &ComponentDescriptor,
    class_inputs: &[InputGroup],
    takes: &[TakeChannel],
) -> ClassflowResult<Vec<String>> {
    let mut args = Vec::with_capacity(desc.inputs.len());
    let mut consumed = vec![false; class_inputs.len()];

    for channel in &desc.inputs {
        let matched = class_inputs
            .iter()
            .enumerate()
            .find(|(i, group)| !consumed[*i] && groups_compatible(channel, &group.params));
        match matched {
            Some((i, _)) => {
                consumed[i] = true;
                args.push(format!("{}_branch.{}", takes[i].name, desc.branch_name()));
            }
            None => {
                // Extra optional input of the component; wire an empty
                // placeholder of the same arity.
                if channel.len() > 1 {
                    let empties = vec!["[]"; channel.len()];
                    args.push(format!("[{}]", empties.join(", ")));
                } else {
                    args.push("[]".to_string());
                }
            }
        }
    }

    if let Some(unused) = consumed.iter().position(|c| !c) {
        return Err(ClassflowError::inference(
            &desc.id,
            format!(
                "no input channel accepts the class input group '{}'",
                takes[unused].name
            ),
        ));
    }
    Ok(args)
}

/// Match every class output channel to one of the component's output
/// channels by parameter shape.
fn component_outputs(
    desc: &ComponentDescriptor,
    class_outputs: &[OutputChannel],
) -> ClassflowResult<Vec<(String, String)>> {
    let mut mapping = Vec::with_capacity(class_outputs.len());
    for class_channel in class_outputs {
        let matched = desc.outputs.iter().find(|candidate| {
            candidate.params.len() == class_channel.params.len()
                && candidate
                    .params
                    .iter()
                    .zip(class_channel.params.iter())
                    .all(|(c, k)| params_compatible(c, k))
        });
        match matched {
            Some(channel) => mapping.push((class_channel.name.clone(), channel.name.clone())),
            None => {
                return Err(ClassflowError::inference(
                    &desc.id,
                    format!("no output channel matches the class output '{}'", class_channel.name),
                ))
            }
        }
    }
    Ok(mapping)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::class_def::parse_class_yaml;
    use crate::component::parse_component_meta;

    fn aligner() -> ClassDefinition {
        parse_class_yaml(
            r#"
name: aligner
description: d
input:
  - - meta: { type: map }
    - fasta: { type: file }
output:
  - bam:
      - - meta: { type: map }
        - "*.bam": { type: file, pattern: "*.bam" }
components:
  modules:
    - toola/align
    - toolb/align
    - toolc/align
"#,
            "aligner.yml",
        )
        .unwrap()
    }

    fn tool(id: &str) -> ComponentDescriptor {
        parse_component_meta(
            r#"
input:
  - - meta: { type: map }
    - seqs: { type: file }
output:
  bam:
    - - meta: { type: map }
      - "*.bam": { type: file, pattern: "*.bam" }
  versions:
    - "versions.yml": { type: file }
"#,
            id,
            "meta.yml",
        )
        .unwrap()
    }

    #[test]
    fn test_basic_wiring() {
        let class = aligner();
        let wiring = infer(&class, &[tool("toola/align")]).unwrap();
        assert_eq!(wiring.takes.len(), 1);
        assert_eq!(wiring.takes[0].name, "ch_fasta");
        assert_eq!(wiring.emits, vec!["bam"]);
        assert_eq!(wiring.invocations.len(), 1);
        assert_eq!(wiring.invocations[0].args, vec!["ch_fasta_branch.toola_align"]);
        assert_eq!(
            wiring.invocations[0].outputs,
            vec![("bam".to_string(), "bam".to_string())]
        );
        assert_eq!(wiring.versions, vec!["toola/align"]);
    }

    #[test]
    fn test_empty_selection_fails_fast() {
        let class = aligner();
        let err = infer(&class, &[]).unwrap_err();
        assert!(matches!(err, ClassflowError::NoComponents(_)));
    }

    #[test]
    fn test_order_derived_from_class() {
        let class = aligner();
        let wiring = infer(&class, &[tool("toolc/align"), tool("toola/align")]).unwrap();
        let order: Vec<&str> = wiring.invocations.iter().map(|i| i.component.as_str()).collect();
        assert_eq!(order, vec!["toola/align", "toolc/align"]);
    }

    #[test]
    fn test_append_only_extends_invocations() {
        let class = aligner();
        let two = infer(&class, &[tool("toola/align"), tool("toolb/align")]).unwrap();
        let three = infer(
            &class,
            &[tool("toola/align"), tool("toolb/align"), tool("toolc/align")],
        )
        .unwrap();
        assert_eq!(&three.invocations[..2], &two.invocations[..]);
        assert_eq!(&three.versions[..2], &two.versions[..]);
    }

    #[test]
    fn test_arity_mismatch_is_inference_error() {
        let class = aligner();
        let bad = parse_component_meta(
            r#"
input:
  - - meta: { type: map }
    - seqs: { type: file }
    - extra: { type: string }
output:
  bam:
    - - meta: { type: map }
      - "*.bam": { type: file, pattern: "*.bam" }
"#,
            "toola/align",
            "meta.yml",
        )
        .unwrap();
        let err = infer(&class, &[bad]).unwrap_err();
        match err {
            ClassflowError::Inference { component, .. } => assert_eq!(component, "toola/align"),
            other => panic!("expected inference error, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_output_is_inference_error() {
        let class = aligner();
        let bad = parse_component_meta(
            r#"
input:
  - - meta: { type: map }
    - seqs: { type: file }
output:
  sam:
    - - meta: { type: map }
      - "*.sam": { type: file, pattern: "*.sam" }
"#,
            "toolb/align",
            "meta.yml",
        )
        .unwrap();
        let err = infer(&class, &[bad]).unwrap_err();
        match err {
            ClassflowError::Inference { component, reason } => {
                assert_eq!(component, "toolb/align");
                assert!(reason.contains("bam"));
            }
            other => panic!("expected inference error, got {other:?}"),
        }
    }

    #[test]
    fn test_composed_component_extra_input_gets_placeholder() {
        let class = aligner();
        let composed = parse_component_meta(
            r#"
input:
  - - meta: { type: map }
    - seqs: { type: file }
  - - meta2: { type: map }
    - tree: { type: file }
output:
  bam:
    - - meta: { type: map }
      - "*.bam": { type: file, pattern: "*.bam" }
"#,
            "toola/align",
            "meta.yml",
        )
        .unwrap();
        let wiring = infer(&class, &[composed]).unwrap();
        assert_eq!(
            wiring.invocations[0].args,
            vec!["ch_fasta_branch.toola_align", "[[], []]"]
        );
    }
}
