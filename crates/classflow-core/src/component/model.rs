//! Resolved component metadata.

use serde_yaml::Value;

use crate::class_def::model::{process_name, OutputChannel, ParamSpec};
use crate::class_def::parser::{parse_input_groups, parse_output_channels};
use crate::error::{ClassflowError, ClassflowResult};

/// Resolved metadata for one component implementing a class.
///
/// A component may be composed, spanning more than one input or output
/// channel of the class; matching is therefore per channel, not per
/// component.
#[derive(Debug, Clone)]
pub struct ComponentDescriptor {
    /// Component identifier, possibly namespaced (`tool/subtool`).
    pub id: String,
    /// Process identifier used in generated code (`TOOL_SUBTOOL`).
    pub process_name: String,
    /// Input channels of the component, each an ordered parameter group.
    pub inputs: Vec<Vec<ParamSpec>>,
    /// Named output channels of the component.
    pub outputs: Vec<OutputChannel>,
}

impl ComponentDescriptor {
    /// Channel name used for the branch arm of this component in
    /// generated composites.
    pub fn branch_name(&self) -> String {
        self.process_name.to_lowercase()
    }
}

/// Parse a component `meta.yml` signature.
///
/// `source` is the display name used in error reporting.
pub fn parse_component_meta(text: &str, id: &str, source: &str) -> ClassflowResult<ComponentDescriptor> {
    let root: Value = serde_yaml::from_str(text)?;
    let mapping = root
        .as_mapping()
        .ok_or_else(|| ClassflowError::schema(source, "expected a mapping at the top level"))?;

    let inputs_val = mapping
        .get("input")
        .ok_or_else(|| ClassflowError::schema(source, "missing required key 'input'"))?;
    let inputs = parse_input_groups(inputs_val, &format!("{source}:input"))?
        .into_iter()
        .map(|g| g.params)
        .collect();

    let outputs_val = mapping
        .get("output")
        .ok_or_else(|| ClassflowError::schema(source, "missing required key 'output'"))?;
    let outputs = parse_output_channels(outputs_val, &format!("{source}:output"))?;

    Ok(ComponentDescriptor {
        id: id.to_string(),
        process_name: process_name(id),
        inputs,
        outputs,
    })
}

/// Compare two channel parameters for signature compatibility.
///
/// Types must match; where both sides declare a pattern the patterns must
/// match; for files, every ontology term declared by the class must also
/// be declared by the component.
pub fn params_compatible(component: &ParamSpec, class: &ParamSpec) -> bool {
    if component.param_type != class.param_type {
        return false;
    }
    if let (Some(cp), Some(kp)) = (&component.pattern, &class.pattern) {
        if cp != kp {
            return false;
        }
    }
    if component.param_type == crate::class_def::model::ParamType::File
        && !class.ontologies.is_empty()
        && !component.ontologies.is_empty()
    {
        return class
            .ontologies
            .iter()
            .all(|term| component.ontologies.contains(term));
    }
    true
}

/// Compare an ordered parameter group element-wise.
pub fn groups_compatible(component: &[ParamSpec], class: &[ParamSpec]) -> bool {
    component.len() == class.len()
        && component
            .iter()
            .zip(class.iter())
            .all(|(c, k)| params_compatible(c, k))
}
