//! Class definition domain models.

use serde::{Deserialize, Serialize};

/// Value kind of a single channel parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    Map,
    String,
    Integer,
    Float,
    Boolean,
    File,
    Directory,
}

impl ParamType {
    /// Parse from string.
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "map" => Some(Self::Map),
            "string" => Some(Self::String),
            "integer" => Some(Self::Integer),
            "float" => Some(Self::Float),
            "boolean" => Some(Self::Boolean),
            "file" => Some(Self::File),
            "directory" => Some(Self::Directory),
            _ => None,
        }
    }

    /// Convert to string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Map => "map",
            Self::String => "string",
            Self::Integer => "integer",
            Self::Float => "float",
            Self::Boolean => "boolean",
            Self::File => "file",
            Self::Directory => "directory",
        }
    }

    /// Nextflow input qualifier for this parameter type.
    pub fn qualifier(&self) -> &'static str {
        match self {
            Self::File | Self::Directory => "path",
            _ => "val",
        }
    }
}

/// A single named parameter within an input group or output channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub param_type: ParamType,
    pub description: Option<String>,
    pub pattern: Option<String>,
    #[serde(default)]
    pub ontologies: Vec<String>,
}

impl ParamSpec {
    /// Whether this is the sample-metadata parameter that leads every
    /// group and channel.
    pub fn is_meta(&self) -> bool {
        self.name == "meta" || self.name.starts_with("meta")
    }

    /// Name as it appears in generated code: quoted when it contains
    /// characters outside `[a-zA-Z0-9]`.
    pub fn code_name(&self) -> String {
        if self.name.chars().all(|c| c.is_alphanumeric()) {
            self.name.clone()
        } else {
            format!("\"{}\"", self.name)
        }
    }
}

/// One ordered group of input parameters, flattened to a single channel
/// in generated composites.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputGroup {
    /// Explicit channel label, when the schema declares one.
    pub label: Option<String>,
    pub params: Vec<ParamSpec>,
}

impl InputGroup {
    /// Deterministic channel name: the explicit label when present,
    /// otherwise the first non-metadata parameter.
    pub fn channel_name(&self) -> String {
        let base = match &self.label {
            Some(label) => label.clone(),
            None => self
                .params
                .iter()
                .find(|p| !p.is_meta())
                .map(|p| p.name.clone())
                .unwrap_or_else(|| self.params[0].name.clone()),
        };
        format!("ch_{}", sanitize_identifier(&base))
    }
}

/// A named output channel with its ordered parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputChannel {
    pub name: String,
    pub params: Vec<ParamSpec>,
}

/// An immutable, parsed class definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassDefinition {
    pub name: String,
    pub description: String,
    pub keywords: Vec<String>,
    pub inputs: Vec<InputGroup>,
    pub outputs: Vec<OutputChannel>,
    pub components: Vec<String>,
    pub testdata: Vec<Vec<String>>,
}

impl ClassDefinition {
    /// Position of a component in the declared order, if it belongs to
    /// the class.
    pub fn component_index(&self, id: &str) -> Option<usize> {
        self.components.iter().position(|c| c == id)
    }

    /// Workflow name used in generated code.
    pub fn workflow_name(&self) -> String {
        self.name.replace('/', "_").to_uppercase()
    }
}

/// Reduce a parameter or label name to a valid lowercase identifier.
pub fn sanitize_identifier(name: &str) -> String {
    let mapped: String = name
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '_' })
        .collect();
    mapped
        .split('_')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("_")
}

/// Process identifier for a component id: `tool/subtool` becomes
/// `TOOL_SUBTOOL`.
pub fn process_name(component: &str) -> String {
    component.replace('/', "_").to_uppercase()
}
