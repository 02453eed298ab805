//! Component selection filter.
//!
//! Restricts the components a composite expands to an explicit
//! allow-list. Order is always derived from the class definition, never
//! from the caller, so repeated runs are reproducible.

use crate::class_def::ClassDefinition;
use crate::error::{ClassflowError, ClassflowResult};

/// Resolve the component subset to expand.
///
/// `requested` is the parsed form of a comma-separated allow-list; `None`
/// or an all-whitespace value selects every component of the class. Every
/// named identifier must exist in the class definition.
pub fn select_components(
    class: &ClassDefinition,
    requested: Option<&str>,
) -> ClassflowResult<Vec<String>> {
    let requested: Vec<&str> = match requested {
        Some(list) => list
            .split(',')
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .collect(),
        None => Vec::new(),
    };

    if requested.is_empty() {
        return Ok(class.components.clone());
    }

    for id in &requested {
        if class.component_index(id).is_none() {
            return Err(ClassflowError::UnknownComponent((*id).to_string()));
        }
    }

    // Re-derive order and drop duplicates by walking the class list.
    Ok(class
        .components
        .iter()
        .filter(|c| requested.contains(&c.as_str()))
        .cloned()
        .collect())
}
