//! # Classflow Codegen
//!
//! Renders source artifacts from the class model: composite subworkflows
//! (`main.nf`, `meta.yml`, `tests/main.nf.test`) and leaf module
//! skeletons. Rendering is a pure function of its inputs, with no
//! timestamps and no unordered iteration, so identical inputs always
//! produce byte-identical text.

pub mod module;
pub mod workflow;

mod yaml;

pub use module::{generate_module, write_module, GeneratedModule};
pub use workflow::{generate_workflow, GeneratedWorkflow};
