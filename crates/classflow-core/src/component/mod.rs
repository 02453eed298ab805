//! Component descriptors and class-compatibility checks.

pub mod model;

pub use model::{parse_component_meta, ComponentDescriptor};
