//! Class definition model and parser.
//!
//! A class groups interchangeable components behind one shared
//! input/output signature. Definitions are loaded from `classes/<name>.yml`
//! and are never mutated after construction.

pub mod model;
pub mod parser;

pub use model::{ClassDefinition, InputGroup, OutputChannel, ParamSpec, ParamType};
pub use parser::parse_class_yaml;
