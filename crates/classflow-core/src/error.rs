//! Centralized error types for classflow.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for classflow operations.
#[derive(Error, Debug)]
pub enum ClassflowError {
    #[error("Malformed class definition at '{path}': {reason}")]
    Schema { path: String, reason: String },

    #[error("Component '{component}' does not match the class signature: {reason}")]
    Inference { component: String, reason: String },

    #[error("Unknown component: '{0}' is not listed in the class definition")]
    UnknownComponent(String),

    #[error("Class '{0}' has no components to expand")]
    NoComponents(String),

    #[error(
        "{applied} of {total} hunks applied; {} conflicting hunk(s) written to '{}'",
        .conflicts.len(),
        .rej_path.display()
    )]
    PatchConflict {
        applied: usize,
        total: usize,
        conflicts: Vec<String>,
        rej_path: PathBuf,
    },

    #[error("Class not found: {0}")]
    ClassNotFound(String),

    #[error("Not a modules repository: {0}")]
    NotARepository(String),

    #[error(
        "'{}' has local modifications but no patch file. \
         Run 'classflow workflow patch' to capture them, or pass --force to discard them.",
        .0.display()
    )]
    DivergedWithoutPatch(PathBuf),

    #[error("Subworkflow '{0}' is unchanged. No patch to compute")]
    NothingToPatch(String),

    #[error("Invalid patch file '{path}': {reason}")]
    InvalidPatch { path: String, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Result type for classflow operations.
pub type ClassflowResult<T> = Result<T, ClassflowError>;

impl ClassflowError {
    /// Create a schema error for a given key path.
    pub fn schema(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Schema {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create an inference error naming the offending component.
    pub fn inference(component: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Inference {
            component: component.into(),
            reason: reason.into(),
        }
    }
}
