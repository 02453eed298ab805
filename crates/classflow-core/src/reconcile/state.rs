//! Artifact states of the reconciliation engine.

/// Where a composite artifact stands relative to its rendered baseline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactState {
    /// No artifact on disk yet.
    Unseeded,
    /// On-disk files equal the baseline exactly.
    Clean,
    /// On-disk files differ from the baseline.
    Diverged {
        /// Whether a stored patch captures the divergence.
        has_patch: bool,
    },
}

impl ArtifactState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unseeded => "unseeded",
            Self::Clean => "clean",
            Self::Diverged { .. } => "diverged",
        }
    }
}
