//! Repository configuration.
//!
//! A modules repository carries a `.classflow.yml` at its root naming the
//! organisation that owns its components; the org is a path segment of
//! every module and subworkflow.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ClassflowError, ClassflowResult};

/// File name of the repository configuration.
pub const CONFIG_FILE: &str = ".classflow.yml";

/// Parsed `.classflow.yml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepoConfig {
    /// Organisation name, used as the directory segment under `modules/`
    /// and `subworkflows/`.
    pub org: String,
}

impl RepoConfig {
    /// Load the configuration from a repository root.
    pub fn load(dir: &Path) -> ClassflowResult<Self> {
        let path = dir.join(CONFIG_FILE);
        let text = std::fs::read_to_string(&path).map_err(|_| {
            ClassflowError::NotARepository(format!(
                "'{}' has no {CONFIG_FILE}",
                dir.display()
            ))
        })?;
        let config: RepoConfig = serde_yaml::from_str(&text)?;
        if config.org.trim().is_empty() {
            return Err(ClassflowError::schema(
                format!("{}:org", path.display()),
                "organisation name must not be empty",
            ));
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_config() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join(CONFIG_FILE), "org: acme\n").unwrap();
        let config = RepoConfig::load(tmp.path()).unwrap();
        assert_eq!(config.org, "acme");
    }

    #[test]
    fn test_missing_config_is_not_a_repository() {
        let tmp = TempDir::new().unwrap();
        let err = RepoConfig::load(tmp.path()).unwrap_err();
        assert!(matches!(err, ClassflowError::NotARepository(_)));
    }
}
