//! Remote class definition source.
//!
//! Supports reconciling a composite against a class definition that is
//! not (yet) present locally, e.g. a schema change under review on a
//! branch. Only the origin of the definition changes; rendering and
//! reconciliation are identical to the local path.

use std::time::Duration;

use tracing::debug;

use crate::class_def::{parse_class_yaml, ClassDefinition};
use crate::error::{ClassflowError, ClassflowResult};

/// Default git remote hosting class definitions.
pub const DEFAULT_REMOTE: &str = "https://github.com/yourorg/class-modules.git";

/// A `(remote, branch)` reference to a modules repository on a git host.
#[derive(Debug, Clone)]
pub struct RemoteRepo {
    remote: String,
    branch: String,
    client: reqwest::Client,
}

impl RemoteRepo {
    pub fn new(remote: impl Into<String>, branch: Option<&str>) -> Self {
        Self {
            remote: remote.into(),
            branch: branch.unwrap_or("main").to_string(),
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(10))
                .build()
                .unwrap_or_default(),
        }
    }

    /// Raw-content URL of a repository file.
    ///
    /// `https://github.com/<org>/<repo>[.git]` maps onto
    /// `https://raw.githubusercontent.com/<org>/<repo>/<branch>/<path>`.
    fn raw_url(&self, path: &str) -> String {
        let repo = self
            .remote
            .trim_end_matches('/')
            .trim_end_matches(".git")
            .trim_start_matches("https://github.com/");
        format!(
            "https://raw.githubusercontent.com/{repo}/{branch}/{path}",
            branch = self.branch
        )
    }

    /// Fetch and parse a class definition from the remote.
    pub async fn fetch_class(&self, class_name: &str) -> ClassflowResult<ClassDefinition> {
        let url = self.raw_url(&format!("classes/{class_name}.yml"));
        debug!(url = %url, "fetching class definition");
        let response = self.client.get(&url).send().await?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(ClassflowError::ClassNotFound(format!(
                "{class_name} (remote {}, branch {})",
                self.remote, self.branch
            )));
        }
        let text = response.error_for_status()?.text().await?;
        parse_class_yaml(&text, &url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_url_strips_git_suffix() {
        let repo = RemoteRepo::new("https://github.com/acme/class-modules.git", Some("dev"));
        assert_eq!(
            repo.raw_url("classes/aligner.yml"),
            "https://raw.githubusercontent.com/acme/class-modules/dev/classes/aligner.yml"
        );
    }

    #[test]
    fn test_default_branch_is_main() {
        let repo = RemoteRepo::new("https://github.com/acme/class-modules", None);
        assert!(repo.raw_url("x").contains("/main/"));
    }
}
