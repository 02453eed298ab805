//! Modules repository access.
//!
//! A modules repository holds `classes/<name>.yml` definitions,
//! `modules/<org>/<component>/` implementations and
//! `subworkflows/<org>/<class>/` composite artifacts.

pub mod remote;

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::class_def::{parse_class_yaml, ClassDefinition};
use crate::component::{parse_component_meta, ComponentDescriptor};
use crate::config::RepoConfig;
use crate::error::{ClassflowError, ClassflowResult};

pub use remote::RemoteRepo;

/// A local modules repository rooted at a directory.
#[derive(Debug, Clone)]
pub struct ModulesRepo {
    root: PathBuf,
    org: String,
}

impl ModulesRepo {
    /// Open a repository, reading its configuration.
    pub fn open(root: impl Into<PathBuf>) -> ClassflowResult<Self> {
        let root = root.into();
        let config = RepoConfig::load(&root)?;
        debug!(root = %root.display(), org = %config.org, "opened modules repository");
        Ok(Self {
            root,
            org: config.org,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn org(&self) -> &str {
        &self.org
    }

    /// Directory of a class's composite artifact.
    pub fn subworkflow_dir(&self, class_name: &str) -> PathBuf {
        self.root.join("subworkflows").join(&self.org).join(class_name)
    }

    /// Directory of a component implementation.
    pub fn module_dir(&self, component: &str) -> PathBuf {
        self.root.join("modules").join(&self.org).join(component)
    }

    /// Path of a class definition file.
    pub fn class_path(&self, class_name: &str) -> PathBuf {
        self.root.join("classes").join(format!("{class_name}.yml"))
    }

    /// Enumerate the classes defined in this repository, sorted by name.
    pub fn list_classes(&self) -> ClassflowResult<Vec<String>> {
        let dir = self.root.join("classes");
        let mut names = Vec::new();
        let entries = match std::fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(names),
            Err(e) => return Err(e.into()),
        };
        for entry in entries {
            let entry = entry?;
            let file_name = entry.file_name().to_string_lossy().to_string();
            if let Some(name) = file_name.strip_suffix(".yml") {
                names.push(name.to_string());
            }
        }
        names.sort();
        Ok(names)
    }

    /// Load and parse a class definition.
    pub fn load_class(&self, class_name: &str) -> ClassflowResult<ClassDefinition> {
        let path = self.class_path(class_name);
        let text = std::fs::read_to_string(&path)
            .map_err(|_| ClassflowError::ClassNotFound(class_name.to_string()))?;
        parse_class_yaml(&text, &path.display().to_string())
    }

    /// Resolve a component identifier to its descriptor.
    ///
    /// An identifier that does not resolve to an implementation in this
    /// repository is a definition error, not an inference error.
    pub fn resolve_component(&self, component: &str) -> ClassflowResult<ComponentDescriptor> {
        let meta_path = self.module_dir(component).join("meta.yml");
        let text = std::fs::read_to_string(&meta_path).map_err(|_| {
            ClassflowError::schema(
                format!("components.{component}"),
                format!("does not resolve to a module at '{}'", meta_path.display()),
            )
        })?;
        parse_component_meta(&text, component, &meta_path.display().to_string())
    }

    /// Resolve every selected component, preserving order.
    pub fn resolve_components(
        &self,
        components: &[String],
    ) -> ClassflowResult<Vec<ComponentDescriptor>> {
        components.iter().map(|c| self.resolve_component(c)).collect()
    }
}
