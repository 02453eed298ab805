//! CLI command definitions and handlers.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use classflow_core::repo::ModulesRepo;

pub mod class;
pub mod module;
pub mod workflow;

/// Classflow - generate components and composite workflows from classes
#[derive(Parser)]
#[command(name = "classflow")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Save a verbose log to a file
    #[arg(short, long, global = true)]
    pub log_file: Option<PathBuf>,

    /// Path to the modules repository (defaults to current directory)
    #[arg(short, long, global = true)]
    pub dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Inspect and check classes
    #[command(subcommand)]
    Class(class::ClassCommands),

    /// Create modules implementing a class
    #[command(subcommand)]
    Module(module::ModuleCommands),

    /// Expand and reconcile subworkflows from a class
    #[command(subcommand)]
    Workflow(workflow::WorkflowCommands),
}

impl Cli {
    pub async fn execute(self) -> Result<()> {
        let repo_dir = self
            .dir
            .unwrap_or_else(|| std::env::current_dir().unwrap());

        match self.command {
            Commands::Class(cmd) => class::execute(cmd, &repo_dir).await,
            Commands::Module(cmd) => module::execute(cmd, &repo_dir).await,
            Commands::Workflow(cmd) => workflow::execute(cmd, &repo_dir).await,
        }
    }
}

/// Resolve a class name, prompting with the available classes when the
/// user did not pass one.
pub(crate) fn resolve_classname(repo: &ModulesRepo, classname: Option<String>) -> Result<String> {
    if let Some(name) = classname {
        return Ok(name.to_lowercase());
    }
    let available = repo.list_classes()?;
    if available.is_empty() {
        anyhow::bail!("No classes found in '{}'", repo.root().display());
    }
    let selection = dialoguer::Select::new()
        .with_prompt("Class name")
        .items(&available)
        .default(0)
        .interact()?;
    Ok(available[selection].clone())
}

/// First author recorded in an artifact's `meta.yml`, if any.
///
/// Used so regeneration keeps the author line stable instead of
/// reintroducing the placeholder.
pub(crate) fn read_existing_author(artifact_dir: &Path) -> Option<String> {
    let text = std::fs::read_to_string(artifact_dir.join("meta.yml")).ok()?;
    let value: serde_yaml::Value = serde_yaml::from_str(&text).ok()?;
    value
        .get("authors")?
        .as_sequence()?
        .first()?
        .as_str()
        .map(|s| s.to_string())
}
