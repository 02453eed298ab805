//! Module creation commands.

use anyhow::Result;
use clap::Subcommand;
use colored::Colorize;
use std::path::Path;

use classflow_core::repo::{ModulesRepo, RemoteRepo};

use crate::commands::resolve_classname;
use crate::output;

#[derive(Subcommand)]
pub enum ModuleCommands {
    /// Create a new module scaffold implementing a class signature
    Create {
        /// Class the module implements
        classname: Option<String>,

        /// Name of the tool, optionally namespaced (`tool/subtool`)
        #[arg(short, long)]
        tool: Option<String>,

        /// Author's GitHub username, prefixed with '@'
        #[arg(short, long)]
        author: Option<String>,

        /// Overwrite an existing module
        #[arg(short, long)]
        force: bool,

        /// Remote git repository hosting the class definition
        #[arg(short = 'g', long)]
        git_remote: Option<String>,

        /// Branch of the remote repository
        #[arg(short, long, requires = "git_remote")]
        branch: Option<String>,
    },
}

pub async fn execute(cmd: ModuleCommands, repo_dir: &Path) -> Result<()> {
    match cmd {
        ModuleCommands::Create {
            classname,
            tool,
            author,
            force,
            git_remote,
            branch,
        } => cmd_create(repo_dir, classname, tool, author, force, git_remote, branch).await,
    }
}

async fn cmd_create(
    repo_dir: &Path,
    classname: Option<String>,
    tool: Option<String>,
    author: Option<String>,
    force: bool,
    git_remote: Option<String>,
    branch: Option<String>,
) -> Result<()> {
    let repo = ModulesRepo::open(repo_dir)?;
    let classname = resolve_classname(&repo, classname)?;
    let class = match git_remote {
        Some(remote) => {
            RemoteRepo::new(remote, branch.as_deref())
                .fetch_class(&classname)
                .await?
        }
        None => repo.load_class(&classname)?,
    };

    let tool = resolve_tool_name(tool)?;
    let module_dir = repo.module_dir(&tool);
    if module_dir.exists() && !force {
        anyhow::bail!(
            "Module directory '{}' already exists. Use --force to overwrite.",
            module_dir.display()
        );
    }

    let module = classflow_codegen::generate_module(&class, &tool, author.as_deref())?;
    let written = classflow_codegen::write_module(&module, &module_dir)?;

    println!(
        "{} Created module '{}' from class '{}'",
        "✓".green().bold(),
        tool.cyan(),
        class.name
    );
    output::print_written_files(&written);
    Ok(())
}

/// Normalize and validate the tool name, prompting when absent.
fn resolve_tool_name(tool: Option<String>) -> Result<String> {
    let name = match tool {
        Some(name) => name,
        None => dialoguer::Input::<String>::new()
            .with_prompt("Tool name (tool or tool/subtool)")
            .interact_text()?,
    };
    let name = name.to_lowercase();

    let valid = !name.is_empty()
        && name.split('/').count() <= 2
        && name
            .split('/')
            .all(|part| {
                !part.is_empty()
                    && part
                        .chars()
                        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
            });
    if !valid {
        anyhow::bail!(
            "Invalid tool name '{name}': expected lowercase letters, digits or '_', \
             optionally namespaced as tool/subtool."
        );
    }
    Ok(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_name_validation() {
        assert_eq!(resolve_tool_name(Some("ToolA/Align".into())).unwrap(), "toola/align");
        assert_eq!(resolve_tool_name(Some("famsa".into())).unwrap(), "famsa");
        assert!(resolve_tool_name(Some("bad name".into())).is_err());
        assert!(resolve_tool_name(Some("a/b/c".into())).is_err());
        assert!(resolve_tool_name(Some("tool/".into())).is_err());
    }
}
