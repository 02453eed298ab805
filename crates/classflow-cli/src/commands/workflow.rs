//! Subworkflow expansion and patch commands.

use anyhow::Result;
use clap::Subcommand;
use colored::Colorize;
use std::path::Path;

use classflow_core::class_def::ClassDefinition;
use classflow_core::inference::infer;
use classflow_core::reconcile::Reconciler;
use classflow_core::repo::{ModulesRepo, RemoteRepo};
use classflow_core::selection::select_components;

use crate::commands::{read_existing_author, resolve_classname};
use crate::output;

#[derive(Subcommand)]
pub enum WorkflowCommands {
    /// Expand a class into a subworkflow invoking its components
    Expand {
        /// Class name
        classname: Option<String>,

        /// Comma-separated list of components to expand; defaults to all
        /// components of the class
        #[arg(short = 'm', long)]
        components: Option<String>,

        /// Author's GitHub username, prefixed with '@'
        #[arg(short, long)]
        author: Option<String>,

        /// Discard local modifications that have no patch file
        #[arg(short, long)]
        force: bool,

        /// Remote git repository hosting the class definition
        #[arg(short = 'g', long)]
        git_remote: Option<String>,

        /// Branch of the remote repository
        #[arg(short, long, requires = "git_remote")]
        branch: Option<String>,
    },

    /// Capture local edits of an expanded subworkflow as a patch file
    Patch {
        /// Class name
        classname: Option<String>,

        /// Regenerate an existing patch without asking
        #[arg(short, long)]
        yes: bool,
    },
}

pub async fn execute(cmd: WorkflowCommands, repo_dir: &Path) -> Result<()> {
    match cmd {
        WorkflowCommands::Expand {
            classname,
            components,
            author,
            force,
            git_remote,
            branch,
        } => {
            cmd_expand(
                repo_dir,
                classname,
                components.as_deref(),
                author,
                force,
                git_remote,
                branch,
            )
            .await
        }
        WorkflowCommands::Patch { classname, yes } => cmd_patch(repo_dir, classname, yes).await,
    }
}

/// Load the class definition, locally or from a remote reference.
async fn load_class(
    repo: &ModulesRepo,
    classname: &str,
    git_remote: Option<String>,
    branch: Option<String>,
) -> Result<ClassDefinition> {
    match git_remote {
        Some(remote) => {
            let remote_repo = RemoteRepo::new(remote, branch.as_deref());
            Ok(remote_repo.fetch_class(classname).await?)
        }
        None => Ok(repo.load_class(classname)?),
    }
}

async fn cmd_expand(
    repo_dir: &Path,
    classname: Option<String>,
    components: Option<&str>,
    author: Option<String>,
    force: bool,
    git_remote: Option<String>,
    branch: Option<String>,
) -> Result<()> {
    let repo = ModulesRepo::open(repo_dir)?;
    let classname = resolve_classname(&repo, classname)?;
    let class = load_class(&repo, &classname, git_remote, branch).await?;

    let selected = select_components(&class, components)?;
    let descriptors = repo.resolve_components(&selected)?;
    let wiring = infer(&class, &descriptors)?;

    let artifact_dir = repo.subworkflow_dir(&class.name);
    let author = author.or_else(|| read_existing_author(&artifact_dir));
    let generated =
        classflow_codegen::generate_workflow(&class, &wiring, repo.org(), author.as_deref())?;

    let reconciler = Reconciler::new(&artifact_dir, &class.name);
    let outcome = reconciler.reconcile(&generated.files, force)?;
    output::print_reconcile_outcome(&class.name, &outcome);
    Ok(())
}

async fn cmd_patch(repo_dir: &Path, classname: Option<String>, yes: bool) -> Result<()> {
    let repo = ModulesRepo::open(repo_dir)?;
    let classname = resolve_classname(&repo, classname)?;
    let class = repo.load_class(&classname)?;

    let selected = select_components(&class, None)?;
    let descriptors = repo.resolve_components(&selected)?;
    let wiring = infer(&class, &descriptors)?;

    let artifact_dir = repo.subworkflow_dir(&class.name);
    let author = read_existing_author(&artifact_dir);
    let generated =
        classflow_codegen::generate_workflow(&class, &wiring, repo.org(), author.as_deref())?;

    let reconciler = Reconciler::new(&artifact_dir, &class.name);
    if reconciler.patch_path().exists() && !yes {
        let regenerate = dialoguer::Confirm::new()
            .with_prompt(format!(
                "Patch exists for subworkflow '{classname}'. Regenerate it?"
            ))
            .default(false)
            .interact()?;
        if !regenerate {
            println!("{}", "Keeping the existing patch.".dimmed());
            return Ok(());
        }
    }

    let (record, patch_path) = reconciler.save_patch(&generated.files)?;
    output::print_patch(&record);
    println!(
        "{} Patch file of '{classname}' written to '{}'",
        "✓".green().bold(),
        patch_path.display()
    );
    Ok(())
}
