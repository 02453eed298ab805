//! Class inspection and lint commands.

use anyhow::Result;
use clap::Subcommand;
use colored::Colorize;
use std::path::Path;

use classflow_core::inference::infer;
use classflow_core::reconcile::patch::{apply_hunks, PatchRecord};
use classflow_core::reconcile::Reconciler;
use classflow_core::repo::ModulesRepo;
use classflow_core::selection::select_components;

use crate::commands::read_existing_author;
use crate::output::{self, LintResult};

#[derive(Subcommand)]
pub enum ClassCommands {
    /// List the classes defined in the repository
    List,

    /// Check that expanded subworkflows match their class definition
    /// (with their patch applied)
    Lint {
        /// Class to lint; all classes when omitted
        classname: Option<String>,

        /// Lint every class
        #[arg(long)]
        all: bool,

        /// Also show passing checks
        #[arg(long)]
        show_passed: bool,
    },
}

pub async fn execute(cmd: ClassCommands, repo_dir: &Path) -> Result<()> {
    let repo = ModulesRepo::open(repo_dir)?;
    match cmd {
        ClassCommands::List => cmd_list(&repo),
        ClassCommands::Lint {
            classname,
            all,
            show_passed,
        } => cmd_lint(&repo, classname, all, show_passed),
    }
}

fn cmd_list(repo: &ModulesRepo) -> Result<()> {
    let classes = repo.list_classes()?;
    output::print_classes(&classes);
    Ok(())
}

fn cmd_lint(
    repo: &ModulesRepo,
    classname: Option<String>,
    all: bool,
    show_passed: bool,
) -> Result<()> {
    if classname.is_some() && all {
        anyhow::bail!("You cannot name a class and request all classes to be linted.");
    }

    let targets = match classname {
        Some(name) => vec![name.to_lowercase()],
        None => repo.list_classes()?,
    };
    if targets.is_empty() {
        println!("{}", "No classes found.".dimmed());
        return Ok(());
    }

    let mut results = Vec::new();
    for class_name in &targets {
        results.extend(lint_class(repo, class_name)?);
    }

    output::print_lint_results(&results, show_passed);
    let failed = results.iter().filter(|r| !r.passed).count();
    if failed > 0 {
        anyhow::bail!("{failed} lint check(s) failed");
    }
    Ok(())
}

/// Regenerate a class's subworkflow in memory, apply its stored patch
/// and compare against the working tree.
fn lint_class(repo: &ModulesRepo, class_name: &str) -> Result<Vec<LintResult>> {
    let class = repo.load_class(class_name)?;
    let selected = select_components(&class, None)?;
    let descriptors = repo.resolve_components(&selected)?;
    let wiring = infer(&class, &descriptors)?;

    let artifact_dir = repo.subworkflow_dir(&class.name);
    let author = read_existing_author(&artifact_dir);
    let generated =
        classflow_codegen::generate_workflow(&class, &wiring, repo.org(), author.as_deref())?;

    let mut expected = generated.files;
    let mut results = Vec::new();

    let patch_path = Reconciler::new(&artifact_dir, &class.name).patch_path();
    if patch_path.exists() {
        let record = PatchRecord::parse(
            &std::fs::read_to_string(&patch_path)?,
            &patch_path.display().to_string(),
        )?;
        for file_patch in &record.files {
            let Some(baseline) = expected.get(&file_patch.path) else {
                results.push(LintResult {
                    class_name: class.name.clone(),
                    file: file_patch.path.clone(),
                    passed: false,
                    message: "Patch refers to a file the class does not generate.".to_string(),
                });
                continue;
            };
            let outcome = apply_hunks(baseline, &file_patch.hunks);
            if !outcome.conflicts.is_empty() {
                results.push(LintResult {
                    class_name: class.name.clone(),
                    file: file_patch.path.clone(),
                    passed: false,
                    message: format!(
                        "Stored patch no longer applies ({} conflicting hunk(s)).",
                        outcome.conflicts.len()
                    ),
                });
            }
            expected.insert(file_patch.path.clone(), outcome.text);
        }
    }

    for (rel, content) in &expected {
        let on_disk = std::fs::read_to_string(artifact_dir.join(rel)).ok();
        let (passed, message) = match on_disk {
            Some(text) if text == *content => {
                (true, "Subworkflow file matches the expanded class.".to_string())
            }
            Some(_) => (
                false,
                "Subworkflow file differs from the expanded class.".to_string(),
            ),
            None => (false, "Subworkflow file is missing.".to_string()),
        };
        results.push(LintResult {
            class_name: class.name.clone(),
            file: rel.clone(),
            passed,
            message,
        });
    }

    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use classflow_core::config::CONFIG_FILE;
    use tempfile::TempDir;

    fn scaffold_repo() -> TempDir {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join(CONFIG_FILE), "org: acme\n").unwrap();
        std::fs::create_dir_all(tmp.path().join("classes")).unwrap();
        std::fs::write(
            tmp.path().join("classes/aligner.yml"),
            r#"
name: aligner
description: Align sequences.
keywords:
  - align
input:
  - - meta: { type: map }
    - fasta: { type: file }
output:
  - bam:
      - - meta: { type: map }
        - "*.bam": { type: file, pattern: "*.bam" }
components:
  modules:
    - toola/align
testdata:
  - - "[ id:'test' ]"
    - "file(params.test_data['fasta'])"
"#,
        )
        .unwrap();
        let module_dir = tmp.path().join("modules/acme/toola/align");
        std::fs::create_dir_all(&module_dir).unwrap();
        std::fs::write(
            module_dir.join("meta.yml"),
            r#"
input:
  - - meta: { type: map }
    - seqs: { type: file }
output:
  bam:
    - - meta: { type: map }
      - "*.bam": { type: file, pattern: "*.bam" }
"#,
        )
        .unwrap();
        tmp
    }

    fn expand(repo: &ModulesRepo) {
        let class = repo.load_class("aligner").unwrap();
        let selected = select_components(&class, None).unwrap();
        let descriptors = repo.resolve_components(&selected).unwrap();
        let wiring = infer(&class, &descriptors).unwrap();
        let generated =
            classflow_codegen::generate_workflow(&class, &wiring, repo.org(), Some("@me")).unwrap();
        Reconciler::new(repo.subworkflow_dir("aligner"), "aligner")
            .reconcile(&generated.files, false)
            .unwrap();
    }

    #[test]
    fn test_lint_missing_subworkflow_fails() {
        let tmp = scaffold_repo();
        let repo = ModulesRepo::open(tmp.path()).unwrap();
        let results = lint_class(&repo, "aligner").unwrap();
        assert!(results.iter().all(|r| !r.passed));
        assert!(results.iter().any(|r| r.message.contains("missing")));
    }

    #[test]
    fn test_lint_passes_after_expansion() {
        let tmp = scaffold_repo();
        let repo = ModulesRepo::open(tmp.path()).unwrap();
        expand(&repo);
        let results = lint_class(&repo, "aligner").unwrap();
        assert_eq!(results.len(), 3);
        assert!(results.iter().all(|r| r.passed));
    }

    #[test]
    fn test_lint_flags_unpatched_edits() {
        let tmp = scaffold_repo();
        let repo = ModulesRepo::open(tmp.path()).unwrap();
        expand(&repo);
        let main_path = repo.subworkflow_dir("aligner").join("main.nf");
        let mut text = std::fs::read_to_string(&main_path).unwrap();
        text.push_str("// local tweak\n");
        std::fs::write(&main_path, text).unwrap();

        let results = lint_class(&repo, "aligner").unwrap();
        let main_result = results.iter().find(|r| r.file == "main.nf").unwrap();
        assert!(!main_result.passed);
    }

    #[test]
    fn test_lint_accepts_patched_edits() {
        let tmp = scaffold_repo();
        let repo = ModulesRepo::open(tmp.path()).unwrap();
        expand(&repo);

        let artifact_dir = repo.subworkflow_dir("aligner");
        let main_path = artifact_dir.join("main.nf");
        let mut text = std::fs::read_to_string(&main_path).unwrap();
        text.push_str("// local tweak\n");
        std::fs::write(&main_path, text).unwrap();

        // Capture the edit; lint then treats baseline+patch as expected.
        let class = repo.load_class("aligner").unwrap();
        let selected = select_components(&class, None).unwrap();
        let descriptors = repo.resolve_components(&selected).unwrap();
        let wiring = infer(&class, &descriptors).unwrap();
        let generated =
            classflow_codegen::generate_workflow(&class, &wiring, repo.org(), Some("@me")).unwrap();
        Reconciler::new(&artifact_dir, "aligner")
            .save_patch(&generated.files)
            .unwrap();

        let results = lint_class(&repo, "aligner").unwrap();
        assert!(results.iter().all(|r| r.passed), "{:?}", results.iter().map(|r| (&r.file, r.passed)).collect::<Vec<_>>());
    }
}
