//! Terminal output formatting.

use colored::Colorize;

use classflow_core::reconcile::patch::PatchRecord;
use classflow_core::reconcile::{HunkLine, ReconcileOutcome};

/// One lint check outcome.
pub struct LintResult {
    pub class_name: String,
    pub file: String,
    pub passed: bool,
    pub message: String,
}

/// Print the available classes.
pub fn print_classes(classes: &[String]) {
    if classes.is_empty() {
        println!("{}", "No classes found in this repository.".dimmed());
        return;
    }
    println!("{}", "Classes".bold());
    for name in classes {
        println!("  {} {}", "●".cyan(), name);
    }
    println!();
    println!("{} class(es) total", classes.len());
}

/// Print the list of files a command wrote.
pub fn print_written_files(written: &[String]) {
    println!("{}", "Created following files:".bold());
    for path in written {
        println!("  {path}");
    }
}

/// Report what a reconciliation run did.
pub fn print_reconcile_outcome(class_name: &str, outcome: &ReconcileOutcome) {
    match outcome {
        ReconcileOutcome::Seeded(files) => {
            println!(
                "{} Created subworkflow '{}'",
                "✓".green().bold(),
                class_name.cyan()
            );
            for path in files {
                println!("  {}", path.display());
            }
        }
        ReconcileOutcome::Clean => {
            println!(
                "{} Subworkflow '{}' is already up to date.",
                "✓".green().bold(),
                class_name.cyan()
            );
        }
        ReconcileOutcome::Reapplied { files, patch_path } => {
            println!(
                "{} Regenerated subworkflow '{}' and reapplied stored edits",
                "✓".green().bold(),
                class_name.cyan()
            );
            for path in files {
                println!("  {}", path.display());
            }
            println!(
                "  {} {}",
                "patch refreshed:".dimmed(),
                patch_path.display()
            );
        }
        ReconcileOutcome::Forced(files) => {
            println!(
                "{} Overwrote subworkflow '{}' (local modifications discarded)",
                "!".yellow().bold(),
                class_name.cyan()
            );
            for path in files {
                println!("  {}", path.display());
            }
        }
    }
}

/// Print a patch record with diff colouring.
pub fn print_patch(record: &PatchRecord) {
    for file in &record.files {
        println!("{}", format!("--- {}", file.path).bold());
        println!("{}", format!("+++ {}", file.path).bold());
        for hunk in &file.hunks {
            println!("{}", hunk.header().cyan());
            for line in &hunk.lines {
                match line {
                    HunkLine::Context(s) => println!(" {s}"),
                    HunkLine::Removed(s) => println!("{}", format!("-{s}").red()),
                    HunkLine::Added(s) => println!("{}", format!("+{s}").green()),
                }
            }
        }
    }
}

/// Print lint results, one row per checked file.
pub fn print_lint_results(results: &[LintResult], show_passed: bool) {
    let name_width = results
        .iter()
        .map(|r| r.class_name.len())
        .max()
        .unwrap_or(10)
        .max("Class name".len());
    let file_width = results
        .iter()
        .map(|r| r.file.len())
        .max()
        .unwrap_or(10)
        .max("File".len());

    let visible: Vec<&LintResult> = results
        .iter()
        .filter(|r| show_passed || !r.passed)
        .collect();

    if !visible.is_empty() {
        println!(
            "{:<name_width$} {:<file_width$} {}",
            "Class name".bold(),
            "File".bold(),
            "Result".bold()
        );
        println!("{}", "─".repeat(name_width + file_width + 30));
        for result in &visible {
            let status = if result.passed {
                "✓ passed".green()
            } else {
                "✗ failed".red()
            };
            println!(
                "{:<name_width$} {:<file_width$} {} {}",
                result.class_name,
                result.file,
                status,
                result.message.dimmed()
            );
        }
        println!();
    }

    let passed = results.iter().filter(|r| r.passed).count();
    let failed = results.len() - passed;
    println!("{}", "LINT RESULTS SUMMARY".bold());
    println!("{}", format!("[✓] {passed:>3} check(s) passed").green());
    println!(
        "{}",
        if failed > 0 {
            format!("[✗] {failed:>3} check(s) failed").red()
        } else {
            format!("[✗] {failed:>3} check(s) failed").dimmed()
        }
    );
}
