//! Classflow CLI
//!
//! Generates modules and composite subworkflows from class definitions
//! and keeps them in sync with hand-written edits.

use clap::Parser;
use colored::Colorize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod output;

use classflow_core::ClassflowError;
use commands::Cli;

/// Initialize tracing with optional file logging.
fn init_tracing(log_file: Option<&std::path::Path>, verbose: bool) {
    let default_filter = if verbose {
        "classflow=debug,classflow_core=debug,classflow_codegen=debug"
    } else {
        "classflow=info,classflow_core=info,classflow_codegen=info"
    };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_filter.into());

    if let Some(path) = log_file {
        if let Some(parent) = path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .expect("Failed to open log file");

        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(std::sync::Mutex::new(file))
                    .with_ansi(false),
            )
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.log_file.clone().as_deref(), cli.verbose);

    if let Err(err) = cli.execute().await {
        // A conflict made forward progress: the applied hunks are on disk
        // and the rejected ones await manual resolution.
        if matches!(
            err.downcast_ref::<ClassflowError>(),
            Some(ClassflowError::PatchConflict { .. })
        ) {
            eprintln!("{} {err}", "!".yellow().bold());
            std::process::exit(2);
        }
        eprintln!("{} {err:#}", "✗".red().bold());
        std::process::exit(1);
    }
}
