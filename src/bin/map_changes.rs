//! Map a changed-file list to affected services.
//!
//! Usage:
//!   map-changes --changed-files changed.txt [--repo DIR]
//!
//! Prints the affected service ids as one comma-separated line and writes
//! `<changed-files>.summary.json` for downstream automation.

use anyhow::Result;
use clap::Parser;
use docpack::change_impact::read_changed_files;
use docpack::schemas::OutputSchema;
use docpack::{ChangeSummary, init_logging, map_changes, resolve_repo_root, summary_path_for};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "map-changes")]
#[command(about = "Attribute changed files to the services that own them")]
struct Cli {
    /// Repository root; discovered from the working directory when omitted.
    #[arg(long, env = "DOCPACK_ROOT")]
    repo: Option<PathBuf>,
    /// Newline-delimited list of changed paths, relative to the repo root.
    #[arg(long, value_name = "PATH")]
    changed_files: PathBuf,
    /// Summary destination (default: <changed-files>.summary.json).
    #[arg(long, value_name = "PATH")]
    summary: Option<PathBuf>,
}

fn main() {
    init_logging();
    if let Err(err) = run() {
        eprintln!("{err:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    let repo_root = resolve_repo_root(cli.repo.as_deref());
    let changed = read_changed_files(&cli.changed_files)?;

    let impact = map_changes(&repo_root, &changed);
    println!("{}", impact.csv());
    if !impact.non_service_paths.is_empty() {
        log::info!(
            "{} changed path(s) outside services/: {}",
            impact.non_service_paths.len(),
            impact.non_service_paths.join(", ")
        );
    }

    let summary = ChangeSummary::new(&repo_root, &cli.changed_files, impact);
    OutputSchema::change_summary()?.validate(&serde_json::to_value(&summary)?)?;
    let summary_path = cli
        .summary
        .unwrap_or_else(|| summary_path_for(&cli.changed_files));
    summary.write(&summary_path)?;
    log::info!("wrote {}", summary_path.display());
    Ok(())
}
