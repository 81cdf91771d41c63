//! Cross-check the service catalog against the event catalog.
//!
//! Usage:
//!   validate-docpack [--repo DIR] [--write-report reports/inventory.md]
//!
//! Prints one `LEVEL: title :: detail` line per finding followed by a count
//! summary. Exits 2 when a required file is missing or a catalog does not
//! parse, 0 otherwise (warnings do not fail the run).

use anyhow::Result;
use chrono::Local;
use clap::Parser;
use docpack::report::{render_report, write_report};
use docpack::{DocpackLayout, Severity, init_logging, resolve_repo_root, validate_repo};
use serde_json::json;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "validate-docpack")]
#[command(about = "Validate service and event catalogs against each other")]
struct Cli {
    /// Repository root; discovered from the working directory when omitted.
    #[arg(long, env = "DOCPACK_ROOT")]
    repo: Option<PathBuf>,
    /// Service catalog path (relative paths resolve against the repo).
    #[arg(long, env = "DOCPACK_SERVICE_CATALOG")]
    service_catalog: Option<PathBuf>,
    /// Event catalog path (relative paths resolve against the repo).
    #[arg(long, env = "DOCPACK_EVENT_CATALOG")]
    event_catalog: Option<PathBuf>,
    /// Also render a Markdown inventory report to this path (relative to the
    /// repo).
    #[arg(long, value_name = "PATH")]
    write_report: Option<PathBuf>,
    /// Print findings and summary as one JSON object instead of text.
    #[arg(long)]
    json: bool,
}

fn main() {
    init_logging();
    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("{err:#}");
            std::process::exit(1);
        }
    }
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    let repo_root = resolve_repo_root(cli.repo.as_deref());
    let layout = DocpackLayout::new(repo_root)
        .with_service_catalog(cli.service_catalog.as_deref())
        .with_event_catalog(cli.event_catalog.as_deref());

    let outcome = validate_repo(&layout);

    if cli.json {
        let payload = json!({
            "repo": layout.repo_root.display().to_string(),
            "findings": outcome.findings,
            "summary": outcome.summary,
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
    } else {
        for finding in &outcome.findings {
            println!("{finding}");
        }
    }

    let Some(summary) = &outcome.summary else {
        return Ok(outcome.exit_code());
    };

    if !cli.json {
        println!(
            "Summary: services={} items={} events={} commands={} queries={} orphans={}",
            summary.services,
            summary.items,
            summary.events,
            summary.commands,
            summary.queries,
            summary.orphans.len()
        );
        println!(
            "Findings: errors={} warnings={} info={}",
            outcome.count(Severity::Error),
            outcome.count(Severity::Warning),
            outcome.count(Severity::Info)
        );
    }

    if let Some(path) = &cli.write_report {
        let path = layout.resolve(path);
        let report = render_report(
            &layout.repo_root,
            Local::now().date_naive(),
            &outcome.findings,
            summary,
        );
        write_report(&path, &report)?;
        log::info!("wrote report to {}", path.display());
    }

    Ok(outcome.exit_code())
}
