//! Scan source code for integration points the catalogs may be missing.
//!
//! Usage:
//!   scan-candidates [--root DIR] [--services billing,crm] [--out candidates.jsonl]
//!   scan-candidates --coverage reports/subject_coverage.json
//!
//! Emits one JSON candidate per line as soon as it is found (stdout unless
//! `--out` is given). With `--coverage`, publish/subscribe subjects are
//! also reconciled against the event catalog and written as a JSON map.

use anyhow::{Context, Result};
use clap::Parser;
use docpack::coverage::uncataloged;
use docpack::schemas::OutputSchema;
use docpack::{
    CandidateScanner, CatalogStore, DocpackLayout, ScanOptions, build_subject_coverage,
    init_logging, resolve_repo_root, split_list,
};
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "scan-candidates")]
#[command(about = "Heuristically detect publish/subscribe/HTTP/RPC candidates in source code")]
struct Cli {
    /// Directory to scan; discovered repository root when omitted.
    #[arg(long, env = "DOCPACK_ROOT")]
    root: Option<PathBuf>,
    /// Replace the extension allowlist (comma separated, e.g. ts,py,proto).
    #[arg(long, value_delimiter = ',')]
    ext: Vec<String>,
    /// Additional directory names to skip (repeatable).
    #[arg(long = "skip-dir", value_name = "NAME")]
    skip_dir: Vec<String>,
    /// Only scan these services under services/ (comma separated).
    #[arg(long, value_delimiter = ',')]
    services: Vec<String>,
    /// Write candidates here instead of stdout.
    #[arg(long, value_name = "PATH")]
    out: Option<PathBuf>,
    /// Write a subject coverage map against the event catalog.
    #[arg(long, value_name = "PATH")]
    coverage: Option<PathBuf>,
    #[arg(long, env = "DOCPACK_EVENT_CATALOG")]
    event_catalog: Option<PathBuf>,
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
    let root = resolve_repo_root(cli.root.as_deref());

    let mut options = ScanOptions::default().skipping(&cli.skip_dir);
    if !cli.ext.is_empty() {
        options = options.with_extensions(&cli.ext);
    }
    if !cli.services.is_empty() {
        options = options.with_service_scope(cli.services.iter().flat_map(|s| split_list(s)));
    }

    let scanner = CandidateScanner::new(&root, options)?;
    let schema = OutputSchema::candidate()?;

    let sink: Box<dyn Write> = match &cli.out {
        Some(path) => Box::new(
            File::create(path).with_context(|| format!("creating {}", path.display()))?,
        ),
        None => Box::new(io::stdout().lock()),
    };
    let mut writer = BufWriter::new(sink);

    let keep = cli.coverage.is_some();
    let mut kept = Vec::new();
    let emitted = scanner.scan_with(|record| {
        let value = serde_json::to_value(&record)?;
        schema.validate(&value)?;
        serde_json::to_writer(&mut writer, &value)?;
        writer.write_all(b"\n")?;
        if keep {
            kept.push(record);
        }
        Ok(())
    })?;
    writer.flush()?;
    log::info!("emitted {emitted} candidates");

    if let Some(path) = &cli.coverage {
        let layout =
            DocpackLayout::new(&root).with_event_catalog(cli.event_catalog.as_deref());
        let store = CatalogStore::load_items(&layout.event_catalog)?;
        let coverage = build_subject_coverage(&kept, &store);
        let missing = uncataloged(&coverage);
        if !missing.is_empty() {
            log::warn!(
                "{} subject(s) seen in code are not cataloged: {}",
                missing.len(),
                missing.join(", ")
            );
        }
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        let mut text = serde_json::to_string_pretty(&coverage)?;
        text.push('\n');
        fs::write(path, text).with_context(|| format!("writing {}", path.display()))?;
    }

    Ok(())
}
