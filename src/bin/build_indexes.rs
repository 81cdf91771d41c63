//! Regenerate the retrieval indexes from the catalogs.
//!
//! Usage:
//!   build-indexes [--repo DIR] [--out-dir indexes]
//!   build-indexes --check
//!
//! Writes `services.jsonl` and `events.jsonl`, one document per line. With
//! `--check` nothing is written: the indexes are rebuilt in memory and
//! compared with the files on disk, exiting 1 when they differ or fail the
//! document schema.

use anyhow::{Context, Result};
use clap::Parser;
use docpack::index_builder::{render_jsonl, write_jsonl};
use docpack::schemas::OutputSchema;
use docpack::{CatalogStore, DocpackLayout, IndexBuilder, init_logging, resolve_repo_root};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(name = "build-indexes")]
#[command(about = "Build JSONL retrieval indexes from the service and event catalogs")]
struct Cli {
    /// Repository root; discovered from the working directory when omitted.
    #[arg(long, env = "DOCPACK_ROOT")]
    repo: Option<PathBuf>,
    #[arg(long, env = "DOCPACK_SERVICE_CATALOG")]
    service_catalog: Option<PathBuf>,
    #[arg(long, env = "DOCPACK_EVENT_CATALOG")]
    event_catalog: Option<PathBuf>,
    /// Output directory (default: <repo>/indexes).
    #[arg(long, value_name = "DIR")]
    out_dir: Option<PathBuf>,
    /// Verify the indexes on disk are current instead of writing them.
    #[arg(long)]
    check: bool,
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
        .with_event_catalog(cli.event_catalog.as_deref())
        .with_index_dir(cli.out_dir.as_deref());

    let store = CatalogStore::load(&layout.service_catalog, &layout.event_catalog)?;
    let builder = IndexBuilder::for_layout(&layout);

    if cli.check {
        return check(&layout, &store, &builder);
    }

    let services_path = layout.services_index();
    let items_path = layout.items_index();
    let services = write_jsonl(&services_path, builder.service_documents(&store))?;
    let items = write_jsonl(&items_path, builder.item_documents(&store))?;
    println!("Wrote {services} services to {}", services_path.display());
    println!("Wrote {items} items to {}", items_path.display());
    Ok(0)
}

fn check(layout: &DocpackLayout, store: &CatalogStore, builder: &IndexBuilder) -> Result<i32> {
    let schema = OutputSchema::index_document()?;
    let expected = [
        (layout.services_index(), render_jsonl(builder.service_documents(store))?),
        (layout.items_index(), render_jsonl(builder.item_documents(store))?),
    ];

    let mut problems = Vec::new();
    for (path, rendered) in &expected {
        let Some(on_disk) = read_optional(path)? else {
            problems.push(format!("{} is missing", path.display()));
            continue;
        };
        if &on_disk != rendered {
            problems.push(format!("{} is stale", path.display()));
        }
        for problem in schema.validate_jsonl(&on_disk) {
            problems.push(format!("{}: {problem}", path.display()));
        }
    }

    if problems.is_empty() {
        println!("Indexes are up to date.");
        return Ok(0);
    }
    for problem in &problems {
        println!("{problem}");
    }
    println!("Run build-indexes to regenerate.");
    Ok(1)
}

fn read_optional(path: &Path) -> Result<Option<String>> {
    match fs::read_to_string(path) {
        Ok(text) => Ok(Some(text)),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(err).with_context(|| format!("reading {}", path.display())),
    }
}
