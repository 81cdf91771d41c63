//! Umbrella CLI that delegates to the docpack helper binaries.
//!
//! `docpack validate|index|scan|changes [args]` resolves the matching helper
//! (next to this executable, in the repo's cargo target dir, or on PATH) and
//! runs it with the remaining arguments. `DOCPACK_ROOT` is injected when a
//! repository root can be discovered so helpers agree on the doc pack.

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use docpack::find_repo_root;
use docpack::runtime::resolve_helper;
use std::env;
use std::ffi::OsString;
use std::path::Path;
use std::process::Command;

#[derive(Parser, Debug)]
#[command(name = "docpack")]
#[command(about = "Catalog validation, indexing, candidate scanning, and change mapping")]
struct Cli {
    #[command(subcommand)]
    command: Tool,
}

#[derive(Subcommand, Debug)]
enum Tool {
    /// Validate the catalogs (validate-docpack).
    #[command(disable_help_flag = true)]
    Validate {
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<OsString>,
    },
    /// Build or check the JSONL indexes (build-indexes).
    #[command(disable_help_flag = true)]
    Index {
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<OsString>,
    },
    /// Scan source code for integration candidates (scan-candidates).
    #[command(disable_help_flag = true)]
    Scan {
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<OsString>,
    },
    /// Map changed files to affected services (map-changes).
    #[command(disable_help_flag = true)]
    Changes {
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<OsString>,
    },
}

impl Tool {
    fn helper(&self) -> (&'static str, &[OsString]) {
        match self {
            Tool::Validate { args } => ("validate-docpack", args.as_slice()),
            Tool::Index { args } => ("build-indexes", args.as_slice()),
            Tool::Scan { args } => ("scan-candidates", args.as_slice()),
            Tool::Changes { args } => ("map-changes", args.as_slice()),
        }
    }
}

fn main() {
    docpack::init_logging();
    if let Err(err) = run() {
        eprintln!("{err:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    let repo_root = find_repo_root().ok();
    let (name, args) = cli.command.helper();
    run_helper(name, args, repo_root.as_deref())
}

/// Execute the resolved helper, wiring DOCPACK_ROOT when available.
fn run_helper(name: &str, args: &[OsString], repo_root: Option<&Path>) -> Result<()> {
    let helper_path = resolve_helper(name, repo_root)?;
    log::debug!("running {}", helper_path.display());
    let mut command = Command::new(&helper_path);
    command.args(args);

    if let Some(root) = repo_root {
        if env::var_os("DOCPACK_ROOT").is_none() {
            command.env("DOCPACK_ROOT", root);
        }
    }

    let status = command
        .status()
        .with_context(|| format!("Failed to execute {}", helper_path.display()))?;

    if status.success() {
        return Ok(());
    }

    if let Some(code) = status.code() {
        std::process::exit(code);
    }

    bail!("Helper terminated by signal")
}
