//! Shared library for the docpack tools.
//!
//! The crate keeps a microservice repository's integration metadata honest:
//! it loads the service and event catalogs, validates them against each
//! other, projects them into retrieval indexes, scans source code for
//! integration points the catalogs do not yet describe, and maps changed
//! files to the services that own them. Public functions here form the
//! contract the helper binaries depend on: repository discovery, layout
//! resolution, and small path/list utilities.

use anyhow::{Result, bail};
use std::env;
use std::fs;
use std::path::{Component, Path, PathBuf};

pub mod catalog;
pub mod change_impact;
pub mod coverage;
pub mod index_builder;
pub mod report;
pub mod runtime;
pub mod scanner;
pub mod schemas;
pub mod validation;

pub use catalog::{
    CatalogError, CatalogItem, CatalogStore, ItemId, ItemKind, Role, Service, ServiceId,
};
pub use change_impact::{ChangeImpact, ChangeSummary, map_changes, summary_path_for};
pub use coverage::{SubjectCoverage, build_subject_coverage};
pub use index_builder::{IndexBuilder, IndexDocument};
pub use scanner::{CandidateKind, CandidateRecord, CandidateScanner, ScanOptions};
pub use validation::{Finding, Orphan, Severity, Summary, ValidationOutcome, validate_repo};

pub const SERVICE_CATALOG_PATH: &str = "catalogs/service_catalog.yaml";
pub const EVENT_CATALOG_PATH: &str = "catalogs/event_catalog.yaml";
pub const CONTEXT_DOC_PATH: &str = "AI_CONTEXT.md";
pub const INDEX_DIR: &str = "indexes";
pub const SERVICES_INDEX_FILE: &str = "services.jsonl";
pub const ITEMS_INDEX_FILE: &str = "events.jsonl";

const ROOT_SENTINEL: &str = "catalogs";

#[derive(Clone, Debug)]
/// Where the doc pack lives inside a repository.
///
/// Defaults follow the conventional layout; every path can be overridden.
/// Relative overrides are resolved against `repo_root`.
pub struct DocpackLayout {
    pub repo_root: PathBuf,
    pub service_catalog: PathBuf,
    pub event_catalog: PathBuf,
    pub context_doc: PathBuf,
    pub index_dir: PathBuf,
}

impl DocpackLayout {
    pub fn new(repo_root: impl Into<PathBuf>) -> Self {
        let repo_root = repo_root.into();
        Self {
            service_catalog: repo_root.join(SERVICE_CATALOG_PATH),
            event_catalog: repo_root.join(EVENT_CATALOG_PATH),
            context_doc: repo_root.join(CONTEXT_DOC_PATH),
            index_dir: repo_root.join(INDEX_DIR),
            repo_root,
        }
    }

    pub fn with_service_catalog(mut self, path: Option<&Path>) -> Self {
        if let Some(path) = path {
            self.service_catalog = self.resolve(path);
        }
        self
    }

    pub fn with_event_catalog(mut self, path: Option<&Path>) -> Self {
        if let Some(path) = path {
            self.event_catalog = self.resolve(path);
        }
        self
    }

    pub fn with_index_dir(mut self, path: Option<&Path>) -> Self {
        if let Some(path) = path {
            self.index_dir = self.resolve(path);
        }
        self
    }

    /// Files whose absence makes validation fatal.
    pub fn required_files(&self) -> Vec<&Path> {
        vec![
            self.context_doc.as_path(),
            self.service_catalog.as_path(),
            self.event_catalog.as_path(),
        ]
    }

    pub fn services_index(&self) -> PathBuf {
        self.index_dir.join(SERVICES_INDEX_FILE)
    }

    pub fn items_index(&self) -> PathBuf {
        self.index_dir.join(ITEMS_INDEX_FILE)
    }

    /// Repo-relative, forward-slash form of `path` for use in links.
    pub fn relative_display(&self, path: &Path) -> String {
        path.strip_prefix(&self.repo_root)
            .map(to_slash)
            .unwrap_or_else(|_| to_slash(path))
    }

    /// Absolute paths pass through; relative ones hang off the repo root.
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.repo_root.join(path)
        }
    }
}

/// Returns true when `candidate` looks like a repository carrying a doc pack.
fn is_repo_root(candidate: &Path) -> bool {
    candidate.join(ROOT_SENTINEL).is_dir()
}

fn repo_root_from_hint(hint: &str) -> Option<PathBuf> {
    if hint.is_empty() {
        return None;
    }
    let hint_path = PathBuf::from(hint);
    if !is_repo_root(&hint_path) {
        return None;
    }
    fs::canonicalize(hint_path).ok()
}

fn search_upwards(start: &Path) -> Option<PathBuf> {
    let mut dir = fs::canonicalize(start).ok()?;
    loop {
        if is_repo_root(&dir) {
            return Some(dir);
        }
        if !dir.pop() {
            break;
        }
    }
    None
}

/// Locate the repository root.
///
/// Search order: honor `DOCPACK_ROOT` if it points at a repo with a
/// `catalogs/` directory, then climb up from the current directory.
pub fn find_repo_root() -> Result<PathBuf> {
    if let Ok(env_root) = env::var("DOCPACK_ROOT") {
        if let Some(root) = repo_root_from_hint(&env_root) {
            return Ok(root);
        }
    }

    if let Ok(cwd) = env::current_dir() {
        if let Some(root) = search_upwards(&cwd) {
            return Ok(root);
        }
    }

    bail!("Unable to locate a repository with a catalogs/ directory. Pass --repo or set DOCPACK_ROOT.")
}

/// Use an explicit `--repo` when given, otherwise discover one, otherwise `.`.
pub fn resolve_repo_root(explicit: Option<&Path>) -> PathBuf {
    if let Some(path) = explicit {
        return fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
    }
    match find_repo_root() {
        Ok(root) => root,
        Err(err) => {
            log::debug!("{err:#}; falling back to current directory");
            PathBuf::from(".")
        }
    }
}

/// Split comma- or whitespace-delimited configuration lists into tokens.
pub fn split_list(value: &str) -> Vec<String> {
    value
        .replace(',', " ")
        .split_whitespace()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Join path components with `/` regardless of platform.
pub fn to_slash(path: &Path) -> String {
    path.components()
        .filter_map(|component| match component {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            Component::RootDir => Some(String::new()),
            Component::Prefix(prefix) => Some(prefix.as_os_str().to_string_lossy().into_owned()),
            Component::CurDir | Component::ParentDir => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Initialise stderr logging for a helper binary (`RUST_LOG` overrides).
pub fn init_logging() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .target(env_logger::Target::Stderr)
        .try_init();
}
