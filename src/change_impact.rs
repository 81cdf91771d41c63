//! Maps a list of changed files to the services that own them.
//!
//! Only paths shaped `services/<name>/...` attribute to a service. When the
//! repository has a `services/` directory, names that no longer exist there
//! are dropped. Everything else is reported as a non-service path so shared
//! code changes stay visible to downstream automation.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

const SERVICES_DIR: &str = "services";
const SUMMARY_SUFFIX: &str = ".summary.json";

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ChangeImpact {
    /// Sorted, de-duplicated service names.
    pub affected_services: Vec<String>,
    /// Paths outside `services/<name>/`, in input order.
    pub non_service_paths: Vec<String>,
}

impl ChangeImpact {
    /// Comma-separated affected services, as printed on stdout.
    pub fn csv(&self) -> String {
        self.affected_services.join(",")
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
/// Persisted form of a mapping run.
pub struct ChangeSummary {
    pub repo: String,
    pub changed_file_list: String,
    pub affected_services: Vec<String>,
    pub non_service_paths: Vec<String>,
}

impl ChangeSummary {
    pub fn new(repo: &Path, changed_file_list: &Path, impact: ChangeImpact) -> Self {
        Self {
            repo: repo.display().to_string(),
            changed_file_list: changed_file_list.display().to_string(),
            affected_services: impact.affected_services,
            non_service_paths: impact.non_service_paths,
        }
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        let mut text = serde_json::to_string_pretty(self)?;
        text.push('\n');
        fs::write(path, text).with_context(|| format!("writing change summary {}", path.display()))
    }
}

/// Attribute changed paths to services under `repo_root`.
pub fn map_changes(repo_root: &Path, changed: &[String]) -> ChangeImpact {
    let mut candidates = BTreeSet::new();
    let mut non_service_paths: Vec<String> = Vec::new();

    for raw in changed {
        let path = normalize(raw);
        if path.is_empty() {
            continue;
        }
        match service_of(&path) {
            Some(name) => {
                candidates.insert(name.to_string());
            }
            None => {
                if !non_service_paths.contains(&path) {
                    non_service_paths.push(path);
                }
            }
        }
    }

    let services_dir = repo_root.join(SERVICES_DIR);
    let affected_services = if services_dir.is_dir() {
        candidates
            .into_iter()
            .filter(|name| {
                let exists = services_dir.join(name).is_dir();
                if !exists {
                    log::debug!("dropping {SERVICES_DIR}/{name}: no such service directory");
                }
                exists
            })
            .collect()
    } else {
        candidates.into_iter().collect()
    };

    ChangeImpact {
        affected_services,
        non_service_paths,
    }
}

/// Read a newline-delimited changed-file list, skipping blank lines.
pub fn read_changed_files(path: &Path) -> Result<Vec<String>> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("reading changed file list {}", path.display()))?;
    Ok(text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}

/// `<input>.summary.json`, next to the input file.
pub fn summary_path_for(input: &Path) -> PathBuf {
    let mut name: OsString = input
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| OsString::from("changed_files"));
    name.push(SUMMARY_SUFFIX);
    input.with_file_name(name)
}

fn normalize(raw: &str) -> String {
    let slashed = raw.trim().replace('\\', "/");
    let mut rest = slashed.as_str();
    while let Some(stripped) = rest.strip_prefix("./") {
        rest = stripped;
    }
    rest.to_string()
}

/// `<name>` for any path starting `services/<name>`, including the service
/// directory itself. Files directly under `services/` are weeded out later
/// by the on-disk check.
fn service_of(path: &str) -> Option<&str> {
    let mut segments = path.split('/').filter(|s| !s.is_empty());
    if segments.next()? != SERVICES_DIR {
        return None;
    }
    segments.next()
}
