//! Heuristic discovery of integration points in source code.
//!
//! The scanner walks a repository, reads allowlisted files as text, and
//! reports lines that look like message publishing, subscriptions, HTTP
//! routes, or RPC declarations. Results are candidates for a human to
//! reconcile into the catalogs; false positives and misses are expected.

mod patterns;

use crate::to_slash;
use anyhow::Result;
use patterns::{LinePattern, ProtoScanContext, compile_patterns};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

pub const DEFAULT_EXTENSIONS: &[&str] = &[
    "ts", "tsx", "js", "jsx", "mjs", "cjs", "py", "go", "java", "kt", "cs", "rb", "rs", "proto",
    "yaml", "yml",
];

pub const DEFAULT_SKIP_DIRS: &[&str] = &[
    ".git",
    "node_modules",
    "dist",
    "build",
    "target",
    "vendor",
    ".venv",
    "venv",
    "__pycache__",
    ".next",
    "coverage",
];

const SNIPPET_CHARS: usize = 220;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CandidateKind {
    Publish,
    Subscribe,
    Http,
    Proto,
}

impl CandidateKind {
    pub fn as_str(self) -> &'static str {
        match self {
            CandidateKind::Publish => "publish",
            CandidateKind::Subscribe => "subscribe",
            CandidateKind::Http => "http",
            CandidateKind::Proto => "proto",
        }
    }

    /// Publish and subscribe candidates carry a message subject.
    pub fn carries_subject(self) -> bool {
        matches!(self, CandidateKind::Publish | CandidateKind::Subscribe)
    }
}

impl fmt::Display for CandidateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
/// One detected integration point. `file` is relative to the scan root.
pub struct CandidateRecord {
    pub kind: CandidateKind,
    pub value: String,
    pub file: String,
    pub line: usize,
    pub snippet: String,
}

impl CandidateRecord {
    /// `file:line`, as used in coverage listings.
    pub fn location(&self) -> String {
        format!("{}:{}", self.file, self.line)
    }
}

#[derive(Clone, Debug)]
pub struct ScanOptions {
    /// Extensions read as text, without the leading dot.
    pub extensions: BTreeSet<String>,
    /// Directory names pruned wherever they appear.
    pub skip_dirs: BTreeSet<String>,
    /// When set, only these `services/<name>` subtrees are scanned.
    pub service_scope: Option<BTreeSet<String>>,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            extensions: DEFAULT_EXTENSIONS.iter().map(|s| s.to_string()).collect(),
            skip_dirs: DEFAULT_SKIP_DIRS.iter().map(|s| s.to_string()).collect(),
            service_scope: None,
        }
    }
}

impl ScanOptions {
    /// Replace the extension allowlist; leading dots are ignored.
    pub fn with_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.extensions = extensions
            .into_iter()
            .map(|ext| ext.as_ref().trim_start_matches('.').to_ascii_lowercase())
            .filter(|ext| !ext.is_empty())
            .collect();
        self
    }

    /// Add directory names to the skip set.
    pub fn skipping<I, S>(mut self, dirs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.skip_dirs
            .extend(dirs.into_iter().map(|d| d.as_ref().to_string()));
        self
    }

    pub fn with_service_scope<I, S>(mut self, services: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let scope: BTreeSet<String> = services
            .into_iter()
            .map(|s| s.as_ref().to_string())
            .collect();
        self.service_scope = (!scope.is_empty()).then_some(scope);
        self
    }
}

pub struct CandidateScanner {
    root: PathBuf,
    options: ScanOptions,
    patterns: Vec<LinePattern>,
}

impl CandidateScanner {
    pub fn new(root: impl Into<PathBuf>, options: ScanOptions) -> Result<Self> {
        Ok(Self {
            root: root.into(),
            options,
            patterns: compile_patterns()?,
        })
    }

    /// Collect every candidate under the root.
    pub fn scan(&self) -> Result<Vec<CandidateRecord>> {
        let mut records = Vec::new();
        self.scan_with(|record| {
            records.push(record);
            Ok(())
        })?;
        Ok(records)
    }

    /// Hand each candidate to `sink` as soon as it is found. Returns the
    /// number of candidates emitted. Only sink errors abort the walk.
    pub fn scan_with<F>(&self, mut sink: F) -> Result<usize>
    where
        F: FnMut(CandidateRecord) -> Result<()>,
    {
        let mut emitted = 0;
        let walker = WalkDir::new(&self.root)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| !self.is_pruned(entry));

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    log::debug!("skipping unreadable entry: {err}");
                    continue;
                }
            };
            if !entry.file_type().is_file() || !self.is_allowed(entry.path()) {
                continue;
            }
            emitted += self.scan_file(entry.path(), &mut sink)?;
        }

        log::info!("scan of {} found {emitted} candidates", self.root.display());
        Ok(emitted)
    }

    fn scan_file<F>(&self, path: &Path, sink: &mut F) -> Result<usize>
    where
        F: FnMut(CandidateRecord) -> Result<()>,
    {
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(err) => {
                log::debug!("skipping {}: {err}", path.display());
                return Ok(0);
            }
        };
        let text = String::from_utf8_lossy(&bytes);
        let file = self.relative(path);
        let mut proto = if is_proto(path) {
            Some(ProtoScanContext::new()?)
        } else {
            None
        };

        let mut emitted = 0;
        for (idx, line) in text.lines().enumerate() {
            let mut emit = |kind: CandidateKind, value: String| {
                sink(CandidateRecord {
                    kind,
                    value,
                    file: file.clone(),
                    line: idx + 1,
                    snippet: snippet(line),
                })
            };
            for pattern in &self.patterns {
                for value in pattern.values(line) {
                    emit(pattern.kind, value)?;
                    emitted += 1;
                }
            }
            if let Some(ctx) = proto.as_mut() {
                if let Some(value) = ctx.observe(line) {
                    emit(CandidateKind::Proto, value)?;
                    emitted += 1;
                }
            }
        }
        Ok(emitted)
    }

    fn is_pruned(&self, entry: &DirEntry) -> bool {
        if entry.depth() == 0 || !entry.file_type().is_dir() {
            return false;
        }
        let name = entry.file_name().to_string_lossy();
        if self.options.skip_dirs.contains(&*name) {
            log::debug!("pruning {}", entry.path().display());
            return true;
        }
        let Some(scope) = &self.options.service_scope else {
            return false;
        };
        let rel = entry.path().strip_prefix(&self.root).unwrap_or(entry.path());
        let mut parts = rel.components();
        let in_services = parts
            .next()
            .is_some_and(|first| first.as_os_str() == "services");
        match (in_services, parts.next(), parts.next()) {
            (true, Some(service), None) => {
                let out_of_scope = !scope.contains(&*service.as_os_str().to_string_lossy());
                if out_of_scope {
                    log::debug!("pruning out-of-scope {}", rel.display());
                }
                out_of_scope
            }
            _ => false,
        }
    }

    fn is_allowed(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| self.options.extensions.contains(&ext.to_ascii_lowercase()))
    }

    fn relative(&self, path: &Path) -> String {
        to_slash(path.strip_prefix(&self.root).unwrap_or(path))
    }
}

fn is_proto(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("proto"))
}

fn snippet(line: &str) -> String {
    line.trim().chars().take(SNIPPET_CHARS).collect::<String>().trim().to_string()
}
