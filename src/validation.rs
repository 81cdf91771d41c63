//! Cross-checks between the service catalog and the event catalog.
//!
//! Validation never stops at the first problem: every rule runs and adds to
//! the findings list so one run surfaces everything actionable. Only a
//! missing or unparsable catalog is fatal; it yields ERROR findings and no
//! summary. Duplicate item ids are reported as ERROR because they break
//! addressing; everything else is a WARNING.

use crate::DocpackLayout;
use crate::catalog::{CatalogError, CatalogItem, CatalogStore, ItemKind, ServiceId};
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;

// Console and report rendering cap for long subject lists; the finding
// still carries the full list.
const DRIFT_DISPLAY_LIMIT: usize = 200;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl Severity {
    pub const ALL: [Severity; 3] = [Severity::Error, Severity::Warning, Severity::Info];

    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Error => "ERROR",
            Severity::Warning => "WARNING",
            Severity::Info => "INFO",
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct Finding {
    pub severity: Severity,
    pub title: String,
    pub detail: String,
    /// Complete list behind a truncated `detail`, when the rule has one.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub subjects: Vec<String>,
}

impl Finding {
    pub fn new(severity: Severity, title: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            severity,
            title: title.into(),
            detail: detail.into(),
            subjects: Vec::new(),
        }
    }

    pub fn error(title: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::new(Severity::Error, title, detail)
    }

    pub fn warning(title: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::new(Severity::Warning, title, detail)
    }

    fn with_subjects(mut self, subjects: Vec<String>) -> Self {
        self.subjects = subjects;
        self
    }
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} :: {}",
            self.severity.as_str(),
            self.title,
            self.detail
        )
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
/// Active event with a producer and nobody listening.
pub struct Orphan {
    pub id: String,
    pub subject: String,
    pub producer: String,
    pub status: String,
}

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize)]
pub struct Summary {
    pub services: usize,
    pub items: usize,
    pub events: usize,
    pub commands: usize,
    pub queries: usize,
    pub orphans: Vec<Orphan>,
}

#[derive(Debug)]
/// Result of validating a repository's doc pack.
///
/// `summary` is `None` only when a required file was missing or a catalog
/// failed to parse.
pub struct ValidationOutcome {
    pub findings: Vec<Finding>,
    pub summary: Option<Summary>,
}

impl ValidationOutcome {
    fn fatal(findings: Vec<Finding>) -> Self {
        Self {
            findings,
            summary: None,
        }
    }

    pub fn is_fatal(&self) -> bool {
        self.summary.is_none()
    }

    /// `2` for fatal runs, `0` whenever a summary was produced.
    pub fn exit_code(&self) -> i32 {
        if self.is_fatal() { 2 } else { 0 }
    }

    pub fn count(&self, severity: Severity) -> usize {
        self.findings
            .iter()
            .filter(|finding| finding.severity == severity)
            .count()
    }
}

/// Check required files, load both catalogs, and run every rule.
pub fn validate_repo(layout: &DocpackLayout) -> ValidationOutcome {
    let missing: Vec<Finding> = layout
        .required_files()
        .into_iter()
        .filter(|path| !path.exists())
        .map(|path| Finding::error("Missing required file", path.display().to_string()))
        .collect();
    if !missing.is_empty() {
        return ValidationOutcome::fatal(missing);
    }

    let store = match CatalogStore::load(&layout.service_catalog, &layout.event_catalog) {
        Ok(store) => store,
        Err(err) => return ValidationOutcome::fatal(vec![load_failure(&err)]),
    };

    let (findings, summary) = validate(&store);
    ValidationOutcome {
        findings,
        summary: Some(summary),
    }
}

fn load_failure(err: &CatalogError) -> Finding {
    match err {
        CatalogError::Missing(path) => {
            Finding::error("Missing required file", path.display().to_string())
        }
        CatalogError::Read { path, .. }
        | CatalogError::Parse { path, .. }
        | CatalogError::Entry { path, .. } => Finding::error(
            format!("Failed to parse {}", file_label(path)),
            err.to_string(),
        ),
    }
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Run every rule over a loaded catalog pair.
pub fn validate(store: &CatalogStore) -> (Vec<Finding>, Summary) {
    let mut findings = Vec::new();
    let known: BTreeSet<&ServiceId> = store.service_ids().collect();
    if known.is_empty() {
        findings.push(Finding::warning(
            "No services found",
            "service catalog has an empty services list",
        ));
    }

    let mut seen_ids = BTreeSet::new();
    let mut duplicate_ids = BTreeSet::new();
    let mut seen_subjects = BTreeSet::new();
    let mut duplicate_subjects = BTreeSet::new();

    for item in store.items() {
        if let Some(id) = item.id() {
            if !seen_ids.insert(id.0.as_str()) {
                duplicate_ids.insert(id.0.as_str());
            }
        }
        if let Some(subject) = item.messaging_subject() {
            if !seen_subjects.insert(subject) {
                duplicate_subjects.insert(subject);
            }
        }

        for (role, service) in item.service_references() {
            if !known.contains(service) {
                findings.push(Finding::warning(
                    format!("Unknown {} service", role.as_str()),
                    format!("{} -> {}", item_label(item), service),
                ));
            }
        }
    }

    if !duplicate_ids.is_empty() {
        findings.push(Finding::error(
            "Duplicate catalog item IDs",
            join(&duplicate_ids),
        ));
    }
    if !duplicate_subjects.is_empty() {
        findings.push(Finding::warning("Duplicate subjects", join(&duplicate_subjects)));
    }

    let drift = catalog_drift(store);
    if !drift.is_empty() {
        let shown: Vec<&str> = drift
            .iter()
            .take(DRIFT_DISPLAY_LIMIT)
            .map(String::as_str)
            .collect();
        let mut detail = shown.join(", ");
        if drift.len() > DRIFT_DISPLAY_LIMIT {
            detail.push_str(&format!(" (+{} more)", drift.len() - DRIFT_DISPLAY_LIMIT));
        }
        findings.push(
            Finding::warning(
                "Subjects referenced by service catalog but not present in event catalog",
                detail,
            )
            .with_subjects(drift),
        );
    }

    let summary = Summary {
        services: store.services().len(),
        items: store.items().len(),
        events: count_kind(store, ItemKind::Event),
        commands: count_kind(store, ItemKind::Command),
        queries: count_kind(store, ItemKind::Query),
        orphans: find_orphans(store),
    };
    (findings, summary)
}

/// Subjects declared in any service's publishes/consumes that no event or
/// command carries, sorted.
pub fn catalog_drift(store: &CatalogStore) -> Vec<String> {
    let cataloged: BTreeSet<&str> = store.items().iter().filter_map(CatalogItem::messaging_subject).collect();
    let declared: BTreeSet<&str> = store
        .services()
        .iter()
        .flat_map(|svc| {
            svc.messaging
                .publishes
                .iter()
                .chain(svc.messaging.consumes.iter())
        })
        .map(String::as_str)
        .collect();
    declared
        .difference(&cataloged)
        .map(|subject| subject.to_string())
        .collect()
}

/// Active events with a producer and no consumers.
pub fn find_orphans(store: &CatalogStore) -> Vec<Orphan> {
    store
        .items()
        .iter()
        .filter_map(|item| {
            let CatalogItem::Event(event) = item else {
                return None;
            };
            let producer = item.origin()?;
            if !event.consumers.is_empty() || item.is_deprecated() {
                return None;
            }
            Some(Orphan {
                id: item.id().map(|id| id.0.clone()).unwrap_or_default(),
                subject: event.subject.clone().unwrap_or_default(),
                producer: producer.0.clone(),
                status: event
                    .base
                    .status
                    .clone()
                    .unwrap_or_else(|| "orphan".to_string()),
            })
        })
        .collect()
}

fn count_kind(store: &CatalogStore, kind: ItemKind) -> usize {
    store
        .items()
        .iter()
        .filter(|item| item.declared_kind().as_ref() == Some(&kind))
        .count()
}

fn item_label(item: &CatalogItem) -> &str {
    item.id().map(|id| id.0.as_str()).unwrap_or("<no id>")
}

fn join(values: &BTreeSet<&str>) -> String {
    values.iter().copied().collect::<Vec<_>>().join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    const SERVICES: &str = "services:\n  - id: billing\n    name: Billing\n  - id: crm\n    name: CRM\n";

    fn run(events: &str) -> (Vec<Finding>, Summary) {
        let store = CatalogStore::from_yaml_str(SERVICES, events).unwrap();
        validate(&store)
    }

    fn titled<'a>(findings: &'a [Finding], title: &str) -> Vec<&'a Finding> {
        findings.iter().filter(|f| f.title == title).collect()
    }

    #[test]
    fn duplicate_id_reported_once_regardless_of_count() {
        let (findings, _) = run(
            "catalog:\n  events:\n    - {id: dup, kind: event}\n    - {id: dup, kind: event}\n  commands:\n    - {id: dup, kind: command}\n  queries:\n    - {id: dup, kind: query}\n",
        );
        let dups = titled(&findings, "Duplicate catalog item IDs");
        assert_eq!(dups.len(), 1);
        assert_eq!(dups[0].severity, Severity::Error);
        assert_eq!(dups[0].detail, "dup");
    }

    #[test]
    fn duplicate_subjects_are_warnings() {
        let (findings, _) = run(
            "catalog:\n  events:\n    - {id: a, kind: event, subject: x.y}\n  commands:\n    - {id: b, kind: command, subject: x.y}\n",
        );
        let dups = titled(&findings, "Duplicate subjects");
        assert_eq!(dups.len(), 1);
        assert_eq!(dups[0].severity, Severity::Warning);
        assert!(findings.iter().all(|f| f.severity != Severity::Error));
    }

    #[test]
    fn blank_producer_emits_no_unknown_producer_warning() {
        let (findings, _) = run(
            "catalog:\n  events:\n    - {id: a, kind: event, producer: {service: ''}}\n    - {id: b, kind: event}\n",
        );
        assert!(titled(&findings, "Unknown producer service").is_empty());
    }

    #[test]
    fn unresolved_references_warn_per_role() {
        let (findings, _) = run(
            "catalog:\n  events:\n    - id: a\n      kind: event\n      producer: {service: ghost}\n      consumers: [{service: crm}, {service: phantom}]\n  commands:\n    - {id: c, kind: command, receiver: nowhere}\n",
        );
        let producer = titled(&findings, "Unknown producer service");
        assert_eq!(producer.len(), 1);
        assert_eq!(producer[0].detail, "a -> ghost");
        assert_eq!(titled(&findings, "Unknown consumer service")[0].detail, "a -> phantom");
        assert_eq!(titled(&findings, "Unknown receiver service")[0].detail, "c -> nowhere");
    }

    #[test]
    fn references_checked_whatever_the_kind() {
        let (findings, summary) = run(
            "catalog:\n  events:\n    - {id: typo, kind: evnt, producer: ghost, consumers: [phantom]}\n    - {id: bare, producer: {service: crm}, consumers: [billing]}\n  queries:\n    - {id: q, kind: query, subject: crm.contact.get, producer: ghost2, consumers: [{service: phantom2}]}\n",
        );
        let producers: Vec<&str> = titled(&findings, "Unknown producer service")
            .iter()
            .map(|f| f.detail.as_str())
            .collect();
        assert_eq!(producers, vec!["typo -> ghost", "q -> ghost2"]);
        let consumers: Vec<&str> = titled(&findings, "Unknown consumer service")
            .iter()
            .map(|f| f.detail.as_str())
            .collect();
        assert_eq!(consumers, vec!["typo -> phantom", "q -> phantom2"]);
        // a query subject is not a message channel
        assert!(summary.orphans.is_empty());
        assert!(titled(&findings, "Duplicate subjects").is_empty());
    }

    #[test]
    fn drift_lists_undeclared_subjects_once() {
        let store = CatalogStore::from_yaml_str(
            "services:\n  - id: billing\n    messaging: {publishes: [x.y], consumes: [a.b]}\n  - id: crm\n    messaging: {consumes: [x.y]}\n",
            "catalog:\n  events:\n    - {id: e, kind: event, subject: a.b}\n",
        )
        .unwrap();
        let (findings, _) = validate(&store);
        let drift = titled(
            &findings,
            "Subjects referenced by service catalog but not present in event catalog",
        );
        assert_eq!(drift.len(), 1);
        assert_eq!(drift[0].severity, Severity::Warning);
        assert_eq!(drift[0].subjects, vec!["x.y".to_string()]);
        assert_eq!(drift[0].detail, "x.y");
    }

    #[test]
    fn drift_detail_truncates_but_keeps_full_list() {
        let subjects: Vec<String> = (0..250).map(|i| format!("s.{i:03}")).collect();
        let services = format!(
            "services:\n  - id: billing\n    messaging:\n      publishes: [{}]\n",
            subjects.join(", ")
        );
        let store = CatalogStore::from_yaml_str(&services, "").unwrap();
        let (findings, _) = validate(&store);
        let drift = findings.iter().find(|f| !f.subjects.is_empty()).unwrap();
        assert_eq!(drift.subjects.len(), 250);
        assert!(drift.detail.ends_with("(+50 more)"));
    }

    #[test]
    fn orphan_rule_respects_deprecation() {
        let (_, summary) = run(
            "catalog:\n  events:\n    - {id: lonely, kind: event, subject: a.b, producer: billing, consumers: []}\n    - {id: retired, kind: event, subject: c.d, producer: billing, status: deprecated}\n    - {id: heard, kind: event, subject: e.f, producer: billing, consumers: [crm]}\n    - {id: sourceless, kind: event, subject: g.h}\n",
        );
        assert_eq!(
            summary.orphans,
            vec![Orphan {
                id: "lonely".into(),
                subject: "a.b".into(),
                producer: "billing".into(),
                status: "orphan".into(),
            }]
        );
    }

    #[test]
    fn summary_counts_by_kind() {
        let (_, summary) = run(
            "catalog:\n  events: [{id: a, kind: event}, {id: b}]\n  commands: [{id: c, kind: command}]\n  queries: [{id: d, kind: query}, {id: e, kind: query}]\n",
        );
        assert_eq!(summary.services, 2);
        assert_eq!(summary.items, 5);
        assert_eq!(summary.events, 1);
        assert_eq!(summary.commands, 1);
        assert_eq!(summary.queries, 2);
    }

    #[test]
    fn empty_service_catalog_warns() {
        let store = CatalogStore::from_yaml_str("services: []\n", "").unwrap();
        let (findings, summary) = validate(&store);
        assert_eq!(titled(&findings, "No services found").len(), 1);
        assert_eq!(summary.services, 0);
    }
}
