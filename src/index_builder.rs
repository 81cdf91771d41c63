//! Projects the catalogs into retrieval documents.
//!
//! Every service and every catalog item becomes one `IndexDocument` with the
//! fixed shape `{id, type, title, tags, body, links}`. Derivation is purely
//! structural and ordered, so rebuilding from unchanged catalogs reproduces
//! the previous output byte for byte. Entries without an id (or, for items,
//! without a kind) are skipped rather than failing the build.

use crate::catalog::{CatalogItem, CatalogStore, Service};
use crate::{DocpackLayout, EVENT_CATALOG_PATH, SERVICE_CATALOG_PATH};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{BufWriter, Write};
use std::path::Path;
use tempfile::NamedTempFile;

// Required-field lists longer than this are cut with an ellipsis in bodies.
const REQUIRED_FIELDS_SHOWN: usize = 12;

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct IndexDocument {
    pub id: String,
    #[serde(rename = "type")]
    pub doc_type: String,
    pub title: String,
    pub tags: Vec<String>,
    pub body: String,
    pub links: Vec<String>,
}

#[derive(Clone, Debug)]
/// Builds index documents; anchors name the catalog files links point into.
pub struct IndexBuilder {
    service_anchor: String,
    item_anchor: String,
}

impl Default for IndexBuilder {
    fn default() -> Self {
        Self::new(SERVICE_CATALOG_PATH, EVENT_CATALOG_PATH)
    }
}

impl IndexBuilder {
    pub fn new(service_anchor: impl Into<String>, item_anchor: impl Into<String>) -> Self {
        Self {
            service_anchor: service_anchor.into(),
            item_anchor: item_anchor.into(),
        }
    }

    /// Anchor links at the layout's catalog paths, relative to the repo root.
    pub fn for_layout(layout: &DocpackLayout) -> Self {
        Self::new(
            layout.relative_display(&layout.service_catalog),
            layout.relative_display(&layout.event_catalog),
        )
    }

    /// Documents for all services, in catalog order.
    pub fn service_documents<'a>(
        &'a self,
        store: &'a CatalogStore,
    ) -> impl Iterator<Item = IndexDocument> + 'a {
        store
            .services()
            .iter()
            .filter_map(move |svc| self.service_document(svc))
    }

    /// Documents for all catalog items, in catalog order.
    pub fn item_documents<'a>(
        &'a self,
        store: &'a CatalogStore,
    ) -> impl Iterator<Item = IndexDocument> + 'a {
        store
            .items()
            .iter()
            .filter_map(move |item| self.item_document(item))
    }

    pub fn build(&self, store: &CatalogStore) -> (Vec<IndexDocument>, Vec<IndexDocument>) {
        (
            self.service_documents(store).collect(),
            self.item_documents(store).collect(),
        )
    }

    pub fn service_document(&self, svc: &Service) -> Option<IndexDocument> {
        let id = svc.id.as_ref()?;
        let name = svc.name.as_deref()?;
        Some(IndexDocument {
            id: id.0.clone(),
            doc_type: "service".to_string(),
            title: name.to_string(),
            tags: service_tags(svc),
            body: service_body(svc, name),
            links: self.service_links(svc, &id.0),
        })
    }

    pub fn item_document(&self, item: &CatalogItem) -> Option<IndexDocument> {
        let id = item.id()?;
        let kind = item.declared_kind()?;
        Some(IndexDocument {
            id: id.0.clone(),
            doc_type: kind.as_str().to_string(),
            title: item_title(item),
            tags: item_tags(item),
            body: item_body(item),
            links: self.item_links(item, &id.0),
        })
    }

    fn service_links(&self, svc: &Service, id: &str) -> Vec<String> {
        let mut links = vec![format!("{}#{id}", self.service_anchor)];
        links.extend(svc.repo.path.iter().cloned());
        links.extend(svc.interfaces.grpc.iter().filter_map(|g| g.proto.clone()));
        links.extend(svc.interfaces.http.iter().filter_map(|h| h.openapi.clone()));
        links
    }

    fn item_links(&self, item: &CatalogItem, id: &str) -> Vec<String> {
        let base = item.base();
        let mut links = vec![format!("{}#{id}", self.item_anchor)];
        for group in [
            &base.links.contracts,
            &base.links.docs,
            &base.links.runbook,
            &base.links.code_refs,
            &base.links.handler_refs,
            &base.code_refs,
            &base.handler_refs,
        ] {
            links.extend(group.iter().cloned());
        }
        links
    }
}

fn service_tags(svc: &Service) -> Vec<String> {
    let mut tags = Vec::new();
    push_tag(&mut tags, "domain", svc.domain.as_deref());
    push_tag(&mut tags, "type", svc.service_type.as_deref());
    push_tag(&mut tags, "lang", svc.runtime.language.as_deref());
    push_tag(&mut tags, "fw", svc.runtime.framework.as_deref());
    for subject in &svc.messaging.publishes {
        tags.push(format!("publishes:{subject}"));
    }
    for subject in &svc.messaging.consumes {
        tags.push(format!("consumes:{subject}"));
    }
    tags
}

fn service_body(svc: &Service, name: &str) -> String {
    let mut parts = vec![format!(
        "Service {name} (domain={}, type={}).",
        svc.domain.as_deref().unwrap_or("none"),
        svc.service_type.as_deref().unwrap_or("none")
    )];

    let grpc = svc.interfaces.grpc.len();
    if grpc > 0 {
        parts.push(format!("gRPC={grpc}."));
    }
    let http = svc.interfaces.http.len();
    if http > 0 {
        parts.push(format!("HTTP={http}."));
    }

    let db_names: Vec<&str> = svc
        .data
        .databases
        .iter()
        .filter_map(|db| db.name.as_deref())
        .collect();
    if !db_names.is_empty() {
        parts.push(format!("DBs={}.", db_names.join(",")));
    }

    if !svc.messaging.publishes.is_empty() {
        parts.push(format!("Publishes {}.", svc.messaging.publishes.len()));
    }
    if !svc.messaging.consumes.is_empty() {
        parts.push(format!("Consumes {}.", svc.messaging.consumes.len()));
    }
    if let Some(description) = &svc.description {
        parts.push(description.clone());
    }

    compact(&parts.join(" "))
}

/// First non-empty of: subject, gRPC `Service.Method`, `METHOD /path`,
/// name, id, `unknown`.
fn item_title(item: &CatalogItem) -> String {
    if let Some(subject) = item.subject() {
        return subject.to_string();
    }
    let base = item.base();
    if let Some(grpc) = &base.transport.grpc {
        if let (Some(service), Some(method)) = (&grpc.service, &grpc.method) {
            return format!("{service}.{method}");
        }
    }
    if let Some(http) = &base.transport.http {
        if let (Some(method), Some(path)) = (&http.method, &http.path) {
            return format!("{} {path}", method.to_uppercase());
        }
    }
    base.name
        .clone()
        .or_else(|| item.id().map(|id| id.0.clone()))
        .unwrap_or_else(|| "unknown".to_string())
}

fn item_tags(item: &CatalogItem) -> Vec<String> {
    let base = item.base();
    let mut tags = Vec::new();
    push_tag(&mut tags, "kind", item.declared_kind().as_ref().map(|k| k.as_str()));
    push_tag(&mut tags, "subject", item.subject());
    push_tag(&mut tags, "transport", base.transport.mode.as_deref());
    push_tag(&mut tags, "broker", base.delivery.broker.as_deref());
    if let Some(version) = &base.schema.version {
        tags.push(format!("schema:v{version}"));
    }
    push_tag(&mut tags, "producer", item.producer().map(|s| s.0.as_str()));
    push_tag(&mut tags, "sender", item.sender().map(|s| s.0.as_str()));
    push_tag(&mut tags, "receiver", item.receiver().map(|s| s.0.as_str()));
    push_tag(&mut tags, "responder", item.responder().map(|s| s.0.as_str()));
    for consumer in item.consumers() {
        tags.push(format!("consumer:{consumer}"));
    }
    tags.extend(base.tags.iter().cloned());
    push_tag(&mut tags, "domain_event", base.domain_event.as_deref());
    tags
}

fn item_body(item: &CatalogItem) -> String {
    let base = item.base();
    let mut parts: Vec<String> = Vec::new();
    if let Some(description) = &base.description {
        parts.push(compact(description));
    }
    parts.push(format!("Kind={}.", item.kind_label()));

    let roles = [
        ("Producer", item.producer()),
        ("Sender", item.sender()),
        ("Receiver", item.receiver()),
        ("Responder", item.responder()),
    ];
    for (label, service) in roles {
        if let Some(service) = service {
            parts.push(format!("{label}={service}."));
        }
    }

    let consumers = item.consumers();
    if !consumers.is_empty() {
        let names: Vec<&str> = consumers.iter().map(|c| c.0.as_str()).collect();
        parts.push(format!("Consumers={}.", names.join(",")));
    }

    let schema = &base.schema;
    if let Some(name) = &schema.name {
        parts.push(format!("Schema={name}."));
    }
    if let Some(version) = &schema.version {
        parts.push(format!("SchemaVersion={version}."));
    }
    if !schema.required_fields.is_empty() {
        let shown: Vec<&str> = schema
            .required_fields
            .iter()
            .take(REQUIRED_FIELDS_SHOWN)
            .map(String::as_str)
            .collect();
        let ellipsis = if schema.required_fields.len() > REQUIRED_FIELDS_SHOWN {
            "..."
        } else {
            ""
        };
        parts.push(format!("Required={}{ellipsis}.", shown.join(",")));
    }

    let delivery = &base.delivery;
    if let Some(stream) = &delivery.jetstream.stream {
        parts.push(format!("Stream={stream}."));
    }
    if let Some(filter) = &delivery.jetstream.subject_filter {
        parts.push(format!("Filter={filter}."));
    }
    let reliability = &delivery.reliability;
    if let Some(policy) = &reliability.retry.policy {
        parts.push(format!("Retry={policy}."));
    }
    if let Some(max_attempts) = &reliability.retry.max_attempts {
        parts.push(format!("MaxAttempts={max_attempts}."));
    }
    if let Some(dlq) = &reliability.dlq_subject {
        parts.push(format!("DLQ={dlq}."));
    }

    compact(&parts.join(" "))
}

fn push_tag(tags: &mut Vec<String>, prefix: &str, value: Option<&str>) {
    if let Some(value) = value {
        tags.push(format!("{prefix}:{value}"));
    }
}

/// Collapse whitespace runs to single spaces and trim.
fn compact(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Serialize documents as JSON lines.
pub fn render_jsonl<I>(docs: I) -> Result<String>
where
    I: IntoIterator<Item = IndexDocument>,
{
    let mut out = String::new();
    for doc in docs {
        out.push_str(&serde_json::to_string(&doc)?);
        out.push('\n');
    }
    Ok(out)
}

/// Stream documents to `path`, replacing it atomically. Returns the count.
pub fn write_jsonl<I>(path: &Path, docs: I) -> Result<usize>
where
    I: IntoIterator<Item = IndexDocument>,
{
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(dir).with_context(|| format!("creating index dir {}", dir.display()))?;

    let staged = NamedTempFile::new_in(dir)
        .with_context(|| format!("staging index file in {}", dir.display()))?;
    let mut count = 0;
    {
        let mut writer = BufWriter::new(staged.as_file());
        for doc in docs {
            serde_json::to_writer(&mut writer, &doc)?;
            writer.write_all(b"\n")?;
            count += 1;
        }
        writer.flush()?;
    }
    if let Some(permissions) = index_permissions(path) {
        staged
            .as_file()
            .set_permissions(permissions)
            .with_context(|| format!("setting permissions for {}", path.display()))?;
    }
    staged
        .persist(path)
        .with_context(|| format!("replacing {}", path.display()))?;
    Ok(count)
}

/// Keep the mode of the file being replaced; fresh files get 0644 rather
/// than the private mode of the staging file.
fn index_permissions(path: &Path) -> Option<fs::Permissions> {
    if let Ok(meta) = fs::metadata(path) {
        return Some(meta.permissions());
    }
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        Some(fs::Permissions::from_mode(0o644))
    }
    #[cfg(not(unix))]
    {
        None
    }
}
