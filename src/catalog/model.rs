//! Typed representation of the service catalog and the event catalog.
//!
//! Catalogs are hand-edited YAML, so every field is optional and scalar
//! fields accept strings, numbers, or booleans. Shape problems that would make
//! a field meaningless (a mapping where a string belongs, a scalar where a
//! list belongs) collapse to the empty value instead of failing the load.
//! Items are converted into the `CatalogItem` variant for their declared
//! kind. `subject`, `producer`, and `consumers` are kept on every variant so
//! misfiled entries can still be indexed and checked; the point-to-point
//! roles (`sender`, `receiver`, `responder`) only survive on their own kind.

use crate::catalog::identity::{ItemId, ItemKind, ServiceId};
use serde::de::{DeserializeOwned, Error as _};
use serde::{Deserialize, Deserializer};
use serde_yaml::Value;

#[derive(Clone, Debug, Default, Deserialize)]
/// One microservice entry from `services:`.
pub struct Service {
    #[serde(default, deserialize_with = "opt_service_id")]
    pub id: Option<ServiceId>,
    #[serde(default, deserialize_with = "opt_text")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "opt_text")]
    pub domain: Option<String>,
    #[serde(default, rename = "type", deserialize_with = "opt_text")]
    pub service_type: Option<String>,
    #[serde(default, deserialize_with = "opt_text")]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub runtime: Runtime,
    #[serde(default, deserialize_with = "lenient")]
    pub interfaces: Interfaces,
    #[serde(default, deserialize_with = "lenient")]
    pub data: DataStores,
    #[serde(default, deserialize_with = "lenient")]
    pub messaging: Messaging,
    #[serde(default, deserialize_with = "lenient")]
    pub repo: RepoLocation,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct Runtime {
    #[serde(default, deserialize_with = "opt_text")]
    pub language: Option<String>,
    #[serde(default, deserialize_with = "opt_text")]
    pub framework: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct Interfaces {
    #[serde(default, deserialize_with = "lenient_seq")]
    pub grpc: Vec<GrpcInterface>,
    #[serde(default, deserialize_with = "lenient_seq")]
    pub http: Vec<HttpInterface>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct GrpcInterface {
    #[serde(default, deserialize_with = "opt_text")]
    pub proto: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct HttpInterface {
    #[serde(default, deserialize_with = "opt_text")]
    pub openapi: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct DataStores {
    #[serde(default, deserialize_with = "lenient_seq")]
    pub databases: Vec<Database>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct Database {
    #[serde(default, deserialize_with = "opt_text")]
    pub name: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
/// Subjects a service declares it publishes to or consumes from.
pub struct Messaging {
    #[serde(default, deserialize_with = "text_list")]
    pub publishes: Vec<String>,
    #[serde(default, deserialize_with = "text_list")]
    pub consumes: Vec<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct RepoLocation {
    #[serde(default, deserialize_with = "opt_text")]
    pub path: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
/// Attributes shared by every catalog item regardless of kind.
pub struct ItemBase {
    #[serde(default, deserialize_with = "opt_item_id")]
    pub id: Option<ItemId>,
    #[serde(default, deserialize_with = "opt_text")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "opt_text")]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "opt_text")]
    pub status: Option<String>,
    #[serde(default, deserialize_with = "opt_text")]
    pub domain_event: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub schema: SchemaInfo,
    #[serde(default, deserialize_with = "lenient")]
    pub transport: Transport,
    #[serde(default, deserialize_with = "lenient")]
    pub delivery: Delivery,
    #[serde(default, deserialize_with = "lenient")]
    pub links: ItemLinks,
    #[serde(default, deserialize_with = "text_list")]
    pub tags: Vec<String>,
    /// Inline references left at the top level during iterative edits.
    #[serde(default, deserialize_with = "text_list")]
    pub code_refs: Vec<String>,
    #[serde(default, deserialize_with = "text_list")]
    pub handler_refs: Vec<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct SchemaInfo {
    #[serde(default, deserialize_with = "opt_text")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "opt_text")]
    pub version: Option<String>,
    #[serde(default, deserialize_with = "text_list")]
    pub required_fields: Vec<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct Transport {
    #[serde(default, deserialize_with = "opt_text")]
    pub mode: Option<String>,
    #[serde(default, deserialize_with = "lenient_opt")]
    pub grpc: Option<GrpcMethod>,
    #[serde(default, deserialize_with = "lenient_opt")]
    pub http: Option<HttpRoute>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct GrpcMethod {
    #[serde(default, deserialize_with = "opt_text")]
    pub service: Option<String>,
    #[serde(default, deserialize_with = "opt_text")]
    pub method: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct HttpRoute {
    #[serde(default, deserialize_with = "opt_text")]
    pub method: Option<String>,
    #[serde(default, deserialize_with = "opt_text")]
    pub path: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct Delivery {
    #[serde(default, deserialize_with = "opt_text")]
    pub broker: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub jetstream: JetStream,
    #[serde(default, deserialize_with = "lenient")]
    pub reliability: Reliability,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct JetStream {
    #[serde(default, deserialize_with = "opt_text")]
    pub stream: Option<String>,
    #[serde(default, deserialize_with = "opt_text")]
    pub subject_filter: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct Reliability {
    #[serde(default, deserialize_with = "lenient")]
    pub retry: RetryPolicy,
    #[serde(default, deserialize_with = "opt_text")]
    pub dlq_subject: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct RetryPolicy {
    #[serde(default, deserialize_with = "opt_text")]
    pub policy: Option<String>,
    #[serde(default, deserialize_with = "opt_text")]
    pub max_attempts: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct ItemLinks {
    #[serde(default, deserialize_with = "text_list")]
    pub contracts: Vec<String>,
    #[serde(default, deserialize_with = "text_list")]
    pub docs: Vec<String>,
    #[serde(default, deserialize_with = "text_list")]
    pub runbook: Vec<String>,
    #[serde(default, deserialize_with = "text_list")]
    pub code_refs: Vec<String>,
    #[serde(default, deserialize_with = "text_list")]
    pub handler_refs: Vec<String>,
}

#[derive(Clone, Debug)]
pub struct EventItem {
    pub base: ItemBase,
    pub subject: Option<String>,
    pub producer: Option<ServiceId>,
    pub consumers: Vec<ServiceId>,
}

#[derive(Clone, Debug)]
/// Commands come in two shapes: publish-style (`producer`/`consumers`) and
/// point-to-point (`sender`/`receiver`). Both are kept.
pub struct CommandItem {
    pub base: ItemBase,
    pub subject: Option<String>,
    pub producer: Option<ServiceId>,
    pub consumers: Vec<ServiceId>,
    pub sender: Option<ServiceId>,
    pub receiver: Option<ServiceId>,
}

#[derive(Clone, Debug)]
pub struct QueryItem {
    pub base: ItemBase,
    pub subject: Option<String>,
    pub producer: Option<ServiceId>,
    pub consumers: Vec<ServiceId>,
    pub responder: Option<ServiceId>,
}

#[derive(Clone, Debug)]
/// Item whose `kind` is missing or not one of event/command/query.
pub struct UnclassifiedItem {
    pub base: ItemBase,
    pub label: Option<String>,
    pub subject: Option<String>,
    pub producer: Option<ServiceId>,
    pub consumers: Vec<ServiceId>,
}

#[derive(Clone, Debug)]
/// A unit of integration contract from the event catalog.
pub enum CatalogItem {
    Event(EventItem),
    Command(CommandItem),
    Query(QueryItem),
    Unclassified(UnclassifiedItem),
}

/// Relationship between an item and a service it names.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Role {
    Producer,
    Sender,
    Receiver,
    Responder,
    Consumer,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Producer => "producer",
            Role::Sender => "sender",
            Role::Receiver => "receiver",
            Role::Responder => "responder",
            Role::Consumer => "consumer",
        }
    }
}

#[derive(Deserialize)]
struct ItemRecord {
    #[serde(flatten)]
    base: ItemBase,
    #[serde(default, deserialize_with = "opt_text")]
    kind: Option<String>,
    #[serde(default, deserialize_with = "opt_text")]
    subject: Option<String>,
    #[serde(default, deserialize_with = "opt_service_ref")]
    producer: Option<ServiceId>,
    #[serde(default, deserialize_with = "service_ref_list")]
    consumers: Vec<ServiceId>,
    #[serde(default, deserialize_with = "opt_service_ref")]
    sender: Option<ServiceId>,
    #[serde(default, deserialize_with = "opt_service_ref")]
    receiver: Option<ServiceId>,
    #[serde(default, deserialize_with = "opt_service_ref")]
    responder: Option<ServiceId>,
}

impl Service {
    /// Parse one `services:` entry. Callers only pass mappings.
    pub fn from_yaml(value: Value) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_value(value)
    }
}

impl CatalogItem {
    /// Parse one catalog entry and place it in the variant for its `kind`.
    pub fn from_yaml(value: Value) -> Result<Self, serde_yaml::Error> {
        let record: ItemRecord = serde_yaml::from_value(value)?;
        Ok(Self::from_record(record))
    }

    fn from_record(record: ItemRecord) -> Self {
        let kind = record.kind.as_deref().map(ItemKind::from_label);
        match kind {
            Some(ItemKind::Event) => CatalogItem::Event(EventItem {
                base: record.base,
                subject: record.subject,
                producer: record.producer,
                consumers: record.consumers,
            }),
            Some(ItemKind::Command) => CatalogItem::Command(CommandItem {
                base: record.base,
                subject: record.subject,
                producer: record.producer,
                consumers: record.consumers,
                sender: record.sender,
                receiver: record.receiver,
            }),
            Some(ItemKind::Query) => CatalogItem::Query(QueryItem {
                base: record.base,
                subject: record.subject,
                producer: record.producer,
                consumers: record.consumers,
                responder: record.responder,
            }),
            other => CatalogItem::Unclassified(UnclassifiedItem {
                base: record.base,
                label: other.map(|kind| kind.as_str().to_string()),
                subject: record.subject,
                producer: record.producer,
                consumers: record.consumers,
            }),
        }
    }

    pub fn base(&self) -> &ItemBase {
        match self {
            CatalogItem::Event(item) => &item.base,
            CatalogItem::Command(item) => &item.base,
            CatalogItem::Query(item) => &item.base,
            CatalogItem::Unclassified(item) => &item.base,
        }
    }

    pub fn id(&self) -> Option<&ItemId> {
        self.base().id.as_ref()
    }

    /// Declared kind, or `None` when the entry has no `kind` at all.
    pub fn declared_kind(&self) -> Option<ItemKind> {
        match self {
            CatalogItem::Event(_) => Some(ItemKind::Event),
            CatalogItem::Command(_) => Some(ItemKind::Command),
            CatalogItem::Query(_) => Some(ItemKind::Query),
            CatalogItem::Unclassified(item) => item.label.as_deref().map(ItemKind::from_label),
        }
    }

    /// Kind label used for counting; `unknown` when absent.
    pub fn kind_label(&self) -> &str {
        match self {
            CatalogItem::Event(_) => "event",
            CatalogItem::Command(_) => "command",
            CatalogItem::Query(_) => "query",
            CatalogItem::Unclassified(item) => item.label.as_deref().unwrap_or("unknown"),
        }
    }

    /// Declared subject, whatever the kind.
    pub fn subject(&self) -> Option<&str> {
        match self {
            CatalogItem::Event(item) => item.subject.as_deref(),
            CatalogItem::Command(item) => item.subject.as_deref(),
            CatalogItem::Query(item) => item.subject.as_deref(),
            CatalogItem::Unclassified(item) => item.subject.as_deref(),
        }
    }

    /// Subject as a message channel: events and commands only. Uniqueness
    /// and drift checks work on this one.
    pub fn messaging_subject(&self) -> Option<&str> {
        match self {
            CatalogItem::Event(_) | CatalogItem::Command(_) => self.subject(),
            _ => None,
        }
    }

    pub fn producer(&self) -> Option<&ServiceId> {
        match self {
            CatalogItem::Event(item) => item.producer.as_ref(),
            CatalogItem::Command(item) => item.producer.as_ref(),
            CatalogItem::Query(item) => item.producer.as_ref(),
            CatalogItem::Unclassified(item) => item.producer.as_ref(),
        }
    }

    pub fn consumers(&self) -> &[ServiceId] {
        match self {
            CatalogItem::Event(item) => &item.consumers,
            CatalogItem::Command(item) => &item.consumers,
            CatalogItem::Query(item) => &item.consumers,
            CatalogItem::Unclassified(item) => &item.consumers,
        }
    }

    pub fn sender(&self) -> Option<&ServiceId> {
        match self {
            CatalogItem::Command(item) => item.sender.as_ref(),
            _ => None,
        }
    }

    pub fn receiver(&self) -> Option<&ServiceId> {
        match self {
            CatalogItem::Command(item) => item.receiver.as_ref(),
            _ => None,
        }
    }

    pub fn responder(&self) -> Option<&ServiceId> {
        match self {
            CatalogItem::Query(item) => item.responder.as_ref(),
            _ => None,
        }
    }

    /// Originating service: producer, then sender, then responder.
    pub fn origin(&self) -> Option<&ServiceId> {
        self.producer()
            .or_else(|| self.sender())
            .or_else(|| self.responder())
    }

    /// Every service reference in a fixed order: producer, sender, receiver,
    /// responder, then consumers as listed.
    pub fn service_references(&self) -> Vec<(Role, &ServiceId)> {
        let mut refs = Vec::new();
        if let Some(svc) = self.producer() {
            refs.push((Role::Producer, svc));
        }
        if let Some(svc) = self.sender() {
            refs.push((Role::Sender, svc));
        }
        if let Some(svc) = self.receiver() {
            refs.push((Role::Receiver, svc));
        }
        if let Some(svc) = self.responder() {
            refs.push((Role::Responder, svc));
        }
        refs.extend(self.consumers().iter().map(|svc| (Role::Consumer, svc)));
        refs
    }

    pub fn is_deprecated(&self) -> bool {
        self.base().status.as_deref() == Some("deprecated")
    }
}

/// Text form of a YAML scalar; blank strings and non-scalars yield `None`.
pub(crate) fn scalar_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Tagged(tagged) => return scalar_text(&tagged.value),
        _ => return None,
    };
    if text.is_empty() { None } else { Some(text) }
}

/// A service reference is either `{service: name}` or a bare name.
fn service_ref_text(value: &Value) -> Option<String> {
    match value {
        Value::Mapping(map) => map.get("service").and_then(scalar_text),
        other => scalar_text(other),
    }
}

fn opt_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(scalar_text(&value))
}

fn opt_service_id<'de, D>(deserializer: D) -> Result<Option<ServiceId>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(opt_text(deserializer)?.map(ServiceId))
}

fn opt_item_id<'de, D>(deserializer: D) -> Result<Option<ItemId>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(opt_text(deserializer)?.map(ItemId))
}

fn text_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Sequence(items) => items.iter().filter_map(scalar_text).collect(),
        other => scalar_text(&other).into_iter().collect(),
    })
}

fn opt_service_ref<'de, D>(deserializer: D) -> Result<Option<ServiceId>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(service_ref_text(&value).map(ServiceId))
}

fn service_ref_list<'de, D>(deserializer: D) -> Result<Vec<ServiceId>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Sequence(items) => items
            .iter()
            .filter_map(service_ref_text)
            .map(ServiceId)
            .collect(),
        _ => Vec::new(),
    })
}

fn lenient<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = Value::deserialize(deserializer)?;
    match value {
        Value::Mapping(_) => serde_yaml::from_value(value).map_err(D::Error::custom),
        _ => Ok(T::default()),
    }
}

fn lenient_opt<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    match value {
        Value::Mapping(_) => serde_yaml::from_value(value)
            .map(Some)
            .map_err(D::Error::custom),
        _ => Ok(None),
    }
}

fn lenient_seq<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    let Value::Sequence(items) = value else {
        return Ok(Vec::new());
    };
    items
        .into_iter()
        .filter(Value::is_mapping)
        .map(|item| serde_yaml::from_value(item).map_err(D::Error::custom))
        .collect()
}
