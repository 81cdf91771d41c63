//! Loads the two catalogs into typed, in-memory form.
//!
//! A parse failure in either file is fatal for the run. Inside a file that
//! parses, the loader is forgiving: a non-mapping root or a missing
//! `services` / `catalog.{events,commands,queries}` key reads as an empty
//! list, and non-mapping entries inside those lists are skipped.

use crate::catalog::identity::{ItemId, ServiceId};
use crate::catalog::model::{CatalogItem, Service};
use serde_yaml::Value;
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Keys under `catalog:` in the order items are read.
pub const ITEM_SECTIONS: [&str; 3] = ["events", "commands", "queries"];

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("missing required file {}", .0.display())]
    Missing(PathBuf),

    #[error("unable to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("{}: entry {position} of '{section}' is malformed: {source}", .path.display())]
    Entry {
        path: PathBuf,
        section: String,
        position: usize,
        #[source]
        source: serde_yaml::Error,
    },
}

#[derive(Debug, Default)]
/// Services and catalog items for one invocation, in file order.
pub struct CatalogStore {
    services: Vec<Service>,
    items: Vec<CatalogItem>,
    service_index: BTreeMap<ServiceId, usize>,
}

impl CatalogStore {
    /// Read and parse both catalogs from disk.
    pub fn load(service_catalog: &Path, event_catalog: &Path) -> Result<Self, CatalogError> {
        let service_doc = read_yaml(service_catalog)?;
        let event_doc = read_yaml(event_catalog)?;
        Self::from_documents(service_catalog, service_doc, event_catalog, event_doc)
    }

    /// Parse catalogs already held in memory. Paths are only used in errors.
    pub fn from_yaml_str(services_yaml: &str, events_yaml: &str) -> Result<Self, CatalogError> {
        let service_path = PathBuf::from("<service catalog>");
        let event_path = PathBuf::from("<event catalog>");
        let service_doc = parse_yaml(&service_path, services_yaml)?;
        let event_doc = parse_yaml(&event_path, events_yaml)?;
        Self::from_documents(&service_path, service_doc, &event_path, event_doc)
    }

    /// Read only the event catalog; the store has no services. Enough for
    /// subject lookups.
    pub fn load_items(event_catalog: &Path) -> Result<Self, CatalogError> {
        let event_doc = read_yaml(event_catalog)?;
        Ok(Self::new(Vec::new(), parse_items(event_catalog, event_doc)?))
    }

    fn from_documents(
        service_path: &Path,
        service_doc: Value,
        event_path: &Path,
        event_doc: Value,
    ) -> Result<Self, CatalogError> {
        let services = parse_services(service_path, service_doc)?;
        let items = parse_items(event_path, event_doc)?;
        Ok(Self::new(services, items))
    }

    pub fn new(services: Vec<Service>, items: Vec<CatalogItem>) -> Self {
        let mut service_index = BTreeMap::new();
        for (idx, svc) in services.iter().enumerate() {
            if let Some(id) = &svc.id {
                // First declaration wins lookups.
                service_index.entry(id.clone()).or_insert(idx);
            }
        }
        Self {
            services,
            items,
            service_index,
        }
    }

    pub fn services(&self) -> &[Service] {
        &self.services
    }

    pub fn items(&self) -> &[CatalogItem] {
        &self.items
    }

    /// Resolve a service by id.
    pub fn service(&self, id: &ServiceId) -> Option<&Service> {
        self.service_index.get(id).map(|idx| &self.services[*idx])
    }

    /// First item carrying `id`, if any.
    pub fn find_item(&self, id: &ItemId) -> Option<&CatalogItem> {
        self.items.iter().find(|item| item.id() == Some(id))
    }

    /// Known service ids in stable order.
    pub fn service_ids(&self) -> impl Iterator<Item = &ServiceId> {
        self.service_index.keys()
    }
}

fn parse_services(path: &Path, doc: Value) -> Result<Vec<Service>, CatalogError> {
    mapping_entries(doc.get("services"))
        .into_iter()
        .map(|(position, entry)| {
            Service::from_yaml(entry).map_err(|source| CatalogError::Entry {
                path: path.to_path_buf(),
                section: "services".to_string(),
                position,
                source,
            })
        })
        .collect()
}

fn parse_items(path: &Path, doc: Value) -> Result<Vec<CatalogItem>, CatalogError> {
    let mut items = Vec::new();
    let catalog_root = doc.get("catalog");
    for section in ITEM_SECTIONS {
        let list = catalog_root.and_then(|root| root.get(section));
        for (position, entry) in mapping_entries(list) {
            let item = CatalogItem::from_yaml(entry).map_err(|source| CatalogError::Entry {
                path: path.to_path_buf(),
                section: format!("catalog.{section}"),
                position,
                source,
            })?;
            items.push(item);
        }
    }
    Ok(items)
}

fn read_yaml(path: &Path) -> Result<Value, CatalogError> {
    if !path.is_file() {
        return Err(CatalogError::Missing(path.to_path_buf()));
    }
    let text = fs::read_to_string(path).map_err(|source| CatalogError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_yaml(path, &text)
}

fn parse_yaml(path: &Path, text: &str) -> Result<Value, CatalogError> {
    // An empty document reads as an empty catalog.
    if text.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_yaml::from_str::<Value>(text).map_err(|source| CatalogError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Mapping entries of a YAML list with their position; anything else is empty.
fn mapping_entries(list: Option<&Value>) -> Vec<(usize, Value)> {
    let Some(Value::Sequence(entries)) = list else {
        return Vec::new();
    };
    entries
        .iter()
        .enumerate()
        .filter(|(_, entry)| entry.is_mapping())
        .map(|(position, entry)| (position, entry.clone()))
        .collect()
}
