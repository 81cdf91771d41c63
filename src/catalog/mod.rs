//! Service and event catalog wiring.
//!
//! The catalogs under `catalogs/` are the source of truth for which services
//! exist and which events, commands, and queries they exchange. Types here
//! mirror the YAML shape; `CatalogStore` loads both files for one run and
//! offers lookups by id.

pub mod identity;
pub mod model;
pub mod store;

pub use identity::{ItemId, ItemKind, ServiceId};
pub use model::{
    CatalogItem, CommandItem, EventItem, ItemBase, QueryItem, Role, Service, UnclassifiedItem,
};
pub use store::{CatalogError, CatalogStore, ITEM_SECTIONS};
