use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Stable identifier for a service in the service catalog (e.g., `svc-billing`).
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ServiceId(pub String);

/// Identifier for an event, command, or query entry.
///
/// Ids are expected to be unique across every kind in the event catalog;
/// the validator reports duplicates as errors because they break addressing
/// from indexes and reports.
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(pub String);

impl fmt::Display for ServiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Contract kind declared by a catalog item.
///
/// Known variants drive kind-specific relations; `Other` keeps labels such as
/// `notification` intact so they still reach the index with their own type.
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum ItemKind {
    Event,
    Command,
    Query,
    Other(String),
}

impl Serialize for ItemKind {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ItemKind {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        Ok(Self::from_label(&value))
    }
}

impl ItemKind {
    pub fn as_str(&self) -> &str {
        match self {
            ItemKind::Event => "event",
            ItemKind::Command => "command",
            ItemKind::Query => "query",
            ItemKind::Other(value) => value.as_str(),
        }
    }

    pub fn from_label(value: &str) -> Self {
        match value.trim() {
            "event" => ItemKind::Event,
            "command" => ItemKind::Command,
            "query" => ItemKind::Query,
            other => ItemKind::Other(other.to_string()),
        }
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_round_trips_known_and_unknown() {
        let known = ItemKind::Command;
        let json = serde_json::to_string(&known).unwrap();
        assert_eq!(json, "\"command\"");
        let back: ItemKind = serde_json::from_str(&json).unwrap();
        assert_eq!(back, known);

        let parsed: ItemKind = serde_json::from_str("\"notification\"").unwrap();
        assert_eq!(parsed, ItemKind::Other("notification".to_string()));
        assert_eq!(serde_json::to_string(&parsed).unwrap(), "\"notification\"");
    }

    #[test]
    fn ids_serialize_transparently() {
        let id = ItemId("evt.invoice.created".to_string());
        assert_eq!(
            serde_json::to_string(&id).unwrap(),
            "\"evt.invoice.created\""
        );
        let svc: ServiceId = serde_json::from_str("\"billing\"").unwrap();
        assert_eq!(svc.to_string(), "billing");
    }
}
