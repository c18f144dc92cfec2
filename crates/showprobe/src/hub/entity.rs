use std::collections::BTreeMap;
use std::io::Write;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;

use super::Error;
use super::Result;

/// A single entity state as returned by `/api/states`.
///
/// Only the fields this tool needs are typed. Everything else the hub sends
/// (`last_changed`, `context`, ...) is kept verbatim in `extra`, so the record
/// prints back exactly as it arrived, nulls and missing fields included.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    /// Entity ID (e.g., "light.house_light_1")
    pub entity_id: String,

    /// Current state string (e.g., "on", "21.5", "unavailable")
    pub state: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attributes: Option<Map<String, Value>>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Entity {
    pub fn domain(&self) -> Result<&str> {
        domain_of(&self.entity_id)
    }

    pub fn attribute(&self, key: &str) -> Option<&Value> {
        self.attributes.as_ref()?.get(key)
    }

    /// ISO 8601 timestamp of the last state change
    pub fn last_changed(&self) -> Option<&str> {
        self.extra.get("last_changed")?.as_str()
    }

    /// ISO 8601 timestamp of the last state or attribute update
    pub fn last_updated(&self) -> Option<&str> {
        self.extra.get("last_updated")?.as_str()
    }
}

/// Split the domain off an entity id.
///
/// `light.kitchen` -> `light`. Both halves must be non-empty.
pub fn domain_of(entity_id: &str) -> Result<&str> {
    match entity_id.split_once('.') {
        Some((domain, object_id)) if !domain.is_empty() && !object_id.is_empty() => Ok(domain),
        _ => Err(Error::InvalidEntityId {
            entity_id: entity_id.to_string(),
            reason: "expected <domain>.<object_id>".to_string(),
        }),
    }
}

/// Entities grouped by domain.
///
/// Domains are ordered by name; within a domain entities keep the order the
/// hub returned them in.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct EntityGroups(BTreeMap<String, Vec<Entity>>);

impl EntityGroups {
    pub fn from_entities(entities: Vec<Entity>) -> Result<Self> {
        let mut groups: BTreeMap<String, Vec<Entity>> = BTreeMap::new();
        for entity in entities {
            let domain = entity.domain()?.to_string();
            groups.entry(domain).or_default().push(entity);
        }
        Ok(Self(groups))
    }

    pub fn get(&self, domain: &str) -> Option<&[Entity]> {
        self.0.get(domain).map(Vec::as_slice)
    }

    pub fn domains(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[Entity])> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Total number of entities across all domains
    pub fn entity_count(&self) -> usize {
        self.0.values().map(Vec::len).sum()
    }

    /// Write the groups as pretty-printed JSON followed by a newline
    pub fn write_json(&self, mut out: impl Write) -> std::io::Result<()> {
        serde_json::to_writer_pretty(&mut out, self)?;
        writeln!(out)
    }

    /// Write one `domain: entity_id = state` line per entity
    pub fn write_text(&self, mut out: impl Write) -> std::io::Result<()> {
        for (domain, entities) in self.iter() {
            for entity in entities {
                writeln!(out, "{}: {} = {}", domain, entity.entity_id, entity.state)?;
            }
        }
        Ok(())
    }
}
