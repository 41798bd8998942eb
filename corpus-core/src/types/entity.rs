use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Open-set type tag for a canonical entity. `Unknown` is the fallback the
/// type heuristic in `corpus-graph::resolve` assigns when no rule matches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityType {
    Component,
    Function,
    Config,
    File,
    Person,
    Unknown,
}

/// A canonical real-world referent, shared by any number of claims across
/// documents. Entities are never owned by a single document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entity {
    pub id: Uuid,
    pub canonical_name: String,
    pub entity_type: EntityType,
    pub aliases: BTreeSet<String>,
    pub attributes: BTreeMap<String, Value>,
    pub embedding: Option<Vec<f32>>,
}

impl Entity {
    pub fn new(canonical_name: impl Into<String>, entity_type: EntityType) -> Self {
        Entity {
            id: Uuid::new_v4(),
            canonical_name: canonical_name.into(),
            entity_type,
            aliases: BTreeSet::new(),
            attributes: BTreeMap::new(),
            embedding: None,
        }
    }

    pub fn matches_name(&self, text: &str) -> bool {
        self.canonical_name.eq_ignore_ascii_case(text)
    }

    pub fn matches_alias(&self, text: &str) -> bool {
        let folded = text.to_lowercase();
        self.aliases.iter().any(|a| a.to_lowercase() == folded)
    }

    /// Adds `text` as an alias unless it already equals the canonical name
    /// or is already present, case-insensitively.
    pub fn add_alias_if_new(&mut self, text: &str) {
        if self.matches_name(text) || self.matches_alias(text) {
            return;
        }
        self.aliases.insert(text.to_string());
    }
}
