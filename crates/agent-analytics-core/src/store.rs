//! In-memory entity store
//!
//! Entities are grouped by kind, then by id. Storing validates the entity
//! and replaces any previous entity of the same kind and id.

use std::collections::HashMap;

use crate::elements::Record;
use crate::entity::{Entity, EntityKind};
use crate::error::ModelResult;

#[derive(Debug, Default, Clone)]
pub struct InMemoryStore {
    entities: HashMap<EntityKind, HashMap<String, Entity>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate and store an entity, returning the one it replaced
    pub fn store(&mut self, entity: impl Into<Entity>) -> ModelResult<Option<Entity>> {
        let entity = entity.into();
        entity.validate()?;

        let kind = entity.kind();
        let id = entity.id().to_string();
        tracing::debug!(kind = %kind, id = %id, "Storing entity");

        Ok(self.entities.entry(kind).or_default().insert(id, entity))
    }

    /// Look up an entity by id across all kinds
    pub fn get_by_id(&self, id: &str) -> Option<&Entity> {
        self.entities.values().find_map(|by_id| by_id.get(id))
    }

    /// Look up an entity by kind and id
    pub fn get(&self, kind: EntityKind, id: &str) -> Option<&Entity> {
        self.entities.get(&kind).and_then(|by_id| by_id.get(id))
    }

    /// Look up an entity as a concrete type
    pub fn get_as<T: Record>(&self, id: &str) -> Option<&T> {
        self.get(T::KIND, id).and_then(T::from_entity)
    }

    /// Entities whose `owner_id` is `parent_id`
    pub fn get_children(&self, parent_id: &str) -> Vec<&Entity> {
        let mut children: Vec<&Entity> = self
            .iter()
            .filter(|entity| entity.owner_id() == Some(parent_id))
            .collect();
        children.sort_by(|a, b| (a.kind(), a.id()).cmp(&(b.kind(), b.id())));
        children
    }

    /// Remove an entity by id, whatever its kind
    pub fn delete(&mut self, id: &str) -> Option<Entity> {
        let removed = self
            .entities
            .values_mut()
            .find_map(|by_id| by_id.remove(id));
        if removed.is_some() {
            tracing::debug!(id = %id, "Deleted entity");
        }
        removed
    }

    /// All entities of a kind, ordered by id
    pub fn get_all(&self, kind: EntityKind) -> Vec<&Entity> {
        let mut all: Vec<&Entity> = self
            .entities
            .get(&kind)
            .map(|by_id| by_id.values().collect())
            .unwrap_or_default();
        all.sort_by(|a, b| a.id().cmp(b.id()));
        all
    }

    /// Entities of a kind whose serialized fields equal every query value
    pub fn search(&self, kind: EntityKind, query: &serde_json::Map<String, serde_json::Value>) -> Vec<&Entity> {
        self.get_all(kind)
            .into_iter()
            .filter(|entity| match serde_json::to_value(entity) {
                Ok(serde_json::Value::Object(dump)) => query
                    .iter()
                    .all(|(key, expected)| dump.get(key) == Some(expected)),
                _ => false,
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entities.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values().flat_map(|by_id| by_id.values())
    }
}
