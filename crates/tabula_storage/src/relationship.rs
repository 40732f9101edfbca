//! Relationship indices for pair ids.
//!
//! Every pair `(relation, object)` an entity holds is mirrored here as an
//! edge `source -relation-> object`. Bidirectional indices allow traversal
//! in both directions, and edges keep the order they were attached in.

use std::collections::{HashMap, HashSet};

use tabula_foundation::EntityId;

use crate::schema::{OnDelete, RelationPolicy};

/// Stores relationship edges between entities.
///
/// Maintains bidirectional indices for efficient traversal:
/// - Forward: source -> (relation, object) in attach order
/// - Reverse: object -> (relation, source) in attach order
#[derive(Clone, Debug, Default)]
pub struct RelationStore {
    policies: HashMap<EntityId, RelationPolicy>,
    forward: HashMap<EntityId, Vec<(EntityId, EntityId)>>,
    reverse: HashMap<EntityId, Vec<(EntityId, EntityId)>>,
}

impl RelationStore {
    /// Creates a store with the built-in relation policies.
    #[must_use]
    pub fn new() -> Self {
        let mut store = Self::default();
        store
            .policies
            .insert(EntityId::CHILD_OF, RelationPolicy::hierarchy());
        store.policies.insert(EntityId::IS_A, RelationPolicy::new());
        store
    }

    /// Sets the policy of a relation.
    pub fn set_policy(&mut self, relation: EntityId, policy: RelationPolicy) {
        self.policies.insert(relation, policy);
    }

    /// Policy of a relation; the default policy if none was set.
    #[must_use]
    pub fn policy(&self, relation: EntityId) -> RelationPolicy {
        self.policies.get(&relation).copied().unwrap_or_default()
    }

    /// Records an edge. Linking an existing edge is a no-op.
    pub fn link(&mut self, source: EntityId, relation: EntityId, object: EntityId) {
        if self.has_edge(source, relation, object) {
            return;
        }
        self.forward
            .entry(source)
            .or_default()
            .push((relation, object));
        self.reverse
            .entry(object)
            .or_default()
            .push((relation, source));
    }

    /// Removes an edge. Unlinking a non-existent edge is a no-op.
    pub fn unlink(&mut self, source: EntityId, relation: EntityId, object: EntityId) {
        if let Some(edges) = self.forward.get_mut(&source) {
            edges.retain(|&edge| edge != (relation, object));
            if edges.is_empty() {
                self.forward.remove(&source);
            }
        }
        if let Some(edges) = self.reverse.get_mut(&object) {
            edges.retain(|&edge| edge != (relation, source));
            if edges.is_empty() {
                self.reverse.remove(&object);
            }
        }
    }

    /// Objects of `relation` on `source` (forward traversal), in attach order.
    pub fn targets(
        &self,
        source: EntityId,
        relation: EntityId,
    ) -> impl Iterator<Item = EntityId> + '_ {
        self.forward
            .get(&source)
            .into_iter()
            .flatten()
            .filter(move |(r, _)| *r == relation)
            .map(|(_, object)| *object)
    }

    /// Sources holding `(relation, object)` (reverse traversal), in attach
    /// order.
    pub fn sources(
        &self,
        object: EntityId,
        relation: EntityId,
    ) -> impl Iterator<Item = EntityId> + '_ {
        self.reverse
            .get(&object)
            .into_iter()
            .flatten()
            .filter(move |(r, _)| *r == relation)
            .map(|(_, source)| *source)
    }

    /// Checks if a specific edge exists.
    #[must_use]
    pub fn has_edge(&self, source: EntityId, relation: EntityId, object: EntityId) -> bool {
        self.forward
            .get(&source)
            .is_some_and(|edges| edges.contains(&(relation, object)))
    }

    /// Sources that must be destroyed along with `object`, most recently
    /// attached first.
    #[must_use]
    pub fn cascade_sources(&self, object: EntityId) -> Vec<EntityId> {
        let mut seen = HashSet::new();
        self.reverse
            .get(&object)
            .into_iter()
            .flatten()
            .rev()
            .filter(|(relation, _)| self.policy(*relation).on_delete == OnDelete::Cascade)
            .map(|(_, source)| *source)
            .filter(|source| seen.insert(*source))
            .collect()
    }

    /// Forgets every edge into or out of a destroyed entity, and its policy.
    pub fn on_entity_destroyed(&mut self, entity: EntityId) {
        if let Some(edges) = self.forward.remove(&entity) {
            for (relation, object) in edges {
                if let Some(reverse) = self.reverse.get_mut(&object) {
                    reverse.retain(|&edge| edge != (relation, entity));
                }
            }
        }
        if let Some(edges) = self.reverse.remove(&entity) {
            for (relation, source) in edges {
                if let Some(forward) = self.forward.get_mut(&source) {
                    forward.retain(|&edge| edge != (relation, entity));
                }
            }
        }
        self.policies.remove(&entity);
    }
}
