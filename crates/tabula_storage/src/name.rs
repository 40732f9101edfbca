//! Scoped entity names.
//!
//! A name is unique among the children of one parent. Entities without a
//! parent live in the root scope, keyed by `None`.

use std::collections::HashMap;

use tabula_foundation::{EntityId, Error, Result};

/// Two-way map between entities and their names within a scope.
#[derive(Clone, Debug, Default)]
pub struct NameIndex {
    scopes: HashMap<Option<EntityId>, HashMap<String, EntityId>>,
    names: HashMap<EntityId, (Option<EntityId>, String)>,
}

impl NameIndex {
    /// Creates an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks up a name in a scope.
    #[must_use]
    pub fn lookup(&self, scope: Option<EntityId>, name: &str) -> Option<EntityId> {
        self.scopes.get(&scope)?.get(name).copied()
    }

    /// Name of an entity, if it has one.
    #[must_use]
    pub fn name(&self, entity: EntityId) -> Option<&str> {
        self.names.get(&entity).map(|(_, name)| name.as_str())
    }

    /// Checks that `entity` may take `name` in `scope`.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateName` if another entity holds the name there.
    pub fn check(&self, entity: EntityId, scope: Option<EntityId>, name: &str) -> Result<()> {
        match self.lookup(scope, name) {
            Some(holder) if holder != entity => Err(Error::duplicate_name(name)),
            _ => Ok(()),
        }
    }

    /// Names `entity` in `scope`, replacing any earlier name it had.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateName` if another entity holds the name there.
    pub fn bind(&mut self, entity: EntityId, scope: Option<EntityId>, name: &str) -> Result<()> {
        self.check(entity, scope, name)?;
        self.unbind(entity);
        self.scopes
            .entry(scope)
            .or_default()
            .insert(name.to_string(), entity);
        self.names.insert(entity, (scope, name.to_string()));
        Ok(())
    }

    /// Checks that a named entity could move to `scope`. Unnamed entities
    /// always can.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateName` if the entity's name is taken in `scope`.
    pub fn check_rescope(&self, entity: EntityId, scope: Option<EntityId>) -> Result<()> {
        match self.names.get(&entity) {
            Some((_, name)) => self.check(entity, scope, name),
            None => Ok(()),
        }
    }

    /// Moves a named entity's binding to `scope`.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateName` if the entity's name is taken in `scope`.
    pub fn rescope(&mut self, entity: EntityId, scope: Option<EntityId>) -> Result<()> {
        let Some((current, name)) = self.names.get(&entity).cloned() else {
            return Ok(());
        };
        if current == scope {
            return Ok(());
        }
        self.bind(entity, scope, &name)
    }

    /// Removes the entity's name.
    pub fn unbind(&mut self, entity: EntityId) {
        if let Some((scope, name)) = self.names.remove(&entity) {
            if let Some(names) = self.scopes.get_mut(&scope) {
                names.remove(&name);
                if names.is_empty() {
                    self.scopes.remove(&scope);
                }
            }
        }
    }

    /// Number of named entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Returns true if no entity is named.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
