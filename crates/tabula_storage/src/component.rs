//! Component registration.
//!
//! A component is an entity with a registered [`Layout`]. The registry maps
//! names to component entities and answers which ids carry bytes.

use std::collections::HashMap;

use tabula_foundation::{EntityId, Error, ErrorKind, Id, Layout, Result};

use crate::schema::ComponentInfo;

/// Registered components by entity and by name.
#[derive(Clone, Debug, Default)]
pub struct ComponentRegistry {
    info: HashMap<EntityId, ComponentInfo>,
    by_name: HashMap<String, EntityId>,
}

impl ComponentRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Checks a registration request against an earlier one with the same
    /// name.
    ///
    /// Returns the existing entity when the layouts agree and `None` when the
    /// name is new.
    ///
    /// # Errors
    ///
    /// Returns `ComponentRedefinition` when the name is taken with another
    /// layout.
    pub fn check(&self, name: &str, layout: Layout) -> Result<Option<EntityId>> {
        let Some(&entity) = self.by_name.get(name) else {
            return Ok(None);
        };
        let existing = self.info[&entity].layout;
        if existing != layout {
            return Err(Error::new(ErrorKind::ComponentRedefinition {
                name: name.to_string(),
                existing_size: existing.size(),
                existing_align: existing.align(),
                size: layout.size(),
                align: layout.align(),
            }));
        }
        Ok(Some(entity))
    }

    /// Records `entity` as a component.
    pub fn insert(&mut self, entity: EntityId, info: ComponentInfo) {
        self.by_name.insert(info.name.clone(), entity);
        self.info.insert(entity, info);
    }

    /// Drops the registration of a destroyed component entity.
    pub fn remove(&mut self, entity: EntityId) -> Option<ComponentInfo> {
        let info = self.info.remove(&entity)?;
        if self.by_name.get(&info.name) == Some(&entity) {
            self.by_name.remove(&info.name);
        }
        Some(info)
    }

    /// Returns the registration of a component entity.
    #[must_use]
    pub fn get(&self, entity: EntityId) -> Option<&ComponentInfo> {
        self.info.get(&entity)
    }

    /// Looks up a component by registration name.
    #[must_use]
    pub fn by_name(&self, name: &str) -> Option<EntityId> {
        self.by_name.get(name).copied()
    }

    /// Returns true if `entity` is a registered component (tag or sized).
    #[must_use]
    pub fn contains(&self, entity: EntityId) -> bool {
        self.info.contains_key(&entity)
    }

    /// Returns the column layout of an id, or `None` for ids that carry no
    /// bytes.
    ///
    /// A plain id carries bytes when it is a sized component. A pair takes the
    /// relation's layout when the relation is sized, otherwise the object's.
    /// The built-in relations never carry bytes.
    #[must_use]
    pub fn data_layout(&self, id: Id) -> Option<Layout> {
        match id {
            Id::Entity(entity) => self.sized(entity),
            Id::Pair(relation, object) => {
                if relation.is_builtin() {
                    return None;
                }
                self.sized(relation).or_else(|| self.sized(object))
            }
        }
    }

    fn sized(&self, entity: EntityId) -> Option<Layout> {
        self.info
            .get(&entity)
            .map(|info| info.layout)
            .filter(|layout| !layout.is_tag())
    }

    /// Number of registered components.
    #[must_use]
    pub fn len(&self) -> usize {
        self.info.len()
    }

    /// Returns true if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.info.is_empty()
    }
}
