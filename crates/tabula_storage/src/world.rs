//! The world: owner of every store and the entry point for all operations.
//!
//! A `World` ties together entity liveness, component registration, table
//! storage, relationship indices, and names. Every mutation goes through it
//! so the stores never disagree about where an entity lives.

use std::collections::HashSet;

use tracing::{debug, trace};

use tabula_foundation::{EntityId, Error, ErrorContext, ErrorKind, Id, Layout, Result};

use crate::component::ComponentRegistry;
use crate::config::WorldConfig;
use crate::entity::{EntityStore, Location};
use crate::event::{EventLog, StorageEvent, Subscription};
use crate::lock::{IterationLock, IterationToken};
use crate::name::NameIndex;
use crate::relationship::RelationStore;
use crate::schema::{ComponentInfo, RelationPolicy};
use crate::table::{Column, Table, TableId, TableStore, Type};

/// Splits a pair id into `(relation, object)`.
fn pair_parts(id: Id) -> Option<(EntityId, EntityId)> {
    match id {
        Id::Pair(relation, object) => Some((relation, object)),
        Id::Entity(_) => None,
    }
}

/// In-memory ECS world.
#[derive(Debug)]
pub struct World {
    config: WorldConfig,
    entities: EntityStore,
    components: ComponentRegistry,
    tables: TableStore,
    relations: RelationStore,
    names: NameIndex,
    events: EventLog,
    lock: IterationLock,
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

impl World {
    // =========================================================================
    // Construction
    // =========================================================================

    /// Creates a world with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(WorldConfig::default())
    }

    /// Creates a world with the given configuration.
    ///
    /// The built-in `ChildOf`, `IsA`, and `Prefab` entities are created first,
    /// registered as tags, and named in the root scope.
    #[must_use]
    pub fn with_config(config: WorldConfig) -> Self {
        let mut world = Self {
            entities: EntityStore::with_capacity(config.entity_capacity),
            components: ComponentRegistry::new(),
            tables: TableStore::new(config.table_capacity),
            relations: RelationStore::new(),
            names: NameIndex::new(),
            events: EventLog::new(),
            lock: IterationLock::default(),
            config,
        };

        for (expected, name) in [
            (EntityId::CHILD_OF, "ChildOf"),
            (EntityId::IS_A, "IsA"),
            (EntityId::PREFAB, "Prefab"),
        ] {
            let entity = world.create();
            debug_assert_eq!(entity, expected);
            let bound = world.names.bind(entity, None, name);
            debug_assert!(bound.is_ok(), "built-in name {name} already bound");
            world
                .components
                .insert(entity, ComponentInfo::new(name, Layout::TAG));
        }

        world
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    // =========================================================================
    // Iteration guard
    // =========================================================================

    /// Hands out a token that blocks structural changes until dropped.
    #[must_use]
    pub fn begin_iteration(&self) -> IterationToken {
        self.lock.acquire()
    }

    /// Returns true while any iteration token is alive.
    #[must_use]
    pub fn is_iterating(&self) -> bool {
        self.lock.holders() > 0
    }

    /// Returns true if `token` came from this world.
    #[must_use]
    pub fn issued(&self, token: &IterationToken) -> bool {
        self.lock.issued(token)
    }

    fn ensure_structural(&self, operation: &'static str) -> Result<()> {
        if self.is_iterating() {
            return Err(Error::concurrent_mutation(operation)
                .with_context(ErrorContext::new().with_operation(operation)));
        }
        Ok(())
    }

    // =========================================================================
    // Entities
    // =========================================================================

    /// Creates an entity with the empty type.
    pub fn create(&mut self) -> EntityId {
        self.spawn_in(TableId::ROOT, &[])
    }

    /// Creates an entity named `name` in the root scope.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateName` if the root scope already holds `name`.
    pub fn create_named(&mut self, name: &str) -> Result<EntityId> {
        if self.names.lookup(None, name).is_some() {
            return Err(Error::duplicate_name(name));
        }
        let entity = self.create();
        self.names.bind(entity, None, name)?;
        Ok(entity)
    }

    /// Returns the root-scope entity named `name`, creating it if needed.
    ///
    /// # Errors
    ///
    /// Propagates failures of [`World::create_named`].
    pub fn entity_named(&mut self, name: &str) -> Result<EntityId> {
        match self.names.lookup(None, name) {
            Some(entity) => Ok(entity),
            None => self.create_named(name),
        }
    }

    /// Creates an entity directly in the table of `[id]`.
    ///
    /// # Errors
    ///
    /// Returns `StaleEntity` if `id` mentions a dead entity.
    pub fn create_with(&mut self, id: impl Into<Id>) -> Result<EntityId> {
        let id = id.into();
        self.validate_id(id)?;
        let table = self.table_for(Type::from_ids(vec![id]));
        Ok(self.spawn_in(table, &[]))
    }

    /// Creates a prefab: an entity tagged `Prefab`, optionally named.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateName` if the root scope already holds `name`.
    pub fn prefab(&mut self, name: Option<&str>) -> Result<EntityId> {
        if let Some(name) = name {
            if self.names.lookup(None, name).is_some() {
                return Err(Error::duplicate_name(name));
            }
        }
        let entity = self.create_with(EntityId::PREFAB)?;
        if let Some(name) = name {
            self.names.bind(entity, None, name)?;
        }
        Ok(entity)
    }

    /// Creates `count` entities that all have `id`, zero-initialized.
    ///
    /// # Errors
    ///
    /// Returns `StaleEntity` if `id` mentions a dead entity.
    pub fn bulk_create_with_id(&mut self, id: impl Into<Id>, count: usize) -> Result<Vec<EntityId>> {
        let zeroed: &[u8] = &[];
        self.bulk_create(count, &[(id.into(), zeroed)])
    }

    /// Creates `count` entities in one table.
    ///
    /// Each entry of `data` names an id and optionally supplies its values for
    /// all new rows back to back (`count * size` bytes). An empty slice
    /// zero-initializes the column; tags must pass an empty slice.
    ///
    /// # Errors
    ///
    /// Returns `SizeMismatch` for a wrong byte length, `StaleEntity` if an id
    /// mentions a dead entity, and `Internal` if the ids hold two pairs of an
    /// exclusive relation. Nothing is created on error.
    pub fn bulk_create(&mut self, count: usize, data: &[(Id, &[u8])]) -> Result<Vec<EntityId>> {
        let mut ids = Vec::with_capacity(data.len());
        for &(id, bytes) in data {
            self.validate_id(id)?;
            let size = self.components.data_layout(id).map_or(0, Layout::size);
            if !bytes.is_empty() && size.checked_mul(count) != Some(bytes.len()) {
                return Err(Error::size_mismatch(id, size.saturating_mul(count), bytes.len()));
            }
            if size == 0 && !bytes.is_empty() {
                return Err(Error::size_mismatch(id, 0, bytes.len()));
            }
            ids.push(id);
        }
        let ty = Type::from_ids(ids);
        self.check_exclusive(&ty)?;

        let table = self.table_for(ty);
        self.tables.at_mut(table).reserve(count);

        let mut created = Vec::with_capacity(count);
        for row in 0..count {
            let values: Vec<(Id, &[u8])> = data
                .iter()
                .filter(|(_, bytes)| !bytes.is_empty())
                .map(|&(id, bytes)| {
                    let size = bytes.len() / count;
                    (id, &bytes[row * size..(row + 1) * size])
                })
                .collect();
            created.push(self.spawn_in(table, &values));
        }
        debug!(count, %table, "bulk created entities");
        Ok(created)
    }

    /// Appends a new entity to `table` and mirrors the table's pairs.
    fn spawn_in(&mut self, table: TableId, values: &[(Id, &[u8])]) -> EntityId {
        let row = self.tables.at(table).len();
        let entity = self.entities.spawn(Location::new(table, row));
        self.tables.at_mut(table).push(entity, |id| {
            values
                .iter()
                .find(|(value_id, _)| *value_id == id)
                .map(|(_, bytes)| *bytes)
        });
        for &id in self.tables.at(table).ty().ids() {
            if let Some((relation, object)) = pair_parts(id) {
                self.relations.link(entity, relation, object);
            }
        }
        entity
    }

    /// Destroys an entity and everything that cascades from it.
    ///
    /// Sources of cascading relations (`ChildOf` by default) are destroyed
    /// first, depth-first, most recently attached first. Every surviving
    /// entity loses the ids that mention a destroyed entity. Returns the
    /// destroyed ids in destruction order; a dead id yields an empty list.
    ///
    /// # Errors
    ///
    /// Returns `ProtectedEntity` if a built-in would be destroyed and
    /// `ConcurrentStructuralMutation` while an iterator is active.
    pub fn destroy(&mut self, entity: EntityId) -> Result<Vec<EntityId>> {
        if !self.entities.exists(entity) {
            return Ok(Vec::new());
        }
        if entity.is_builtin() {
            return Err(Error::new(ErrorKind::ProtectedEntity(entity))
                .with_context(ErrorContext::new().with_operation("destroy").with_entity(entity)));
        }
        self.ensure_structural("destroy")?;

        let victims = self.cascade_order(entity);
        if let Some(&protected) = victims.iter().find(|victim| victim.is_builtin()) {
            return Err(
                Error::new(ErrorKind::ProtectedEntity(protected)).with_context(
                    ErrorContext::new()
                        .with_operation("destroy")
                        .with_entity(entity)
                        .with_frame(format!("cascade to {protected}")),
                ),
            );
        }

        let doomed: HashSet<EntityId> = victims.iter().copied().collect();
        for &victim in &victims {
            self.remove_entity(victim, &doomed)?;
        }
        if victims.len() > 1 {
            debug!(%entity, destroyed = victims.len(), "cascaded destroy");
        }
        Ok(victims)
    }

    /// Post-order walk over cascade sources, without recursion.
    fn cascade_order(&self, root: EntityId) -> Vec<EntityId> {
        let mut order = Vec::new();
        let mut seen = HashSet::from([root]);
        let mut stack = vec![(root, self.relations.cascade_sources(root), 0usize)];

        while let Some(top) = stack.last_mut() {
            let next = top.1.get(top.2).copied();
            top.2 += 1;
            match next {
                Some(source) => {
                    if seen.insert(source) {
                        let sources = self.relations.cascade_sources(source);
                        stack.push((source, sources, 0));
                    }
                }
                None => {
                    let done = top.0;
                    order.push(done);
                    stack.pop();
                }
            }
        }
        order
    }

    /// Removes one entity's row and every trace of it.
    fn remove_entity(&mut self, victim: EntityId, doomed: &HashSet<EntityId>) -> Result<()> {
        let holders: Vec<EntityId> = self
            .tables
            .iter()
            .filter(|table| !table.is_empty() && table.ty().references(victim))
            .flat_map(|table| table.entities().iter().copied())
            .filter(|holder| *holder != victim && !doomed.contains(holder))
            .collect();
        for holder in holders {
            if let Some(from) = self.entities.location(holder) {
                let ty = self
                    .tables
                    .at(from.table)
                    .ty()
                    .filtered(|id| !id.references(victim));
                let to = self.table_for(ty);
                self.move_row(holder, from, to, None);
            }
        }

        let at = self.locate(victim)?;
        if let Some(moved) = self.tables.at_mut(at.table).swap_remove(at.row) {
            self.entities.set_location(moved, at);
        }
        let was_prototype = self.is_prototype(victim);
        self.relations.on_entity_destroyed(victim);
        self.names.unbind(victim);
        self.components.remove(victim);
        self.entities.destroy(victim)?;
        if was_prototype {
            self.events.push(StorageEvent::PrototypeChanged(victim));
        }
        trace!(entity = %victim, table = %at.table, "removed entity");
        Ok(())
    }

    /// Checks if an entity is alive.
    #[must_use]
    pub fn is_alive(&self, entity: EntityId) -> bool {
        self.entities.exists(entity)
    }

    /// Validates that an entity is alive.
    ///
    /// # Errors
    ///
    /// Returns `StaleEntity` or `UnknownId` for dead ids.
    pub fn validate(&self, entity: EntityId) -> Result<()> {
        self.entities.validate(entity)
    }

    /// Number of live entities, built-ins included.
    #[must_use]
    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    /// Iterates over all live entities in index order.
    pub fn entities(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.entities.iter()
    }

    fn locate(&self, entity: EntityId) -> Result<Location> {
        self.entities.validate(entity)?;
        self.entities
            .location(entity)
            .ok_or_else(|| Error::stale_entity(entity))
    }

    fn validate_id(&self, id: Id) -> Result<()> {
        id.entities().try_for_each(|entity| self.entities.validate(entity))
    }

    // =========================================================================
    // Names and paths
    // =========================================================================

    /// Name of an entity, if it has one.
    #[must_use]
    pub fn name(&self, entity: EntityId) -> Option<&str> {
        self.names.name(entity)
    }

    /// Names an entity within its parent's scope.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateName` if a sibling holds the name, `StaleEntity` for
    /// a dead entity, and `ProtectedEntity` for built-ins.
    pub fn set_name(&mut self, entity: EntityId, name: &str) -> Result<()> {
        self.entities.validate(entity)?;
        if entity.is_builtin() {
            return Err(Error::new(ErrorKind::ProtectedEntity(entity)));
        }
        let scope = self.parent(entity);
        self.names.bind(entity, scope, name)
    }

    /// Looks up a name in the root scope.
    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<EntityId> {
        self.names.lookup(None, name)
    }

    /// Looks up a child of `parent` by name.
    #[must_use]
    pub fn lookup_child(&self, parent: EntityId, name: &str) -> Option<EntityId> {
        self.names.lookup(Some(parent), name)
    }

    /// Resolves a separator-joined path of names, starting below `root`
    /// (the root scope when `None`).
    #[must_use]
    pub fn lookup_path(&self, root: Option<EntityId>, path: &str) -> Option<EntityId> {
        let mut scope = root;
        let mut found = None;
        for segment in path.split(self.config.path_separator.as_str()) {
            let entity = self.names.lookup(scope, segment)?;
            found = Some(entity);
            scope = Some(entity);
        }
        found
    }

    /// Hierarchical path of an entity, root ancestor first.
    ///
    /// # Errors
    ///
    /// Returns `StaleEntity` for a dead entity.
    pub fn path(&self, entity: EntityId) -> Result<String> {
        self.entities.validate(entity)?;
        let mut segments = Vec::new();
        let mut current = Some(entity);
        while let Some(node) = current {
            segments.push(self.display_name(node));
            current = self.parent(node);
        }
        segments.reverse();
        Ok(segments.join(&self.config.path_separator))
    }

    /// Human readable type, e.g. `Position, (ChildOf,Sun)`.
    ///
    /// # Errors
    ///
    /// Returns `StaleEntity` for a dead entity.
    pub fn type_str(&self, entity: EntityId) -> Result<String> {
        let ty = self.type_of(entity)?;
        Ok(ty
            .ids()
            .iter()
            .map(|id| self.id_str(*id))
            .collect::<Vec<_>>()
            .join(", "))
    }

    /// Renders an id with names where available.
    #[must_use]
    pub fn id_str(&self, id: Id) -> String {
        match id {
            Id::Entity(entity) => self.display_name(entity),
            Id::Pair(relation, object) => format!(
                "({},{})",
                self.display_name(relation),
                self.display_name(object)
            ),
        }
    }

    fn display_name(&self, entity: EntityId) -> String {
        self.names
            .name(entity)
            .map_or_else(|| format!("#{}", entity.index), str::to_string)
    }

    // =========================================================================
    // Components
    // =========================================================================

    /// Registers a component, or returns the existing one for the same name
    /// and layout. Size 0 registers a tag.
    ///
    /// An existing root-scope entity with this name becomes the component.
    ///
    /// # Errors
    ///
    /// Returns `InvalidLayout` for a bad size/alignment and
    /// `ComponentRedefinition` if the name is registered with another layout,
    /// or names an entity already used as a tag id.
    pub fn register_component(&mut self, name: &str, size: usize, align: usize) -> Result<EntityId> {
        let layout = Layout::new(size, align)?;
        if let Some(existing) = self.components.check(name, layout)? {
            return Ok(existing);
        }

        let entity = if let Some(entity) = self.names.lookup(None, name) {
            if !layout.is_tag() && self.tables.iter().any(|t| t.ty().references(entity)) {
                return Err(Error::new(ErrorKind::ComponentRedefinition {
                    name: name.to_string(),
                    existing_size: 0,
                    existing_align: 1,
                    size,
                    align,
                }));
            }
            entity
        } else {
            self.create_named(name)?
        };

        self.components
            .insert(entity, ComponentInfo::new(name, layout));
        debug!(%entity, name, size, align, "registered component");
        Ok(entity)
    }

    /// Registers a tag: a component without bytes.
    ///
    /// # Errors
    ///
    /// Returns `ComponentRedefinition` if `name` is a sized component.
    pub fn register_tag(&mut self, name: &str) -> Result<EntityId> {
        self.register_component(name, 0, 1)
    }

    /// Registration record of a component entity.
    #[must_use]
    pub fn component_info(&self, entity: EntityId) -> Option<&ComponentInfo> {
        self.components.get(entity)
    }

    /// Returns true if `entity` is a registered component or tag.
    #[must_use]
    pub fn is_component(&self, entity: EntityId) -> bool {
        self.components.contains(entity)
    }

    /// Column layout of a data-carrying id.
    ///
    /// # Errors
    ///
    /// Returns `UnknownComponent` for tags and plain entities.
    pub fn layout_of(&self, id: impl Into<Id>) -> Result<Layout> {
        let id = id.into();
        self.components
            .data_layout(id)
            .ok_or_else(|| Error::unknown_component(id))
    }

    /// Byte size of a data-carrying id.
    ///
    /// # Errors
    ///
    /// Returns `UnknownComponent` for tags and plain entities.
    pub fn size_of(&self, id: impl Into<Id>) -> Result<usize> {
        self.layout_of(id).map(Layout::size)
    }

    // =========================================================================
    // Ids on entities
    // =========================================================================

    /// Adds an id. Data-carrying ids start zeroed. Adding a present id is a
    /// no-op.
    ///
    /// # Errors
    ///
    /// Returns `StaleEntity` for dead entities, `IsACycle` or
    /// `HierarchyCycle` for cyclic pairs, `DuplicateName` when re-parenting
    /// into a scope that holds the entity's name, and
    /// `ConcurrentStructuralMutation` while iterating.
    pub fn add(&mut self, entity: EntityId, id: impl Into<Id>) -> Result<()> {
        let id = id.into();
        let from = self.locate(entity)?;
        self.validate_id(id)?;
        if self.tables.at(from.table).ty().contains(id) {
            return Ok(());
        }
        self.ensure_structural("add")?;
        self.check_add(entity, id)?;

        let to = self.destination_add(from.table, id);
        self.move_row(entity, from, to, None);
        self.after_add(entity, id)
    }

    /// Removes an owned id. Removing an absent id is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `StaleEntity` for dead entities, `DuplicateName` when leaving a
    /// parent would clash with a root-scope name, and
    /// `ConcurrentStructuralMutation` while iterating.
    pub fn remove(&mut self, entity: EntityId, id: impl Into<Id>) -> Result<()> {
        let id = id.into();
        let from = self.locate(entity)?;
        if !self.tables.at(from.table).ty().contains(id) {
            return Ok(());
        }
        self.ensure_structural("remove")?;
        let leaves_parent = id.has_relation(EntityId::CHILD_OF);
        if leaves_parent {
            self.names.check_rescope(entity, None)?;
        }

        let to = self.destination_remove(from.table, id);
        self.move_row(entity, from, to, None);
        if leaves_parent {
            self.names.rescope(entity, None)?;
        }
        Ok(())
    }

    /// Writes the bytes of a data-carrying id.
    ///
    /// Overwriting an owned value is not structural and is allowed while
    /// iterating. Otherwise the entity migrates with the value in one step,
    /// which also overrides an inherited value.
    ///
    /// # Errors
    ///
    /// Returns `UnknownComponent` for ids without bytes, `SizeMismatch` for a
    /// wrong length, plus the errors of [`World::add`].
    pub fn set(&mut self, entity: EntityId, id: impl Into<Id>, bytes: &[u8]) -> Result<()> {
        let id = id.into();
        let from = self.locate(entity)?;
        self.validate_id(id)?;
        let layout = self.layout_of(id)?;
        if bytes.len() != layout.size() {
            return Err(Error::size_mismatch(id, layout.size(), bytes.len())
                .with_context(ErrorContext::new().with_operation("set").with_entity(entity)));
        }
        if let Some(slot) = self.tables.at_mut(from.table).get_mut(from.row, id) {
            slot.copy_from_slice(bytes);
            return Ok(());
        }
        self.ensure_structural("set")?;
        self.check_add(entity, id)?;

        let to = self.destination_add(from.table, id);
        self.move_row(entity, from, to, Some((id, bytes)));
        Ok(())
    }

    /// Bytes of a data-carrying id, own or inherited. `None` if absent.
    ///
    /// # Errors
    ///
    /// Returns `StaleEntity` for dead entities and `UnknownComponent` for ids
    /// without bytes.
    pub fn get(&self, entity: EntityId, id: impl Into<Id>) -> Result<Option<&[u8]>> {
        let id = id.into();
        self.entities.validate(entity)?;
        self.layout_of(id)?;
        let Some(source) = self.resolve_source(entity, id)? else {
            return Ok(None);
        };
        let at = self.locate(source)?;
        Ok(self.tables.at(at.table).get(at.row, id))
    }

    /// Mutable bytes of an owned data-carrying id. Never structural.
    ///
    /// # Errors
    ///
    /// Returns `StaleEntity` for dead entities and `UnknownComponent` for ids
    /// without bytes.
    pub fn get_mut(&mut self, entity: EntityId, id: impl Into<Id>) -> Result<Option<&mut [u8]>> {
        let id = id.into();
        let at = self.locate(entity)?;
        self.layout_of(id)?;
        Ok(self.tables.at_mut(at.table).get_mut(at.row, id))
    }

    /// Returns true if the entity owns or inherits `id`.
    #[must_use]
    pub fn has(&self, entity: EntityId, id: impl Into<Id>) -> bool {
        matches!(self.resolve_source(entity, id.into()), Ok(Some(_)))
    }

    /// Returns true if the entity owns `id` itself.
    #[must_use]
    pub fn owns(&self, entity: EntityId, id: impl Into<Id>) -> bool {
        let id = id.into();
        self.entities
            .location(entity)
            .is_some_and(|at| self.tables.at(at.table).ty().contains(id))
    }

    /// The entity's own type.
    ///
    /// # Errors
    ///
    /// Returns `StaleEntity` for dead entities.
    pub fn type_of(&self, entity: EntityId) -> Result<&Type> {
        let at = self.locate(entity)?;
        Ok(self.tables.at(at.table).ty())
    }

    // =========================================================================
    // Pairs and relations
    // =========================================================================

    /// Adds the pair `(relation, object)`.
    ///
    /// # Errors
    ///
    /// See [`World::add`].
    pub fn add_pair(&mut self, entity: EntityId, relation: EntityId, object: EntityId) -> Result<()> {
        self.add(entity, Id::pair(relation, object))
    }

    /// Removes the pair `(relation, object)`.
    ///
    /// # Errors
    ///
    /// See [`World::remove`].
    pub fn remove_pair(&mut self, entity: EntityId, relation: EntityId, object: EntityId) -> Result<()> {
        self.remove(entity, Id::pair(relation, object))
    }

    /// Returns true if the entity owns or inherits the pair.
    #[must_use]
    pub fn has_pair(&self, entity: EntityId, relation: EntityId, object: EntityId) -> bool {
        self.has(entity, Id::pair(relation, object))
    }

    /// Writes the bytes of a data-carrying pair.
    ///
    /// # Errors
    ///
    /// See [`World::set`].
    pub fn set_pair(
        &mut self,
        entity: EntityId,
        relation: EntityId,
        object: EntityId,
        bytes: &[u8],
    ) -> Result<()> {
        self.set(entity, Id::pair(relation, object), bytes)
    }

    /// Bytes of a data-carrying pair.
    ///
    /// # Errors
    ///
    /// See [`World::get`].
    pub fn get_pair(&self, entity: EntityId, relation: EntityId, object: EntityId) -> Result<Option<&[u8]>> {
        self.get(entity, Id::pair(relation, object))
    }

    /// Places `child` under `parent`, replacing any previous parent.
    ///
    /// # Errors
    ///
    /// See [`World::add`].
    pub fn add_child(&mut self, parent: EntityId, child: EntityId) -> Result<()> {
        self.add_pair(child, EntityId::CHILD_OF, parent)
    }

    /// Parent of an entity, if it has one.
    #[must_use]
    pub fn parent(&self, entity: EntityId) -> Option<EntityId> {
        self.relations.targets(entity, EntityId::CHILD_OF).next()
    }

    /// Children of an entity in attach order.
    #[must_use]
    pub fn children(&self, parent: EntityId) -> Vec<EntityId> {
        self.relations.sources(parent, EntityId::CHILD_OF).collect()
    }

    /// Makes `instance` inherit from `prototype`.
    ///
    /// # Errors
    ///
    /// Returns `IsACycle` if `prototype` already inherits from `instance`,
    /// plus the errors of [`World::add`].
    pub fn is_a(&mut self, instance: EntityId, prototype: EntityId) -> Result<()> {
        self.add_pair(instance, EntityId::IS_A, prototype)
    }

    /// Direct prototypes of an entity, in type order.
    #[must_use]
    pub fn prototypes(&self, entity: EntityId) -> Vec<EntityId> {
        self.type_of(entity)
            .map(|ty| ty.objects(EntityId::IS_A).collect())
            .unwrap_or_default()
    }

    /// Sets the policy of a user relation.
    ///
    /// # Errors
    ///
    /// Returns `StaleEntity` for a dead relation and `ProtectedEntity` for
    /// the built-ins.
    pub fn set_relation_policy(&mut self, relation: EntityId, policy: RelationPolicy) -> Result<()> {
        self.entities.validate(relation)?;
        if relation.is_builtin() {
            return Err(Error::new(ErrorKind::ProtectedEntity(relation)));
        }
        self.relations.set_policy(relation, policy);
        // exclusivity changes where an add lands
        self.tables.clear_edges();
        Ok(())
    }

    /// Policy of a relation.
    #[must_use]
    pub fn relation_policy(&self, relation: EntityId) -> RelationPolicy {
        self.relations.policy(relation)
    }

    fn check_add(&self, entity: EntityId, id: Id) -> Result<()> {
        let Some((relation, object)) = pair_parts(id) else {
            return Ok(());
        };
        if relation == EntityId::IS_A && (object == entity || self.inherits_from(object, entity)) {
            return Err(Error::new(ErrorKind::IsACycle {
                instance: entity,
                prototype: object,
            }));
        }
        if relation == EntityId::CHILD_OF {
            if entity.is_builtin() {
                return Err(Error::new(ErrorKind::ProtectedEntity(entity)));
            }
            if object == entity || self.is_ancestor(entity, object) {
                return Err(Error::new(ErrorKind::HierarchyCycle {
                    child: entity,
                    parent: object,
                }));
            }
            self.names.check_rescope(entity, Some(object))?;
        }
        Ok(())
    }

    fn after_add(&mut self, entity: EntityId, id: Id) -> Result<()> {
        if let Some((EntityId::CHILD_OF, parent)) = pair_parts(id) {
            self.names.rescope(entity, Some(parent))?;
        }
        Ok(())
    }

    fn check_exclusive(&self, ty: &Type) -> Result<()> {
        let mut seen = HashSet::new();
        for (relation, _) in ty.ids().iter().filter_map(|id| pair_parts(*id)) {
            if self.relations.policy(relation).exclusive && !seen.insert(relation) {
                return Err(Error::new(ErrorKind::Internal(format!(
                    "more than one pair of exclusive relation {relation}"
                ))));
            }
        }
        Ok(())
    }

    /// Returns true if `start` reaches `target` through `IsA` edges.
    fn inherits_from(&self, start: EntityId, target: EntityId) -> bool {
        let mut seen = HashSet::new();
        let mut stack = vec![start];
        while let Some(node) = stack.pop() {
            if node == target {
                return true;
            }
            if seen.insert(node) {
                stack.extend(self.relations.targets(node, EntityId::IS_A));
            }
        }
        false
    }

    /// Returns true if `ancestor` is above `entity` in the hierarchy.
    fn is_ancestor(&self, ancestor: EntityId, entity: EntityId) -> bool {
        let mut current = self.parent(entity);
        while let Some(node) = current {
            if node == ancestor {
                return true;
            }
            current = self.parent(node);
        }
        false
    }

    // =========================================================================
    // Inheritance
    // =========================================================================

    /// Returns true if `id` can be inherited through `IsA`.
    ///
    /// `Prefab`, `ChildOf` pairs and `IsA` pairs stay with their owner.
    #[must_use]
    pub fn is_inheritable(id: Id) -> bool {
        id != Id::entity(EntityId::PREFAB)
            && !id.has_relation(EntityId::CHILD_OF)
            && !id.has_relation(EntityId::IS_A)
    }

    /// Entity whose storage provides `id` for `entity`: the entity itself if
    /// it owns `id`, else the first prototype that does.
    ///
    /// # Errors
    ///
    /// Returns `StaleEntity` for dead entities and `IsACycle` if the walk
    /// meets a cycle.
    pub fn resolve_source(&self, entity: EntityId, id: Id) -> Result<Option<EntityId>> {
        let at = self.locate(entity)?;
        let ty = self.tables.at(at.table).ty();
        if ty.contains(id) {
            return Ok(Some(entity));
        }
        self.resolve_inherited(ty, id)
    }

    /// Prototype that provides `id` to entities of type `ty`, searching the
    /// `IsA` objects of `ty` depth-first in type order.
    ///
    /// # Errors
    ///
    /// Returns `IsACycle` if the walk meets a cycle.
    pub fn resolve_inherited(&self, ty: &Type, id: Id) -> Result<Option<EntityId>> {
        if !Self::is_inheritable(id) {
            return Ok(None);
        }
        let mut path = Vec::new();
        self.resolve_walk(ty, id, &mut path)
    }

    fn resolve_walk(&self, ty: &Type, id: Id, path: &mut Vec<EntityId>) -> Result<Option<EntityId>> {
        for prototype in ty.objects(EntityId::IS_A) {
            let Some(at) = self.entities.location(prototype) else {
                continue;
            };
            if path.contains(&prototype) {
                return Err(Error::new(ErrorKind::IsACycle {
                    instance: path.last().copied().unwrap_or(prototype),
                    prototype,
                }));
            }
            let prototype_ty = self.tables.at(at.table).ty();
            if prototype_ty.contains(id) {
                return Ok(Some(prototype));
            }
            path.push(prototype);
            let found = self.resolve_walk(prototype_ty, id, path)?;
            path.pop();
            if found.is_some() {
                return Ok(found);
            }
        }
        Ok(None)
    }

    fn is_prototype(&self, entity: EntityId) -> bool {
        !self
            .tables
            .with_id(Id::pair(EntityId::IS_A, entity))
            .is_empty()
    }

    // =========================================================================
    // Tables and migration
    // =========================================================================

    /// All tables.
    #[must_use]
    pub fn tables(&self) -> &TableStore {
        &self.tables
    }

    /// Table by id.
    #[must_use]
    pub fn table(&self, id: TableId) -> Option<&Table> {
        self.tables.get(id)
    }

    /// Where a live entity's row is.
    #[must_use]
    pub fn location(&self, entity: EntityId) -> Option<Location> {
        self.entities.location(entity)
    }

    /// Mutable bytes of every row of a table column. Writing bytes is never
    /// structural, and the column keeps its row count.
    pub fn column_mut(&mut self, table: TableId, column: usize) -> Option<&mut [u8]> {
        self.tables
            .get_mut(table)?
            .column_mut(column)
            .map(Column::bytes_mut)
    }

    /// Starts a storage event subscription at the current end of the log.
    pub fn subscribe(&mut self) -> Subscription {
        self.events.subscribe()
    }

    /// Events the subscription has not seen yet.
    #[must_use]
    pub fn read_events(&self, subscription: &Subscription) -> Vec<StorageEvent> {
        self.events.read(subscription)
    }

    fn table_for(&mut self, ty: Type) -> TableId {
        if let Some(id) = self.tables.find(&ty) {
            return id;
        }
        let ids = ty.len();
        let components = &self.components;
        let id = self.tables.insert(ty, |id| components.data_layout(id));
        debug!(table = %id, ids, "created table");
        self.events.push(StorageEvent::TableCreated(id));
        id
    }

    fn destination_add(&mut self, from: TableId, id: Id) -> TableId {
        if let Some(to) = self.tables.at(from).add_edge(id) {
            return to;
        }
        let current = self.tables.at(from).ty();
        let ty = match pair_parts(id) {
            Some((relation, _)) if self.relations.policy(relation).exclusive => current
                .filtered(|existing| !existing.has_relation(relation))
                .with(id),
            _ => current.with(id),
        };
        let to = self.table_for(ty);
        self.tables.at_mut(from).set_add_edge(id, to);
        to
    }

    fn destination_remove(&mut self, from: TableId, id: Id) -> TableId {
        if let Some(to) = self.tables.at(from).remove_edge(id) {
            return to;
        }
        let ty = self.tables.at(from).ty().without(id);
        let to = self.table_for(ty);
        self.tables.at_mut(from).set_remove_edge(id, to);
        to
    }

    /// Moves an entity's row to `to`, keeping every index in step.
    fn move_row(&mut self, entity: EntityId, from: Location, to: TableId, value: Option<(Id, &[u8])>) {
        if to == from.table {
            if let Some((id, bytes)) = value {
                if let Some(slot) = self.tables.at_mut(to).get_mut(from.row, id) {
                    slot.copy_from_slice(bytes);
                }
            }
            return;
        }

        let (row, moved) = self.tables.move_row(from.table, to, from.row, value);
        self.entities.set_location(entity, Location::new(to, row));
        if let Some(moved) = moved {
            self.entities.set_location(moved, from);
        }

        let old = self.tables.at(from.table).ty();
        let new = self.tables.at(to).ty();
        for &id in old.ids() {
            if let (Some((relation, object)), false) = (pair_parts(id), new.contains(id)) {
                self.relations.unlink(entity, relation, object);
            }
        }
        for &id in new.ids() {
            if let (Some((relation, object)), false) = (pair_parts(id), old.contains(id)) {
                self.relations.link(entity, relation, object);
            }
        }

        if self.is_prototype(entity) {
            self.events.push(StorageEvent::PrototypeChanged(entity));
        }
        trace!(%entity, from = %from.table, %to, "migrated entity");
    }
}
