//! Entity lifecycle management with generational indices.
//!
//! The `EntityStore` manages entity allocation, tracks generations to detect
//! stale references, and records which table row holds each live entity.

use tabula_foundation::{EntityId, Error, Id, Result};
use tabula_foundation::entity::GENERATION_MASK;
use tabula_foundation::id::MAX_ENTITY_INDEX;

use crate::table::TableId;

/// Where a live entity's row currently sits.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Location {
    /// Table holding the row.
    pub table: TableId,
    /// Row within the table.
    pub row: usize,
}

impl Location {
    /// Creates a location.
    #[must_use]
    pub const fn new(table: TableId, row: usize) -> Self {
        Self { table, row }
    }
}

/// One slot per entity index.
#[derive(Clone, Debug)]
struct Slot {
    /// Even generations are free, odd generations are alive.
    generation: u32,
    location: Location,
}

/// Manages entity lifecycle, generation tracking, and row locations.
///
/// Entities are allocated from a free list when available, otherwise
/// new indices are allocated. When an entity is destroyed, its index
/// is added to the free list and its generation is advanced.
#[derive(Debug, Clone, Default)]
pub struct EntityStore {
    slots: Vec<Slot>,
    free_list: Vec<u32>,
    live_count: usize,
}

/// Advances a generation, wrapping inside the 31 bits an id can carry.
const fn next_generation(generation: u32) -> u32 {
    generation.wrapping_add(1) & GENERATION_MASK
}

impl EntityStore {
    /// Creates a new empty entity store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store with room for `capacity` indices.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            free_list: Vec::new(),
            live_count: 0,
        }
    }

    /// Spawns a new entity at `location`, returns its ID.
    ///
    /// Reuses indices from the free list when available.
    ///
    /// # Panics
    ///
    /// Panics if every index up to the pair-encoding limit is in use.
    pub fn spawn(&mut self, location: Location) -> EntityId {
        self.live_count += 1;

        if let Some(index) = self.free_list.pop() {
            let slot = &mut self.slots[index as usize];
            // was even/free, now odd/alive
            slot.generation = next_generation(slot.generation);
            slot.location = location;
            EntityId::new(index, slot.generation)
        } else {
            let index = u32::try_from(self.slots.len())
                .ok()
                .filter(|index| *index <= MAX_ENTITY_INDEX)
                .unwrap_or_else(|| panic!("entity index space exhausted"));
            self.slots.push(Slot {
                generation: 1,
                location,
            });
            EntityId::new(index, 1)
        }
    }

    /// Destroys an entity.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the entity is stale or already destroyed.
    pub fn destroy(&mut self, id: EntityId) -> Result<()> {
        self.validate(id)?;

        let slot = &mut self.slots[id.index as usize];
        // was odd/alive, now even/free
        slot.generation = next_generation(slot.generation);
        self.free_list.push(id.index);
        self.live_count -= 1;

        Ok(())
    }

    /// Checks if an entity exists and is not stale.
    #[must_use]
    pub fn exists(&self, id: EntityId) -> bool {
        self.slots
            .get(id.index as usize)
            .is_some_and(|slot| slot.generation == id.generation && id.generation % 2 == 1)
    }

    /// Validates that an entity is live.
    ///
    /// # Errors
    ///
    /// Returns `UnknownId` for an index this store never handed out and
    /// `StaleEntity` for a destroyed or reused one.
    pub fn validate(&self, id: EntityId) -> Result<()> {
        let Some(slot) = self.slots.get(id.index as usize) else {
            return Err(Error::unknown_id(Id::entity(id)));
        };

        if slot.generation != id.generation || slot.generation % 2 == 0 {
            return Err(Error::stale_entity(id));
        }

        Ok(())
    }

    /// Returns where a live entity's row is.
    #[must_use]
    pub fn location(&self, id: EntityId) -> Option<Location> {
        if self.exists(id) {
            Some(self.slots[id.index as usize].location)
        } else {
            None
        }
    }

    /// Records a new row location for a live entity.
    ///
    /// Dead ids are ignored.
    pub fn set_location(&mut self, id: EntityId, location: Location) {
        if self.exists(id) {
            self.slots[id.index as usize].location = location;
        }
    }

    /// Returns the total number of live entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.live_count
    }

    /// Returns true if there are no live entities.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.live_count == 0
    }

    /// Iterates over all live entity IDs in index order.
    pub fn iter(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.slots
            .iter()
            .zip(0u32..)
            .filter(|(slot, _)| slot.generation % 2 == 1)
            .map(|(slot, index)| EntityId::new(index, slot.generation))
    }

    /// Returns the current generation for an index, if it exists.
    #[must_use]
    pub fn generation(&self, index: u32) -> Option<u32> {
        self.slots.get(index as usize).map(|slot| slot.generation)
    }
}
