//! Entity identifiers with generational indices.

use std::fmt;

/// Largest generation value an [`EntityId`] can carry.
///
/// Generations stay below 2^31 so the packed form of a plain id never sets
/// the pair bit (see [`crate::IdBits`]).
pub const GENERATION_MASK: u32 = 0x7FFF_FFFF;

/// Entity identifier with generational index for stale reference detection.
///
/// The generation counter increments when an entity index is reused after destruction,
/// allowing detection of stale references to destroyed entities.
///
/// # Layout
/// - `index`: 32-bit index into entity storage
/// - `generation`: 31-bit generation counter (odd while alive)
#[derive(Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct EntityId {
    /// Index into entity storage.
    pub index: u32,
    /// Generation counter for stale reference detection.
    pub generation: u32,
}

impl EntityId {
    /// The built-in hierarchy relation. `(ChildOf, parent)` places an entity
    /// under `parent`.
    pub const CHILD_OF: EntityId = EntityId::new(0, 1);

    /// The built-in prototype relation. `(IsA, prototype)` lets an entity
    /// inherit the prototype's components.
    pub const IS_A: EntityId = EntityId::new(1, 1);

    /// The built-in tag marking prototypes that filters skip by default.
    pub const PREFAB: EntityId = EntityId::new(2, 1);

    /// Number of entities every world reserves for built-ins.
    pub const BUILTIN_COUNT: u32 = 3;

    /// Creates a new entity ID with the given index and generation.
    #[must_use]
    pub const fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    /// Returns a sentinel value representing "no entity".
    ///
    /// This uses `u32::MAX` as the index, which should never be allocated.
    #[must_use]
    pub const fn null() -> Self {
        Self {
            index: u32::MAX,
            generation: 0,
        }
    }

    /// Returns true if this is the null sentinel value.
    #[must_use]
    pub const fn is_null(self) -> bool {
        self.index == u32::MAX
    }

    /// Returns true for the entities every world creates up front.
    #[must_use]
    pub const fn is_builtin(self) -> bool {
        self.index < Self::BUILTIN_COUNT && self.generation == 1
    }
}

impl fmt::Debug for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            write!(f, "EntityId(null)")
        } else {
            write!(f, "EntityId({}v{})", self.index, self.generation)
        }
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            write!(f, "Entity(null)")
        } else {
            write!(f, "Entity({})", self.index)
        }
    }
}
