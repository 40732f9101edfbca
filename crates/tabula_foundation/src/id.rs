//! Ids: the values an entity's type is made of.
//!
//! An [`Id`] is either a plain entity (a component, a tag, or any other
//! entity used as a marker) or a `(relation, object)` pair. The packed
//! 64-bit form ([`IdBits`]) is only an encoding detail; everything in the
//! storage layer works with the tagged variant.

use std::fmt;

use crate::entity::{EntityId, GENERATION_MASK};

/// Flag bit set on every packed pair.
pub const PAIR_FLAG: u64 = 1 << 63;

/// Mask for the relation half of a packed pair (31 bits, below the flag).
const RELATION_MASK: u64 = 0x7FFF_FFFF;

/// Largest entity index that still fits the relation half of a pair.
pub const MAX_ENTITY_INDEX: u32 = 0x7FFF_FFFF;

/// A component, tag, or relationship id attached to an entity.
#[derive(Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub enum Id {
    /// A plain entity used as a component or tag.
    Entity(EntityId),
    /// A `(relation, object)` pair.
    Pair(EntityId, EntityId),
}

impl Id {
    /// Creates a plain id.
    #[must_use]
    pub const fn entity(entity: EntityId) -> Self {
        Self::Entity(entity)
    }

    /// Creates a pair id.
    #[must_use]
    pub const fn pair(relation: EntityId, object: EntityId) -> Self {
        Self::Pair(relation, object)
    }

    /// Returns true for pair ids.
    #[must_use]
    pub const fn is_pair(self) -> bool {
        matches!(self, Self::Pair(..))
    }

    /// Returns the entity of a plain id.
    #[must_use]
    pub const fn as_entity(self) -> Option<EntityId> {
        match self {
            Self::Entity(e) => Some(e),
            Self::Pair(..) => None,
        }
    }

    /// Returns the relation half of a pair.
    #[must_use]
    pub const fn relation(self) -> Option<EntityId> {
        match self {
            Self::Pair(r, _) => Some(r),
            Self::Entity(_) => None,
        }
    }

    /// Returns the object half of a pair.
    #[must_use]
    pub const fn object(self) -> Option<EntityId> {
        match self {
            Self::Pair(_, o) => Some(o),
            Self::Entity(_) => None,
        }
    }

    /// Returns true if this is a pair with the given relation.
    #[must_use]
    pub fn has_relation(self, relation: EntityId) -> bool {
        self.relation() == Some(relation)
    }

    /// Returns true if `entity` appears anywhere in this id.
    #[must_use]
    pub fn references(self, entity: EntityId) -> bool {
        match self {
            Self::Entity(e) => e == entity,
            Self::Pair(r, o) => r == entity || o == entity,
        }
    }

    /// Returns the entities this id is built from.
    pub fn entities(self) -> impl Iterator<Item = EntityId> {
        let (first, second) = match self {
            Self::Entity(e) => (e, None),
            Self::Pair(r, o) => (r, Some(o)),
        };
        std::iter::once(first).chain(second)
    }

    /// Packs this id into its 64-bit encoding.
    ///
    /// Pairs keep only the indices of their halves.
    #[must_use]
    pub fn to_bits(self) -> IdBits {
        match self {
            Self::Entity(e) => {
                IdBits((u64::from(e.generation & GENERATION_MASK) << 32) | u64::from(e.index))
            }
            Self::Pair(r, o) => IdBits(
                PAIR_FLAG | ((u64::from(r.index) & RELATION_MASK) << 32) | u64::from(o.index),
            ),
        }
    }
}

impl From<EntityId> for Id {
    fn from(entity: EntityId) -> Self {
        Self::Entity(entity)
    }
}

impl fmt::Debug for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Entity(e) => write!(f, "Id({e:?})"),
            Self::Pair(r, o) => write!(f, "Id({r:?}, {o:?})"),
        }
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Entity(e) => write!(f, "#{}", e.index),
            Self::Pair(r, o) => write!(f, "(#{},#{})", r.index, o.index),
        }
    }
}

/// Packed 64-bit form of an [`Id`].
///
/// Plain ids are `generation << 32 | index` with the top bit clear. Pairs set
/// the top bit and store the relation index in bits 32..63 and the object
/// index in bits 0..32.
#[derive(Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord, Debug)]
pub struct IdBits(pub u64);

impl IdBits {
    /// Returns true if the pair flag is set.
    #[must_use]
    pub const fn is_pair(self) -> bool {
        self.0 & PAIR_FLAG != 0
    }

    /// Decodes a plain id.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn entity(self) -> Option<EntityId> {
        if self.is_pair() {
            None
        } else {
            Some(EntityId::new(self.0 as u32, (self.0 >> 32) as u32))
        }
    }

    /// Decodes the relation index of a pair.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn relation_index(self) -> Option<u32> {
        if self.is_pair() {
            Some(((self.0 >> 32) & RELATION_MASK) as u32)
        } else {
            None
        }
    }

    /// Decodes the object index of a pair.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn object_index(self) -> Option<u32> {
        if self.is_pair() {
            Some(self.0 as u32)
        } else {
            None
        }
    }
}
