//! Terms: the building blocks of filters and queries.

use tabula_foundation::{EntityId, Id};

/// How a term constrains matching tables.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum TermMode {
    /// Required, own or inherited, returned as data.
    Match,
    /// Required in the table's own type.
    Own,
    /// Required through `IsA` only; never an own column.
    Inherit,
    /// Required, own or inherited, not returned as data.
    FilterOnly,
    /// Returned when present, never required.
    Optional,
    /// The table must have it neither own nor inherited.
    Not,
}

impl TermMode {
    /// Returns true if iterators hand out data for this term.
    #[must_use]
    pub const fn produces_data(self) -> bool {
        !matches!(self, TermMode::FilterOnly | TermMode::Not)
    }

    /// Returns true if a table must have the id to match.
    #[must_use]
    pub const fn is_required(self) -> bool {
        matches!(
            self,
            TermMode::Match | TermMode::Own | TermMode::Inherit | TermMode::FilterOnly
        )
    }

    /// Returns true if an inherited id satisfies the term.
    #[must_use]
    pub const fn admits_inherited(self) -> bool {
        matches!(
            self,
            TermMode::Match | TermMode::Inherit | TermMode::FilterOnly | TermMode::Optional
        )
    }
}

/// Whether a term's data is read, written, or both.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default)]
pub enum Access {
    /// Read only.
    In,
    /// Write only.
    Out,
    /// Read and write.
    #[default]
    InOut,
}

impl Access {
    /// Returns true if data may be written through an iterator.
    #[must_use]
    pub const fn is_writable(self) -> bool {
        matches!(self, Access::Out | Access::InOut)
    }
}

/// One `(id, mode, access)` entry.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Term {
    /// The id being matched.
    pub id: Id,
    /// Matching behavior.
    pub mode: TermMode,
    /// Read/write direction.
    pub access: Access,
}

impl Term {
    /// Creates a `Match` term with `InOut` access.
    #[must_use]
    pub fn new(id: impl Into<Id>) -> Self {
        Self {
            id: id.into(),
            mode: TermMode::Match,
            access: Access::default(),
        }
    }

    /// Creates a `Match` term for a pair.
    #[must_use]
    pub fn pair(relation: EntityId, object: EntityId) -> Self {
        Self::new(Id::pair(relation, object))
    }

    /// Sets the mode.
    #[must_use]
    pub fn with_mode(mut self, mode: TermMode) -> Self {
        self.mode = mode;
        self
    }

    /// Sets the access.
    #[must_use]
    pub fn with_access(mut self, access: Access) -> Self {
        self.access = access;
        self
    }
}

impl From<EntityId> for Term {
    fn from(entity: EntityId) -> Self {
        Term::new(entity)
    }
}

impl From<Id> for Term {
    fn from(id: Id) -> Self {
        Term::new(id)
    }
}
