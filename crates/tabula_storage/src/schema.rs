//! Schema definitions for components and relations.
//!
//! Components carry a name and a byte layout. Relations carry a policy that
//! decides what happens to their pairs when the object entity goes away.

use tabula_foundation::Layout;

/// Registration record for a component entity.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ComponentInfo {
    /// Name the component was registered under.
    pub name: String,
    /// Byte layout of one value.
    pub layout: Layout,
}

impl ComponentInfo {
    /// Creates a component record.
    #[must_use]
    pub fn new(name: impl Into<String>, layout: Layout) -> Self {
        Self {
            name: name.into(),
            layout,
        }
    }

    /// Returns true if this component is a tag (no bytes).
    #[must_use]
    pub fn is_tag(&self) -> bool {
        self.layout.is_tag()
    }
}

/// Behavior attached to a relation entity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RelationPolicy {
    /// What happens to sources when the object of a pair is destroyed.
    pub on_delete: OnDelete,
    /// If true, an entity holds at most one pair of this relation; adding a
    /// new one replaces the old.
    pub exclusive: bool,
}

impl RelationPolicy {
    /// Creates the default policy: remove the pair, not exclusive.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            on_delete: OnDelete::Remove,
            exclusive: false,
        }
    }

    /// Policy of the built-in `ChildOf` relation.
    #[must_use]
    pub const fn hierarchy() -> Self {
        Self {
            on_delete: OnDelete::Cascade,
            exclusive: true,
        }
    }

    /// Sets the on-delete behavior.
    #[must_use]
    pub const fn with_on_delete(mut self, on_delete: OnDelete) -> Self {
        self.on_delete = on_delete;
        self
    }

    /// Sets exclusivity.
    #[must_use]
    pub const fn with_exclusive(mut self, exclusive: bool) -> Self {
        self.exclusive = exclusive;
        self
    }
}

impl Default for RelationPolicy {
    fn default() -> Self {
        Self::new()
    }
}

/// What happens to a source entity when the object of its pair is destroyed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OnDelete {
    /// Remove the pair from the source.
    Remove,
    /// Destroy the source as well.
    Cascade,
}
