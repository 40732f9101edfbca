//! Error types for the Tabula system.
//!
//! Uses `thiserror` for ergonomic error definition with rich context.

use std::fmt;

use thiserror::Error;

use crate::entity::EntityId;
use crate::id::Id;

/// Result type used throughout Tabula.
pub type Result<T> = std::result::Result<T, Error>;

/// The main error type for Tabula operations.
#[derive(Debug, Error)]
#[error("{kind}")]
pub struct Error {
    /// The kind of error that occurred.
    pub kind: ErrorKind,
    /// Optional context about where the error occurred.
    pub context: Option<ErrorContext>,
}

impl Error {
    /// Creates a new error with the given kind.
    #[must_use]
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            context: None,
        }
    }

    /// Adds context to this error.
    #[must_use]
    pub fn with_context(mut self, context: ErrorContext) -> Self {
        self.context = Some(context);
        self
    }

    /// Creates a stale entity reference error.
    #[must_use]
    pub fn stale_entity(id: EntityId) -> Self {
        Self::new(ErrorKind::StaleEntity(id))
    }

    /// Creates an unknown id error.
    #[must_use]
    pub fn unknown_id(id: Id) -> Self {
        Self::new(ErrorKind::UnknownId(id))
    }

    /// Creates an unknown component error.
    #[must_use]
    pub fn unknown_component(id: Id) -> Self {
        Self::new(ErrorKind::UnknownComponent(id))
    }

    /// Creates a duplicate name error.
    #[must_use]
    pub fn duplicate_name(name: impl Into<String>) -> Self {
        Self::new(ErrorKind::DuplicateName(name.into()))
    }

    /// Creates a byte length mismatch error.
    #[must_use]
    pub fn size_mismatch(id: Id, expected: usize, actual: usize) -> Self {
        Self::new(ErrorKind::SizeMismatch {
            id,
            expected,
            actual,
        })
    }

    /// Creates a structural-mutation-during-iteration error.
    #[must_use]
    pub fn concurrent_mutation(operation: &'static str) -> Self {
        Self::new(ErrorKind::ConcurrentStructuralMutation(operation))
    }

    /// Returns true if this error reports a dead or never-allocated entity.
    #[must_use]
    pub fn is_stale(&self) -> bool {
        matches!(self.kind, ErrorKind::StaleEntity(_) | ErrorKind::UnknownId(_))
    }
}

/// Categorized error kinds for pattern matching.
#[derive(Debug, Error)]
pub enum ErrorKind {
    /// An id that must be a sized component is not one.
    #[error("not a sized component: {0}")]
    UnknownComponent(Id),

    /// A component name was registered again with a different layout.
    #[error("component {name} already registered with size {existing_size} align {existing_align}, requested size {size} align {align}")]
    ComponentRedefinition {
        /// The component name.
        name: String,
        /// Size from the first registration.
        existing_size: usize,
        /// Alignment from the first registration.
        existing_align: usize,
        /// Requested size.
        size: usize,
        /// Requested alignment.
        align: usize,
    },

    /// A component declaration has an unusable size/alignment.
    #[error("invalid component layout: size {size} align {align}")]
    InvalidLayout {
        /// Declared size.
        size: usize,
        /// Declared alignment.
        align: usize,
    },

    /// The name is already taken in the target scope.
    #[error("duplicate name in scope: {0}")]
    DuplicateName(String),

    /// Entity reference is dead (destroyed, or generation mismatch).
    #[error("stale entity reference: {0:?}")]
    StaleEntity(EntityId),

    /// The id was never allocated by this world.
    #[error("unknown id: {0:?}")]
    UnknownId(Id),

    /// Adding an `IsA` pair would make an entity its own prototype.
    #[error("IsA cycle: {instance:?} cannot inherit from {prototype:?}")]
    IsACycle {
        /// Entity that would inherit.
        instance: EntityId,
        /// Prototype that already inherits from `instance`.
        prototype: EntityId,
    },

    /// Adding a `ChildOf` pair would make an entity its own ancestor.
    #[error("hierarchy cycle: {child:?} cannot be placed under {parent:?}")]
    HierarchyCycle {
        /// Entity being re-parented.
        child: EntityId,
        /// Requested parent, a descendant of `child`.
        parent: EntityId,
    },

    /// A structural change was attempted while an iterator holds the world.
    #[error("structural mutation ({0}) while an iterator is active")]
    ConcurrentStructuralMutation(&'static str),

    /// The term exists but produces no data.
    #[error("term {0} is not part of the iterator output")]
    TermNotInOutput(usize),

    /// The term index is past the end of the term list.
    #[error("term index {index} out of range ({count} terms)")]
    TermIndexOutOfRange {
        /// The requested index.
        index: usize,
        /// Number of terms.
        count: usize,
    },

    /// The term cannot be written through the iterator.
    #[error("term {0} is not writable")]
    TermNotWritable(usize),

    /// Term data was requested outside of an active batch.
    #[error("iterator is not active")]
    IteratorNotActive,

    /// Supplied bytes do not match the component size.
    #[error("size mismatch for {id}: expected {expected} bytes, got {actual}")]
    SizeMismatch {
        /// The component id.
        id: Id,
        /// Bytes required.
        expected: usize,
        /// Bytes supplied.
        actual: usize,
    },

    /// Built-in entities cannot be destroyed or renamed.
    #[error("protected built-in entity: {0:?}")]
    ProtectedEntity(EntityId),

    /// Internal error (should not happen).
    #[error("internal error: {0}")]
    Internal(String),
}

/// Context about where an error occurred.
#[derive(Debug, Clone)]
pub struct ErrorContext {
    /// Operation being performed (e.g. `"set"`).
    pub operation: Option<String>,
    /// Entity the operation targeted.
    pub entity: Option<EntityId>,
    /// Chain of enclosing operations, innermost first.
    pub stack: Vec<String>,
}

impl ErrorContext {
    /// Creates a new empty context.
    #[must_use]
    pub fn new() -> Self {
        Self {
            operation: None,
            entity: None,
            stack: Vec::new(),
        }
    }

    /// Sets the operation name.
    #[must_use]
    pub fn with_operation(mut self, operation: impl Into<String>) -> Self {
        self.operation = Some(operation.into());
        self
    }

    /// Sets the target entity.
    #[must_use]
    pub fn with_entity(mut self, entity: EntityId) -> Self {
        self.entity = Some(entity);
        self
    }

    /// Adds a stack frame.
    #[must_use]
    pub fn with_frame(mut self, frame: impl Into<String>) -> Self {
        self.stack.push(frame.into());
        self
    }
}

impl Default for ErrorContext {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(operation) = &self.operation {
            write!(f, "in {operation}")?;
            if let Some(entity) = self.entity {
                write!(f, " on {entity}")?;
            }
        }
        if !self.stack.is_empty() {
            writeln!(f)?;
            for frame in &self.stack {
                writeln!(f, "  in {frame}")?;
            }
        }
        Ok(())
    }
}
