//! Iteration tokens.
//!
//! Iterators borrow the world only per call, so the borrow checker cannot
//! stop a structural change between two calls. Instead each live iterator
//! holds an [`IterationToken`]; structural operations refuse to run while
//! any token is out.

use std::sync::Arc;

/// Marker shared by a world and the iterators running over it.
#[derive(Debug, Default)]
pub(crate) struct IterationLock {
    marker: Arc<()>,
}

impl IterationLock {
    pub(crate) fn acquire(&self) -> IterationToken {
        IterationToken {
            marker: Arc::clone(&self.marker),
        }
    }

    /// Number of tokens currently out.
    pub(crate) fn holders(&self) -> usize {
        Arc::strong_count(&self.marker) - 1
    }

    pub(crate) fn issued(&self, token: &IterationToken) -> bool {
        Arc::ptr_eq(&self.marker, &token.marker)
    }
}

/// Proof that an iterator is running over one particular world.
///
/// Dropping the token ends the iteration.
#[derive(Debug)]
pub struct IterationToken {
    marker: Arc<()>,
}
