//! Uncached filters.
//!
//! A [`Filter`] keeps no state between iterations: every call to
//! [`Filter::iter`] evaluates the term list against the current tables.

use tabula_foundation::{EntityId, Id, Result};
use tabula_storage::World;

use crate::iter::Iter;
use crate::plan::{Plan, TableMatch};
use crate::term::{Access, Term, TermMode};

// =============================================================================
// Filter
// =============================================================================

/// A term list evaluated from scratch on every iteration.
#[derive(Clone, Debug)]
pub struct Filter {
    plan: Plan,
}

impl Filter {
    /// Creates an instanced filter from a term list.
    #[must_use]
    pub fn new(terms: Vec<Term>) -> Self {
        Self {
            plan: Plan::new(terms, true),
        }
    }

    /// Starts building a filter term by term.
    #[must_use]
    pub fn builder() -> FilterBuilder {
        FilterBuilder::default()
    }

    /// The compiled plan.
    #[must_use]
    pub fn plan(&self) -> &Plan {
        &self.plan
    }

    /// The terms in order.
    #[must_use]
    pub fn terms(&self) -> &[Term] {
        self.plan.terms()
    }

    /// Matches every table from scratch, ordered by table id.
    ///
    /// # Errors
    ///
    /// Returns `IsACycle` if resolving an inherited id meets a cycle.
    pub fn matches(&self, world: &World) -> Result<Vec<TableMatch>> {
        self.plan.evaluate(world)
    }

    /// Evaluates the filter and returns an iterator over the matches.
    ///
    /// # Errors
    ///
    /// Returns `IsACycle` if resolving an inherited id meets a cycle.
    pub fn iter(&self, world: &World) -> Result<Iter> {
        let matches = self.plan.evaluate(world)?;
        Ok(Iter::new(
            world,
            self.plan.shared_terms(),
            self.plan.instanced(),
            matches,
        ))
    }

    /// Number of entities in the matched tables.
    ///
    /// # Errors
    ///
    /// Returns `IsACycle` if resolving an inherited id meets a cycle.
    pub fn count(&self, world: &World) -> Result<usize> {
        Ok(self
            .matches(world)?
            .iter()
            .filter_map(|matched| world.table(matched.table))
            .map(tabula_storage::Table::len)
            .sum())
    }

    /// Every matched entity, in iteration order.
    ///
    /// # Errors
    ///
    /// Returns `IsACycle` if resolving an inherited id meets a cycle.
    pub fn entities(&self, world: &World) -> Result<Vec<EntityId>> {
        Ok(self
            .matches(world)?
            .iter()
            .filter_map(|matched| world.table(matched.table))
            .flat_map(|table| table.entities().iter().copied())
            .collect())
    }
}

// =============================================================================
// Builder
// =============================================================================

/// Builds a term list one term at a time.
///
/// Every method appends a term except [`FilterBuilder::access`], which
/// changes the last one, and [`FilterBuilder::instanced`].
#[derive(Clone, Debug)]
pub struct FilterBuilder {
    terms: Vec<Term>,
    instanced: bool,
}

impl Default for FilterBuilder {
    fn default() -> Self {
        Self {
            terms: Vec::new(),
            instanced: true,
        }
    }
}

impl FilterBuilder {
    /// Appends a ready-made term.
    #[must_use]
    pub fn term(mut self, term: impl Into<Term>) -> Self {
        self.terms.push(term.into());
        self
    }

    fn push(self, id: impl Into<Id>, mode: TermMode) -> Self {
        self.term(Term::new(id).with_mode(mode))
    }

    /// Appends a `Match` term.
    #[must_use]
    pub fn with(self, id: impl Into<Id>) -> Self {
        self.push(id, TermMode::Match)
    }

    /// Appends a `Not` term.
    #[must_use]
    pub fn without(self, id: impl Into<Id>) -> Self {
        self.push(id, TermMode::Not)
    }

    /// Appends an `Optional` term.
    #[must_use]
    pub fn optional(self, id: impl Into<Id>) -> Self {
        self.push(id, TermMode::Optional)
    }

    /// Appends an `Own` term.
    #[must_use]
    pub fn own(self, id: impl Into<Id>) -> Self {
        self.push(id, TermMode::Own)
    }

    /// Appends an `Inherit` term.
    #[must_use]
    pub fn inherit(self, id: impl Into<Id>) -> Self {
        self.push(id, TermMode::Inherit)
    }

    /// Appends a `FilterOnly` term.
    #[must_use]
    pub fn filter_only(self, id: impl Into<Id>) -> Self {
        self.push(id, TermMode::FilterOnly)
    }

    /// Sets the access of the last term. No-op on an empty builder.
    #[must_use]
    pub fn access(mut self, access: Access) -> Self {
        if let Some(last) = self.terms.last_mut() {
            last.access = access;
        }
        self
    }

    /// Chooses whether tables with shared terms come as whole batches
    /// (`true`, the default) or one row at a time.
    #[must_use]
    pub fn instanced(mut self, instanced: bool) -> Self {
        self.instanced = instanced;
        self
    }

    /// The terms collected so far.
    #[must_use]
    pub fn terms(&self) -> &[Term] {
        &self.terms
    }

    /// Returns true if the builder is instanced.
    #[must_use]
    pub fn is_instanced(&self) -> bool {
        self.instanced
    }

    /// Finishes the filter.
    #[must_use]
    pub fn build(self) -> Filter {
        Filter {
            plan: Plan::new(self.terms, self.instanced),
        }
    }
}
