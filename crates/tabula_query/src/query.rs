//! Cached queries.
//!
//! A [`Query`] evaluates its terms once, then keeps the match list current by
//! reading the world's storage events:
//!
//! - `TableCreated` checks the new table alone.
//! - `PrototypeChanged` re-checks every table that carries an `IsA` pair,
//!   since any of them may inherit through the changed prototype.
//!
//! Whether a table matches depends only on its own type and on the types of
//! its prototypes, so those two events are enough to stay equal to a
//! from-scratch [`Filter`](crate::Filter) evaluation.

use tabula_foundation::{EntityId, Result};
use tabula_storage::{StorageEvent, Subscription, Table, TableId, World};
use tracing::trace;

use crate::filter::Filter;
use crate::iter::Iter;
use crate::plan::{Plan, TableMatch};
use crate::term::Term;

/// A filter with an incrementally maintained match list.
#[derive(Debug)]
pub struct Query {
    plan: Plan,
    matches: Vec<TableMatch>,
    subscription: Subscription,
    /// Set when an incremental update failed; forces a full evaluation.
    stale: bool,
}

impl Query {
    /// Creates an instanced query and evaluates it.
    ///
    /// # Errors
    ///
    /// Returns `IsACycle` if resolving an inherited id meets a cycle.
    pub fn new(world: &mut World, terms: Vec<Term>) -> Result<Self> {
        Self::with_plan(world, Plan::new(terms, true))
    }

    /// Creates a query with the same terms and flags as `filter`.
    ///
    /// # Errors
    ///
    /// Returns `IsACycle` if resolving an inherited id meets a cycle.
    pub fn from_filter(world: &mut World, filter: &Filter) -> Result<Self> {
        Self::with_plan(world, filter.plan().clone())
    }

    fn with_plan(world: &mut World, plan: Plan) -> Result<Self> {
        let subscription = world.subscribe();
        let matches = plan.evaluate(world)?;
        Ok(Self {
            plan,
            matches,
            subscription,
            stale: false,
        })
    }

    /// The terms in order.
    #[must_use]
    pub fn terms(&self) -> &[Term] {
        self.plan.terms()
    }

    /// Applies storage events received since the last refresh.
    ///
    /// # Errors
    ///
    /// Returns `IsACycle` if resolving an inherited id meets a cycle. The
    /// next refresh then evaluates from scratch.
    pub fn refresh(&mut self, world: &World) -> Result<()> {
        let events = world.read_events(&self.subscription);
        if self.stale {
            return self.rebuild(world);
        }

        let mut prototypes_changed = false;
        let mut created = Vec::new();
        for event in events {
            match event {
                StorageEvent::TableCreated(table) => created.push(table),
                StorageEvent::PrototypeChanged(_) => prototypes_changed = true,
            }
        }

        if let Err(error) = self.apply(world, &created, prototypes_changed) {
            self.stale = true;
            return Err(error);
        }
        trace!(
            created = created.len(),
            prototypes_changed,
            matches = self.matches.len(),
            "query refreshed"
        );
        Ok(())
    }

    fn rebuild(&mut self, world: &World) -> Result<()> {
        self.stale = true;
        self.matches = self.plan.evaluate(world)?;
        self.stale = false;
        trace!(matches = self.matches.len(), "query rebuilt");
        Ok(())
    }

    fn apply(&mut self, world: &World, created: &[TableId], prototypes_changed: bool) -> Result<()> {
        for &id in created {
            self.revise(world, id)?;
        }
        if prototypes_changed {
            for &id in world.tables().inheriting() {
                self.revise(world, id)?;
            }
        }
        Ok(())
    }

    /// Re-checks one table and inserts, replaces, or drops its entry.
    fn revise(&mut self, world: &World, id: TableId) -> Result<()> {
        let Some(table) = world.table(id) else {
            return Ok(());
        };
        let matched = self.plan.match_table(world, table)?;
        let position = self.matches.binary_search_by_key(&id, |entry| entry.table);
        match (position, matched) {
            (Ok(index), Some(matched)) => self.matches[index] = matched,
            (Ok(index), None) => {
                self.matches.remove(index);
            }
            (Err(index), Some(matched)) => self.matches.insert(index, matched),
            (Err(_), None) => {}
        }
        Ok(())
    }

    /// Current matches, ordered by table id.
    ///
    /// # Errors
    ///
    /// Same as [`Query::refresh`].
    pub fn matches(&mut self, world: &World) -> Result<&[TableMatch]> {
        self.refresh(world)?;
        Ok(&self.matches)
    }

    /// Refreshes and returns an iterator over the matches.
    ///
    /// # Errors
    ///
    /// Same as [`Query::refresh`].
    pub fn iter(&mut self, world: &World) -> Result<Iter> {
        self.refresh(world)?;
        Ok(Iter::new(
            world,
            self.plan.shared_terms(),
            self.plan.instanced(),
            self.matches.clone(),
        ))
    }

    /// Number of entities in the matched tables.
    ///
    /// # Errors
    ///
    /// Same as [`Query::refresh`].
    pub fn count(&mut self, world: &World) -> Result<usize> {
        self.refresh(world)?;
        Ok(self
            .matches
            .iter()
            .filter_map(|matched| world.table(matched.table))
            .map(Table::len)
            .sum())
    }

    /// Every matched entity, in iteration order.
    ///
    /// # Errors
    ///
    /// Same as [`Query::refresh`].
    pub fn entities(&mut self, world: &World) -> Result<Vec<EntityId>> {
        self.refresh(world)?;
        Ok(self
            .matches
            .iter()
            .filter_map(|matched| world.table(matched.table))
            .flat_map(|table| table.entities().iter().copied())
            .collect())
    }
}
