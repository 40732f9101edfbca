//! Table matching shared by filters and queries.
//!
//! A [`Plan`] is a term list plus the flags that affect matching. It decides
//! which tables can possibly match from the inverted index, then checks each
//! candidate term by term and records where every term's data lives.

use std::collections::BTreeSet;
use std::sync::Arc;

use tabula_foundation::{EntityId, Id, Result};
use tabula_storage::{Table, TableId, World};

use crate::term::{Term, TermMode};

// =============================================================================
// Match Types
// =============================================================================

/// Where one term's data comes from in a matched table.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum TermSource {
    /// The table's own type holds the id; `column` is `None` for tags.
    Owned {
        /// Column index within the table.
        column: Option<usize>,
    },
    /// Inherited from a prototype; one value shared by every row.
    Shared {
        /// Prototype whose storage holds the id.
        source: EntityId,
    },
    /// Not present (`Optional` miss or `Not` term).
    Absent,
}

/// One matched table with the source of every term.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TableMatch {
    /// The matched table.
    pub table: TableId,
    /// Sources in term order.
    pub sources: Vec<TermSource>,
}

impl TableMatch {
    /// Returns true if any term is served by a prototype.
    #[must_use]
    pub fn has_shared(&self) -> bool {
        self.sources
            .iter()
            .any(|source| matches!(source, TermSource::Shared { .. }))
    }
}

// =============================================================================
// Plan
// =============================================================================

/// Compiled term list.
#[derive(Clone, Debug)]
pub struct Plan {
    terms: Arc<[Term]>,
    match_prefab: bool,
    instanced: bool,
}

impl Plan {
    /// Compiles a term list.
    ///
    /// Prefab tables are skipped unless some term's id is `Prefab`.
    #[must_use]
    pub fn new(terms: Vec<Term>, instanced: bool) -> Self {
        let match_prefab = terms
            .iter()
            .any(|term| term.id == Id::entity(EntityId::PREFAB));
        Self {
            terms: terms.into(),
            match_prefab,
            instanced,
        }
    }

    /// The terms in order.
    #[must_use]
    pub fn terms(&self) -> &[Term] {
        &self.terms
    }

    /// Shared handle to the terms.
    #[must_use]
    pub fn shared_terms(&self) -> Arc<[Term]> {
        Arc::clone(&self.terms)
    }

    /// Returns true if tables with shared terms are iterated as whole
    /// batches rather than row by row.
    #[must_use]
    pub fn instanced(&self) -> bool {
        self.instanced
    }

    /// Tables that can possibly match, ascending.
    ///
    /// Intersects the tables holding each required id; terms that accept
    /// inherited ids also admit every table with an `IsA` pair.
    #[must_use]
    pub fn candidates(&self, world: &World) -> Vec<TableId> {
        let tables = world.tables();
        let mut result: Option<BTreeSet<TableId>> = None;

        for term in self.terms.iter().filter(|term| term.mode.is_required()) {
            let mut set: BTreeSet<TableId> = match term.mode {
                TermMode::Inherit => BTreeSet::new(),
                _ => tables.with_id(term.id).iter().copied().collect(),
            };
            if term.mode.admits_inherited() {
                set.extend(tables.inheriting().iter().copied());
            }
            result = Some(match result {
                None => set,
                Some(previous) => previous.intersection(&set).copied().collect(),
            });
        }

        match result {
            Some(set) => set.into_iter().collect(),
            None => tables.iter().map(Table::id).collect(),
        }
    }

    /// Checks one table against every term.
    ///
    /// # Errors
    ///
    /// Returns `IsACycle` if resolving an inherited id meets a cycle.
    pub fn match_table(&self, world: &World, table: &Table) -> Result<Option<TableMatch>> {
        let ty = table.ty();
        if !self.match_prefab && ty.contains(Id::entity(EntityId::PREFAB)) {
            return Ok(None);
        }

        let mut sources = Vec::with_capacity(self.terms.len());
        for term in self.terms.iter() {
            let owned = ty.contains(term.id);
            let own_source = TermSource::Owned {
                column: table.column_index(term.id),
            };
            let inherited = |world: &World| -> Result<Option<TermSource>> {
                Ok(world
                    .resolve_inherited(ty, term.id)?
                    .map(|source| TermSource::Shared { source }))
            };

            let source = match term.mode {
                TermMode::Own if owned => own_source,
                TermMode::Own => return Ok(None),
                TermMode::Match | TermMode::FilterOnly if owned => own_source,
                TermMode::Match | TermMode::FilterOnly | TermMode::Inherit => {
                    if owned {
                        return Ok(None);
                    }
                    match inherited(world)? {
                        Some(shared) => shared,
                        None => return Ok(None),
                    }
                }
                TermMode::Optional if owned => own_source,
                TermMode::Optional => inherited(world)?.unwrap_or(TermSource::Absent),
                TermMode::Not => {
                    if owned || inherited(world)?.is_some() {
                        return Ok(None);
                    }
                    TermSource::Absent
                }
            };
            sources.push(source);
        }

        Ok(Some(TableMatch {
            table: table.id(),
            sources,
        }))
    }

    /// Matches every candidate table from scratch, in table order.
    ///
    /// # Errors
    ///
    /// Returns `IsACycle` if resolving an inherited id meets a cycle.
    pub fn evaluate(&self, world: &World) -> Result<Vec<TableMatch>> {
        let mut matches = Vec::new();
        for id in self.candidates(world) {
            if let Some(table) = world.table(id) {
                if let Some(matched) = self.match_table(world, table)? {
                    matches.push(matched);
                }
            }
        }
        Ok(matches)
    }
}
