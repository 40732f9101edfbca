//! Batch iteration over matched tables.
//!
//! An [`Iter`] is a cursor. It never holds a borrow of the world between
//! calls; each call takes the world again. While the iterator lives it holds
//! an [`IterationToken`], so the world refuses structural changes that would
//! move the rows a batch points at.

use std::sync::Arc;

use tabula_foundation::{EntityId, Error, ErrorKind, Result};
use tabula_storage::{IterationToken, Location, Table, TableId, World};

use crate::plan::{TableMatch, TermSource};
use crate::term::Term;

/// Lifecycle of an iterator.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum IterState {
    /// Created, `next` not called yet.
    Created,
    /// A batch is available.
    Active,
    /// Every matched table was visited.
    Exhausted,
}

/// Current batch: a row range of one matched table.
#[derive(Clone, Debug)]
struct Batch {
    matched: usize,
    offset: usize,
    count: usize,
    /// Row of each shared term's prototype, resolved when the batch starts.
    shared: Vec<Option<Location>>,
}

/// Cursor over the tables a filter or query matched.
#[derive(Debug)]
pub struct Iter {
    terms: Arc<[Term]>,
    instanced: bool,
    matches: Vec<TableMatch>,
    next_match: usize,
    /// Row-by-row progress through a table with shared terms:
    /// `(match index, next row, row count at entry)`.
    rows: Option<(usize, usize, usize)>,
    batch: Option<Batch>,
    state: IterState,
    token: Option<IterationToken>,
}

impl Iter {
    /// Creates an iterator over `matches` and takes the world's iteration
    /// token.
    #[must_use]
    pub fn new(world: &World, terms: Arc<[Term]>, instanced: bool, matches: Vec<TableMatch>) -> Self {
        Self {
            terms,
            instanced,
            matches,
            next_match: 0,
            rows: None,
            batch: None,
            state: IterState::Created,
            token: Some(world.begin_iteration()),
        }
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> IterState {
        self.state
    }

    /// Number of terms.
    #[must_use]
    pub fn term_count(&self) -> usize {
        self.terms.len()
    }

    /// Number of rows in the current batch; 0 when not active.
    #[must_use]
    pub fn count(&self) -> usize {
        self.batch.as_ref().map_or(0, |batch| batch.count)
    }

    /// Table of the current batch.
    #[must_use]
    pub fn table(&self) -> Option<TableId> {
        self.batch
            .as_ref()
            .map(|batch| self.matches[batch.matched].table)
    }

    /// Advances to the next non-empty batch.
    ///
    /// Returns `false` once every matched table was visited; the iterator
    /// then releases its token and stays exhausted.
    ///
    /// # Errors
    ///
    /// Returns `Internal` if `world` is not the world this iterator was
    /// created from.
    pub fn next(&mut self, world: &World) -> Result<bool> {
        if self.state == IterState::Exhausted {
            return Ok(false);
        }
        self.check_world(world)?;

        loop {
            if let Some((matched, row, end)) = self.rows {
                if row < end {
                    self.rows = Some((matched, row + 1, end));
                    self.start_batch(world, matched, row, 1);
                    return Ok(true);
                }
                self.rows = None;
            }

            let Some(matched) = self.matches.get(self.next_match) else {
                self.finish();
                return Ok(false);
            };
            let index = self.next_match;
            self.next_match += 1;

            let len = world.table(matched.table).map_or(0, Table::len);
            if len == 0 {
                continue;
            }
            if !self.instanced && matched.has_shared() {
                self.rows = Some((index, 0, len));
                continue;
            }
            self.start_batch(world, index, 0, len);
            return Ok(true);
        }
    }

    fn start_batch(&mut self, world: &World, matched: usize, offset: usize, count: usize) {
        let shared = self.matches[matched]
            .sources
            .iter()
            .map(|source| match source {
                TermSource::Shared { source } => world.location(*source),
                _ => None,
            })
            .collect();
        self.batch = Some(Batch {
            matched,
            offset,
            count,
            shared,
        });
        self.state = IterState::Active;
    }

    fn finish(&mut self) {
        self.batch = None;
        self.state = IterState::Exhausted;
        self.token = None;
    }

    fn check_world(&self, world: &World) -> Result<()> {
        match &self.token {
            Some(token) if !world.issued(token) => Err(Error::new(ErrorKind::Internal(
                "iterator used with a world it was not created from".to_string(),
            ))),
            _ => Ok(()),
        }
    }

    /// Validates a term index for data access and returns the batch.
    fn output_term(&self, index: usize) -> Result<&Batch> {
        let Some(batch) = &self.batch else {
            return Err(Error::new(ErrorKind::IteratorNotActive));
        };
        let Some(term) = self.terms.get(index) else {
            return Err(Error::new(ErrorKind::TermIndexOutOfRange {
                index,
                count: self.terms.len(),
            }));
        };
        if !term.mode.produces_data() {
            return Err(Error::new(ErrorKind::TermNotInOutput(index)));
        }
        Ok(batch)
    }

    fn source(&self, batch: &Batch, index: usize) -> TermSource {
        self.matches[batch.matched].sources[index]
    }

    /// Entities of the current batch.
    ///
    /// # Errors
    ///
    /// Returns `IteratorNotActive` outside a batch.
    pub fn entities<'w>(&self, world: &'w World) -> Result<&'w [EntityId]> {
        self.check_world(world)?;
        let Some(batch) = &self.batch else {
            return Err(Error::new(ErrorKind::IteratorNotActive));
        };
        let table = world
            .table(self.matches[batch.matched].table)
            .ok_or_else(|| Error::new(ErrorKind::Internal("matched table vanished".to_string())))?;
        Ok(&table.entities()[batch.offset..batch.offset + batch.count])
    }

    /// Data of a term for the current batch.
    ///
    /// Owned terms span `count` values back to back; shared terms span
    /// exactly one value for the caller to broadcast. Tags and absent
    /// optional terms give an empty slice.
    ///
    /// # Errors
    ///
    /// Returns `IteratorNotActive` outside a batch, `TermIndexOutOfRange`
    /// past the last term, and `TermNotInOutput` for `FilterOnly`/`Not`
    /// terms.
    pub fn data<'w>(&self, world: &'w World, index: usize) -> Result<&'w [u8]> {
        self.check_world(world)?;
        let batch = self.output_term(index)?;
        let table_id = self.matches[batch.matched].table;

        match self.source(batch, index) {
            TermSource::Owned { column: Some(column) } => {
                let column = world
                    .table(table_id)
                    .and_then(|table| table.column(column))
                    .ok_or_else(|| Error::new(ErrorKind::Internal("missing column".to_string())))?;
                let size = column.layout().size();
                Ok(&column.bytes()[batch.offset * size..(batch.offset + batch.count) * size])
            }
            TermSource::Shared { .. } => {
                let id = self.terms[index].id;
                Ok(batch.shared[index]
                    .and_then(|at| world.table(at.table)?.get(at.row, id))
                    .unwrap_or(&[]))
            }
            TermSource::Owned { column: None } | TermSource::Absent => Ok(&[]),
        }
    }

    /// Mutable data of an owned term for the current batch.
    ///
    /// # Errors
    ///
    /// Returns the errors of [`Iter::data`], plus `TermNotWritable` for `In`
    /// terms and for shared terms.
    pub fn data_mut<'w>(&self, world: &'w mut World, index: usize) -> Result<&'w mut [u8]> {
        self.check_world(world)?;
        let batch = self.output_term(index)?;
        if !self.terms[index].access.is_writable() {
            return Err(Error::new(ErrorKind::TermNotWritable(index)));
        }
        let table_id = self.matches[batch.matched].table;

        match self.source(batch, index) {
            TermSource::Owned { column: Some(column) } => {
                let (offset, count) = (batch.offset, batch.count);
                let size = world.size_of(self.terms[index].id)?;
                let bytes = world
                    .column_mut(table_id, column)
                    .ok_or_else(|| Error::new(ErrorKind::Internal("missing column".to_string())))?;
                Ok(&mut bytes[offset * size..(offset + count) * size])
            }
            TermSource::Shared { .. } => Err(Error::new(ErrorKind::TermNotWritable(index))),
            TermSource::Owned { column: None } | TermSource::Absent => Ok(&mut []),
        }
    }

    /// Returns true if the term comes from the table's own storage.
    ///
    /// # Errors
    ///
    /// Same as [`Iter::data`].
    pub fn is_owned(&self, world: &World, index: usize) -> Result<bool> {
        self.check_world(world)?;
        let batch = self.output_term(index)?;
        Ok(matches!(self.source(batch, index), TermSource::Owned { .. }))
    }

    /// Returns true if the term is present (own or inherited).
    ///
    /// # Errors
    ///
    /// Same as [`Iter::data`].
    pub fn is_set(&self, world: &World, index: usize) -> Result<bool> {
        self.check_world(world)?;
        let batch = self.output_term(index)?;
        Ok(!matches!(self.source(batch, index), TermSource::Absent))
    }

    /// Byte size of one value of the term; 0 for tags and absent terms.
    ///
    /// # Errors
    ///
    /// Same as [`Iter::data`].
    pub fn term_size(&self, world: &World, index: usize) -> Result<usize> {
        self.check_world(world)?;
        let batch = self.output_term(index)?;
        match self.source(batch, index) {
            TermSource::Owned { column: None } | TermSource::Absent => Ok(0),
            TermSource::Owned { column: Some(_) } | TermSource::Shared { .. } => {
                world.size_of(self.terms[index].id)
            }
        }
    }
}
