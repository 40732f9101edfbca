//! Archetype tables.
//!
//! Every distinct [`Type`] (sorted set of ids) gets exactly one [`Table`].
//! A table stores its entities row-wise and the bytes of each data-carrying
//! id column-wise. Tables are never freed, so a [`TableId`] stays valid for
//! the life of the world.

use std::collections::HashMap;
use std::fmt;

use tabula_foundation::{EntityId, Id, Layout};

// =============================================================================
// Type
// =============================================================================

/// Canonical set of ids an entity has.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Default)]
pub struct Type {
    /// Ids in ascending order, no duplicates.
    ids: Vec<Id>,
}

impl Type {
    /// Creates the empty type.
    #[must_use]
    pub fn new() -> Self {
        Self { ids: Vec::new() }
    }

    /// Creates a type from ids in any order.
    #[must_use]
    pub fn from_ids(mut ids: Vec<Id>) -> Self {
        ids.sort_unstable();
        ids.dedup();
        Self { ids }
    }

    /// Returns the ids in ascending order.
    #[must_use]
    pub fn ids(&self) -> &[Id] {
        &self.ids
    }

    /// Number of ids.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Returns true for the empty type.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Checks if this type contains an id.
    #[must_use]
    pub fn contains(&self, id: Id) -> bool {
        self.ids.binary_search(&id).is_ok()
    }

    /// Position of an id in [`Type::ids`].
    #[must_use]
    pub fn position(&self, id: Id) -> Option<usize> {
        self.ids.binary_search(&id).ok()
    }

    /// Returns a new type with the id added.
    #[must_use]
    pub fn with(&self, id: Id) -> Self {
        match self.ids.binary_search(&id) {
            Ok(_) => self.clone(),
            Err(pos) => {
                let mut ids = self.ids.clone();
                ids.insert(pos, id);
                Self { ids }
            }
        }
    }

    /// Returns a new type with the id removed.
    #[must_use]
    pub fn without(&self, id: Id) -> Self {
        let mut ids = self.ids.clone();
        if let Ok(pos) = ids.binary_search(&id) {
            ids.remove(pos);
        }
        Self { ids }
    }

    /// Returns a new type keeping only the ids `keep` accepts.
    #[must_use]
    pub fn filtered(&self, mut keep: impl FnMut(Id) -> bool) -> Self {
        Self {
            ids: self.ids.iter().copied().filter(|id| keep(*id)).collect(),
        }
    }

    /// Objects of all pairs with the given relation, in id order.
    pub fn objects(&self, relation: EntityId) -> impl Iterator<Item = EntityId> + '_ {
        self.ids
            .iter()
            .filter(move |id| id.has_relation(relation))
            .filter_map(|id| id.object())
    }

    /// Returns true if any id mentions `entity` (as itself, relation, or object).
    #[must_use]
    pub fn references(&self, entity: EntityId) -> bool {
        self.ids.iter().any(|id| id.references(entity))
    }
}

// =============================================================================
// Column
// =============================================================================

const WORD: usize = std::mem::size_of::<u128>();

/// Densely packed bytes of one id across all rows of a table.
///
/// Backed by `u128` words so every row start honors any alignment up to
/// [`tabula_foundation::MAX_ALIGN`].
#[derive(Clone, Debug)]
pub struct Column {
    id: Id,
    layout: Layout,
    words: Vec<u128>,
    len: usize,
}

impl Column {
    /// Creates an empty column for a sized id.
    #[must_use]
    pub fn new(id: Id, layout: Layout) -> Self {
        Self {
            id,
            layout,
            words: Vec::new(),
            len: 0,
        }
    }

    /// The id this column stores.
    #[must_use]
    pub fn id(&self) -> Id {
        self.id
    }

    /// Byte layout of one row.
    #[must_use]
    pub fn layout(&self) -> Layout {
        self.layout
    }

    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns true if the column has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// All rows as one contiguous byte slice.
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        let used = self.len * self.layout.size();
        &bytemuck::cast_slice::<u128, u8>(&self.words)[..used]
    }

    /// All rows as one contiguous mutable byte slice.
    pub fn bytes_mut(&mut self) -> &mut [u8] {
        let used = self.len * self.layout.size();
        &mut bytemuck::cast_slice_mut::<u128, u8>(&mut self.words)[..used]
    }

    /// Bytes of one row.
    #[must_use]
    pub fn row(&self, row: usize) -> &[u8] {
        let size = self.layout.size();
        &self.bytes()[row * size..(row + 1) * size]
    }

    /// Mutable bytes of one row.
    pub fn row_mut(&mut self, row: usize) -> &mut [u8] {
        let size = self.layout.size();
        &mut self.bytes_mut()[row * size..(row + 1) * size]
    }

    /// Reserves room for `additional` more rows.
    pub(crate) fn reserve(&mut self, additional: usize) {
        let bytes = self.len.saturating_add(additional).saturating_mul(self.layout.size());
        let words = bytes.div_ceil(WORD);
        self.words.reserve(words.saturating_sub(self.words.len()));
    }

    /// Appends a row. `value` must be exactly one row long; `None` zeroes it.
    pub(crate) fn push(&mut self, value: Option<&[u8]>) {
        let size = self.layout.size();
        let words = ((self.len + 1) * size).div_ceil(WORD);
        if self.words.len() < words {
            self.words.resize(words, 0);
        }
        self.len += 1;
        let row = self.row_mut(self.len - 1);
        match value {
            Some(bytes) => row.copy_from_slice(bytes),
            None => row.fill(0),
        }
    }

    /// Removes a row by moving the last row into its place.
    pub(crate) fn swap_remove(&mut self, row: usize) {
        let size = self.layout.size();
        let last = self.len - 1;
        if row != last {
            let bytes = bytemuck::cast_slice_mut::<u128, u8>(&mut self.words);
            bytes.copy_within(last * size..(last + 1) * size, row * size);
        }
        self.len = last;
    }
}

// =============================================================================
// Table
// =============================================================================

/// Index of a table in the world's table arena.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TableId(pub u32);

impl TableId {
    /// The table of entities with the empty type.
    pub const ROOT: TableId = TableId(0);

    /// Position in the arena.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for TableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Table({})", self.0)
    }
}

/// All entities sharing one [`Type`].
#[derive(Clone, Debug)]
pub struct Table {
    id: TableId,
    ty: Type,
    entities: Vec<EntityId>,
    columns: Vec<Column>,
    /// Column index for each position in `ty`, `None` for tags.
    column_of: Vec<Option<usize>>,
    add_edges: HashMap<Id, TableId>,
    remove_edges: HashMap<Id, TableId>,
}

impl Table {
    /// Creates an empty table. `layout` gives the column layout of each
    /// data-carrying id of `ty`.
    pub(crate) fn new(id: TableId, ty: Type, layout: impl Fn(Id) -> Option<Layout>) -> Self {
        let mut columns = Vec::new();
        let column_of = ty
            .ids()
            .iter()
            .map(|&ty_id| {
                layout(ty_id).map(|l| {
                    columns.push(Column::new(ty_id, l));
                    columns.len() - 1
                })
            })
            .collect();
        Self {
            id,
            ty,
            entities: Vec::new(),
            columns,
            column_of,
            add_edges: HashMap::new(),
            remove_edges: HashMap::new(),
        }
    }

    /// This table's id.
    #[must_use]
    pub fn id(&self) -> TableId {
        self.id
    }

    /// The type every row has.
    #[must_use]
    pub fn ty(&self) -> &Type {
        &self.ty
    }

    /// Entities, one per row.
    #[must_use]
    pub fn entities(&self) -> &[EntityId] {
        &self.entities
    }

    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Returns true if the table has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Data columns in type order.
    #[must_use]
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Column index of a data-carrying id.
    #[must_use]
    pub fn column_index(&self, id: Id) -> Option<usize> {
        self.ty.position(id).and_then(|pos| self.column_of[pos])
    }

    /// Column by index.
    #[must_use]
    pub fn column(&self, index: usize) -> Option<&Column> {
        self.columns.get(index)
    }

    /// Mutable column by index.
    pub(crate) fn column_mut(&mut self, index: usize) -> Option<&mut Column> {
        self.columns.get_mut(index)
    }

    /// Bytes of `id` at `row`, if `id` has a column here.
    #[must_use]
    pub fn get(&self, row: usize, id: Id) -> Option<&[u8]> {
        let column = self.column_index(id)?;
        Some(self.columns[column].row(row))
    }

    /// Mutable bytes of `id` at `row`, if `id` has a column here.
    pub fn get_mut(&mut self, row: usize, id: Id) -> Option<&mut [u8]> {
        let column = self.column_index(id)?;
        Some(self.columns[column].row_mut(row))
    }

    /// Cached destination when adding `id`.
    #[must_use]
    pub fn add_edge(&self, id: Id) -> Option<TableId> {
        self.add_edges.get(&id).copied()
    }

    /// Cached destination when removing `id`.
    #[must_use]
    pub fn remove_edge(&self, id: Id) -> Option<TableId> {
        self.remove_edges.get(&id).copied()
    }

    pub(crate) fn set_add_edge(&mut self, id: Id, to: TableId) {
        self.add_edges.insert(id, to);
    }

    pub(crate) fn set_remove_edge(&mut self, id: Id, to: TableId) {
        self.remove_edges.insert(id, to);
    }

    /// Appends a row. `value` supplies bytes for a column by id; columns it
    /// skips are zeroed.
    pub(crate) fn push<'a>(
        &mut self,
        entity: EntityId,
        mut value: impl FnMut(Id) -> Option<&'a [u8]>,
    ) -> usize {
        for column in &mut self.columns {
            column.push(value(column.id));
        }
        self.entities.push(entity);
        self.entities.len() - 1
    }

    /// Reserves room for `additional` rows in every column.
    pub(crate) fn reserve(&mut self, additional: usize) {
        self.entities.reserve(additional);
        for column in &mut self.columns {
            column.reserve(additional);
        }
    }

    /// Removes a row by swapping in the last one. Returns the entity that now
    /// occupies `row`, if any moved.
    pub(crate) fn swap_remove(&mut self, row: usize) -> Option<EntityId> {
        for column in &mut self.columns {
            column.swap_remove(row);
        }
        self.entities.swap_remove(row);
        self.entities.get(row).copied()
    }
}

// =============================================================================
// TableStore
// =============================================================================

/// Arena of all tables plus the lookups that find them.
#[derive(Clone, Debug)]
pub struct TableStore {
    tables: Vec<Table>,
    by_type: HashMap<Type, TableId>,
    /// Tables containing each id, ascending.
    by_id: HashMap<Id, Vec<TableId>>,
    /// Tables with at least one `IsA` pair, ascending.
    inheriting: Vec<TableId>,
}

impl TableStore {
    /// Creates a store holding only the root table.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let mut store = Self {
            tables: Vec::with_capacity(capacity),
            by_type: HashMap::new(),
            by_id: HashMap::new(),
            inheriting: Vec::new(),
        };
        store.insert(Type::new(), |_| None);
        store
    }

    /// Number of tables, including the root.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    /// Always false; the root table exists from the start.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Table by id.
    #[must_use]
    pub fn get(&self, id: TableId) -> Option<&Table> {
        self.tables.get(id.index())
    }

    /// Mutable table by id.
    pub(crate) fn get_mut(&mut self, id: TableId) -> Option<&mut Table> {
        self.tables.get_mut(id.index())
    }

    /// All tables in creation order.
    pub fn iter(&self) -> impl Iterator<Item = &Table> {
        self.tables.iter()
    }

    /// Table by id, for ids this store handed out.
    pub(crate) fn at(&self, id: TableId) -> &Table {
        &self.tables[id.index()]
    }

    pub(crate) fn at_mut(&mut self, id: TableId) -> &mut Table {
        &mut self.tables[id.index()]
    }

    /// Forgets every cached add/remove edge.
    pub(crate) fn clear_edges(&mut self) {
        for table in &mut self.tables {
            table.add_edges.clear();
            table.remove_edges.clear();
        }
    }

    /// Table holding exactly `ty`, if one was ever created.
    #[must_use]
    pub fn find(&self, ty: &Type) -> Option<TableId> {
        self.by_type.get(ty).copied()
    }

    /// Tables whose type contains `id`, ascending.
    #[must_use]
    pub fn with_id(&self, id: Id) -> &[TableId] {
        self.by_id.get(&id).map_or(&[], Vec::as_slice)
    }

    /// Tables whose type has an `IsA` pair, ascending.
    #[must_use]
    pub fn inheriting(&self) -> &[TableId] {
        &self.inheriting
    }

    /// Creates the table for `ty`. The caller checks [`TableStore::find`]
    /// first.
    ///
    /// # Panics
    ///
    /// Panics if the arena already holds `u32::MAX + 1` tables.
    pub(crate) fn insert(&mut self, ty: Type, layout: impl Fn(Id) -> Option<Layout>) -> TableId {
        let id = u32::try_from(self.tables.len())
            .map(TableId)
            .unwrap_or_else(|_| panic!("table index space exhausted"));
        for &ty_id in ty.ids() {
            self.by_id.entry(ty_id).or_default().push(id);
        }
        if ty.ids().iter().any(|i| i.has_relation(EntityId::IS_A)) {
            self.inheriting.push(id);
        }
        self.by_type.insert(ty.clone(), id);
        self.tables.push(Table::new(id, ty, layout));
        id
    }

    /// Borrows two distinct tables mutably.
    fn pair_mut(&mut self, a: TableId, b: TableId) -> (&mut Table, &mut Table) {
        debug_assert_ne!(a, b);
        if a.index() < b.index() {
            let (lo, hi) = self.tables.split_at_mut(b.index());
            (&mut lo[a.index()], &mut hi[0])
        } else {
            let (lo, hi) = self.tables.split_at_mut(a.index());
            (&mut hi[0], &mut lo[b.index()])
        }
    }

    /// Moves `row` of `from` into `to`, carrying shared columns over.
    ///
    /// `value` fills a destination column by id; remaining new columns are
    /// zeroed. Returns the new row and the entity that took `row` in `from`.
    pub(crate) fn move_row(
        &mut self,
        from: TableId,
        to: TableId,
        row: usize,
        value: Option<(Id, &[u8])>,
    ) -> (usize, Option<EntityId>) {
        let (src, dst) = self.pair_mut(from, to);
        let entity = src.entities[row];
        for column in &mut dst.columns {
            let carried = src
                .column_index(column.id)
                .map(|index| src.columns[index].row(row));
            let supplied = value.and_then(|(id, bytes)| (id == column.id).then_some(bytes));
            column.push(supplied.or(carried));
        }
        dst.entities.push(entity);
        let new_row = dst.entities.len() - 1;
        let moved = src.swap_remove(row);
        (new_row, moved)
    }
}
