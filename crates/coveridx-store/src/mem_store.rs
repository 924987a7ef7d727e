//! In-memory versioned store.
//!
//! Models the visibility rules the engine relies on: every version is kept,
//! tombstones hide same-column (or same-family) versions at or below their
//! timestamp, and readers see only cells inside their time range. Tables are
//! guarded by one `parking_lot::RwLock`; the lock stands in for the host's
//! row-level exclusion during commit.

use std::collections::{BTreeMap, BTreeSet};

use coveridx_error::{IndexError, Result};
use coveridx_types::{Cell, ColumnReference, Mutation, TimeRange, descending_order};
use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::{StoreReader, StoreWriter};

/// One table: row key → every stored cell, newest first.
#[derive(Debug, Default)]
struct MemTable {
    rows: BTreeMap<Vec<u8>, Vec<Cell>>,
}

impl MemTable {
    fn insert(&mut self, cell: Cell) {
        let cells = self.rows.entry(cell.row.clone()).or_default();
        if let Some(existing) = cells.iter_mut().find(|existing| {
            existing.family == cell.family
                && existing.qualifier == cell.qualifier
                && existing.timestamp == cell.timestamp
                && existing.kind == cell.kind
        }) {
            // Same version written twice: last write wins.
            *existing = cell;
            return;
        }
        cells.push(cell);
        cells.sort_by(descending_order);
    }
}

#[derive(Debug, Default)]
struct Inner {
    tables: BTreeMap<String, MemTable>,
    failing_reads: BTreeSet<String>,
    failing_writes: BTreeSet<String>,
}

/// In-memory implementation of [`StoreReader`] and [`StoreWriter`].
#[derive(Debug, Default)]
pub struct MemStore {
    inner: RwLock<Inner>,
}

impl MemStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store with the given tables already created.
    pub fn with_tables<I, S>(tables: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let store = Self::new();
        for table in tables {
            store.create_table(table);
        }
        store
    }

    /// Create `name`; returns `false` if it already existed.
    pub fn create_table(&self, name: impl Into<String>) -> bool {
        let mut inner = self.inner.write();
        let name = name.into();
        if inner.tables.contains_key(&name) {
            return false;
        }
        inner.tables.insert(name, MemTable::default());
        true
    }

    #[must_use]
    pub fn has_table(&self, name: &str) -> bool {
        self.inner.read().tables.contains_key(name)
    }

    /// Make every read of `table` fail (or succeed again).
    pub fn fail_reads(&self, table: impl Into<String>, failing: bool) {
        let mut inner = self.inner.write();
        let table = table.into();
        if failing {
            inner.failing_reads.insert(table);
        } else {
            inner.failing_reads.remove(&table);
        }
    }

    /// Make every write to `table` fail (or succeed again).
    pub fn fail_writes(&self, table: impl Into<String>, failing: bool) {
        let mut inner = self.inner.write();
        let table = table.into();
        if failing {
            inner.failing_writes.insert(table);
        } else {
            inner.failing_writes.remove(&table);
        }
    }

    /// Every stored cell of `row`, tombstones included, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::StoreRead`] if the table is missing or failing.
    pub fn raw_cells(&self, table: &str, row: &[u8]) -> Result<Vec<Cell>> {
        let inner = self.inner.read();
        let mem_table = Self::readable(&inner, table)?;
        Ok(mem_table.rows.get(row).cloned().unwrap_or_default())
    }

    /// Newest visible put of every column of `row` within `range`.
    ///
    /// Tombstones outside `range` are ignored, so a reader positioned before
    /// a delete still sees the value it hides.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::StoreRead`] if the table is missing or failing.
    pub fn get(&self, table: &str, row: &[u8], range: TimeRange) -> Result<Vec<Cell>> {
        let inner = self.inner.read();
        let mem_table = Self::readable(&inner, table)?;
        Ok(mem_table
            .rows
            .get(row)
            .map(|cells| latest_visible(cells, range))
            .unwrap_or_default())
    }

    /// Every row of `table` with at least one visible cell within `range`,
    /// in row-key order, each with its newest visible cells.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::StoreRead`] if the table is missing or failing.
    pub fn scan(&self, table: &str, range: TimeRange) -> Result<Vec<(Vec<u8>, Vec<Cell>)>> {
        let inner = self.inner.read();
        let mem_table = Self::readable(&inner, table)?;
        Ok(mem_table
            .rows
            .iter()
            .filter_map(|(row, cells)| {
                let visible = latest_visible(cells, range);
                (!visible.is_empty()).then(|| (row.clone(), visible))
            })
            .collect())
    }

    /// Number of stored cells (all versions, tombstones included).
    #[must_use]
    pub fn cell_count(&self, table: &str) -> usize {
        self.inner
            .read()
            .tables
            .get(table)
            .map_or(0, |mem_table| mem_table.rows.values().map(Vec::len).sum())
    }

    fn readable<'a>(inner: &'a Inner, table: &str) -> Result<&'a MemTable> {
        if inner.failing_reads.contains(table) {
            warn!(table, "injected read failure");
            return Err(IndexError::store_read(table, "table unavailable"));
        }
        inner
            .tables
            .get(table)
            .ok_or_else(|| IndexError::store_read(table, "no such table"))
    }
}

/// Newest visible put per `(family, qualifier)` among `cells` (sorted newest
/// first) restricted to `range`.
fn latest_visible(cells: &[Cell], range: TimeRange) -> Vec<Cell> {
    let mut tombstones: Vec<&Cell> = Vec::new();
    let mut seen: BTreeSet<(&[u8], &[u8])> = BTreeSet::new();
    let mut visible = Vec::new();
    for cell in cells.iter().filter(|cell| range.contains(cell.timestamp)) {
        if cell.is_tombstone() {
            tombstones.push(cell);
            continue;
        }
        if tombstones.iter().any(|tombstone| tombstone.masks(cell)) {
            continue;
        }
        if seen.insert((cell.family.as_slice(), cell.qualifier.as_slice())) {
            visible.push(cell.clone());
        }
    }
    visible
}

impl StoreReader for MemStore {
    fn read_row(
        &self,
        table: &str,
        row: &[u8],
        columns: &[ColumnReference],
        range: TimeRange,
    ) -> Result<Vec<Cell>> {
        let inner = self.inner.read();
        let mem_table = Self::readable(&inner, table)?;
        let cells: Vec<Cell> = mem_table
            .rows
            .get(row)
            .map(|cells| {
                cells
                    .iter()
                    .filter(|cell| range.contains(cell.timestamp))
                    .filter(|cell| ColumnReference::any_matches(columns, cell))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        debug!(
            table,
            row = %String::from_utf8_lossy(row),
            cells = cells.len(),
            "store read"
        );
        Ok(cells)
    }
}

impl StoreWriter for MemStore {
    fn apply(&self, table: &str, mutation: &Mutation) -> Result<()> {
        let mut inner = self.inner.write();
        if inner.failing_writes.contains(table) {
            warn!(table, "injected write failure");
            return Err(IndexError::store_write(table, "table unavailable"));
        }
        let mem_table = inner
            .tables
            .get_mut(table)
            .ok_or_else(|| IndexError::store_write(table, "no such table"))?;
        for cell in mutation.cells() {
            mem_table.insert(cell.clone());
        }
        debug!(
            table,
            row = %String::from_utf8_lossy(mutation.row()),
            cells = mutation.cells().len(),
            "store write"
        );
        Ok(())
    }
}
