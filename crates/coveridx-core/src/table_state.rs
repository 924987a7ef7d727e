//! Per-mutation view of one primary row.
//!
//! A [`LocalTableState`] layers the cells of the mutation under evaluation
//! (the *pending* cells) over what the store already holds for the row, as
//! of a logical timestamp. Codecs read it through scanners; it never writes.

use coveridx_error::{IndexError, Result};
use coveridx_store::StoreReader;
use coveridx_types::{Cell, ColumnReference, LATEST_TIMESTAMP, Mutation, TimeRange, Timestamp};
use tracing::debug;

use crate::column_tracker::ColumnTracker;
use crate::scanner::Scanner;

/// Pending-over-persisted view of a single row at a logical timestamp.
pub struct LocalTableState<'a> {
    store: &'a dyn StoreReader,
    table: &'a str,
    row: Vec<u8>,
    current_ts: Timestamp,
    pending: Vec<Cell>,
    tracked: Vec<ColumnTracker>,
}

impl<'a> LocalTableState<'a> {
    /// Empty state for `row`, positioned at [`LATEST_TIMESTAMP`].
    pub fn new(store: &'a dyn StoreReader, table: &'a str, row: impl Into<Vec<u8>>) -> Self {
        Self {
            store,
            table,
            row: row.into(),
            current_ts: LATEST_TIMESTAMP,
            pending: Vec::new(),
            tracked: Vec::new(),
        }
    }

    /// State for the row `mutation` targets, with no pending cells yet.
    pub fn for_mutation(store: &'a dyn StoreReader, table: &'a str, mutation: &Mutation) -> Self {
        Self::new(store, table, mutation.row())
    }

    #[must_use]
    pub const fn table(&self) -> &str {
        self.table
    }

    #[must_use]
    pub fn current_row(&self) -> &[u8] {
        &self.row
    }

    #[must_use]
    pub const fn current_timestamp(&self) -> Timestamp {
        self.current_ts
    }

    /// Move the logical timestamp. Views built afterwards hide newer cells.
    pub fn set_current_timestamp(&mut self, ts: Timestamp) {
        self.current_ts = ts;
    }

    /// Layer `cells` on top of the pending set.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::Internal`] if a cell targets another row; the
    /// pending set is left untouched in that case.
    pub fn add_pending_updates<'c>(&mut self, cells: impl IntoIterator<Item = &'c Cell>) -> Result<()> {
        let incoming: Vec<Cell> = cells.into_iter().cloned().collect();
        if let Some(foreign) = incoming.iter().find(|cell| cell.row != self.row) {
            return Err(IndexError::internal(format!(
                "pending cell for row {:?} offered to state of row {:?}",
                String::from_utf8_lossy(&foreign.row),
                String::from_utf8_lossy(&self.row)
            )));
        }
        self.pending.extend(incoming);
        Ok(())
    }

    /// Replace the pending set.
    ///
    /// # Errors
    ///
    /// Same as [`Self::add_pending_updates`].
    pub fn set_pending_updates<'c>(&mut self, cells: impl IntoIterator<Item = &'c Cell>) -> Result<()> {
        let previous = std::mem::take(&mut self.pending);
        if let Err(err) = self.add_pending_updates(cells) {
            self.pending = previous;
            return Err(err);
        }
        Ok(())
    }

    pub fn clear_pending_updates(&mut self) {
        self.pending.clear();
    }

    #[must_use]
    pub fn pending_updates(&self) -> &[Cell] {
        &self.pending
    }

    /// View of `columns` used to build index entries.
    ///
    /// Every persisted cell of those columns newer than the logical timestamp
    /// feeds the returned tracker's boundary, and a copy of the tracker is
    /// kept in [`Self::tracked_columns`].
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::StoreRead`] when the persisted row cannot be read.
    pub fn indexed_columns_state(
        &mut self,
        columns: &[ColumnReference],
    ) -> Result<(Scanner, ColumnTracker)> {
        let persisted = self.read_persisted(columns)?;
        let mut tracker = ColumnTracker::new(columns.iter().cloned());
        for cell in persisted.iter().filter(|cell| cell.timestamp > self.current_ts) {
            tracker.set_ts(cell.timestamp);
        }
        if tracker.has_newer_timestamps() {
            debug!(
                table = self.table,
                row = %String::from_utf8_lossy(&self.row),
                ts = self.current_ts,
                boundary = tracker.ts(),
                "newer cells found for indexed columns"
            );
        }
        self.tracked.push(tracker.clone());
        let scanner = Scanner::new(persisted, self.pending_for(columns), self.current_ts);
        Ok((scanner, tracker))
    }

    /// Same visibility as [`Self::indexed_columns_state`] without tracking.
    /// Codecs use it for row context that never keys an index entry.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::StoreRead`] when the persisted row cannot be read.
    pub fn non_indexed_columns_state(&self, columns: &[ColumnReference]) -> Result<Scanner> {
        let persisted = self.read_persisted(columns)?;
        Ok(Scanner::new(persisted, self.pending_for(columns), self.current_ts))
    }

    /// Trackers handed out since the last reset, oldest first.
    #[must_use]
    pub fn tracked_columns(&self) -> &[ColumnTracker] {
        &self.tracked
    }

    pub fn reset_tracked_columns(&mut self) {
        self.tracked.clear();
    }

    fn read_persisted(&self, columns: &[ColumnReference]) -> Result<Vec<Cell>> {
        // Full range: cells above the logical timestamp are needed for the
        // boundary, the scanner hides them.
        self.store.read_row(self.table, &self.row, columns, TimeRange::all())
    }

    fn pending_for(&self, columns: &[ColumnReference]) -> Vec<Cell> {
        self.pending
            .iter()
            .filter(|cell| ColumnReference::any_matches(columns, cell))
            .cloned()
            .collect()
    }
}

impl std::fmt::Debug for LocalTableState<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalTableState")
            .field("table", &self.table)
            .field("row", &String::from_utf8_lossy(&self.row))
            .field("current_ts", &self.current_ts)
            .field("pending", &self.pending.len())
            .field("tracked", &self.tracked.len())
            .finish_non_exhaustive()
    }
}
