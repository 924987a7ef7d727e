//! Store interfaces consumed by the index engine.
//!
//! The engine only reads the primary table through [`StoreReader`] and hands
//! index writes back to the host, which applies them through
//! [`StoreWriter`]. [`MemStore`] implements both over in-memory tables.

pub mod mem_store;

use std::sync::Arc;

use coveridx_error::Result;
use coveridx_types::{Cell, ColumnReference, Mutation, TimeRange};

pub use mem_store::MemStore;

/// Versioned read access to persisted rows.
pub trait StoreReader {
    /// Every version and tombstone of `row` in `table` selected by `columns`
    /// with a timestamp inside `range`, newest first.
    ///
    /// An empty `columns` slice selects nothing.
    ///
    /// # Errors
    ///
    /// Returns [`coveridx_error::IndexError::StoreRead`] when the table is
    /// missing or unreadable.
    fn read_row(
        &self,
        table: &str,
        row: &[u8],
        columns: &[ColumnReference],
        range: TimeRange,
    ) -> Result<Vec<Cell>>;
}

/// Write access used to apply primary and index mutations.
pub trait StoreWriter {
    /// Apply every cell of `mutation` to `table` at its explicit timestamp.
    ///
    /// # Errors
    ///
    /// Returns [`coveridx_error::IndexError::StoreWrite`] when the table is
    /// missing or the write is rejected.
    fn apply(&self, table: &str, mutation: &Mutation) -> Result<()>;
}

impl<T: StoreReader + ?Sized> StoreReader for &T {
    fn read_row(
        &self,
        table: &str,
        row: &[u8],
        columns: &[ColumnReference],
        range: TimeRange,
    ) -> Result<Vec<Cell>> {
        (**self).read_row(table, row, columns, range)
    }
}

impl<T: StoreReader + ?Sized> StoreReader for Arc<T> {
    fn read_row(
        &self,
        table: &str,
        row: &[u8],
        columns: &[ColumnReference],
        range: TimeRange,
    ) -> Result<Vec<Cell>> {
        (**self).read_row(table, row, columns, range)
    }
}

impl<T: StoreWriter + ?Sized> StoreWriter for &T {
    fn apply(&self, table: &str, mutation: &Mutation) -> Result<()> {
        (**self).apply(table, mutation)
    }
}

impl<T: StoreWriter + ?Sized> StoreWriter for Arc<T> {
    fn apply(&self, table: &str, mutation: &Mutation) -> Result<()> {
        (**self).apply(table, mutation)
    }
}
