//! Primary-table mutations.

use std::collections::BTreeMap;

use coveridx_error::{IndexError, Result};
use smallvec::SmallVec;

use crate::cell::{Cell, LATEST_TIMESTAMP, Timestamp};

/// Cells of one mutation sharing a single timestamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimestampBatch {
    pub timestamp: Timestamp,
    pub cells: SmallVec<[Cell; 4]>,
}

/// A write against one primary-table row.
///
/// Cells may carry different timestamps, and may be puts or tombstones.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mutation {
    row: Vec<u8>,
    cells: Vec<Cell>,
}

impl Mutation {
    pub fn new(row: impl Into<Vec<u8>>) -> Self {
        Self {
            row: row.into(),
            cells: Vec::new(),
        }
    }

    /// Add a put cell.
    #[must_use]
    pub fn put(
        mut self,
        family: impl Into<Vec<u8>>,
        qualifier: impl Into<Vec<u8>>,
        timestamp: Timestamp,
        value: impl Into<Vec<u8>>,
    ) -> Self {
        let cell = Cell::put(self.row.clone(), family, qualifier, timestamp, value);
        self.cells.push(cell);
        self
    }

    /// Add a column tombstone.
    #[must_use]
    pub fn delete_column(
        mut self,
        family: impl Into<Vec<u8>>,
        qualifier: impl Into<Vec<u8>>,
        timestamp: Timestamp,
    ) -> Self {
        let cell = Cell::delete_column(self.row.clone(), family, qualifier, timestamp);
        self.cells.push(cell);
        self
    }

    /// Add a family tombstone.
    #[must_use]
    pub fn delete_family(mut self, family: impl Into<Vec<u8>>, timestamp: Timestamp) -> Self {
        let cell = Cell::delete_family(self.row.clone(), family, timestamp);
        self.cells.push(cell);
        self
    }

    /// Append an already-built cell.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::Internal`] when the cell belongs to another row.
    pub fn push(&mut self, cell: Cell) -> Result<()> {
        if cell.row != self.row {
            return Err(IndexError::internal(format!(
                "cell row {:?} does not match mutation row {:?}",
                String::from_utf8_lossy(&cell.row),
                String::from_utf8_lossy(&self.row)
            )));
        }
        self.cells.push(cell);
        Ok(())
    }

    #[must_use]
    pub fn row(&self) -> &[u8] {
        &self.row
    }

    #[must_use]
    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    #[must_use]
    pub fn into_cells(self) -> Vec<Cell> {
        self.cells
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    #[must_use]
    pub fn has_latest_timestamps(&self) -> bool {
        self.cells.iter().any(|cell| cell.timestamp == LATEST_TIMESTAMP)
    }

    /// Replace every [`LATEST_TIMESTAMP`] with `now`; returns how many cells
    /// were stamped.
    pub fn stamp_latest(&mut self, now: Timestamp) -> usize {
        let mut stamped = 0;
        for cell in &mut self.cells {
            if cell.timestamp == LATEST_TIMESTAMP {
                cell.timestamp = now;
                stamped += 1;
            }
        }
        stamped
    }

    /// Copy with every cell moved to `ts`.
    #[must_use]
    pub fn at_timestamp(&self, ts: Timestamp) -> Self {
        let mut copy = self.clone();
        for cell in &mut copy.cells {
            cell.timestamp = ts;
        }
        copy
    }

    /// Group cells by timestamp, oldest batch first. Cell order within a batch
    /// follows insertion order.
    #[must_use]
    pub fn split_by_timestamp(&self) -> Vec<TimestampBatch> {
        let mut grouped: BTreeMap<Timestamp, SmallVec<[Cell; 4]>> = BTreeMap::new();
        for cell in &self.cells {
            grouped.entry(cell.timestamp).or_default().push(cell.clone());
        }
        grouped
            .into_iter()
            .map(|(timestamp, cells)| TimestampBatch { timestamp, cells })
            .collect()
    }
}
