//! Lazy merge of persisted and pending cells, newest first.

use std::iter::Peekable;
use std::vec::IntoIter;

use coveridx_types::{Cell, Timestamp, descending_order};

/// Single-pass reader over the visible cells of one row.
///
/// Built from two runs: cells already in the store and cells pending in the
/// batch under evaluation. The runs are merged on the fly in descending
/// timestamp order. On a timestamp tie a tombstone comes first (it masks the
/// same-timestamp put), then pending cells before persisted ones. Cells newer
/// than the read timestamp are skipped, tombstones are consumed to hide the
/// versions they mask and are never yielded.
///
/// A scanner cannot be rewound; build a new one from the table state.
#[derive(Debug)]
pub struct Scanner {
    pending: Peekable<IntoIter<Cell>>,
    persisted: Peekable<IntoIter<Cell>>,
    read_ts: Timestamp,
    tombstones: Vec<Cell>,
    peeked: Option<Option<Cell>>,
}

impl Scanner {
    pub(crate) fn new(mut persisted: Vec<Cell>, mut pending: Vec<Cell>, read_ts: Timestamp) -> Self {
        // Stable sorts keep insertion order among identical keys.
        persisted.sort_by(descending_order);
        pending.sort_by(descending_order);
        Self {
            pending: pending.into_iter().peekable(),
            persisted: persisted.into_iter().peekable(),
            read_ts,
            tombstones: Vec::new(),
            peeked: None,
        }
    }

    /// A scanner that yields nothing.
    #[must_use]
    pub fn empty() -> Self {
        Self::new(Vec::new(), Vec::new(), Timestamp::MAX)
    }

    /// Next visible cell, or `None` at the end of the sequence.
    pub fn next_cell(&mut self) -> Option<Cell> {
        if let Some(peeked) = self.peeked.take() {
            return peeked;
        }
        self.advance()
    }

    /// Look at the next visible cell without consuming it.
    pub fn peek(&mut self) -> Option<&Cell> {
        if self.peeked.is_none() {
            let next = self.advance();
            self.peeked = Some(next);
        }
        self.peeked.as_ref().and_then(Option::as_ref)
    }

    fn advance(&mut self) -> Option<Cell> {
        while let Some(cell) = self.next_merged() {
            if cell.timestamp > self.read_ts {
                continue;
            }
            if cell.is_tombstone() {
                self.tombstones.push(cell);
                continue;
            }
            if self.tombstones.iter().any(|tombstone| tombstone.masks(&cell)) {
                continue;
            }
            return Some(cell);
        }
        None
    }

    fn next_merged(&mut self) -> Option<Cell> {
        let take_pending = match (self.pending.peek(), self.persisted.peek()) {
            (Some(pending), Some(persisted)) => descending_order(pending, persisted).is_le(),
            (Some(_), None) => true,
            (None, Some(_)) => false,
            (None, None) => return None,
        };
        if take_pending {
            self.pending.next()
        } else {
            self.persisted.next()
        }
    }
}

impl Iterator for Scanner {
    type Item = Cell;

    fn next(&mut self) -> Option<Cell> {
        self.next_cell()
    }
}
