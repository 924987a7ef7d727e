//! Coverage boundary for one set of indexed columns.

use coveridx_types::{Cell, ColumnReference, Timestamp};
use smallvec::SmallVec;

/// Boundary value meaning "nothing newer is known for these columns".
pub const NO_NEWER_ENTRY: Timestamp = Timestamp::MAX;

/// Tracks the nearest timestamp, newer than the evaluation timestamp, at which
/// any of `columns` changes.
///
/// An index entry derived at time `T` stays valid until that boundary; when
/// one exists the entry needs a compensating delete positioned there. The
/// tracker is a plain value scoped to one evaluation: it is never shared
/// between mutations unless the caller threads it through explicitly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnTracker {
    columns: SmallVec<[ColumnReference; 4]>,
    ts: Timestamp,
}

impl ColumnTracker {
    pub fn new(columns: impl IntoIterator<Item = ColumnReference>) -> Self {
        Self {
            columns: columns.into_iter().collect(),
            ts: NO_NEWER_ENTRY,
        }
    }

    #[must_use]
    pub fn columns(&self) -> &[ColumnReference] {
        &self.columns
    }

    /// Record an observed newer timestamp. The nearest one wins.
    pub fn set_ts(&mut self, ts: Timestamp) {
        self.ts = self.ts.min(ts);
    }

    #[must_use]
    pub const fn ts(&self) -> Timestamp {
        self.ts
    }

    #[must_use]
    pub const fn has_newer_timestamps(&self) -> bool {
        self.ts != NO_NEWER_ENTRY
    }

    /// Forget the boundary, as for a fresh mutation.
    pub fn reset(&mut self) {
        self.ts = NO_NEWER_ENTRY;
    }

    /// Whether `column` falls under one of the tracked references.
    ///
    /// A family-wide reference covers every column of its family; a literal
    /// reference covers only itself.
    #[must_use]
    pub fn covers(&self, column: &ColumnReference) -> bool {
        self.columns.iter().any(|tracked| {
            tracked == column || (tracked.is_family_wide() && tracked.matches_family(column.family()))
        })
    }

    #[must_use]
    pub fn covers_cell(&self, cell: &Cell) -> bool {
        ColumnReference::any_matches(&self.columns, cell)
    }

    #[must_use]
    pub const fn is_newest(ts: Timestamp) -> bool {
        ts == NO_NEWER_ENTRY
    }
}
