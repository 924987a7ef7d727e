//! Versioned cells and time ranges.

use std::cmp::Ordering;

/// Logical timestamp of a cell version.
pub type Timestamp = i64;

/// Sentinel for "stamp with the current time at evaluation".
pub const LATEST_TIMESTAMP: Timestamp = i64::MAX;

/// What a cell does to its column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CellKind {
    /// A value.
    Put,
    /// Masks every version of one qualifier at or below the timestamp.
    DeleteColumn,
    /// Masks every version of every qualifier in the family at or below the
    /// timestamp.
    DeleteFamily,
}

impl CellKind {
    #[must_use]
    pub const fn is_tombstone(self) -> bool {
        !matches!(self, Self::Put)
    }
}

/// One version of one column of one row.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Cell {
    pub row: Vec<u8>,
    pub family: Vec<u8>,
    /// Empty for [`CellKind::DeleteFamily`].
    pub qualifier: Vec<u8>,
    pub timestamp: Timestamp,
    pub kind: CellKind,
    /// Empty for tombstones.
    pub value: Vec<u8>,
}

impl Cell {
    pub fn put(
        row: impl Into<Vec<u8>>,
        family: impl Into<Vec<u8>>,
        qualifier: impl Into<Vec<u8>>,
        timestamp: Timestamp,
        value: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            row: row.into(),
            family: family.into(),
            qualifier: qualifier.into(),
            timestamp,
            kind: CellKind::Put,
            value: value.into(),
        }
    }

    pub fn delete_column(
        row: impl Into<Vec<u8>>,
        family: impl Into<Vec<u8>>,
        qualifier: impl Into<Vec<u8>>,
        timestamp: Timestamp,
    ) -> Self {
        Self {
            row: row.into(),
            family: family.into(),
            qualifier: qualifier.into(),
            timestamp,
            kind: CellKind::DeleteColumn,
            value: Vec::new(),
        }
    }

    pub fn delete_family(
        row: impl Into<Vec<u8>>,
        family: impl Into<Vec<u8>>,
        timestamp: Timestamp,
    ) -> Self {
        Self {
            row: row.into(),
            family: family.into(),
            qualifier: Vec::new(),
            timestamp,
            kind: CellKind::DeleteFamily,
            value: Vec::new(),
        }
    }

    #[must_use]
    pub const fn is_tombstone(&self) -> bool {
        self.kind.is_tombstone()
    }

    /// Whether `self` is a tombstone that hides `other`.
    ///
    /// A tombstone hides cells of its row and column (or whole family) whose
    /// timestamp is at or below its own, including a put at the same
    /// timestamp.
    #[must_use]
    pub fn masks(&self, other: &Self) -> bool {
        if self.row != other.row || self.family != other.family {
            return false;
        }
        if other.timestamp > self.timestamp {
            return false;
        }
        match self.kind {
            CellKind::Put => false,
            CellKind::DeleteColumn => self.qualifier == other.qualifier,
            CellKind::DeleteFamily => true,
        }
    }
}

/// Scan order: newest first, and at equal timestamps tombstones before puts
/// so masking is decided before any same-timestamp value is emitted.
#[must_use]
pub fn descending_order(a: &Cell, b: &Cell) -> Ordering {
    b.timestamp
        .cmp(&a.timestamp)
        .then_with(|| b.is_tombstone().cmp(&a.is_tombstone()))
}

/// Half-open timestamp interval `[min, max)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimeRange {
    min: Timestamp,
    max: Timestamp,
}

impl TimeRange {
    /// Every timestamp.
    #[must_use]
    pub const fn all() -> Self {
        Self {
            min: Timestamp::MIN,
            max: Timestamp::MAX,
        }
    }

    /// `[min, max)`; `None` when `min > max`.
    #[must_use]
    pub const fn new(min: Timestamp, max: Timestamp) -> Option<Self> {
        if min > max {
            None
        } else {
            Some(Self { min, max })
        }
    }

    /// Everything visible to a reader positioned at `ts`: `[MIN, ts]`.
    #[must_use]
    pub const fn as_of(ts: Timestamp) -> Self {
        Self {
            min: Timestamp::MIN,
            max: ts.saturating_add(1),
        }
    }

    #[must_use]
    pub const fn min(self) -> Timestamp {
        self.min
    }

    #[must_use]
    pub const fn max(self) -> Timestamp {
        self.max
    }

    #[must_use]
    pub const fn contains(self, ts: Timestamp) -> bool {
        ts >= self.min && ts < self.max
    }
}

impl Default for TimeRange {
    fn default() -> Self {
        Self::all()
    }
}
