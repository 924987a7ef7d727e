//! Column references: a family plus a qualifier or the family-wide wildcard.

use std::fmt;

use crate::cell::{Cell, CellKind};

/// Qualifier half of a [`ColumnReference`].
///
/// `All` sorts before every literal qualifier and is never equal to one.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Qualifier {
    /// Every qualifier in the family.
    All,
    /// One literal qualifier.
    Named(Vec<u8>),
}

impl Qualifier {
    /// Whether this qualifier selects `qualifier`.
    #[must_use]
    pub fn matches(&self, qualifier: &[u8]) -> bool {
        match self {
            Self::All => true,
            Self::Named(name) => name.as_slice() == qualifier,
        }
    }
}

/// Immutable column identifier used as coverage and scan granularity.
///
/// Equality and ordering are by `(family, qualifier)`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ColumnReference {
    family: Vec<u8>,
    qualifier: Qualifier,
}

impl ColumnReference {
    /// Reference a single `family:qualifier` column.
    pub fn new(family: impl Into<Vec<u8>>, qualifier: impl Into<Vec<u8>>) -> Self {
        Self {
            family: family.into(),
            qualifier: Qualifier::Named(qualifier.into()),
        }
    }

    /// Reference every qualifier in `family`.
    pub fn family_wide(family: impl Into<Vec<u8>>) -> Self {
        Self {
            family: family.into(),
            qualifier: Qualifier::All,
        }
    }

    #[must_use]
    pub fn family(&self) -> &[u8] {
        &self.family
    }

    #[must_use]
    pub const fn qualifier(&self) -> &Qualifier {
        &self.qualifier
    }

    #[must_use]
    pub const fn is_family_wide(&self) -> bool {
        matches!(self.qualifier, Qualifier::All)
    }

    #[must_use]
    pub fn matches_family(&self, family: &[u8]) -> bool {
        self.family.as_slice() == family
    }

    /// Whether this reference selects the `family:qualifier` column.
    #[must_use]
    pub fn matches(&self, family: &[u8], qualifier: &[u8]) -> bool {
        self.matches_family(family) && self.qualifier.matches(qualifier)
    }

    /// Whether `cell` is relevant to a scan over this reference.
    ///
    /// Family tombstones carry no qualifier; they are relevant to every
    /// reference in their family.
    #[must_use]
    pub fn matches_cell(&self, cell: &Cell) -> bool {
        match cell.kind {
            CellKind::DeleteFamily => self.matches_family(&cell.family),
            CellKind::Put | CellKind::DeleteColumn => self.matches(&cell.family, &cell.qualifier),
        }
    }

    /// Whether any reference in `columns` selects `cell`.
    #[must_use]
    pub fn any_matches(columns: &[Self], cell: &Cell) -> bool {
        columns.iter().any(|column| column.matches_cell(cell))
    }
}

impl fmt::Display for ColumnReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:", String::from_utf8_lossy(&self.family))?;
        match &self.qualifier {
            Qualifier::All => f.write_str("*"),
            Qualifier::Named(name) => f.write_str(&String::from_utf8_lossy(name)),
        }
    }
}
