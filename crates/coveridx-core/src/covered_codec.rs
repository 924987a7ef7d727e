//! Covered-column index codec.
//!
//! Each column group maps a list of primary columns to one index table. The
//! index row key is
//!
//! ```text
//! value_0 | value_1 | ... | value_n-1 | primary row | len_0 | ... | len_n-1 | n
//! ```
//!
//! where every `len_i` and `n` are big-endian `u32`, and an absent column
//! contributes an empty value. The index row carries one empty-valued cell per
//! present column in family [`INDEX_ROW_FAMILY`], qualified by the primary
//! column's `family:qualifier`.

use coveridx_error::{IndexError, Result};
use coveridx_types::{Cell, ColumnReference, Mutation, Timestamp};
use smallvec::SmallVec;
use tracing::debug;

use crate::codec::IndexCodec;
use crate::column_tracker::ColumnTracker;
use crate::config::IndexerConfig;
use crate::index_update::IndexUpdate;
use crate::table_state::LocalTableState;

/// Family of every cell written to an index row.
pub const INDEX_ROW_FAMILY: &[u8] = b"0";

const LENGTH_WIDTH: usize = std::mem::size_of::<u32>();

/// One primary column covered by a group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoveredColumn {
    reference: ColumnReference,
    required: bool,
}

impl CoveredColumn {
    #[must_use]
    pub const fn new(reference: ColumnReference, required: bool) -> Self {
        Self {
            reference,
            required,
        }
    }

    #[must_use]
    pub const fn reference(&self) -> &ColumnReference {
        &self.reference
    }

    #[must_use]
    pub const fn is_required(&self) -> bool {
        self.required
    }
}

/// Primary columns indexed together into one index table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnGroup {
    table: String,
    columns: Vec<CoveredColumn>,
}

/// Parts of an index row key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecomposedRowKey {
    pub values: Vec<Vec<u8>>,
    pub primary_row: Vec<u8>,
}

impl ColumnGroup {
    pub fn new(table: impl Into<String>, columns: impl IntoIterator<Item = CoveredColumn>) -> Self {
        Self {
            table: table.into(),
            columns: columns.into_iter().collect(),
        }
    }

    #[must_use]
    pub fn table(&self) -> &str {
        &self.table
    }

    #[must_use]
    pub fn columns(&self) -> &[CoveredColumn] {
        &self.columns
    }

    #[must_use]
    pub fn references(&self) -> Vec<ColumnReference> {
        self.columns.iter().map(|column| column.reference.clone()).collect()
    }

    /// Build the index row key for `values` (one per column, in group order).
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::IndexEncoding`] when a value or the column count
    /// does not fit the `u32` length fields.
    pub fn compose_row_key(&self, values: &[&[u8]], primary_row: &[u8]) -> Result<Vec<u8>> {
        let payload: usize = values.iter().map(|value| value.len()).sum();
        let mut key =
            Vec::with_capacity(payload + primary_row.len() + (values.len() + 1) * LENGTH_WIDTH);
        for value in values {
            key.extend_from_slice(value);
        }
        key.extend_from_slice(primary_row);
        for value in values {
            key.extend_from_slice(&self.encode_length(value.len())?.to_be_bytes());
        }
        key.extend_from_slice(&self.encode_length(values.len())?.to_be_bytes());
        Ok(key)
    }

    /// Split an index row key built by [`Self::compose_row_key`].
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::IndexEncoding`] when the trailer is truncated or
    /// the lengths exceed the key.
    pub fn decompose_row_key(&self, key: &[u8]) -> Result<DecomposedRowKey> {
        let count = self.read_length(key, key.len().checked_sub(LENGTH_WIDTH))?;
        let trailer = count
            .checked_add(1)
            .and_then(|slots| slots.checked_mul(LENGTH_WIDTH))
            .filter(|trailer| *trailer <= key.len())
            .ok_or_else(|| self.malformed(key, "length trailer exceeds key"))?;
        let lengths_start = key.len() - trailer;

        let mut lengths = Vec::with_capacity(count);
        for slot in 0..count {
            lengths.push(self.read_length(key, Some(lengths_start + slot * LENGTH_WIDTH))?);
        }
        let payload = lengths
            .iter()
            .try_fold(0usize, |total, len| total.checked_add(*len))
            .filter(|payload| *payload <= lengths_start)
            .ok_or_else(|| self.malformed(key, "value lengths exceed key"))?;

        let mut values = Vec::with_capacity(count);
        let mut offset = 0;
        for len in lengths {
            values.push(key[offset..offset + len].to_vec());
            offset += len;
        }
        Ok(DecomposedRowKey {
            values,
            primary_row: key[payload..lengths_start].to_vec(),
        })
    }

    fn encode_length(&self, len: usize) -> Result<u32> {
        u32::try_from(len).map_err(|_| {
            IndexError::encoding(
                self.table.clone(),
                format!("length {len} does not fit a u32 length field"),
            )
        })
    }

    fn read_length(&self, key: &[u8], at: Option<usize>) -> Result<usize> {
        let bytes: [u8; LENGTH_WIDTH] = at
            .and_then(|start| key.get(start..start + LENGTH_WIDTH))
            .and_then(|slice| slice.try_into().ok())
            .ok_or_else(|| self.malformed(key, "truncated length field"))?;
        usize::try_from(u32::from_be_bytes(bytes))
            .map_err(|_| self.malformed(key, "length does not fit usize"))
    }

    fn malformed(&self, key: &[u8], detail: &str) -> IndexError {
        IndexError::encoding(
            self.table.clone(),
            format!("malformed index row key ({} bytes): {detail}", key.len()),
        )
    }
}

// ---------------------------------------------------------------------------
// Codec
// ---------------------------------------------------------------------------

/// Entry derived for one group from a row state.
struct GroupEntry {
    key: Vec<u8>,
    qualifiers: SmallVec<[Vec<u8>; 4]>,
    tracker: ColumnTracker,
}

/// Codec maintaining one covered index per configured column group.
#[derive(Debug, Clone)]
pub struct CoveredColumnIndexCodec {
    groups: Vec<ColumnGroup>,
}

impl CoveredColumnIndexCodec {
    pub const NAME: &'static str = "covered-columns";

    /// # Errors
    ///
    /// Returns [`IndexError::Configuration`] when no group is configured.
    pub fn new(groups: Vec<ColumnGroup>) -> Result<Self> {
        if groups.is_empty() {
            return Err(IndexError::configuration(
                "covered-columns codec needs at least one column group",
            ));
        }
        Ok(Self { groups })
    }

    /// Build from the `groups` section of an indexer configuration.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::Configuration`] if the configuration is invalid
    /// or has no groups.
    pub fn from_config(config: &IndexerConfig) -> Result<Self> {
        config.validate()?;
        let groups = config
            .groups
            .iter()
            .map(|group| {
                ColumnGroup::new(
                    group.table.clone(),
                    group
                        .columns
                        .iter()
                        .map(|column| CoveredColumn::new(column.reference(), column.required)),
                )
            })
            .collect();
        Self::new(groups)
    }

    #[must_use]
    pub fn groups(&self) -> &[ColumnGroup] {
        &self.groups
    }

    /// Current entry of `group`, `Ok(None)` when the row has no visible
    /// covered value (or, with `strict == false`, lacks a required one).
    fn current_entry(
        group: &ColumnGroup,
        state: &mut LocalTableState<'_>,
        strict: bool,
    ) -> Result<Option<GroupEntry>> {
        let references = group.references();
        let (scanner, tracker) = state.indexed_columns_state(&references)?;

        let mut newest: SmallVec<[Option<Cell>; 4]> = SmallVec::from_elem(None, group.columns.len());
        for cell in scanner {
            for (slot, column) in group.columns.iter().enumerate() {
                if newest[slot].is_none() && column.reference.matches_cell(&cell) {
                    newest[slot] = Some(cell.clone());
                }
            }
            if newest.iter().all(Option::is_some) {
                break;
            }
        }

        if newest.iter().all(Option::is_none) {
            return Ok(None);
        }
        if let Some(missing) = group
            .columns
            .iter()
            .zip(&newest)
            .find(|(column, cell)| column.required && cell.is_none())
            .map(|(column, _)| column)
        {
            if strict {
                return Err(IndexError::encoding(
                    group.table.clone(),
                    format!(
                        "required column {} has no value in row {:?}",
                        missing.reference,
                        String::from_utf8_lossy(state.current_row())
                    ),
                ));
            }
            return Ok(None);
        }

        let values: SmallVec<[&[u8]; 4]> = newest
            .iter()
            .map(|cell| cell.as_ref().map_or(&[][..], |cell| cell.value.as_slice()))
            .collect();
        let key = group.compose_row_key(&values, state.current_row())?;
        let qualifiers = newest
            .iter()
            .flatten()
            .map(|cell| {
                let mut qualifier = cell.family.clone();
                qualifier.push(b':');
                qualifier.extend_from_slice(&cell.qualifier);
                qualifier
            })
            .collect();
        Ok(Some(GroupEntry {
            key,
            qualifiers,
            tracker,
        }))
    }
}

impl IndexCodec for CoveredColumnIndexCodec {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn index_deletes(&self, state: &mut LocalTableState<'_>) -> Result<Vec<IndexUpdate>> {
        let ts = state.current_timestamp();
        let mut updates = Vec::new();
        for group in &self.groups {
            // An entry that could never be written needs no delete.
            let Some(entry) = Self::current_entry(group, state, false)? else {
                continue;
            };
            debug!(index_table = %group.table, ts, "covered index delete");
            let mutation = Mutation::new(entry.key).delete_family(INDEX_ROW_FAMILY, ts);
            updates.push(IndexUpdate::new(group.table.clone(), mutation, entry.tracker));
        }
        Ok(updates)
    }

    fn index_upserts(&self, state: &mut LocalTableState<'_>) -> Result<Vec<IndexUpdate>> {
        let ts: Timestamp = state.current_timestamp();
        let mut updates = Vec::new();
        for group in &self.groups {
            let Some(entry) = Self::current_entry(group, state, true)? else {
                continue;
            };
            debug!(index_table = %group.table, ts, "covered index upsert");
            let mut mutation = Mutation::new(entry.key);
            for qualifier in entry.qualifiers {
                mutation = mutation.put(INDEX_ROW_FAMILY, qualifier, ts, Vec::<u8>::new());
            }
            updates.push(IndexUpdate::new(group.table.clone(), mutation, entry.tracker));
        }
        Ok(updates)
    }

    fn is_enabled(&self, mutation: &Mutation) -> bool {
        self.groups.iter().any(|group| {
            let references = group.references();
            mutation
                .cells()
                .iter()
                .any(|cell| ColumnReference::any_matches(&references, cell))
        })
    }
}
