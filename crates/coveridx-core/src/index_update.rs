//! Index writes derived from primary mutations.

use std::collections::{BTreeSet, HashSet};

use coveridx_types::{Mutation, Timestamp};

use crate::column_tracker::ColumnTracker;

/// Whether an [`IndexUpdate`] adds or removes an index entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexOperation {
    Put,
    Delete,
}

impl IndexOperation {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Put => "put",
            Self::Delete => "delete",
        }
    }
}

/// One write against an index table, together with the tracker that was
/// current when the codec derived it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexUpdate {
    table: String,
    mutation: Mutation,
    tracker: ColumnTracker,
}

impl IndexUpdate {
    pub fn new(table: impl Into<String>, mutation: Mutation, tracker: ColumnTracker) -> Self {
        Self {
            table: table.into(),
            mutation,
            tracker,
        }
    }

    #[must_use]
    pub fn table(&self) -> &str {
        &self.table
    }

    #[must_use]
    pub const fn mutation(&self) -> &Mutation {
        &self.mutation
    }

    #[must_use]
    pub const fn tracker(&self) -> &ColumnTracker {
        &self.tracker
    }

    /// Index row key.
    #[must_use]
    pub fn row(&self) -> &[u8] {
        self.mutation.row()
    }

    /// `Put` as soon as the mutation carries one put cell.
    #[must_use]
    pub fn operation(&self) -> IndexOperation {
        if self.mutation.cells().iter().any(|cell| !cell.is_tombstone()) {
            IndexOperation::Put
        } else {
            IndexOperation::Delete
        }
    }

    /// Newest cell timestamp, `None` for an empty mutation.
    #[must_use]
    pub fn timestamp(&self) -> Option<Timestamp> {
        self.mutation.cells().iter().map(|cell| cell.timestamp).max()
    }

    /// Copy of this update with every cell moved to `ts`.
    #[must_use]
    pub fn at_timestamp(&self, ts: Timestamp) -> Self {
        Self {
            table: self.table.clone(),
            mutation: self.mutation.at_timestamp(ts),
            tracker: self.tracker.clone(),
        }
    }

    /// Delete of this update's index row at `ts`: one family tombstone per
    /// family the update writes.
    #[must_use]
    pub fn compensating_delete(&self, ts: Timestamp) -> Self {
        let families: BTreeSet<&[u8]> = self
            .mutation
            .cells()
            .iter()
            .map(|cell| cell.family.as_slice())
            .collect();
        let mut mutation = Mutation::new(self.mutation.row());
        for family in families {
            mutation = mutation.delete_family(family, ts);
        }
        Self {
            table: self.table.clone(),
            mutation,
            tracker: self.tracker.clone(),
        }
    }

    fn collision_key(&self) -> Option<(&str, &[u8], Timestamp)> {
        self.timestamp()
            .map(|ts| (self.table.as_str(), self.mutation.row(), ts))
    }
}

// ---------------------------------------------------------------------------
// Update set
// ---------------------------------------------------------------------------

/// Ordered collection of updates for one mutation or batch.
///
/// [`Self::finish`] drops exact duplicates, then drops every delete that lands
/// on the same (table, row, timestamp) as a put: the tombstone would hide the
/// put at that timestamp.
#[derive(Debug, Default, Clone)]
pub struct IndexUpdateSet {
    updates: Vec<IndexUpdate>,
}

impl IndexUpdateSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, update: IndexUpdate) {
        self.updates.push(update);
    }

    pub fn extend(&mut self, updates: impl IntoIterator<Item = IndexUpdate>) {
        self.updates.extend(updates);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.updates.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.updates.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &IndexUpdate> {
        self.updates.iter()
    }

    #[must_use]
    pub fn finish(self) -> Vec<IndexUpdate> {
        let mut unique: Vec<IndexUpdate> = Vec::with_capacity(self.updates.len());
        for update in self.updates {
            let duplicate = unique
                .iter()
                .any(|kept| kept.table == update.table && kept.mutation == update.mutation);
            if !duplicate {
                unique.push(update);
            }
        }

        let put_keys: HashSet<(String, Vec<u8>, Timestamp)> = unique
            .iter()
            .filter(|update| update.operation() == IndexOperation::Put)
            .filter_map(|update| {
                update
                    .collision_key()
                    .map(|(table, row, ts)| (table.to_owned(), row.to_vec(), ts))
            })
            .collect();

        unique.retain(|update| {
            if update.operation() == IndexOperation::Put {
                return true;
            }
            match update.collision_key() {
                Some((table, row, ts)) => {
                    !put_keys.contains(&(table.to_owned(), row.to_vec(), ts))
                }
                None => false,
            }
        });
        unique
    }
}

impl IntoIterator for IndexUpdateSet {
    type Item = IndexUpdate;
    type IntoIter = std::vec::IntoIter<IndexUpdate>;

    fn into_iter(self) -> Self::IntoIter {
        self.finish().into_iter()
    }
}
