//! Derivation of index updates for primary mutations.
//!
//! For every timestamp batch of a mutation the builder
//!
//! 1. asks the codec for the deletes of the row as it stood before the
//!    batch, positioned at the batch timestamp;
//! 2. adds the batch to the pending cells and asks for upserts; each upsert
//!    whose tracker saw newer cells gets a compensating delete at that
//!    boundary;
//! 3. rolls forward through the boundaries: at each one the entry the index
//!    already holds (row without the batch) is compared with the entry the row
//!    now yields (row with the batch). Stale entries are deleted and fresh
//!    ones written, until a boundary where nothing changes.
//!
//! Each mutation is evaluated against the store alone. Mutations earlier in
//! the same batch are not visible to later ones.

use std::collections::HashSet;
use std::sync::Arc;

use coveridx_error::{IndexError, Result};
use coveridx_store::StoreReader;
use coveridx_types::{Cell, Mutation, Timestamp};
use tracing::{debug, warn};

use crate::codec::IndexCodec;
use crate::column_tracker::{ColumnTracker, NO_NEWER_ENTRY};
use crate::config::FailurePolicy;
use crate::index_update::{IndexUpdate, IndexUpdateSet};
use crate::table_state::LocalTableState;

/// Index updates derived for one primary mutation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MutationUpdates {
    /// Position of the mutation in its batch.
    pub index: usize,
    pub updates: Vec<IndexUpdate>,
    /// Compensating deletes emitted for out-of-order writes.
    pub corrections: u64,
    pub roll_forward_steps: u64,
}

/// A mutation whose derivation failed and must not be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedMutation {
    pub index: usize,
    pub error: IndexError,
}

/// Outcome of deriving a whole batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchUpdates {
    pub derived: Vec<MutationUpdates>,
    pub failed: Vec<FailedMutation>,
}

impl BatchUpdates {
    /// Every derived update, in batch order.
    pub fn updates(&self) -> impl Iterator<Item = &IndexUpdate> {
        self.derived.iter().flat_map(|mutation| mutation.updates.iter())
    }

    #[must_use]
    pub fn update_count(&self) -> usize {
        self.derived.iter().map(|mutation| mutation.updates.len()).sum()
    }

    #[must_use]
    pub fn is_failed(&self, index: usize) -> bool {
        self.failed.iter().any(|failed| failed.index == index)
    }
}

/// Drives a codec over mutations.
#[derive(Debug, Clone)]
pub struct IndexBuilder {
    codec: Arc<dyn IndexCodec>,
}

impl IndexBuilder {
    #[must_use]
    pub fn new(codec: Arc<dyn IndexCodec>) -> Self {
        Self { codec }
    }

    #[must_use]
    pub fn codec(&self) -> &dyn IndexCodec {
        self.codec.as_ref()
    }

    /// Derive the index updates for `mutation` against `table` in `store`.
    ///
    /// Cells must carry explicit timestamps. Nothing is returned on failure:
    /// the updates are a complete set or an error.
    ///
    /// # Errors
    ///
    /// [`IndexError::StoreRead`] and [`IndexError::IndexEncoding`] from the
    /// store and codec; [`IndexError::Internal`] if a cell still carries the
    /// `LATEST` sentinel.
    pub fn index_updates(
        &self,
        store: &dyn StoreReader,
        table: &str,
        mutation: &Mutation,
    ) -> Result<MutationUpdates> {
        if mutation.has_latest_timestamps() {
            return Err(IndexError::internal(
                "mutation reached the index builder with unstamped LATEST cells",
            ));
        }
        let mut derived = MutationUpdates::default();
        if mutation.is_empty() || !self.codec.is_enabled(mutation) {
            return Ok(derived);
        }

        let mut set = IndexUpdateSet::new();
        let mut state = LocalTableState::for_mutation(store, table, mutation);
        for batch in mutation.split_by_timestamp() {
            let ts = batch.timestamp;
            state.set_current_timestamp(ts);

            let cleanup = self.codec.index_deletes(&mut state)?;
            set.extend(cleanup.iter().map(|delete| delete.at_timestamp(ts)));
            // A batch that leaves no upsert (an old tombstone) still changes
            // the row at every newer boundary the codec looked at.
            let mut next_ts = nearest_boundary(state.tracked_columns(), ts);
            state.reset_tracked_columns();

            let prior_pending = state.pending_updates().to_vec();
            state.add_pending_updates(batch.cells.iter())?;
            let upserts = self.codec.index_upserts(&mut state)?;
            next_ts = next_ts.min(nearest_boundary(state.tracked_columns(), ts));
            state.reset_tracked_columns();

            for upsert in upserts {
                if upsert.tracker().has_newer_timestamps() {
                    let boundary = upsert.tracker().ts();
                    debug!(
                        index_table = upsert.table(),
                        ts,
                        boundary,
                        "back-in-time write, compensating delete at boundary"
                    );
                    set.add(upsert.compensating_delete(boundary));
                    derived.corrections += 1;
                    next_ts = next_ts.min(boundary);
                }
                set.add(upsert);
            }

            if next_ts != NO_NEWER_ENTRY {
                self.roll_forward(
                    store,
                    table,
                    mutation.row(),
                    &prior_pending,
                    state.pending_updates(),
                    next_ts,
                    &mut set,
                    &mut derived,
                )?;
            }
        }

        derived.updates = set.finish();
        debug!(
            table,
            row = %String::from_utf8_lossy(mutation.row()),
            updates = derived.updates.len(),
            corrections = derived.corrections,
            "index updates derived"
        );
        Ok(derived)
    }

    #[allow(clippy::too_many_arguments)]
    fn roll_forward(
        &self,
        store: &dyn StoreReader,
        table: &str,
        row: &[u8],
        without: &[Cell],
        with: &[Cell],
        first_step: Timestamp,
        set: &mut IndexUpdateSet,
        derived: &mut MutationUpdates,
    ) -> Result<()> {
        let mut step = first_step;
        while step != NO_NEWER_ENTRY {
            derived.roll_forward_steps += 1;

            let mut before = LocalTableState::new(store, table, row);
            before.set_pending_updates(without)?;
            before.set_current_timestamp(step);
            let stale = self.codec.index_deletes(&mut before)?;

            let mut after = LocalTableState::new(store, table, row);
            after.set_pending_updates(with)?;
            after.set_current_timestamp(step);
            let fresh = self.codec.index_upserts(&mut after)?;

            let fresh_keys: HashSet<(&str, &[u8])> =
                fresh.iter().map(|update| (update.table(), update.row())).collect();
            let stale_keys: HashSet<(&str, &[u8])> =
                stale.iter().map(|update| (update.table(), update.row())).collect();
            let unchanged = fresh_keys == stale_keys;
            debug!(table, step, unchanged, "roll-forward step");

            // Re-writing the fresh entries cancels any compensating delete
            // that landed on an entry still valid at this step.
            for update in &fresh {
                set.add(update.at_timestamp(step));
            }
            if unchanged {
                break;
            }

            for update in stale
                .iter()
                .filter(|update| !fresh_keys.contains(&(update.table(), update.row())))
            {
                set.add(update.at_timestamp(step));
            }

            let mut next = nearest_boundary(before.tracked_columns(), step)
                .min(nearest_boundary(after.tracked_columns(), step));
            for update in &fresh {
                let boundary = update.tracker().ts();
                if update.tracker().has_newer_timestamps() && boundary > step {
                    set.add(update.compensating_delete(boundary));
                    derived.corrections += 1;
                    next = next.min(boundary);
                }
            }
            step = next;
        }
        Ok(())
    }

    /// Derive updates for every mutation of a batch.
    ///
    /// Under [`FailurePolicy::AbortBatch`] the first failure is returned.
    /// Under [`FailurePolicy::SkipMutation`] mutation-scoped failures
    /// (store reads, encoding) are recorded and the batch continues; any
    /// other error still aborts.
    ///
    /// # Errors
    ///
    /// The first failure that the policy does not absorb.
    pub fn batch_index_updates(
        &self,
        store: &dyn StoreReader,
        table: &str,
        mutations: &[Mutation],
        policy: FailurePolicy,
    ) -> Result<BatchUpdates> {
        let mut batch = BatchUpdates::default();
        for (index, mutation) in mutations.iter().enumerate() {
            match self.index_updates(store, table, mutation) {
                Ok(mut derived) => {
                    derived.index = index;
                    batch.derived.push(derived);
                }
                Err(error) if policy == FailurePolicy::SkipMutation && error.is_mutation_scoped() => {
                    warn!(
                        table,
                        index,
                        row = %String::from_utf8_lossy(mutation.row()),
                        error = %error,
                        "index derivation failed, mutation refused"
                    );
                    batch.failed.push(FailedMutation { index, error });
                }
                Err(error) => return Err(error),
            }
        }
        Ok(batch)
    }
}

/// Nearest timestamp newer than `after` recorded by any of `trackers`.
fn nearest_boundary(trackers: &[ColumnTracker], after: Timestamp) -> Timestamp {
    trackers
        .iter()
        .filter(|tracker| tracker.has_newer_timestamps() && tracker.ts() > after)
        .map(ColumnTracker::ts)
        .min()
        .unwrap_or(NO_NEWER_ENTRY)
}
