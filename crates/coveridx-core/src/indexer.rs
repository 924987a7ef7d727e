//! Host-facing entry point.
//!
//! A host opens one [`Indexer`] per primary table and hands it each mutation
//! batch before commit. The indexer stamps `LATEST` cells, derives index
//! updates, writes them, and only then writes the primary mutations whose
//! derivation succeeded.

use std::sync::Arc;

use coveridx_error::Result;
use coveridx_store::{StoreReader, StoreWriter};
use coveridx_types::{Clock, Mutation, Timestamp};
use tracing::{debug, error, info};

use crate::builder::{BatchUpdates, FailedMutation, IndexBuilder};
use crate::codec::{CodecRegistry, IndexCodec};
use crate::config::{FailurePolicy, IndexerConfig};
use crate::metrics::IndexMetrics;

/// Result of [`Indexer::write_batch`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteReport {
    /// Primary mutations written.
    pub applied: usize,
    /// Primary mutations refused because their index derivation failed.
    pub refused: Vec<FailedMutation>,
    /// Index mutations written.
    pub index_updates: usize,
}

/// Index maintenance for one primary table.
#[derive(Debug)]
pub struct Indexer {
    table: String,
    config: IndexerConfig,
    builder: IndexBuilder,
    clock: Arc<dyn Clock>,
    metrics: IndexMetrics,
}

impl Indexer {
    /// Validate `config` and resolve its codec through `registry`.
    ///
    /// # Errors
    ///
    /// Returns [`coveridx_error::IndexError::Configuration`] for an invalid
    /// configuration or an unknown codec.
    pub fn open(
        table: impl Into<String>,
        config: IndexerConfig,
        registry: &CodecRegistry,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        let table = table.into();
        config.validate()?;
        let codec = registry.resolve(&config)?;
        info!(
            table = %table,
            codec = codec.name(),
            groups = config.groups.len(),
            failure_policy = %config.failure_policy,
            "indexer opened"
        );
        Ok(Self {
            table,
            config,
            builder: IndexBuilder::new(codec),
            clock,
            metrics: IndexMetrics::new(),
        })
    }

    #[must_use]
    pub fn table(&self) -> &str {
        &self.table
    }

    #[must_use]
    pub const fn config(&self) -> &IndexerConfig {
        &self.config
    }

    #[must_use]
    pub fn codec(&self) -> &dyn IndexCodec {
        self.builder.codec()
    }

    #[must_use]
    pub const fn failure_policy(&self) -> FailurePolicy {
        self.config.failure_policy
    }

    #[must_use]
    pub const fn metrics(&self) -> &IndexMetrics {
        &self.metrics
    }

    /// Replace `LATEST` timestamps with the clock's current time. One reading
    /// covers the whole batch; returns it.
    pub fn stamp(&self, mutations: &mut [Mutation]) -> Timestamp {
        let now = self.clock.now();
        let stamped: usize = mutations
            .iter_mut()
            .map(|mutation| mutation.stamp_latest(now))
            .sum();
        if stamped > 0 {
            debug!(table = %self.table, now, stamped, "stamped LATEST cells");
        }
        now
    }

    /// Stamp the batch and derive its index updates without writing.
    ///
    /// # Errors
    ///
    /// The first failure the configured [`FailurePolicy`] does not absorb.
    pub fn prepare_batch(
        &self,
        store: &dyn StoreReader,
        mutations: &mut [Mutation],
    ) -> Result<BatchUpdates> {
        self.stamp(mutations);
        let outcome = self.builder.batch_index_updates(
            store,
            &self.table,
            mutations,
            self.config.failure_policy,
        );
        let batch = match outcome {
            Ok(batch) => batch,
            Err(err) => {
                self.metrics.record_failed();
                error!(
                    table = %self.table,
                    mutations = mutations.len(),
                    error = %err,
                    "index derivation aborted the batch"
                );
                return Err(err);
            }
        };

        for derived in &batch.derived {
            self.metrics.record_indexed();
            self.metrics.record_corrections(derived.corrections);
            self.metrics.record_roll_forward_steps(derived.roll_forward_steps);
            for update in &derived.updates {
                self.metrics.record_update(update.operation());
            }
        }
        for _ in &batch.failed {
            self.metrics.record_failed();
        }
        info!(
            table = %self.table,
            mutations = mutations.len(),
            index_updates = batch.update_count(),
            refused = batch.failed.len(),
            "batch indexed"
        );
        Ok(batch)
    }

    /// Index and commit a batch: index writes first, then the primary
    /// mutations that were not refused.
    ///
    /// # Errors
    ///
    /// Derivation failures per [`Self::prepare_batch`] (nothing is written),
    /// and [`coveridx_error::IndexError::StoreWrite`] from either write
    /// phase.
    pub fn write_batch<S>(&self, store: &S, mutations: &mut [Mutation]) -> Result<WriteReport>
    where
        S: StoreReader + StoreWriter,
    {
        let batch = self.prepare_batch(store, mutations)?;

        let mut report = WriteReport::default();
        for update in batch.updates() {
            store.apply(update.table(), update.mutation())?;
            debug!(
                index_table = update.table(),
                operation = update.operation().as_str(),
                ts = update.timestamp(),
                "index update written"
            );
            report.index_updates += 1;
        }
        for (index, mutation) in mutations.iter().enumerate() {
            if batch.is_failed(index) {
                continue;
            }
            store.apply(&self.table, mutation)?;
            report.applied += 1;
        }
        report.refused = batch.failed;
        debug!(
            table = %self.table,
            applied = report.applied,
            refused = report.refused.len(),
            index_updates = report.index_updates,
            "batch written"
        );
        Ok(report)
    }
}
