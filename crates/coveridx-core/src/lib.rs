//! Covered secondary-index maintenance.
//!
//! Given primary-table mutations, derive the index puts and deletes that keep
//! every covered index correct at any historical timestamp, including for
//! writes that arrive older than the row's current state.
//!
//! The moving parts, leaves first:
//!
//! - [`Scanner`]: newest-first merge of persisted and pending cells.
//! - [`ColumnTracker`]: nearest newer timestamp for a set of columns.
//! - [`LocalTableState`]: per-mutation row view handed to codecs.
//! - [`IndexCodec`]: turns a row view into [`IndexUpdate`]s.
//! - [`IndexBuilder`]: cleanup, upsert and roll-forward per mutation.
//! - [`Indexer`]: what a host calls with a batch.

pub mod builder;
pub mod codec;
pub mod column_tracker;
pub mod config;
pub mod covered_codec;
pub mod index_update;
pub mod indexer;
pub mod metrics;
pub mod scanner;
pub mod table_state;

pub use builder::{BatchUpdates, FailedMutation, IndexBuilder, MutationUpdates};
pub use codec::{CodecFactory, CodecRegistry, IndexCodec, NoopCodec};
pub use column_tracker::{ColumnTracker, NO_NEWER_ENTRY};
pub use config::{
    CODEC_CLASS_KEY, ColumnGroupConfig, CoveredColumnConfig, DEFAULT_CODEC, FAILURE_POLICY_KEY,
    FailurePolicy, IndexerConfig,
};
pub use covered_codec::{
    ColumnGroup, CoveredColumn, CoveredColumnIndexCodec, DecomposedRowKey, INDEX_ROW_FAMILY,
};
pub use index_update::{IndexOperation, IndexUpdate, IndexUpdateSet};
pub use indexer::{Indexer, WriteReport};
pub use metrics::{IndexMetrics, IndexMetricsSnapshot};
pub use scanner::Scanner;
pub use table_state::LocalTableState;
