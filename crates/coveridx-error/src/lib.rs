//! Error type for covered-index maintenance.
//!
//! Every crate in the workspace reports failures through [`IndexError`]. The
//! variants map onto the three failure classes a host has to tell apart:
//! reads from the primary store, index key construction, and setup-time
//! configuration. Write-path and internal failures are carried alongside.

use thiserror::Error;

/// Workspace-wide result alias.
pub type Result<T, E = IndexError> = std::result::Result<T, E>;

/// Failure raised while deriving or applying index updates.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IndexError {
    /// Reading persisted cells failed or the store was unavailable.
    ///
    /// Never retried by the engine; retry policy belongs to the store client.
    #[error("store read failed on table '{table}': {detail}")]
    StoreRead { table: String, detail: String },

    /// Applying a mutation to a table failed.
    #[error("store write failed on table '{table}': {detail}")]
    StoreWrite { table: String, detail: String },

    /// A codec could not build a valid index key or value.
    ///
    /// Aborts index derivation for the single mutation being evaluated.
    #[error("index encoding failed for index table '{index_table}': {detail}")]
    IndexEncoding { index_table: String, detail: String },

    /// Codec unresolvable or coverage configuration malformed.
    ///
    /// Fatal at setup, before any mutation is processed.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A broken internal invariant.
    #[error("internal error: {0}")]
    Internal(String),
}

impl IndexError {
    /// Build an [`IndexError::StoreRead`].
    pub fn store_read(table: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::StoreRead {
            table: table.into(),
            detail: detail.into(),
        }
    }

    /// Build an [`IndexError::StoreWrite`].
    pub fn store_write(table: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::StoreWrite {
            table: table.into(),
            detail: detail.into(),
        }
    }

    /// Build an [`IndexError::IndexEncoding`].
    pub fn encoding(index_table: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::IndexEncoding {
            index_table: index_table.into(),
            detail: detail.into(),
        }
    }

    /// Build an [`IndexError::Configuration`].
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Build an [`IndexError::Internal`].
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    #[must_use]
    pub const fn is_store_read(&self) -> bool {
        matches!(self, Self::StoreRead { .. })
    }

    #[must_use]
    pub const fn is_encoding(&self) -> bool {
        matches!(self, Self::IndexEncoding { .. })
    }

    #[must_use]
    pub const fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }

    /// Whether the failure is confined to one mutation.
    ///
    /// Read and encoding failures abort a single mutation's derivation; the
    /// batch policy decides what happens to the rest of the batch. Anything
    /// else poisons the whole batch.
    #[must_use]
    pub const fn is_mutation_scoped(&self) -> bool {
        matches!(self, Self::StoreRead { .. } | Self::IndexEncoding { .. })
    }
}
