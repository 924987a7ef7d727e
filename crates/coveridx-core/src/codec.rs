//! Codec contract and the registry that resolves codecs by name.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use coveridx_error::{IndexError, Result};
use coveridx_types::Mutation;
use tracing::debug;

use crate::config::IndexerConfig;
use crate::covered_codec::CoveredColumnIndexCodec;
use crate::index_update::IndexUpdate;
use crate::table_state::LocalTableState;

/// Derives index writes from a row state.
///
/// Implementations must not write to the store; everything they learn comes
/// from the [`LocalTableState`] they are handed. An error aborts the
/// mutation under evaluation, and nothing a failing call produced is kept.
pub trait IndexCodec: Send + Sync + fmt::Debug {
    /// Registry name, as used in `index.codec.class`.
    fn name(&self) -> &str;

    /// Deletes that remove the index entries of the row state as it is now.
    ///
    /// # Errors
    ///
    /// Store read or key encoding failures.
    fn index_deletes(&self, state: &mut LocalTableState<'_>) -> Result<Vec<IndexUpdate>>;

    /// Puts for the index entries of the row state as it is now.
    ///
    /// # Errors
    ///
    /// Store read or key encoding failures.
    fn index_upserts(&self, state: &mut LocalTableState<'_>) -> Result<Vec<IndexUpdate>>;

    /// Whether `mutation` needs indexing at all.
    fn is_enabled(&self, _mutation: &Mutation) -> bool {
        true
    }
}

/// Codec that derives nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopCodec;

impl NoopCodec {
    pub const NAME: &'static str = "noop";
}

impl IndexCodec for NoopCodec {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn index_deletes(&self, _state: &mut LocalTableState<'_>) -> Result<Vec<IndexUpdate>> {
        Ok(Vec::new())
    }

    fn index_upserts(&self, _state: &mut LocalTableState<'_>) -> Result<Vec<IndexUpdate>> {
        Ok(Vec::new())
    }

    fn is_enabled(&self, _mutation: &Mutation) -> bool {
        false
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Builds a codec from the table's configuration.
pub type CodecFactory = Arc<dyn Fn(&IndexerConfig) -> Result<Arc<dyn IndexCodec>> + Send + Sync>;

/// Codec factories keyed by name.
#[derive(Clone, Default)]
pub struct CodecRegistry {
    factories: BTreeMap<String, CodecFactory>,
}

impl CodecRegistry {
    /// Empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding `covered-columns` and `noop`.
    #[must_use]
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.factories.insert(
            CoveredColumnIndexCodec::NAME.to_owned(),
            Arc::new(|config: &IndexerConfig| -> Result<Arc<dyn IndexCodec>> {
                let codec: Arc<dyn IndexCodec> = Arc::new(CoveredColumnIndexCodec::from_config(config)?);
                Ok(codec)
            }),
        );
        registry.factories.insert(
            NoopCodec::NAME.to_owned(),
            Arc::new(|_: &IndexerConfig| -> Result<Arc<dyn IndexCodec>> {
                let codec: Arc<dyn IndexCodec> = Arc::new(NoopCodec);
                Ok(codec)
            }),
        );
        registry
    }

    /// Add a factory under `name`.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::Configuration`] if the name is empty or taken.
    pub fn register<F>(&mut self, name: impl Into<String>, factory: F) -> Result<()>
    where
        F: Fn(&IndexerConfig) -> Result<Arc<dyn IndexCodec>> + Send + Sync + 'static,
    {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(IndexError::configuration("codec name must not be empty"));
        }
        if self.factories.contains_key(&name) {
            return Err(IndexError::configuration(format!(
                "codec already registered: {name}"
            )));
        }
        debug!(codec = %name, "codec registered");
        self.factories.insert(name, Arc::new(factory));
        Ok(())
    }

    /// Build the codec named by `config.codec`.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::Configuration`] when no factory has that name,
    /// or whatever the factory itself reports.
    pub fn resolve(&self, config: &IndexerConfig) -> Result<Arc<dyn IndexCodec>> {
        let factory = self.factories.get(&config.codec).ok_or_else(|| {
            IndexError::configuration(format!(
                "unknown codec {:?}; registered: {}",
                config.codec,
                self.names().join(", ")
            ))
        })?;
        factory(config)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Registered names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.factories.keys().map(String::as_str).collect()
    }
}

impl fmt::Debug for CodecRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CodecRegistry")
            .field("codecs", &self.names())
            .finish()
    }
}
