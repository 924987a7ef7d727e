//! Indexer configuration.
//!
//! Loaded either from TOML text or from the flat `key = value` properties a
//! host keeps in its table descriptor:
//!
//! ```text
//! index.codec.class     = covered-columns
//! index.failure.policy  = skip_mutation
//! index.group.0.table   = idx_by_name
//! index.group.0.columns = info:name!, info:*
//! ```
//!
//! A trailing `!` marks a column as required; `family:*` covers the whole
//! family.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use coveridx_error::{IndexError, Result};
use coveridx_types::ColumnReference;
use serde::{Deserialize, Serialize};

/// Name of the codec used when the configuration does not choose one.
pub const DEFAULT_CODEC: &str = "covered-columns";

pub const CODEC_CLASS_KEY: &str = "index.codec.class";
pub const FAILURE_POLICY_KEY: &str = "index.failure.policy";
const GROUP_PREFIX: &str = "index.group.";

// ---------------------------------------------------------------------------
// Failure policy
// ---------------------------------------------------------------------------

/// What a batch does when one of its mutations fails index derivation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Fail the whole batch with the first error.
    #[default]
    AbortBatch,
    /// Record the failure, refuse that mutation, keep going.
    SkipMutation,
}

impl FailurePolicy {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AbortBatch => "abort_batch",
            Self::SkipMutation => "skip_mutation",
        }
    }

    /// Parse the property form.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::Configuration`] for an unknown policy name.
    pub fn parse(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "abort_batch" | "abort" => Ok(Self::AbortBatch),
            "skip_mutation" | "skip" => Ok(Self::SkipMutation),
            other => Err(IndexError::configuration(format!(
                "unknown failure policy: {other}"
            ))),
        }
    }
}

impl fmt::Display for FailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Column groups
// ---------------------------------------------------------------------------

/// One covered column. No qualifier means the whole family.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CoveredColumnConfig {
    pub family: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qualifier: Option<String>,
    #[serde(default)]
    pub required: bool,
}

impl CoveredColumnConfig {
    pub fn new(family: impl Into<String>, qualifier: impl Into<String>) -> Self {
        Self {
            family: family.into(),
            qualifier: Some(qualifier.into()),
            required: false,
        }
    }

    pub fn family_wide(family: impl Into<String>) -> Self {
        Self {
            family: family.into(),
            qualifier: None,
            required: false,
        }
    }

    #[must_use]
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    #[must_use]
    pub fn reference(&self) -> ColumnReference {
        match &self.qualifier {
            Some(qualifier) => ColumnReference::new(self.family.as_bytes(), qualifier.as_bytes()),
            None => ColumnReference::family_wide(self.family.as_bytes()),
        }
    }

    fn parse(raw: &str) -> Result<Self> {
        let (column, required) = match raw.strip_suffix('!') {
            Some(rest) => (rest.trim_end(), true),
            None => (raw, false),
        };
        let (family, qualifier) = column.split_once(':').ok_or_else(|| {
            IndexError::configuration(format!("column {raw:?} is not family:qualifier"))
        })?;
        let qualifier = match qualifier {
            "*" => None,
            named => Some(named.to_owned()),
        };
        Ok(Self {
            family: family.to_owned(),
            qualifier,
            required,
        })
    }

    fn render(&self) -> String {
        let qualifier = self.qualifier.as_deref().unwrap_or("*");
        let marker = if self.required { "!" } else { "" };
        format!("{}:{qualifier}{marker}", self.family)
    }
}

/// Columns maintained together in one index table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ColumnGroupConfig {
    pub table: String,
    pub columns: Vec<CoveredColumnConfig>,
}

impl ColumnGroupConfig {
    pub fn new(
        table: impl Into<String>,
        columns: impl IntoIterator<Item = CoveredColumnConfig>,
    ) -> Self {
        Self {
            table: table.into(),
            columns: columns.into_iter().collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Indexer configuration
// ---------------------------------------------------------------------------

/// Per-table indexer setup, resolved once when the table opens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IndexerConfig {
    #[serde(rename = "index.codec.class", default = "default_codec")]
    pub codec: String,
    #[serde(default)]
    pub failure_policy: FailurePolicy,
    #[serde(default)]
    pub groups: Vec<ColumnGroupConfig>,
}

fn default_codec() -> String {
    DEFAULT_CODEC.to_owned()
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self {
            codec: default_codec(),
            failure_policy: FailurePolicy::default(),
            groups: Vec::new(),
        }
    }
}

impl IndexerConfig {
    /// Default configuration using codec `codec`.
    pub fn with_codec(codec: impl Into<String>) -> Self {
        Self {
            codec: codec.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    #[must_use]
    pub fn with_group(mut self, group: ColumnGroupConfig) -> Self {
        self.groups.push(group);
        self
    }

    /// Parse and validate TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::Configuration`] for malformed TOML or a config
    /// that fails [`Self::validate`].
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)
            .map_err(|err| IndexError::configuration(format!("invalid indexer TOML: {err}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize back to TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::Internal`] if serialization fails.
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string(self)
            .map_err(|err| IndexError::internal(format!("indexer config to TOML: {err}")))
    }

    /// Parse and validate the flat property form.
    ///
    /// Keys outside the `index.` namespace belong to the host and are
    /// ignored; unknown keys inside it are rejected.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::Configuration`] for unknown keys, incomplete
    /// groups, malformed column lists, or a config that fails
    /// [`Self::validate`].
    pub fn from_properties<K, V>(properties: impl IntoIterator<Item = (K, V)>) -> Result<Self>
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut config = Self::default();
        let mut tables: BTreeMap<usize, String> = BTreeMap::new();
        let mut columns: BTreeMap<usize, Vec<CoveredColumnConfig>> = BTreeMap::new();

        for (key, value) in properties {
            let key = key.as_ref().trim();
            let value = value.as_ref().trim();
            if !key.starts_with("index.") {
                continue;
            }
            if key == CODEC_CLASS_KEY {
                config.codec = value.to_owned();
            } else if key == FAILURE_POLICY_KEY {
                config.failure_policy = FailurePolicy::parse(value)?;
            } else if let Some(rest) = key.strip_prefix(GROUP_PREFIX) {
                let (slot, field) = rest
                    .split_once('.')
                    .and_then(|(slot, field)| slot.parse::<usize>().ok().map(|slot| (slot, field)))
                    .ok_or_else(|| IndexError::configuration(format!("malformed group key: {key}")))?;
                match field {
                    "table" => {
                        tables.insert(slot, value.to_owned());
                    }
                    "columns" => {
                        let parsed = value
                            .split(',')
                            .map(str::trim)
                            .filter(|raw| !raw.is_empty())
                            .map(CoveredColumnConfig::parse)
                            .collect::<Result<Vec<_>>>()?;
                        columns.insert(slot, parsed);
                    }
                    other => {
                        return Err(IndexError::configuration(format!(
                            "unknown group field {other:?} in {key}"
                        )));
                    }
                }
            } else {
                return Err(IndexError::configuration(format!("unknown index key: {key}")));
            }
        }

        let slots: BTreeSet<usize> = tables.keys().chain(columns.keys()).copied().collect();
        for slot in slots {
            let table = tables.remove(&slot).ok_or_else(|| {
                IndexError::configuration(format!("index.group.{slot} has no table"))
            })?;
            let group_columns = columns.remove(&slot).ok_or_else(|| {
                IndexError::configuration(format!("index.group.{slot} has no columns"))
            })?;
            config.groups.push(ColumnGroupConfig::new(table, group_columns));
        }

        config.validate()?;
        Ok(config)
    }

    /// Flat property form; the inverse of [`Self::from_properties`].
    #[must_use]
    pub fn to_properties(&self) -> BTreeMap<String, String> {
        let mut properties = BTreeMap::new();
        properties.insert(CODEC_CLASS_KEY.to_owned(), self.codec.clone());
        properties.insert(
            FAILURE_POLICY_KEY.to_owned(),
            self.failure_policy.as_str().to_owned(),
        );
        for (slot, group) in self.groups.iter().enumerate() {
            properties.insert(format!("{GROUP_PREFIX}{slot}.table"), group.table.clone());
            let rendered: Vec<String> = group.columns.iter().map(CoveredColumnConfig::render).collect();
            properties.insert(format!("{GROUP_PREFIX}{slot}.columns"), rendered.join(","));
        }
        properties
    }

    /// Structural checks. Codec names are checked by the registry.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::Configuration`] for an empty codec name, an empty
    /// or duplicate index table, a group without columns, or an empty family.
    pub fn validate(&self) -> Result<()> {
        if self.codec.trim().is_empty() {
            return Err(IndexError::configuration(format!(
                "{CODEC_CLASS_KEY} must not be empty"
            )));
        }
        let mut seen = BTreeSet::new();
        for group in &self.groups {
            if group.table.trim().is_empty() {
                return Err(IndexError::configuration("column group with empty table name"));
            }
            if !seen.insert(group.table.as_str()) {
                return Err(IndexError::configuration(format!(
                    "index table {} configured twice",
                    group.table
                )));
            }
            if group.columns.is_empty() {
                return Err(IndexError::configuration(format!(
                    "index table {} covers no columns",
                    group.table
                )));
            }
            if group.columns.iter().any(|column| column.family.trim().is_empty()) {
                return Err(IndexError::configuration(format!(
                    "index table {} has a column with an empty family",
                    group.table
                )));
            }
        }
        Ok(())
    }
}
