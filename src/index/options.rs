use std::sync::Arc;

use serde::Deserialize;

use crate::table::DEFAULT_MAX_LOAD_FACTOR;
use crate::types::{IndexError, Result};

use super::metrics::IndexMetrics;

/// Default number of shards.
pub const DEFAULT_SHARDS: usize = 64;
/// Upper bound on the shard count.
pub const MAX_SHARDS: usize = 4096;

/// Configuration supplied when building an [`super::EdgeIndex`].
#[derive(Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IndexOptions {
    /// Total number of edges to pre-size for, spread evenly across shards.
    pub initial_capacity: usize,
    /// Number of independently locked shards; rounded up to a power of two.
    pub shards: usize,
    /// Fill ratio that triggers a shard rehash, in (0.0, 1.0).
    pub max_load_factor: f64,
    /// Optional metrics collection implementation.
    #[serde(skip)]
    pub metrics: Option<Arc<dyn IndexMetrics>>,
}

impl Default for IndexOptions {
    fn default() -> Self {
        Self {
            initial_capacity: 0,
            shards: DEFAULT_SHARDS,
            max_load_factor: DEFAULT_MAX_LOAD_FACTOR,
            metrics: None,
        }
    }
}

impl IndexOptions {
    /// Parses options from a TOML document. Missing keys keep their defaults.
    ///
    /// ```
    /// let opts = relidx::IndexOptions::from_toml_str("shards = 8\ninitial_capacity = 1000").unwrap();
    /// assert_eq!(opts.shards, 8);
    /// ```
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let opts: IndexOptions =
            toml::from_str(raw).map_err(|err| IndexError::Config(err.to_string()))?;
        opts.validate()?;
        Ok(opts)
    }

    /// Sets the number of edges to pre-size for.
    pub fn initial_capacity(mut self, edges: usize) -> Self {
        self.initial_capacity = edges;
        self
    }

    /// Sets the shard count.
    pub fn shards(mut self, shards: usize) -> Self {
        self.shards = shards;
        self
    }

    /// Sets the load factor cap.
    pub fn max_load_factor(mut self, factor: f64) -> Self {
        self.max_load_factor = factor;
        self
    }

    /// Sets the metrics collection implementation.
    pub fn metrics(mut self, metrics: Arc<dyn IndexMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Checks that every value is within range.
    pub fn validate(&self) -> Result<()> {
        if self.shards == 0 {
            return Err(IndexError::Invalid("shard count must be positive"));
        }
        if self.shards > MAX_SHARDS {
            return Err(IndexError::Invalid("shard count exceeds 4096"));
        }
        if !(self.max_load_factor > 0.0 && self.max_load_factor < 1.0) {
            return Err(IndexError::Invalid("max load factor must be in (0, 1)"));
        }
        Ok(())
    }

    /// Shard count rounded up to a power of two.
    pub(crate) fn shard_count(&self) -> usize {
        self.shards.next_power_of_two()
    }
}
