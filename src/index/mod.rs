//! Concurrent relationship index.
//!
//! [`EdgeIndex`] splits its keyspace over a power-of-two number of shards,
//! each an [`EdgeTable`] behind its own `RwLock`. The shard is chosen from the
//! high bits of the packed key and the probe start from the low bits. Loader
//! threads writing different edges mostly contend on different shards, and a
//! shard that is growing holds its write lock for the whole rehash so readers
//! never see a half-moved table.

mod frozen;
mod metrics;
mod options;

use std::sync::Arc;
use std::time::Instant;

use parking_lot::RwLock;
use tracing::{debug, trace};

use crate::codec::{EdgeKey, PackedKey};
use crate::registry::TypeRegistry;
use crate::table::EdgeTable;
use crate::types::{IndexError, NodeId, RelId, Result, TypeId};

pub use frozen::FrozenEdgeIndex;
pub use metrics::{default_metrics, CounterMetrics, IndexMetrics, NoopMetrics};
pub use options::{IndexOptions, DEFAULT_SHARDS, MAX_SHARDS};

/// Aggregate shape of an [`EdgeIndex`] at one point in time.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct IndexStats {
    /// Distinct edges indexed.
    pub edges: usize,
    /// Allocated slots across all shards.
    pub capacity: usize,
    /// Number of shards.
    pub shards: usize,
    /// Shard reallocations caused by growth.
    pub resizes: u64,
    /// Longest probe sequence in any shard.
    pub max_probe_len: usize,
    /// `edges / capacity`, or zero when nothing is allocated.
    pub load_factor: f64,
}

/// Thread-safe map from (source, target, relationship type) to relationship id.
pub struct EdgeIndex {
    registry: Arc<TypeRegistry>,
    shards: Box<[RwLock<EdgeTable>]>,
    shard_bits: u32,
    max_load_factor: f64,
    metrics: Arc<dyn IndexMetrics>,
}

impl EdgeIndex {
    /// Creates an index with its own empty type registry.
    pub fn new(options: IndexOptions) -> Result<Self> {
        Self::with_registry(Arc::new(TypeRegistry::new()), options)
    }

    /// Creates an index that resolves type tokens through a shared registry.
    ///
    /// Use this when the registry outlives a single load session.
    pub fn with_registry(registry: Arc<TypeRegistry>, options: IndexOptions) -> Result<Self> {
        options.validate()?;
        let shard_count = options.shard_count();
        let per_shard = options.initial_capacity.div_ceil(shard_count);
        let shards = (0..shard_count)
            .map(|_| EdgeTable::with_capacity(per_shard, options.max_load_factor).map(RwLock::new))
            .collect::<Result<Vec<_>>>()?
            .into_boxed_slice();
        debug!(
            shards = shard_count,
            initial_capacity = options.initial_capacity,
            max_load_factor = options.max_load_factor,
            "index.open"
        );
        Ok(Self {
            registry,
            shards,
            shard_bits: shard_count.trailing_zeros(),
            max_load_factor: options.max_load_factor,
            metrics: options.metrics.unwrap_or_else(default_metrics),
        })
    }

    /// The registry used to resolve type tokens.
    pub fn registry(&self) -> &Arc<TypeRegistry> {
        &self.registry
    }

    /// Returns the dense id for `token`, registering it on first sight.
    pub fn resolve_type(&self, token: &str) -> Result<TypeId> {
        self.registry.resolve(token)
    }

    /// Inserts or overwrites the relationship id for an edge.
    ///
    /// Last write wins; the replaced id is returned.
    pub fn put(&self, src: NodeId, dst: NodeId, ty: &str, rel: RelId) -> Result<Option<RelId>> {
        let ty = self.registry.resolve(ty)?;
        self.insert(&EdgeKey::new(src, dst, ty), rel)
    }

    /// Inserts or overwrites using an already resolved key.
    ///
    /// Fails with [`IndexError::UnknownType`] if the key's type id was not
    /// issued by this index's registry.
    pub fn put_key(&self, key: EdgeKey, rel: RelId) -> Result<Option<RelId>> {
        self.check_type(key.ty)?;
        self.insert(&key, rel)
    }

    /// Inserts a batch of resolved edges, taking each shard lock once.
    ///
    /// Returns the number of edges that were not already present. Type ids are
    /// checked before anything is written, but an allocation failure part way
    /// through leaves the shard groups written so far in place: a failed batch
    /// may be partly applied.
    pub fn put_batch(&self, edges: &[(EdgeKey, RelId)]) -> Result<usize> {
        for (key, _) in edges {
            self.check_type(key.ty)?;
        }
        let mut order: Vec<(usize, PackedKey, usize)> = edges
            .iter()
            .enumerate()
            .map(|(pos, (key, _))| {
                let hash = key.pack();
                (hash.shard(self.shard_bits), hash, pos)
            })
            .collect();
        order.sort_unstable_by_key(|(shard, _, _)| *shard);

        let mut inserted = 0;
        for group in order.chunk_by(|a, b| a.0 == b.0) {
            let shard = group[0].0;
            let mut table = self.shards[shard].write();
            for &(_, hash, pos) in group {
                let (key, rel) = &edges[pos];
                if self.insert_locked(shard, &mut table, key, hash, *rel)?.is_none() {
                    inserted += 1;
                }
            }
        }
        trace!(edges = edges.len(), inserted, "index.put_batch");
        Ok(inserted)
    }

    /// Returns true if the edge is indexed.
    pub fn contains_key(&self, src: NodeId, dst: NodeId, ty: &str) -> bool {
        self.get(src, dst, ty).is_some()
    }

    /// Returns the relationship id for the edge, or `None` if it is absent.
    ///
    /// An unregistered type token is simply a miss; it is not registered.
    pub fn get(&self, src: NodeId, dst: NodeId, ty: &str) -> Option<RelId> {
        match self.registry.lookup(ty) {
            Some(ty) => self.get_key(&EdgeKey::new(src, dst, ty)),
            None => {
                self.metrics.lookup(false);
                None
            }
        }
    }

    /// Like [`EdgeIndex::get`] but reports absence as [`IndexError::NotFound`].
    pub fn try_get(&self, src: NodeId, dst: NodeId, ty: &str) -> Result<RelId> {
        self.get(src, dst, ty).ok_or(IndexError::NotFound)
    }

    /// Point lookup with an already resolved key.
    pub fn get_key(&self, key: &EdgeKey) -> Option<RelId> {
        let hash = key.pack();
        let found = self.shards[hash.shard(self.shard_bits)]
            .read()
            .get_hashed(key, hash);
        self.metrics.lookup(found.is_some());
        found
    }

    /// Existence check with an already resolved key.
    pub fn contains_key_typed(&self, key: &EdgeKey) -> bool {
        self.get_key(key).is_some()
    }

    /// Number of distinct edges indexed.
    pub fn size(&self) -> usize {
        self.shards.iter().map(|shard| shard.read().len()).sum()
    }

    /// Alias of [`EdgeIndex::size`].
    pub fn len(&self) -> usize {
        self.size()
    }

    /// Returns true if no edge is indexed.
    pub fn is_empty(&self) -> bool {
        self.shards.iter().all(|shard| shard.read().is_empty())
    }

    /// Pre-sizes every shard for `additional` more edges in total.
    ///
    /// Populating millions of edges without reserving first pays for a
    /// sequence of doubling rehashes per shard.
    pub fn reserve(&self, additional: usize) -> Result<()> {
        let per_shard = additional.div_ceil(self.shards.len());
        for (shard, lock) in self.shards.iter().enumerate() {
            let mut table = lock.write();
            let before = table.capacity();
            let started = Instant::now();
            table.reserve(per_shard)?;
            self.note_resize(shard, before, table.capacity(), table.len(), started);
        }
        Ok(())
    }

    /// Drops every edge but keeps the registry and the allocated slots.
    pub fn clear(&self) {
        for shard in self.shards.iter() {
            shard.write().clear();
        }
        debug!("index.clear");
    }

    /// Collects size, capacity and probe statistics across all shards.
    pub fn stats(&self) -> IndexStats {
        let mut stats = IndexStats {
            shards: self.shards.len(),
            ..IndexStats::default()
        };
        for shard in self.shards.iter() {
            let table = shard.read();
            stats.edges += table.len();
            stats.capacity += table.capacity();
            stats.resizes += table.resizes();
            stats.max_probe_len = stats.max_probe_len.max(table.max_probe_len());
        }
        if stats.capacity > 0 {
            stats.load_factor = stats.edges as f64 / stats.capacity as f64;
        }
        stats
    }

    /// Load factor cap shards grow at.
    pub fn max_load_factor(&self) -> f64 {
        self.max_load_factor
    }

    /// Ends the load session, converting the index into a sorted read-only form.
    pub fn freeze(self) -> Result<FrozenEdgeIndex> {
        let started = Instant::now();
        let tables: Vec<EdgeTable> = self
            .shards
            .into_vec()
            .into_iter()
            .map(RwLock::into_inner)
            .collect();
        let frozen = FrozenEdgeIndex::build(self.registry, &tables)?;
        debug!(
            edges = frozen.len(),
            elapsed_us = started.elapsed().as_micros() as u64,
            "index.freeze"
        );
        Ok(frozen)
    }

    fn check_type(&self, ty: TypeId) -> Result<()> {
        if self.registry.contains(ty) {
            Ok(())
        } else {
            Err(IndexError::UnknownType(ty))
        }
    }

    fn insert(&self, key: &EdgeKey, rel: RelId) -> Result<Option<RelId>> {
        let hash = key.pack();
        let shard = hash.shard(self.shard_bits);
        let mut table = self.shards[shard].write();
        self.insert_locked(shard, &mut table, key, hash, rel)
    }

    fn insert_locked(
        &self,
        shard: usize,
        table: &mut EdgeTable,
        key: &EdgeKey,
        hash: PackedKey,
        rel: RelId,
    ) -> Result<Option<RelId>> {
        let started = table.at_capacity().then(Instant::now);
        let before = table.capacity();
        let previous = table.insert_hashed(key, hash, rel)?;
        match previous {
            Some(old) => {
                self.metrics.edge_overwritten();
                trace!(
                    src = key.src.0,
                    dst = key.dst.0,
                    ty = key.ty.0,
                    old = old.0,
                    new = rel.0,
                    "index.put.overwrite"
                );
            }
            None => self.metrics.edge_inserted(),
        }
        if let Some(started) = started {
            self.note_resize(shard, before, table.capacity(), table.len(), started);
        }
        Ok(previous)
    }

    fn note_resize(
        &self,
        shard: usize,
        before: usize,
        after: usize,
        entries: usize,
        started: Instant,
    ) {
        if before == after {
            return;
        }
        self.metrics.resized(shard, before, after);
        debug!(
            shard,
            old_capacity = before,
            new_capacity = after,
            entries,
            elapsed_us = started.elapsed().as_micros() as u64,
            "index.shard.resize"
        );
    }
}
