use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Hooks invoked by [`super::EdgeIndex`] as edges are written and read.
///
/// Implementations must be cheap; hooks run while a shard lock is held for
/// writes and resizes.
pub trait IndexMetrics: Send + Sync {
    /// Records a first-time insert of an edge.
    fn edge_inserted(&self);

    /// Records an insert that replaced an existing relationship id.
    fn edge_overwritten(&self);

    /// Records a point lookup or existence check.
    ///
    /// # Parameters
    /// * `hit` - Whether the edge was present.
    fn lookup(&self, hit: bool);

    /// Records a shard slot array reallocation.
    fn resized(&self, shard: usize, old_capacity: usize, new_capacity: usize);
}

/// A no-op implementation of [`IndexMetrics`].
#[derive(Default)]
pub struct NoopMetrics;

impl IndexMetrics for NoopMetrics {
    fn edge_inserted(&self) {}
    fn edge_overwritten(&self) {}
    fn lookup(&self, _hit: bool) {}
    fn resized(&self, _shard: usize, _old_capacity: usize, _new_capacity: usize) {}
}

/// Atomic counter implementation of [`IndexMetrics`].
#[derive(Default)]
pub struct CounterMetrics {
    /// Edges inserted for the first time.
    pub edges_inserted: AtomicU64,

    /// Inserts that replaced an existing relationship id.
    pub edges_overwritten: AtomicU64,

    /// Lookups that found the edge.
    pub lookup_hits: AtomicU64,

    /// Lookups that did not find the edge.
    pub lookup_misses: AtomicU64,

    /// Shard reallocations, including pre-sizing.
    pub resizes: AtomicU64,

    /// Slots allocated across all resizes.
    pub slots_allocated: AtomicU64,
}

impl IndexMetrics for CounterMetrics {
    fn edge_inserted(&self) {
        self.edges_inserted.fetch_add(1, Ordering::Relaxed);
    }

    fn edge_overwritten(&self) {
        self.edges_overwritten.fetch_add(1, Ordering::Relaxed);
    }

    fn lookup(&self, hit: bool) {
        if hit {
            self.lookup_hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.lookup_misses.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn resized(&self, _shard: usize, _old_capacity: usize, new_capacity: usize) {
        self.resizes.fetch_add(1, Ordering::Relaxed);
        self.slots_allocated
            .fetch_add(new_capacity as u64, Ordering::Relaxed);
    }
}

/// Returns the default metrics implementation, which discards everything.
pub fn default_metrics() -> Arc<dyn IndexMetrics> {
    Arc::new(NoopMetrics)
}
