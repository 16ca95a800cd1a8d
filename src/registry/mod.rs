//! Relationship type registry.
//!
//! Maps type tokens such as `"SUBCLASS_OF"` to dense [`TypeId`]s so packed
//! edge keys never carry the token itself. Ids are issued sequentially from
//! zero and are never reassigned or removed for the lifetime of the registry.

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use tracing::trace;

use crate::types::{IndexError, Result, TypeId};

#[derive(Default)]
struct RegistryInner {
    by_token: FxHashMap<Arc<str>, TypeId>,
    tokens: Vec<Arc<str>>,
}

#[derive(Default)]
struct RegistryMetrics {
    resolve_calls: AtomicU64,
    resolve_hits: AtomicU64,
    resolve_misses: AtomicU64,
}

/// Point-in-time copy of the registry counters.
#[derive(Clone, Copy, Debug, Default)]
pub struct RegistryMetricsSnapshot {
    /// Calls to [`TypeRegistry::resolve`].
    pub resolve_calls: u64,
    /// Resolutions answered by an existing id.
    pub resolve_hits: u64,
    /// Resolutions that allocated a new id.
    pub resolve_misses: u64,
}

impl RegistryMetricsSnapshot {
    /// Fraction of resolutions that found an existing id.
    pub fn hit_rate(&self) -> f64 {
        if self.resolve_calls == 0 {
            return 0.0;
        }
        self.resolve_hits as f64 / self.resolve_calls as f64
    }
}

/// Thread-safe token to dense id mapping.
///
/// Lookups take a shared lock. Allocation takes the exclusive lock and
/// re-checks the token, so racing resolutions of the same unseen token
/// converge on a single id.
#[derive(Default)]
pub struct TypeRegistry {
    inner: RwLock<RegistryInner>,
    issued: AtomicU32,
    metrics: RegistryMetrics,
}

impl TypeRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the id for `token`, allocating the next sequential id on first sight.
    pub fn resolve(&self, token: &str) -> Result<TypeId> {
        self.metrics.resolve_calls.fetch_add(1, Ordering::Relaxed);
        if let Some(id) = self.inner.read().by_token.get(token).copied() {
            self.metrics.resolve_hits.fetch_add(1, Ordering::Relaxed);
            return Ok(id);
        }

        let mut inner = self.inner.write();
        // Another resolver may have won the race for the write lock.
        if let Some(id) = inner.by_token.get(token).copied() {
            self.metrics.resolve_hits.fetch_add(1, Ordering::Relaxed);
            return Ok(id);
        }
        let raw = u32::try_from(inner.tokens.len())
            .ok()
            .filter(|raw| *raw != TypeId::VACANT.0)
            .ok_or(IndexError::Invalid("relationship type id overflow"))?;
        let id = TypeId(raw);
        let token: Arc<str> = Arc::from(token);
        inner.by_token.insert(Arc::clone(&token), id);
        inner.tokens.push(token);
        self.issued.store(raw + 1, Ordering::Release);
        self.metrics.resolve_misses.fetch_add(1, Ordering::Relaxed);
        trace!(id = raw, "registry.resolve.insert");
        Ok(id)
    }

    /// Looks up the id for `token` without allocating.
    pub fn lookup(&self, token: &str) -> Option<TypeId> {
        self.inner.read().by_token.get(token).copied()
    }

    /// Reverse lookup of the token behind `id`.
    pub fn token_for(&self, id: TypeId) -> Result<Arc<str>> {
        self.inner
            .read()
            .tokens
            .get(id.0 as usize)
            .cloned()
            .ok_or(IndexError::UnknownType(id))
    }

    /// Returns true if `id` has been issued by this registry.
    pub fn contains(&self, id: TypeId) -> bool {
        id.0 < self.issued.load(Ordering::Acquire)
    }

    /// Number of distinct tokens registered.
    pub fn len(&self) -> usize {
        self.issued.load(Ordering::Acquire) as usize
    }

    /// Returns true if no token has been registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns a copy of the resolution counters.
    pub fn metrics_snapshot(&self) -> RegistryMetricsSnapshot {
        RegistryMetricsSnapshot {
            resolve_calls: self.metrics.resolve_calls.load(Ordering::Relaxed),
            resolve_hits: self.metrics.resolve_hits.load(Ordering::Relaxed),
            resolve_misses: self.metrics.resolve_misses.load(Ordering::Relaxed),
        }
    }
}
