use std::sync::Arc;

use crate::codec::EdgeKey;
use crate::registry::TypeRegistry;
use crate::table::EdgeTable;
use crate::types::{IndexError, NodeId, RelId, Result};

/// Read-only edge index produced by [`super::EdgeIndex::freeze`].
///
/// Entries are kept in one array sorted by (source, target, type), so lookups
/// are a binary search with no lock and no per-slot vacancy overhead.
pub struct FrozenEdgeIndex {
    registry: Arc<TypeRegistry>,
    entries: Box<[(EdgeKey, RelId)]>,
}

impl FrozenEdgeIndex {
    pub(super) fn build(registry: Arc<TypeRegistry>, tables: &[EdgeTable]) -> Result<Self> {
        let total: usize = tables.iter().map(EdgeTable::len).sum();
        let mut entries = Vec::new();
        entries
            .try_reserve_exact(total)
            .map_err(|_| IndexError::ResourceExhausted {
                requested_slots: total,
            })?;
        for table in tables {
            entries.extend(table.iter());
        }
        entries.sort_unstable_by_key(|(key, _)| *key);
        Ok(Self {
            registry,
            entries: entries.into_boxed_slice(),
        })
    }

    /// The registry shared with the index this was frozen from.
    pub fn registry(&self) -> &Arc<TypeRegistry> {
        &self.registry
    }

    /// Returns the relationship id for the edge, or `None` if it is absent.
    pub fn get(&self, src: NodeId, dst: NodeId, ty: &str) -> Option<RelId> {
        let ty = self.registry.lookup(ty)?;
        self.get_key(&EdgeKey::new(src, dst, ty))
    }

    /// Like [`FrozenEdgeIndex::get`] but reports absence as [`IndexError::NotFound`].
    pub fn try_get(&self, src: NodeId, dst: NodeId, ty: &str) -> Result<RelId> {
        self.get(src, dst, ty).ok_or(IndexError::NotFound)
    }

    /// Returns true if the edge is indexed.
    pub fn contains_key(&self, src: NodeId, dst: NodeId, ty: &str) -> bool {
        self.get(src, dst, ty).is_some()
    }

    /// Point lookup with an already resolved key.
    pub fn get_key(&self, key: &EdgeKey) -> Option<RelId> {
        self.entries
            .binary_search_by(|(probe, _)| probe.cmp(key))
            .ok()
            .map(|pos| self.entries[pos].1)
    }

    /// Number of edges.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if there are no edges.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates edges in (source, target, type) order.
    pub fn iter(&self) -> impl Iterator<Item = (EdgeKey, RelId)> + '_ {
        self.entries.iter().copied()
    }
}
