//! Edge key codec.
//!
//! An [`EdgeKey`] is the exact (source, target, type) triple. [`EdgeKey::pack`]
//! folds it into a well-mixed 64-bit [`PackedKey`] used to pick a shard and a
//! probe start. The packed value is lossy, so table slots keep the full triple
//! and every hit is confirmed by comparing all three fields.

use xxhash_rust::xxh64::xxh64;

use crate::types::{NodeId, TypeId};

const PACK_SEED: u64 = 0x9e37_79b9_7f4a_7c15;
/// Width of the fixed key encoding fed to the hash.
pub const KEY_ENCODED_LEN: usize = 8 + 8 + 4;

/// Directed, typed edge identity.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub struct EdgeKey {
    /// Source node.
    pub src: NodeId,
    /// Target node.
    pub dst: NodeId,
    /// Dense relationship type id.
    pub ty: TypeId,
}

/// 64-bit hash of an [`EdgeKey`].
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct PackedKey(pub u64);

impl EdgeKey {
    /// Builds a key from its three components.
    pub fn new(src: NodeId, dst: NodeId, ty: TypeId) -> Self {
        Self { src, dst, ty }
    }

    /// Fixed little-endian encoding: source, target, type.
    pub fn encode(&self) -> [u8; KEY_ENCODED_LEN] {
        let mut buf = [0u8; KEY_ENCODED_LEN];
        buf[0..8].copy_from_slice(&self.src.0.to_le_bytes());
        buf[8..16].copy_from_slice(&self.dst.0.to_le_bytes());
        buf[16..20].copy_from_slice(&self.ty.0.to_le_bytes());
        buf
    }

    /// Derives the packed hash. Pure: equal keys always pack identically.
    #[inline]
    pub fn pack(&self) -> PackedKey {
        PackedKey(xxh64(&self.encode(), PACK_SEED))
    }
}

impl PackedKey {
    /// Shard index taken from the top `bits` bits.
    #[inline]
    pub fn shard(self, bits: u32) -> usize {
        if bits == 0 {
            0
        } else {
            (self.0 >> (64 - bits)) as usize
        }
    }

    /// Initial probe slot taken from the low bits.
    #[inline]
    pub fn slot(self, mask: usize) -> usize {
        (self.0 as usize) & mask
    }
}
