//! Open-addressed edge table.
//!
//! Linear probing over a power-of-two slot array. Each slot holds the full
//! edge triple plus the relationship id (32 bytes), and a slot is vacant when
//! its type id is [`TypeId::VACANT`]. There is no deletion, so probe chains
//! never contain tombstones.
//!
//! Crossing the load-factor cap rehashes every entry into an array of twice
//! the capacity. That rehash is the single expensive operation here; callers
//! that know their edge count should size the table up front with
//! [`EdgeTable::with_capacity`] or [`EdgeTable::reserve`].

use crate::codec::{EdgeKey, PackedKey};
use crate::types::{IndexError, NodeId, RelId, Result, TypeId};

/// Smallest slot array allocated once the table holds anything.
pub const MIN_CAPACITY: usize = 16;
/// Load factor used when none is configured.
pub const DEFAULT_MAX_LOAD_FACTOR: f64 = 0.75;

#[derive(Copy, Clone, Debug)]
struct Slot {
    src: u64,
    dst: u64,
    rel: u64,
    ty: u32,
}

const VACANT_SLOT: Slot = Slot {
    src: 0,
    dst: 0,
    rel: 0,
    ty: TypeId::VACANT.0,
};

impl Slot {
    #[inline]
    fn is_vacant(&self) -> bool {
        self.ty == TypeId::VACANT.0
    }

    #[inline]
    fn matches(&self, key: &EdgeKey) -> bool {
        self.src == key.src.0 && self.dst == key.dst.0 && self.ty == key.ty.0
    }

    fn key(&self) -> EdgeKey {
        EdgeKey::new(NodeId(self.src), NodeId(self.dst), TypeId(self.ty))
    }
}

/// Single-threaded map from [`EdgeKey`] to [`RelId`].
pub struct EdgeTable {
    slots: Vec<Slot>,
    len: usize,
    grow_at: usize,
    max_load_factor: f64,
    resizes: u64,
}

impl EdgeTable {
    /// Creates an empty table; no slots are allocated until the first insert.
    pub fn new(max_load_factor: f64) -> Self {
        Self {
            slots: Vec::new(),
            len: 0,
            grow_at: 0,
            max_load_factor,
            resizes: 0,
        }
    }

    /// Creates a table able to hold `entries` edges without growing.
    pub fn with_capacity(entries: usize, max_load_factor: f64) -> Result<Self> {
        let mut table = Self::new(max_load_factor);
        if entries > 0 {
            table.reserve(entries)?;
        }
        Ok(table)
    }

    /// Number of edges stored.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns true if no edge is stored.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of allocated slots.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Returns true if inserting one more new edge will trigger a rehash.
    pub fn at_capacity(&self) -> bool {
        self.len + 1 > self.grow_at
    }

    /// Number of times the slot array has been reallocated.
    pub fn resizes(&self) -> u64 {
        self.resizes
    }

    /// Inserts or overwrites the mapping for `key`.
    ///
    /// Returns the replaced relationship id when `key` was already present.
    pub fn insert(&mut self, key: &EdgeKey, rel: RelId) -> Result<Option<RelId>> {
        self.insert_hashed(key, key.pack(), rel)
    }

    /// Looks up the relationship id for `key`.
    pub fn get(&self, key: &EdgeKey) -> Option<RelId> {
        self.get_hashed(key, key.pack())
    }

    /// Returns true if `key` is present. Same probe cost as [`EdgeTable::get`].
    pub fn contains(&self, key: &EdgeKey) -> bool {
        matches!(self.probe(key, key.pack()), Probe::Found(_))
    }

    /// Insert with a hash the caller already computed for shard routing.
    ///
    /// `hash` must equal `key.pack()`; rehashing recomputes it from the key.
    pub(crate) fn insert_hashed(
        &mut self,
        key: &EdgeKey,
        hash: PackedKey,
        rel: RelId,
    ) -> Result<Option<RelId>> {
        debug_assert_eq!(hash, key.pack());
        if key.ty == TypeId::VACANT {
            return Err(IndexError::UnknownType(key.ty));
        }
        let mut probe = self.probe(key, hash);
        if let Probe::Found(idx) = probe {
            let previous = RelId(self.slots[idx].rel);
            self.slots[idx].rel = rel.0;
            return Ok(Some(previous));
        }
        if self.at_capacity() {
            let target = capacity_for(self.len + 1, self.max_load_factor)?
                .max(self.slots.len().saturating_mul(2));
            self.rehash(target)?;
            probe = self.probe(key, hash);
        }
        match probe {
            Probe::Vacant(idx) => {
                self.slots[idx] = Slot {
                    src: key.src.0,
                    dst: key.dst.0,
                    rel: rel.0,
                    ty: key.ty.0,
                };
                self.len += 1;
                Ok(None)
            }
            Probe::Found(_) | Probe::Empty => {
                Err(IndexError::Invalid("edge table has no vacant slot after growth"))
            }
        }
    }

    pub(crate) fn get_hashed(&self, key: &EdgeKey, hash: PackedKey) -> Option<RelId> {
        debug_assert_eq!(hash, key.pack());
        match self.probe(key, hash) {
            Probe::Found(idx) => Some(RelId(self.slots[idx].rel)),
            _ => None,
        }
    }

    /// Ensures `additional` more edges fit without growing.
    pub fn reserve(&mut self, additional: usize) -> Result<()> {
        let needed = self
            .len
            .checked_add(additional)
            .ok_or(IndexError::Invalid("edge table reservation overflow"))?;
        if needed <= self.grow_at {
            return Ok(());
        }
        let target = capacity_for(needed, self.max_load_factor)?;
        self.rehash(target)
    }

    /// Drops every edge while keeping the allocated slots.
    pub fn clear(&mut self) {
        self.slots.fill(VACANT_SLOT);
        self.len = 0;
    }

    /// Iterates stored edges in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (EdgeKey, RelId)> + '_ {
        self.slots
            .iter()
            .filter(|slot| !slot.is_vacant())
            .map(|slot| (slot.key(), RelId(slot.rel)))
    }

    /// Longest probe sequence among stored edges (1 means every edge sits in its home slot).
    pub fn max_probe_len(&self) -> usize {
        let mask = self.mask();
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| !slot.is_vacant())
            .map(|(idx, slot)| {
                let home = slot.key().pack().slot(mask);
                (idx.wrapping_sub(home) & mask) + 1
            })
            .max()
            .unwrap_or(0)
    }

    #[inline]
    fn mask(&self) -> usize {
        self.slots.len().wrapping_sub(1)
    }

    fn probe(&self, key: &EdgeKey, hash: PackedKey) -> Probe {
        if self.slots.is_empty() {
            return Probe::Empty;
        }
        let mask = self.mask();
        let mut idx = hash.slot(mask);
        // The load factor cap keeps at least one vacant slot, so this terminates.
        loop {
            let slot = &self.slots[idx];
            if slot.is_vacant() {
                return Probe::Vacant(idx);
            }
            if slot.matches(key) {
                return Probe::Found(idx);
            }
            idx = (idx + 1) & mask;
        }
    }

    fn rehash(&mut self, new_capacity: usize) -> Result<()> {
        let mut slots = alloc_slots(new_capacity)?;
        let mask = new_capacity - 1;
        for slot in self.slots.iter().filter(|slot| !slot.is_vacant()) {
            let mut idx = slot.key().pack().slot(mask);
            while !slots[idx].is_vacant() {
                idx = (idx + 1) & mask;
            }
            slots[idx] = *slot;
        }
        if !self.slots.is_empty() {
            self.resizes += 1;
        }
        self.slots = slots;
        self.grow_at = grow_threshold(new_capacity, self.max_load_factor);
        Ok(())
    }
}

enum Probe {
    Found(usize),
    Vacant(usize),
    Empty,
}

fn capacity_for(entries: usize, max_load_factor: f64) -> Result<usize> {
    let raw = (entries as f64 / max_load_factor).ceil();
    if !raw.is_finite() || raw >= usize::MAX as f64 {
        return Err(IndexError::ResourceExhausted {
            requested_slots: usize::MAX,
        });
    }
    // Guard against rounding leaving the table exactly full.
    let wanted = (raw as usize).max(entries + 1).max(MIN_CAPACITY);
    wanted
        .checked_next_power_of_two()
        .ok_or(IndexError::ResourceExhausted {
            requested_slots: wanted,
        })
}

fn grow_threshold(capacity: usize, max_load_factor: f64) -> usize {
    let threshold = (capacity as f64 * max_load_factor) as usize;
    threshold.clamp(1, capacity - 1)
}

fn alloc_slots(capacity: usize) -> Result<Vec<Slot>> {
    let mut slots = Vec::new();
    slots
        .try_reserve_exact(capacity)
        .map_err(|_| IndexError::ResourceExhausted {
            requested_slots: capacity,
        })?;
    slots.resize(capacity, VACANT_SLOT);
    Ok(slots)
}
