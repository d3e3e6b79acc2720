use alloc::collections::TryReserveError;
use alloc::vec::Vec;

const EMPTY: usize = usize::MAX;

#[derive(Debug, Clone, Copy)]
struct Slot {
    key: u32,
    pos: usize,
}
const VACANT: Slot = Slot { key: 0, pos: EMPTY };

fn slot_hash(v: u32, log2: u32) -> usize {
    let h = v.wrapping_mul(2654435769);
    let h = h >> (32 - log2);
    h as usize
}

fn vacant_table(log2: u32) -> Result<Vec<Slot>, TryReserveError> {
    let n = 1 << log2;
    let mut slots = Vec::new();
    slots.try_reserve_exact(n)?;
    slots.resize(n, VACANT);
    Ok(slots)
}

/// Maps a 4-byte prefix to the input offset it was last recorded at
///
/// Open addressing over a power-of-two table, starting at a multiplicative hash
/// of the key and probing linearly. Each slot keeps the full key, so a lookup
/// only ever answers for the exact prefix that was inserted.
///
/// Replacement policy is most-recent-wins per prefix: inserting a prefix that
/// is already present overwrites its offset, and the older occurrence becomes
/// unreachable. Different prefixes never displace each other. The table
/// doubles once it is half full, so the initial size is only a starting
/// capacity.
pub(crate) struct BackrefIndex {
    slots: Vec<Slot>,
    log2: u32,
    len: usize,
}
impl BackrefIndex {
    pub fn new(log2: u32) -> Result<Self, TryReserveError> {
        debug_assert!(log2 >= 1 && log2 <= 31);
        Ok(Self {
            slots: vacant_table(log2)?,
            log2,
            len: 0,
        })
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Slot holding `key`, or the vacant slot where it would go
    fn probe(&self, key: u32) -> usize {
        let mask = self.slots.len() - 1;
        let mut i = slot_hash(key, self.log2);
        loop {
            let slot = self.slots[i];
            if slot.pos == EMPTY || slot.key == key {
                return i;
            }
            i = (i + 1) & mask;
        }
    }

    pub fn lookup(&self, key: u32) -> Option<usize> {
        let slot = self.slots[self.probe(key)];
        (slot.pos != EMPTY).then_some(slot.pos)
    }

    /// Record `pos` for `key`, returning the offset previously recorded for it
    pub fn insert(&mut self, key: u32, pos: usize) -> Result<Option<usize>, TryReserveError> {
        debug_assert!(pos != EMPTY);
        let mut i = self.probe(key);
        if self.slots[i].pos == EMPTY {
            // a u32 hash cannot address more than 2^32 slots
            if (self.len + 1) * 2 > self.slots.len() && self.log2 < 32 {
                self.grow()?;
                i = self.probe(key);
            }
            self.len += 1;
        }
        let old = core::mem::replace(&mut self.slots[i], Slot { key, pos });
        Ok((old.pos != EMPTY).then_some(old.pos))
    }

    fn grow(&mut self) -> Result<(), TryReserveError> {
        let old = core::mem::replace(&mut self.slots, vacant_table(self.log2 + 1)?);
        self.log2 += 1;
        for slot in old.into_iter().filter(|s| s.pos != EMPTY) {
            let i = self.probe(slot.key);
            self.slots[i] = slot;
        }
        Ok(())
    }

    /// Forget every prefix, keeping the current allocation
    pub fn clear(&mut self) {
        self.slots.fill(VACANT);
        self.len = 0;
    }

    /// Number of distinct prefixes recorded
    pub fn len(&self) -> usize {
        self.len
    }
}
