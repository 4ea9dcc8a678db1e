// Growable bit mask over vocabulary rows.
//
// Backing storage grows in 64-bit blocks as indices are set. The logical
// length is the highest index ever set plus one; capacity is always a whole
// number of blocks and never smaller than the length. Reading past the
// allocated blocks returns false and leaves storage alone.

use bitvec::prelude::*;

const BLOCK_BITS: usize = u64::BITS as usize;

/// Bit-packed selection mask that grows on demand.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Mask {
    bits: BitVec<u64, Lsb0>,
    length: usize,
}

impl Mask {
    pub fn new() -> Self {
        Self::default()
    }

    /// An empty mask with room for at least `capacity` bits.
    pub fn with_capacity(capacity: usize) -> Self {
        let mut mask = Self::default();
        mask.resize(capacity);
        mask
    }

    /// Number of bits the current blocks can hold.
    pub fn capacity(&self) -> usize {
        self.bits.len()
    }

    /// Highest index ever set, plus one.
    pub fn len(&self) -> usize {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Grow storage so it can hold at least `bits` bits. Never shrinks.
    pub fn resize(&mut self, bits: usize) {
        let needed = whole_blocks(bits);
        if needed > self.bits.len() {
            self.bits.resize(needed, false);
        }
    }

    pub fn get(&self, i: usize) -> bool {
        self.bits.get(i).is_some_and(|bit| *bit)
    }

    /// Set or clear bit `i`, growing storage and the logical length as needed.
    pub fn set(&mut self, i: usize, value: bool) {
        let end = i.saturating_add(1);
        self.resize(end);
        self.bits.set(i, value);
        self.length = self.length.max(end);
    }

    /// Number of set bits.
    pub fn count_ones(&self) -> usize {
        self.bits.count_ones()
    }

    /// Indices of set bits in ascending order.
    pub fn iter_ones(&self) -> impl Iterator<Item = usize> + '_ {
        self.bits.iter_ones()
    }
}

/// `bits` rounded up to a whole number of blocks, saturating at the top.
fn whole_blocks(bits: usize) -> usize {
    bits.div_ceil(BLOCK_BITS).saturating_mul(BLOCK_BITS)
}
