//! Fixed-width integers packed into 64-bit words.
//!
//! Entries are stored LSB-first, `64 / bits` per word. An entry never spans two
//! words; the unused high bits of each word are padding.

use crate::error::WorldError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitStorage {
    bits: u8,
    len: usize,
    data: Vec<u64>,
}

/// Number of words needed to hold `len` entries of `bits` width.
pub fn packed_len(bits: u8, len: usize) -> usize {
    if bits == 0 {
        return 0;
    }
    len.div_ceil(64 / bits as usize)
}

impl BitStorage {
    /// Zeroed storage.
    pub fn new(bits: u8, len: usize) -> Self {
        debug_assert!(bits <= 32);
        Self {
            bits,
            len,
            data: vec![0; packed_len(bits, len)],
        }
    }

    /// Wrap existing words, checking that the length matches exactly.
    pub fn from_words(bits: u8, len: usize, data: Vec<u64>) -> Result<Self, WorldError> {
        let expected = packed_len(bits, len);
        if data.len() != expected {
            return Err(WorldError::PackedLength {
                bits,
                expected,
                got: data.len(),
            });
        }
        Ok(Self { bits, len, data })
    }

    pub fn bits(&self) -> u8 {
        self.bits
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn words(&self) -> &[u64] {
        &self.data
    }

    pub fn into_words(self) -> Vec<u64> {
        self.data
    }

    fn per_word(&self) -> usize {
        64 / self.bits as usize
    }

    fn mask(&self) -> u64 {
        (1u64 << self.bits) - 1
    }

    pub fn get(&self, index: usize) -> u32 {
        assert!(index < self.len, "index {index} out of bounds for {}", self.len);
        if self.bits == 0 {
            return 0;
        }
        let per_word = self.per_word();
        let shift = (index % per_word) * self.bits as usize;
        ((self.data[index / per_word] >> shift) & self.mask()) as u32
    }

    pub fn set(&mut self, index: usize, value: u32) {
        assert!(index < self.len, "index {index} out of bounds for {}", self.len);
        if self.bits == 0 {
            debug_assert_eq!(value, 0);
            return;
        }
        let per_word = self.per_word();
        let shift = (index % per_word) * self.bits as usize;
        let mask = self.mask();
        let word = &mut self.data[index / per_word];
        *word = (*word & !(mask << shift)) | ((value as u64 & mask) << shift);
    }

    /// Iterate every entry in index order.
    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        (0..self.len).map(move |i| self.get(i))
    }

    /// Largest stored value, or `None` when empty.
    pub fn max_value(&self) -> Option<u32> {
        self.iter().max()
    }

    /// Copy every entry into storage of a different width.
    pub fn resized(&self, bits: u8) -> Self {
        let mut out = Self::new(bits, self.len);
        if bits > 0 {
            for (i, v) in self.iter().enumerate() {
                out.set(i, v);
            }
        }
        out
    }
}
