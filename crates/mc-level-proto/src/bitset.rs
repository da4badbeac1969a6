//! Length-prefixed bit set (VarInt word count + big-endian longs).

use std::ops::Not;

use bytes::{Buf, BufMut};

use crate::codec::{ProtoDecode, ProtoEncode};
use crate::error::ProtoError;

/// A growable set of bits backed by 64-bit words.
///
/// Bit `i` lives in word `i / 64` at position `i % 64`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BitSet(pub Vec<u64>);

impl BitSet {
    /// A bit set able to hold `bits` bits without growing.
    pub fn with_capacity(bits: usize) -> Self {
        BitSet(vec![0; bits.div_ceil(64)])
    }

    pub fn get(&self, index: usize) -> bool {
        self.0
            .get(index / 64)
            .is_some_and(|word| word & (1 << (index % 64)) != 0)
    }

    /// Set or clear bit `index`, growing the word list when needed.
    pub fn set(&mut self, index: usize, value: bool) {
        let word = index / 64;
        if word >= self.0.len() {
            if !value {
                return;
            }
            self.0.resize(word + 1, 0);
        }
        if value {
            self.0[word] |= 1 << (index % 64);
        } else {
            self.0[word] &= !(1 << (index % 64));
        }
    }

    /// Number of set bits.
    pub fn count_ones(&self) -> usize {
        self.0.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// Word-wise complement; the word count is unchanged.
    pub fn complement(&self) -> Self {
        BitSet(self.0.iter().map(|w| !w).collect())
    }

    pub fn words(&self) -> &[u64] {
        &self.0
    }
}

impl Not for &BitSet {
    type Output = BitSet;

    fn not(self) -> BitSet {
        self.complement()
    }
}

impl ProtoEncode for BitSet {
    fn proto_encode(&self, buf: &mut impl BufMut) {
        self.0.proto_encode(buf);
    }
}

impl ProtoDecode for BitSet {
    fn proto_decode(buf: &mut impl Buf) -> Result<Self, ProtoError> {
        Ok(BitSet(Vec::<u64>::proto_decode(buf)?))
    }
}
