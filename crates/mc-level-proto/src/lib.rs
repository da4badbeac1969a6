//! Minecraft Java Edition wire primitives.
//!
//! Everything here is big-endian except the variable-length integers, which use
//! LEB128 over the two's-complement bits (no ZigZag).

pub mod bitset;
pub mod codec;
pub mod error;
pub mod types;

pub use bitset::BitSet;
pub use codec::{ProtoDecode, ProtoEncode};
pub use error::ProtoError;
pub use types::{VarInt, VarLong};
