//! Chunk model and conversion errors.

use mc_level_nbt::NbtError;
use mc_level_proto::ProtoError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WorldError {
    // -- out of range --
    #[error("section Y {y} outside [0, {count}) relative to yPos")]
    SectionOutOfBounds { y: i32, count: usize },

    #[error("block entity offset ({x}, {z}) outside [0, 15]")]
    XzOutOfRange { x: i32, z: i32 },

    #[error("block entity Y {0} does not fit in 16 bits")]
    BlockEntityYOutOfRange(i32),

    // -- unknown identifier --
    #[error("unknown block: {0}")]
    UnknownBlock(String),

    #[error("unknown state for block {name}: {properties}")]
    UnknownBlockState { name: String, properties: String },

    #[error("unknown block state id: {0}")]
    UnknownBlockStateId(u32),

    #[error("unknown biome: {0}")]
    UnknownBiome(String),

    #[error("unknown biome id: {0}")]
    UnknownBiomeId(u32),

    #[error("unknown block entity type: {0}")]
    UnknownBlockEntityType(String),

    // -- malformed input --
    #[error("protocol error: {0}")]
    Proto(#[from] ProtoError),

    #[error("NBT error: {0}")]
    Nbt(#[from] NbtError),

    #[error("packed data has {got} words, expected {expected} for {bits} bits per entry")]
    PackedLength {
        bits: u8,
        expected: usize,
        got: usize,
    },

    #[error("palette index {index} out of range for palette of {len}")]
    PaletteIndex { index: u64, len: usize },

    #[error("light array has {0} bytes, expected 2048")]
    InvalidLightLength(usize),

    #[error("missing field: {0}")]
    MissingField(&'static str),

    #[error("invalid field {field}: {reason}")]
    InvalidField {
        field: &'static str,
        reason: String,
    },

    #[error("registry data: {0}")]
    Registry(#[from] serde_json::Error),
}

impl WorldError {
    pub fn is_out_of_range(&self) -> bool {
        matches!(
            self,
            WorldError::SectionOutOfBounds { .. }
                | WorldError::XzOutOfRange { .. }
                | WorldError::BlockEntityYOutOfRange(_)
        )
    }

    pub fn is_unknown_identifier(&self) -> bool {
        matches!(
            self,
            WorldError::UnknownBlock(_)
                | WorldError::UnknownBlockState { .. }
                | WorldError::UnknownBlockStateId(_)
                | WorldError::UnknownBiome(_)
                | WorldError::UnknownBiomeId(_)
                | WorldError::UnknownBlockEntityType(_)
        )
    }

    /// Corrupt or exhausted input on either the disk or the wire path.
    pub fn is_malformed(&self) -> bool {
        matches!(
            self,
            WorldError::Proto(_)
                | WorldError::Nbt(_)
                | WorldError::PackedLength { .. }
                | WorldError::PaletteIndex { .. }
                | WorldError::InvalidLightLength(_)
                | WorldError::MissingField(_)
                | WorldError::InvalidField { .. }
        )
    }

    /// The input stream ran out before the value was complete.
    pub fn is_eof(&self) -> bool {
        matches!(self, WorldError::Proto(e) if e.is_eof())
    }

    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        WorldError::InvalidField {
            field,
            reason: reason.into(),
        }
    }
}
