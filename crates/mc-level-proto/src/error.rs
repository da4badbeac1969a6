//! Protocol-level errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProtoError {
    #[error("buffer too short: need {needed} more bytes, have {remaining}")]
    BufferTooShort { needed: usize, remaining: usize },

    #[error("VarInt encoding error: {0}")]
    VarInt(#[from] crate::types::VarIntError),

    #[error("invalid UTF-8 string")]
    InvalidUtf8,

    #[error("negative length prefix: {0}")]
    NegativeLength(i32),

    #[error("invalid boolean byte: 0x{0:02X}")]
    InvalidBool(u8),

    #[error("invalid data: {0}")]
    InvalidData(String),
}

impl ProtoError {
    /// Whether this error means the input ran out, as opposed to being corrupt.
    pub fn is_eof(&self) -> bool {
        matches!(
            self,
            ProtoError::BufferTooShort { .. }
                | ProtoError::VarInt(crate::types::VarIntError::BufferTooShort)
        )
    }
}
