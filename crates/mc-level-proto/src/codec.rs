//! Protocol encoding/decoding traits and helpers.

use bytes::{Buf, BufMut, Bytes};

use crate::error::ProtoError;
use crate::types::VarInt;

/// Encode a value onto a buffer.
pub trait ProtoEncode {
    fn proto_encode(&self, buf: &mut impl BufMut);
}

/// Decode a value from a buffer.
pub trait ProtoDecode: Sized {
    fn proto_decode(buf: &mut impl Buf) -> Result<Self, ProtoError>;
}

/// Fail with `BufferTooShort` unless `needed` bytes are left.
pub fn ensure_remaining(buf: &impl Buf, needed: usize) -> Result<(), ProtoError> {
    if buf.remaining() < needed {
        Err(ProtoError::BufferTooShort {
            needed,
            remaining: buf.remaining(),
        })
    } else {
        Ok(())
    }
}

/// Read a VarInt length prefix, rejecting negative values.
pub fn read_len(buf: &mut impl Buf) -> Result<usize, ProtoError> {
    let len = VarInt::proto_decode(buf)?.0;
    if len < 0 {
        return Err(ProtoError::NegativeLength(len));
    }
    Ok(len as usize)
}

/// Write a length-prefixed string (VarInt length + UTF-8).
pub fn write_string(buf: &mut impl BufMut, s: &str) {
    VarInt(s.len() as i32).proto_encode(buf);
    buf.put_slice(s.as_bytes());
}

/// Read a length-prefixed string (VarInt length + UTF-8).
pub fn read_string(buf: &mut impl Buf) -> Result<String, ProtoError> {
    let len = read_len(buf)?;
    ensure_remaining(buf, len)?;
    let data = buf.copy_to_bytes(len);
    String::from_utf8(data.to_vec()).map_err(|_| ProtoError::InvalidUtf8)
}

/// Write a length-prefixed opaque byte array.
pub fn write_byte_array(buf: &mut impl BufMut, data: &[u8]) {
    VarInt(data.len() as i32).proto_encode(buf);
    buf.put_slice(data);
}

/// Read a length-prefixed opaque byte array.
pub fn read_byte_array(buf: &mut impl Buf) -> Result<Bytes, ProtoError> {
    let len = read_len(buf)?;
    ensure_remaining(buf, len)?;
    Ok(buf.copy_to_bytes(len))
}

macro_rules! fixed_width {
    ($ty:ty, $size:expr, $put:ident, $get:ident) => {
        impl ProtoEncode for $ty {
            fn proto_encode(&self, buf: &mut impl BufMut) {
                buf.$put(*self);
            }
        }

        impl ProtoDecode for $ty {
            fn proto_decode(buf: &mut impl Buf) -> Result<Self, ProtoError> {
                ensure_remaining(buf, $size)?;
                Ok(buf.$get())
            }
        }
    };
}

fixed_width!(u8, 1, put_u8, get_u8);
fixed_width!(i8, 1, put_i8, get_i8);
fixed_width!(u16, 2, put_u16, get_u16);
fixed_width!(i16, 2, put_i16, get_i16);
fixed_width!(i32, 4, put_i32, get_i32);
fixed_width!(i64, 8, put_i64, get_i64);
fixed_width!(u64, 8, put_u64, get_u64);
fixed_width!(f32, 4, put_f32, get_f32);
fixed_width!(f64, 8, put_f64, get_f64);

impl ProtoEncode for bool {
    fn proto_encode(&self, buf: &mut impl BufMut) {
        buf.put_u8(*self as u8);
    }
}

impl ProtoDecode for bool {
    fn proto_decode(buf: &mut impl Buf) -> Result<Self, ProtoError> {
        match u8::proto_decode(buf)? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(ProtoError::InvalidBool(other)),
        }
    }
}

/// Length-prefixed array: VarInt count followed by the elements.
impl<T: ProtoEncode> ProtoEncode for Vec<T> {
    fn proto_encode(&self, buf: &mut impl BufMut) {
        VarInt(self.len() as i32).proto_encode(buf);
        for item in self {
            item.proto_encode(buf);
        }
    }
}

impl<T: ProtoDecode> ProtoDecode for Vec<T> {
    fn proto_decode(buf: &mut impl Buf) -> Result<Self, ProtoError> {
        let len = read_len(buf)?;
        // Every element takes at least one byte, so cap the pre-allocation.
        let mut items = Vec::with_capacity(len.min(buf.remaining()));
        for _ in 0..len {
            items.push(T::proto_decode(buf)?);
        }
        Ok(items)
    }
}

/// Optional field: boolean presence flag, then the value when present.
impl<T: ProtoEncode> ProtoEncode for Option<T> {
    fn proto_encode(&self, buf: &mut impl BufMut) {
        match self {
            Some(value) => {
                true.proto_encode(buf);
                value.proto_encode(buf);
            }
            None => false.proto_encode(buf),
        }
    }
}

impl<T: ProtoDecode> ProtoDecode for Option<T> {
    fn proto_decode(buf: &mut impl Buf) -> Result<Self, ProtoError> {
        if bool::proto_decode(buf)? {
            Ok(Some(T::proto_decode(buf)?))
        } else {
            Ok(None)
        }
    }
}
