//! Big-endian NBT read/write engine.

use bytes::{Buf, BufMut};

use crate::error::NbtError;
use crate::mutf8;
use crate::tag::{NbtCompound, NbtRoot, NbtTag};

/// Maximum nesting depth to prevent stack overflow.
const MAX_DEPTH: usize = 512;

const TAG_END: u8 = 0;
const TAG_COMPOUND: u8 = 10;

// -----------------------------------------------------------------------
// Reading
// -----------------------------------------------------------------------

pub(crate) fn read_named_root(buf: &mut impl Buf) -> Result<NbtRoot, NbtError> {
    ensure_remaining(buf, 1)?;
    let tag_type = buf.get_u8();
    if tag_type != TAG_COMPOUND {
        return Err(NbtError::ExpectedCompound { got: tag_type });
    }
    let name = read_string(buf)?;
    let compound = read_compound(buf, 0)?;
    Ok(NbtRoot { name, compound })
}

/// Nameless root used on the wire. A lone TAG_End means "no payload".
pub(crate) fn read_unnamed_root(buf: &mut impl Buf) -> Result<Option<NbtCompound>, NbtError> {
    ensure_remaining(buf, 1)?;
    match buf.get_u8() {
        TAG_END => Ok(None),
        TAG_COMPOUND => Ok(Some(read_compound(buf, 0)?)),
        other => Err(NbtError::ExpectedCompound { got: other }),
    }
}

fn read_tag(buf: &mut impl Buf, tag_type: u8, depth: usize) -> Result<NbtTag, NbtError> {
    if depth > MAX_DEPTH {
        return Err(NbtError::NestingTooDeep { limit: MAX_DEPTH });
    }

    match tag_type {
        1 => {
            ensure_remaining(buf, 1)?;
            Ok(NbtTag::Byte(buf.get_i8()))
        }
        2 => {
            ensure_remaining(buf, 2)?;
            Ok(NbtTag::Short(buf.get_i16()))
        }
        3 => {
            ensure_remaining(buf, 4)?;
            Ok(NbtTag::Int(buf.get_i32()))
        }
        4 => {
            ensure_remaining(buf, 8)?;
            Ok(NbtTag::Long(buf.get_i64()))
        }
        5 => {
            ensure_remaining(buf, 4)?;
            Ok(NbtTag::Float(buf.get_f32()))
        }
        6 => {
            ensure_remaining(buf, 8)?;
            Ok(NbtTag::Double(buf.get_f64()))
        }
        7 => {
            let len = read_array_len(buf, 1)?;
            let mut arr = Vec::with_capacity(len);
            for _ in 0..len {
                arr.push(buf.get_i8());
            }
            Ok(NbtTag::ByteArray(arr))
        }
        8 => Ok(NbtTag::String(read_string(buf)?)),
        9 => {
            ensure_remaining(buf, 1)?;
            let element_type = buf.get_u8();
            let len = read_array_len(buf, 0)?;
            if element_type == TAG_END && len > 0 {
                return Err(NbtError::UnknownTagType(TAG_END));
            }
            let mut list = Vec::with_capacity(len.min(buf.remaining()));
            for _ in 0..len {
                list.push(read_tag(buf, element_type, depth + 1)?);
            }
            Ok(NbtTag::List(list))
        }
        10 => Ok(NbtTag::Compound(read_compound(buf, depth + 1)?)),
        11 => {
            let len = read_array_len(buf, 4)?;
            let mut arr = Vec::with_capacity(len);
            for _ in 0..len {
                arr.push(buf.get_i32());
            }
            Ok(NbtTag::IntArray(arr))
        }
        12 => {
            let len = read_array_len(buf, 8)?;
            let mut arr = Vec::with_capacity(len);
            for _ in 0..len {
                arr.push(buf.get_i64());
            }
            Ok(NbtTag::LongArray(arr))
        }
        _ => Err(NbtError::UnknownTagType(tag_type)),
    }
}

fn read_compound(buf: &mut impl Buf, depth: usize) -> Result<NbtCompound, NbtError> {
    if depth > MAX_DEPTH {
        return Err(NbtError::NestingTooDeep { limit: MAX_DEPTH });
    }
    let mut map = NbtCompound::new();
    loop {
        ensure_remaining(buf, 1)?;
        let tag_type = buf.get_u8();
        if tag_type == TAG_END {
            break;
        }
        let name = read_string(buf)?;
        let tag = read_tag(buf, tag_type, depth)?;
        map.insert(name, tag);
    }
    Ok(map)
}

/// Read an i32 element count and check that `elem_size * len` bytes follow.
fn read_array_len(buf: &mut impl Buf, elem_size: usize) -> Result<usize, NbtError> {
    ensure_remaining(buf, 4)?;
    let len = buf.get_i32();
    if len < 0 {
        return Err(NbtError::NegativeLength(len));
    }
    let len = len as usize;
    ensure_remaining(buf, len.saturating_mul(elem_size))?;
    Ok(len)
}

fn read_string(buf: &mut impl Buf) -> Result<String, NbtError> {
    ensure_remaining(buf, 2)?;
    let len = buf.get_u16() as usize;
    ensure_remaining(buf, len)?;
    let data = buf.copy_to_bytes(len);
    mutf8::decode(&data).ok_or(NbtError::InvalidUtf8)
}

fn ensure_remaining(buf: &impl Buf, needed: usize) -> Result<(), NbtError> {
    if buf.remaining() < needed {
        Err(NbtError::UnexpectedEof)
    } else {
        Ok(())
    }
}

// -----------------------------------------------------------------------
// Writing
// -----------------------------------------------------------------------

pub(crate) fn write_named_root(buf: &mut impl BufMut, root: &NbtRoot) {
    buf.put_u8(TAG_COMPOUND);
    write_string(buf, &root.name);
    write_compound(buf, &root.compound);
}

pub(crate) fn write_unnamed_root(buf: &mut impl BufMut, compound: Option<&NbtCompound>) {
    match compound {
        Some(map) => {
            buf.put_u8(TAG_COMPOUND);
            write_compound(buf, map);
        }
        None => buf.put_u8(TAG_END),
    }
}

fn write_tag(buf: &mut impl BufMut, tag: &NbtTag) {
    match tag {
        NbtTag::Byte(v) => buf.put_i8(*v),
        NbtTag::Short(v) => buf.put_i16(*v),
        NbtTag::Int(v) => buf.put_i32(*v),
        NbtTag::Long(v) => buf.put_i64(*v),
        NbtTag::Float(v) => buf.put_f32(*v),
        NbtTag::Double(v) => buf.put_f64(*v),
        NbtTag::ByteArray(arr) => {
            buf.put_i32(arr.len() as i32);
            for &b in arr {
                buf.put_i8(b);
            }
        }
        NbtTag::String(s) => write_string(buf, s),
        NbtTag::List(list) => {
            // Lists are homogeneous; the first element decides the type.
            let element_type = list.first().map_or(TAG_END, NbtTag::tag_type_id);
            buf.put_u8(element_type);
            let items: Vec<&NbtTag> = list
                .iter()
                .filter(|item| item.tag_type_id() == element_type)
                .collect();
            buf.put_i32(items.len() as i32);
            for item in items {
                write_tag(buf, item);
            }
        }
        NbtTag::Compound(map) => write_compound(buf, map),
        NbtTag::IntArray(arr) => {
            buf.put_i32(arr.len() as i32);
            for &v in arr {
                buf.put_i32(v);
            }
        }
        NbtTag::LongArray(arr) => {
            buf.put_i32(arr.len() as i32);
            for &v in arr {
                buf.put_i64(v);
            }
        }
    }
}

fn write_compound(buf: &mut impl BufMut, map: &NbtCompound) {
    for (name, tag) in map {
        buf.put_u8(tag.tag_type_id());
        write_string(buf, name);
        write_tag(buf, tag);
    }
    buf.put_u8(TAG_END);
}

/// Strings longer than a u16 length allows are cut at a character boundary.
fn write_string(buf: &mut impl BufMut, s: &str) {
    let data = mutf8::encode(s, u16::MAX as usize);
    buf.put_u16(data.len() as u16);
    buf.put_slice(&data);
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::BytesMut;

    #[test]
    fn named_root_layout() {
        let mut c = NbtCompound::new();
        c.insert("v".into(), NbtTag::Short(0x0102));
        let mut buf = BytesMut::new();
        write_named_root(&mut buf, &NbtRoot::new("ab", c));
        assert_eq!(
            &buf[..],
            &[10, 0, 2, b'a', b'b', 2, 0, 1, b'v', 0x01, 0x02, 0]
        );
    }

    #[test]
    fn unnamed_root_layout() {
        let mut buf = BytesMut::new();
        write_unnamed_root(&mut buf, Some(&NbtCompound::new()));
        write_unnamed_root(&mut buf, None);
        assert_eq!(&buf[..], &[10, 0, 0]);

        let mut data = buf.freeze();
        assert_eq!(read_unnamed_root(&mut data).unwrap(), Some(NbtCompound::new()));
        assert_eq!(read_unnamed_root(&mut data).unwrap(), None);
    }

    #[test]
    fn mixed_list_keeps_first_type() {
        let mut c = NbtCompound::new();
        c.insert(
            "l".into(),
            NbtTag::List(vec![NbtTag::Int(1), NbtTag::Byte(2), NbtTag::Int(3)]),
        );
        let mut buf = BytesMut::new();
        write_named_root(&mut buf, &NbtRoot::new("", c));
        let root = read_named_root(&mut buf.freeze()).unwrap();
        assert_eq!(
            root.compound["l"],
            NbtTag::List(vec![NbtTag::Int(1), NbtTag::Int(3)])
        );
    }

    #[test]
    fn huge_array_length_is_eof() {
        let data = [10u8, 0, 0, 12, 0, 1, b'a', 0x7F, 0xFF, 0xFF, 0xFF];
        assert!(matches!(
            read_named_root(&mut &data[..]),
            Err(NbtError::UnexpectedEof)
        ));
    }

    #[test]
    fn negative_array_length() {
        let data = [10u8, 0, 0, 7, 0, 1, b'a', 0xFF, 0xFF, 0xFF, 0xFE];
        assert!(matches!(
            read_named_root(&mut &data[..]),
            Err(NbtError::NegativeLength(-2))
        ));
    }

    #[test]
    fn nesting_limit() {
        let mut data = vec![10u8, 0, 0];
        for _ in 0..=MAX_DEPTH + 1 {
            data.extend_from_slice(&[10, 0, 0]);
        }
        assert!(matches!(
            read_named_root(&mut &data[..]),
            Err(NbtError::NestingTooDeep { .. })
        ));
    }
}
