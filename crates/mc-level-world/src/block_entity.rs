//! Block entities as carried in chunk data.

use bytes::{Buf, BufMut};
use mc_level_nbt::{read_nbt_network, write_nbt_network, NbtCompound, NbtError, NbtTag};
use mc_level_proto::{ProtoDecode, ProtoEncode, ProtoError, VarInt};

use crate::error::WorldError;

/// A block entity with its position packed relative to the chunk.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockEntity {
    /// Chunk-local X in the high nibble, Z in the low nibble.
    pub xz: u8,
    /// Absolute world Y.
    pub y: i16,
    /// Numeric block-entity type.
    pub kind: i32,
    /// Type-specific payload.
    pub data: NbtCompound,
}

impl BlockEntity {
    /// Store chunk-local X/Z. Fails without touching `self` if either is outside [0, 15].
    pub fn pack_xz(&mut self, x: i32, z: i32) -> Result<(), WorldError> {
        if !(0..16).contains(&x) || !(0..16).contains(&z) {
            return Err(WorldError::XzOutOfRange { x, z });
        }
        self.xz = ((x as u8) << 4) | z as u8;
        Ok(())
    }

    pub fn unpack_xz(&self) -> (u8, u8) {
        (self.xz >> 4, self.xz & 0x0F)
    }

    pub fn decode(buf: &mut impl Buf) -> Result<Self, WorldError> {
        let xz = u8::proto_decode(buf)?;
        let y = i16::proto_decode(buf)?;
        let kind = VarInt::proto_decode(buf)?.0;
        let data = read_nbt_network(buf)
            .map_err(|e| match e {
                NbtError::UnexpectedEof => ProtoError::BufferTooShort {
                    needed: 1,
                    remaining: 0,
                },
                other => ProtoError::InvalidData(other.to_string()),
            })?
            .unwrap_or_default();
        Ok(Self { xz, y, kind, data })
    }
}

impl ProtoEncode for BlockEntity {
    fn proto_encode(&self, buf: &mut impl BufMut) {
        buf.put_u8(self.xz);
        self.y.proto_encode(buf);
        VarInt(self.kind).proto_encode(buf);
        write_nbt_network(buf, Some(&self.data));
    }
}

/// Fields every persisted block-entity payload starts with.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BlockEntityBase {
    pub id: String,
    pub x: i32,
    pub y: i32,
    pub z: i32,
    /// Marks payloads that should stay packed until the block entity is loaded.
    pub keep_packed: bool,
}

impl BlockEntityBase {
    /// Read the base fields out of a payload. `keep_packed` defaults to false.
    pub fn from_nbt(data: &NbtCompound) -> Result<Self, WorldError> {
        let int = |key: &'static str| -> Result<i32, WorldError> {
            data.get(key)
                .ok_or(WorldError::MissingField(key))?
                .as_int()
                .ok_or_else(|| WorldError::invalid(key, "expected TAG_Int"))
        };
        let id = data
            .get("id")
            .ok_or(WorldError::MissingField("id"))?
            .as_string()
            .ok_or_else(|| WorldError::invalid("id", "expected TAG_String"))?
            .to_owned();
        Ok(Self {
            id,
            x: int("x")?,
            y: int("y")?,
            z: int("z")?,
            keep_packed: data
                .get("keep_packed")
                .and_then(NbtTag::as_bool)
                .unwrap_or(false),
        })
    }

    /// Write the base fields into a payload, replacing any previous values.
    pub fn write_to(&self, data: &mut NbtCompound) {
        data.insert("id".into(), NbtTag::String(self.id.clone()));
        data.insert("x".into(), NbtTag::Int(self.x));
        data.insert("y".into(), NbtTag::Int(self.y));
        data.insert("z".into(), NbtTag::Int(self.z));
        if self.keep_packed {
            data.insert("keep_packed".into(), NbtTag::Byte(1));
        } else {
            data.remove("keep_packed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::BytesMut;

    fn entity() -> BlockEntity {
        BlockEntity {
            xz: 0,
            y: 64,
            kind: 1,
            data: NbtCompound::new(),
        }
    }

    #[test]
    fn pack_is_bijective() {
        let mut seen = std::collections::HashSet::new();
        let mut be = entity();
        for x in 0..16 {
            for z in 0..16 {
                be.pack_xz(x, z).unwrap();
                assert_eq!(be.unpack_xz(), (x as u8, z as u8));
                assert!(seen.insert(be.xz));
            }
        }
        assert_eq!(seen.len(), 256);
    }

    #[test]
    fn pack_layout() {
        let mut be = entity();
        be.pack_xz(3, 12).unwrap();
        assert_eq!(be.xz, 0x3C);
    }

    #[test]
    fn pack_out_of_range_leaves_entity() {
        let mut be = entity();
        be.pack_xz(5, 7).unwrap();
        for (x, z) in [(16, 0), (0, 16), (-1, 3), (3, -1), (i32::MAX, 0)] {
            assert!(matches!(
                be.pack_xz(x, z),
                Err(WorldError::XzOutOfRange { .. })
            ));
            assert_eq!(be.unpack_xz(), (5, 7));
        }
    }

    #[test]
    fn wire_roundtrip() {
        let mut be = entity();
        be.pack_xz(15, 1).unwrap();
        be.y = -60;
        be.data.insert("CustomName".into(), NbtTag::String("box".into()));
        let mut buf = BytesMut::new();
        be.proto_encode(&mut buf);
        assert_eq!(&buf[..4], &[0xF1, 0xFF, 0xC4, 1]);
        let decoded = BlockEntity::decode(&mut buf.freeze()).unwrap();
        assert_eq!(decoded, be);
    }

    #[test]
    fn wire_end_tag_is_empty_payload() {
        let mut data = &[0x11u8, 0, 10, 2, 0][..];
        let decoded = BlockEntity::decode(&mut data).unwrap();
        assert_eq!(decoded.unpack_xz(), (1, 1));
        assert_eq!(decoded.y, 10);
        assert!(decoded.data.is_empty());
    }

    #[test]
    fn truncated_payload_is_eof() {
        let mut data = &[0x11u8, 0, 10, 2, 10, 3][..];
        assert!(BlockEntity::decode(&mut data).unwrap_err().is_eof());
    }

    #[test]
    fn base_fields() {
        let mut data = NbtCompound::new();
        BlockEntityBase {
            id: "minecraft:chest".into(),
            x: -31,
            y: 70,
            z: 5,
            keep_packed: false,
        }
        .write_to(&mut data);
        let base = BlockEntityBase::from_nbt(&data).unwrap();
        assert_eq!(base.id, "minecraft:chest");
        assert_eq!((base.x, base.y, base.z), (-31, 70, 5));
        assert!(!base.keep_packed);

        data.insert("keep_packed".into(), NbtTag::Byte(1));
        assert!(BlockEntityBase::from_nbt(&data).unwrap().keep_packed);

        data.remove("x");
        assert!(matches!(
            BlockEntityBase::from_nbt(&data),
            Err(WorldError::MissingField("x"))
        ));
    }
}
