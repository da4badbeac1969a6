//! Heightmaps: one packed height per column, kept as opaque longs.

use bytes::{Buf, BufMut};
use mc_level_proto::{ProtoDecode, ProtoEncode, VarInt};

use crate::bit_storage::BitStorage;
use crate::error::WorldError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HeightMapKind {
    WorldSurfaceWg,
    WorldSurface,
    OceanFloorWg,
    OceanFloor,
    MotionBlocking,
    MotionBlockingNoLeaves,
}

impl HeightMapKind {
    pub const ALL: [HeightMapKind; 6] = [
        HeightMapKind::WorldSurfaceWg,
        HeightMapKind::WorldSurface,
        HeightMapKind::OceanFloorWg,
        HeightMapKind::OceanFloor,
        HeightMapKind::MotionBlocking,
        HeightMapKind::MotionBlockingNoLeaves,
    ];

    pub fn wire_id(self) -> i32 {
        self as i32
    }

    pub fn from_wire_id(id: i32) -> Option<Self> {
        usize::try_from(id).ok().and_then(|i| Self::ALL.get(i).copied())
    }

    /// Key under `Heightmaps` on disk.
    pub fn disk_key(self) -> &'static str {
        match self {
            HeightMapKind::WorldSurfaceWg => "WORLD_SURFACE_WG",
            HeightMapKind::WorldSurface => "WORLD_SURFACE",
            HeightMapKind::OceanFloorWg => "OCEAN_FLOOR_WG",
            HeightMapKind::OceanFloor => "OCEAN_FLOOR",
            HeightMapKind::MotionBlocking => "MOTION_BLOCKING",
            HeightMapKind::MotionBlockingNoLeaves => "MOTION_BLOCKING_NO_LEAVES",
        }
    }

    pub fn from_disk_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.disk_key() == key)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeightMap {
    pub kind: HeightMapKind,
    pub data: Vec<i64>,
}

/// Bits per height for a column `section_count` sections tall.
pub fn height_bits(section_count: usize) -> u8 {
    let max = section_count * 16 + 1;
    (usize::BITS - (max - 1).leading_zeros()) as u8
}

impl HeightMap {
    /// Pack 256 heights, indexed `z * 16 + x`.
    pub fn from_heights(kind: HeightMapKind, heights: &[u32; 256], section_count: usize) -> Self {
        let mut storage = BitStorage::new(height_bits(section_count), 256);
        for (i, h) in heights.iter().enumerate() {
            storage.set(i, *h);
        }
        Self {
            kind,
            data: storage.into_words().into_iter().map(|w| w as i64).collect(),
        }
    }

    /// Unpack the 256 heights, checking the packed length for this column height.
    pub fn heights(&self, section_count: usize) -> Result<Vec<u32>, WorldError> {
        let words = self.data.iter().map(|&w| w as u64).collect();
        let storage = BitStorage::from_words(height_bits(section_count), 256, words)?;
        Ok(storage.iter().collect())
    }

    pub fn decode(buf: &mut impl Buf) -> Result<Self, WorldError> {
        let id = VarInt::proto_decode(buf)?.0;
        let kind = HeightMapKind::from_wire_id(id)
            .ok_or_else(|| WorldError::invalid("heightmap", format!("unknown type {id}")))?;
        let data = Vec::<i64>::proto_decode(buf)?;
        Ok(Self { kind, data })
    }
}

impl ProtoEncode for HeightMap {
    fn proto_encode(&self, buf: &mut impl BufMut) {
        VarInt(self.kind.wire_id()).proto_encode(buf);
        VarInt(self.data.len() as i32).proto_encode(buf);
        for &word in &self.data {
            buf.put_i64(word);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::BytesMut;

    #[test]
    fn wire_ids_and_disk_keys() {
        for (i, kind) in HeightMapKind::ALL.into_iter().enumerate() {
            assert_eq!(kind.wire_id(), i as i32);
            assert_eq!(HeightMapKind::from_wire_id(i as i32), Some(kind));
            assert_eq!(HeightMapKind::from_disk_key(kind.disk_key()), Some(kind));
        }
        assert_eq!(HeightMapKind::MotionBlocking.wire_id(), 4);
        assert_eq!(HeightMapKind::from_wire_id(6), None);
        assert_eq!(HeightMapKind::from_disk_key("LIGHT_BLOCKING"), None);
    }

    #[test]
    fn overworld_uses_nine_bits() {
        assert_eq!(height_bits(24), 9);
        assert_eq!(height_bits(16), 9);
        assert_eq!(height_bits(8), 8);
    }

    #[test]
    fn pack_heights() {
        let mut heights = [0u32; 256];
        heights[0] = 384;
        heights[255] = 1;
        let map = HeightMap::from_heights(HeightMapKind::WorldSurface, &heights, 24);
        // 7 heights per word for 9 bits.
        assert_eq!(map.data.len(), 37);
        assert_eq!(map.heights(24).unwrap(), heights.to_vec());
        assert!(map.heights(8).is_err());
    }

    #[test]
    fn wire_roundtrip() {
        let map = HeightMap {
            kind: HeightMapKind::MotionBlocking,
            data: vec![1, -1],
        };
        let mut buf = BytesMut::new();
        map.proto_encode(&mut buf);
        assert_eq!(buf[0], 4);
        assert_eq!(buf[1], 2);
        let decoded = HeightMap::decode(&mut buf.freeze()).unwrap();
        assert_eq!(decoded, map);
    }

    #[test]
    fn unknown_wire_kind_is_malformed() {
        let mut data = &[9u8, 0][..];
        assert!(HeightMap::decode(&mut data).unwrap_err().is_malformed());
    }
}
