//! Chunk columns and their network form.

use bytes::{Buf, BufMut, BytesMut};
use mc_level_proto::codec::{read_byte_array, read_len, write_byte_array};
use mc_level_proto::{ProtoDecode, ProtoEncode, ProtoError, VarInt};
use tracing::debug;

use crate::block_entity::BlockEntity;
use crate::error::WorldError;
use crate::heightmap::HeightMap;
use crate::light::LightData;
use crate::registry::{BiomeId, BlockRegistry, BlockStateId};
use crate::section::{biome_index, block_index, Section, SectionConfig};
use crate::status::ChunkStatus;

/// Chunk coordinates, written as two big-endian ints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ChunkPos {
    pub x: i32,
    pub z: i32,
}

impl ChunkPos {
    pub fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    /// The chunk containing a block position.
    pub fn from_block(x: i32, z: i32) -> Self {
        Self {
            x: x >> 4,
            z: z >> 4,
        }
    }
}

impl ProtoEncode for ChunkPos {
    fn proto_encode(&self, buf: &mut impl BufMut) {
        self.x.proto_encode(buf);
        self.z.proto_encode(buf);
    }
}

impl ProtoDecode for ChunkPos {
    fn proto_decode(buf: &mut impl Buf) -> Result<Self, ProtoError> {
        Ok(Self {
            x: i32::proto_decode(buf)?,
            z: i32::proto_decode(buf)?,
        })
    }
}

/// A vertical column of sections. `sections[0]` is the lowest one.
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    pub sections: Vec<Section>,
    pub height_maps: Vec<HeightMap>,
    pub block_entities: Vec<BlockEntity>,
    pub status: ChunkStatus,
}

impl Chunk {
    /// `section_count` empty sections with the vanilla container layout.
    pub fn empty(section_count: usize) -> Self {
        Self::with_config(section_count, SectionConfig::default())
    }

    pub fn with_config(section_count: usize, config: SectionConfig) -> Self {
        Self {
            sections: vec![Section::new(config); section_count],
            height_maps: Vec::new(),
            block_entities: Vec::new(),
            status: ChunkStatus::Empty,
        }
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    pub fn section(&self, index: usize) -> Option<&Section> {
        self.sections.get(index)
    }

    pub fn section_mut(&mut self, index: usize) -> Option<&mut Section> {
        self.sections.get_mut(index)
    }

    /// Block at chunk-local coordinates; `y` counts blocks from the bottom of
    /// the column. `None` above the top or outside the 16x16 footprint.
    pub fn get_block(&self, x: usize, y: usize, z: usize) -> Option<BlockStateId> {
        if x >= 16 || z >= 16 {
            return None;
        }
        let section = self.sections.get(y / 16)?;
        Some(section.get_block(block_index(x, y % 16, z)))
    }

    pub fn set_block(
        &mut self,
        x: usize,
        y: usize,
        z: usize,
        state: BlockStateId,
        registry: &dyn BlockRegistry,
    ) -> Result<(), WorldError> {
        let section = self.locate(x, y, z, 16)?;
        self.sections[section].set_block(block_index(x, y % 16, z), state, registry);
        Ok(())
    }

    /// Biome at 4x4x4 cell coordinates; `y` counts cells from the bottom.
    pub fn get_biome(&self, x: usize, y: usize, z: usize) -> Option<BiomeId> {
        if x >= 4 || z >= 4 {
            return None;
        }
        let section = self.sections.get(y / 4)?;
        Some(section.get_biome(biome_index(x, y % 4, z)))
    }

    pub fn set_biome(
        &mut self,
        x: usize,
        y: usize,
        z: usize,
        biome: BiomeId,
    ) -> Result<(), WorldError> {
        let section = self.locate(x, y, z, 4)?;
        self.sections[section].set_biome(biome_index(x, y % 4, z), biome);
        Ok(())
    }

    fn locate(&self, x: usize, y: usize, z: usize, side: usize) -> Result<usize, WorldError> {
        if x >= side || z >= side {
            return Err(WorldError::XzOutOfRange {
                x: x as i32,
                z: z as i32,
            });
        }
        let section = y / side;
        if section >= self.sections.len() {
            return Err(WorldError::SectionOutOfBounds {
                y: section as i32,
                count: self.sections.len(),
            });
        }
        Ok(section)
    }

    /// All section records back to back, as carried in the chunk data packet.
    pub fn section_data(&self) -> BytesMut {
        let mut data = BytesMut::new();
        for section in &self.sections {
            section.proto_encode(&mut data);
        }
        data
    }

    /// Decode section records into fresh sections shaped like the current ones.
    ///
    /// Running out of data ends the list: sections before the short one are
    /// kept and the rest are dropped. Any other error fails the whole read.
    fn read_sections(&self, mut data: impl Buf) -> Result<Vec<Section>, WorldError> {
        let mut sections = Vec::with_capacity(self.sections.len());
        for shape in &self.sections {
            let mut section = Section::new(SectionConfig {
                states: shape.states().config(),
                biomes: shape.biomes().config(),
            });
            match section.read_from(&mut data) {
                Ok(()) => sections.push(section),
                Err(e) if e.is_eof() => {
                    debug!(
                        decoded = sections.len(),
                        expected = self.sections.len(),
                        "section data ended early, truncating"
                    );
                    break;
                }
                Err(e) => return Err(e),
            }
        }
        Ok(sections)
    }

    /// Read a chunk from its network form into this chunk.
    ///
    /// The section count and container layout come from `self` (start from
    /// [`Chunk::empty`]). `status` is not on the wire and is left as is. On
    /// error `self` is unchanged.
    pub fn read_from(&mut self, buf: &mut impl Buf) -> Result<(), WorldError> {
        let count = read_len(buf)?;
        let mut height_maps = Vec::with_capacity(count.min(buf.remaining()));
        for _ in 0..count {
            height_maps.push(HeightMap::decode(buf)?);
        }

        let data = read_byte_array(buf)?;
        let mut sections = self.read_sections(data)?;

        let count = read_len(buf)?;
        let mut block_entities = Vec::with_capacity(count.min(buf.remaining()));
        for _ in 0..count {
            block_entities.push(BlockEntity::decode(buf)?);
        }

        LightData::decode(buf)?.apply_to(&mut sections)?;

        self.height_maps = height_maps;
        self.sections = sections;
        self.block_entities = block_entities;
        Ok(())
    }
}

impl ProtoEncode for Chunk {
    fn proto_encode(&self, buf: &mut impl BufMut) {
        VarInt(self.height_maps.len() as i32).proto_encode(buf);
        for map in &self.height_maps {
            map.proto_encode(buf);
        }
        write_byte_array(buf, &self.section_data());
        VarInt(self.block_entities.len() as i32).proto_encode(buf);
        for be in &self.block_entities {
            be.proto_encode(buf);
        }
        LightData::from_sections(&self.sections).proto_encode(buf);
    }
}
