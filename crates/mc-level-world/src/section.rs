//! A 16x16x16 chunk section: block states, biomes, light and a non-air counter.

use bytes::{Buf, BufMut};
use mc_level_proto::{ProtoDecode, ProtoEncode};

use crate::error::WorldError;
use crate::palette::{ContainerConfig, PaletteContainer};
use crate::registry::{BiomeId, BlockRegistry, BlockStateId};

/// Bytes in a light array: 4096 nibbles.
pub const LIGHT_LEN: usize = 2048;

/// Container layout for a section's two grids.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectionConfig {
    pub states: ContainerConfig,
    pub biomes: ContainerConfig,
}

impl Default for SectionConfig {
    fn default() -> Self {
        Self {
            states: ContainerConfig::block_states(),
            biomes: ContainerConfig::biomes(),
        }
    }
}

/// Index of a block inside a section, YZX order.
pub fn block_index(x: usize, y: usize, z: usize) -> usize {
    debug_assert!(x < 16 && y < 16 && z < 16);
    (y << 8) | (z << 4) | x
}

/// Index of a 4x4x4 biome cell inside a section, YZX order.
pub fn biome_index(x: usize, y: usize, z: usize) -> usize {
    debug_assert!(x < 4 && y < 4 && z < 4);
    (y << 4) | (z << 2) | x
}

#[derive(Debug, Clone, PartialEq)]
pub struct Section {
    block_count: i16,
    states: PaletteContainer<BlockStateId>,
    biomes: PaletteContainer<BiomeId>,
    sky_light: Option<Vec<u8>>,
    block_light: Option<Vec<u8>>,
}

impl Default for Section {
    fn default() -> Self {
        Self::empty()
    }
}

impl Section {
    /// All air, all biome 0, no light.
    pub fn new(config: SectionConfig) -> Self {
        Self {
            block_count: 0,
            states: PaletteContainer::new(config.states, BlockStateId::AIR),
            biomes: PaletteContainer::new(config.biomes, BiomeId(0)),
            sky_light: None,
            block_light: None,
        }
    }

    pub fn empty() -> Self {
        Self::new(SectionConfig::default())
    }

    /// Build a section from decoded containers, counting non-air blocks once.
    pub fn from_containers(
        states: PaletteContainer<BlockStateId>,
        biomes: PaletteContainer<BiomeId>,
        registry: &dyn BlockRegistry,
    ) -> Self {
        let mut section = Self {
            block_count: 0,
            states,
            biomes,
            sky_light: None,
            block_light: None,
        };
        section.recount_blocks(registry);
        section
    }

    pub fn states(&self) -> &PaletteContainer<BlockStateId> {
        &self.states
    }

    pub fn biomes(&self) -> &PaletteContainer<BiomeId> {
        &self.biomes
    }

    pub fn get_block(&self, index: usize) -> BlockStateId {
        self.states.get(index)
    }

    /// Set a block, keeping the non-air counter in step. The counter wraps
    /// rather than overflowing when it started from a bogus wire value.
    pub fn set_block(&mut self, index: usize, state: BlockStateId, registry: &dyn BlockRegistry) {
        let old = self.states.get(index);
        if !registry.is_air(old) {
            self.block_count = self.block_count.wrapping_sub(1);
        }
        if !registry.is_air(state) {
            self.block_count = self.block_count.wrapping_add(1);
        }
        self.states.set(index, state);
    }

    pub fn get_biome(&self, index: usize) -> BiomeId {
        self.biomes.get(index)
    }

    pub fn set_biome(&mut self, index: usize, biome: BiomeId) {
        self.biomes.set(index, biome);
    }

    /// Non-air blocks as tracked by edits and the last recount.
    pub fn block_count(&self) -> i16 {
        self.block_count
    }

    /// Scan every block and count the ones that are not air.
    pub fn count_non_air(&self, registry: &dyn BlockRegistry) -> i16 {
        (0..self.states.config().volume)
            .filter(|&i| !registry.is_air(self.states.get(i)))
            .count() as i16
    }

    pub fn recount_blocks(&mut self, registry: &dyn BlockRegistry) {
        self.block_count = self.count_non_air(registry);
    }

    pub fn sky_light(&self) -> Option<&[u8]> {
        self.sky_light.as_deref()
    }

    pub fn block_light(&self) -> Option<&[u8]> {
        self.block_light.as_deref()
    }

    pub fn set_sky_light(&mut self, light: Option<Vec<u8>>) -> Result<(), WorldError> {
        check_light(light.as_deref())?;
        self.sky_light = light;
        Ok(())
    }

    pub fn set_block_light(&mut self, light: Option<Vec<u8>>) -> Result<(), WorldError> {
        check_light(light.as_deref())?;
        self.block_light = light;
        Ok(())
    }

    /// Read `block_count`, states and biomes from the network. The section is
    /// only changed when the whole record decodes. `block_count` is kept as
    /// sent; call [`Section::recount_blocks`] to rebuild it.
    pub fn read_from(&mut self, buf: &mut impl Buf) -> Result<(), WorldError> {
        let block_count = i16::proto_decode(buf)?;
        let states = PaletteContainer::decode(self.states.config(), buf)?;
        let biomes = PaletteContainer::decode(self.biomes.config(), buf)?;
        self.block_count = block_count;
        self.states = states;
        self.biomes = biomes;
        Ok(())
    }
}

fn check_light(light: Option<&[u8]>) -> Result<(), WorldError> {
    match light {
        Some(data) if data.len() != LIGHT_LEN => Err(WorldError::InvalidLightLength(data.len())),
        _ => Ok(()),
    }
}

/// Light is not part of the section record; it travels in the light data.
impl ProtoEncode for Section {
    fn proto_encode(&self, buf: &mut impl BufMut) {
        self.block_count.proto_encode(buf);
        self.states.proto_encode(buf);
        self.biomes.proto_encode(buf);
    }
}
