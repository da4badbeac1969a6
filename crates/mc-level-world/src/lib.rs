//! Chunk columns for Minecraft Java Edition 1.18+.
//!
//! A [`Chunk`] is a stack of 16x16x16 [`Section`]s, each holding paletted block
//! states and biomes. Chunks convert to the chunk data packet layout through
//! [`ProtoEncode`](mc_level_proto::ProtoEncode) / [`Chunk::read_from`], and to
//! the region file layout through [`convert`] and [`save::SaveChunk`].

pub mod bit_storage;
pub mod block_entity;
pub mod chunk;
pub mod convert;
pub mod error;
pub mod heightmap;
pub mod light;
pub mod palette;
pub mod registry;
pub mod save;
pub mod section;
pub mod status;

pub use block_entity::{BlockEntity, BlockEntityBase};
pub use chunk::{Chunk, ChunkPos};
pub use convert::{chunk_from_save, chunk_to_save};
pub use error::WorldError;
pub use heightmap::{HeightMap, HeightMapKind};
pub use light::LightData;
pub use palette::{ContainerConfig, PaletteContainer, PaletteValue};
pub use registry::{
    BiomeId, BiomeRegistry, BiomeTable, BlockEntityTypeRegistry, BlockEntityTypeTable,
    BlockRegistry, BlockStateId, BlockStateTable, Registries,
};
pub use save::SaveChunk;
pub use section::{Section, SectionConfig};
pub use status::ChunkStatus;
