mod config;

use std::error::Error;
use std::fs::File;
use std::io::BufWriter;

use bytes::BytesMut;
use config::LevelConfig;
use mc_level_nbt::{is_gzip, read_nbt, read_nbt_gzip, write_nbt, write_nbt_gzip, NbtRoot};
use mc_level_proto::{ProtoDecode, ProtoEncode};
use mc_level_world::{
    chunk_from_save, chunk_to_save, BiomeRegistry, BiomeTable, BlockEntityTypeTable,
    BlockRegistry, BlockStateTable, Chunk, ChunkPos, Registries, SaveChunk,
};
use tracing::{error, info, warn};

struct Tables {
    blocks: BlockStateTable,
    biomes: BiomeTable,
    block_entities: BlockEntityTypeTable,
}

impl Tables {
    fn load(config: &LevelConfig) -> Result<Self, Box<dyn Error>> {
        let blocks = BlockStateTable::from_json(&std::fs::read_to_string(&config.registry.blocks)?)?;
        let biomes = BiomeTable::from_json(&std::fs::read_to_string(&config.registry.biomes)?)?;
        let block_entities = BlockEntityTypeTable::from_json(&std::fs::read_to_string(
            &config.registry.block_entities,
        )?)?;
        Ok(Self {
            blocks,
            biomes,
            block_entities,
        })
    }

    fn registries(&self) -> Registries<'_> {
        Registries {
            blocks: &self.blocks,
            biomes: &self.biomes,
            block_entities: &self.block_entities,
        }
    }
}

fn read_save(config: &LevelConfig) -> Result<SaveChunk, Box<dyn Error>> {
    let data = std::fs::read(&config.input.path)?;
    let root = if is_gzip(&data) {
        read_nbt_gzip(&data[..])?
    } else {
        if config.input.gzip {
            warn!("{} is not gzip compressed, reading it as plain NBT", config.input.path);
        }
        read_nbt(&mut &data[..])?
    };
    Ok(SaveChunk::from_nbt(&root.compound)?)
}

/// Send the chunk through the packet layout and check nothing changed.
fn wire_roundtrip(chunk: &Chunk, pos: ChunkPos) -> Result<usize, Box<dyn Error>> {
    let mut buf = BytesMut::new();
    pos.proto_encode(&mut buf);
    chunk.proto_encode(&mut buf);
    let len = buf.len();

    let mut data = buf.freeze();
    let decoded_pos = ChunkPos::proto_decode(&mut data)?;
    let mut decoded = Chunk::empty(chunk.sections().len());
    decoded.read_from(&mut data)?;
    decoded.status = chunk.status.clone();

    if decoded_pos != pos || decoded != *chunk {
        return Err("chunk changed after a wire round trip".into());
    }
    if !data.is_empty() {
        return Err(format!("{} bytes left after decoding the chunk", data.len()).into());
    }
    Ok(len)
}

fn write_save(config: &LevelConfig, path: &str, save: &SaveChunk) -> Result<(), Box<dyn Error>> {
    let root = NbtRoot::new("", save.to_nbt());
    if config.output.gzip {
        write_nbt_gzip(BufWriter::new(File::create(path)?), &root)?;
    } else {
        let mut buf = BytesMut::new();
        write_nbt(&mut buf, &root);
        std::fs::write(path, &buf)?;
    }
    Ok(())
}

fn run(config: &LevelConfig) -> Result<(), Box<dyn Error>> {
    let tables = Tables::load(config)?;
    info!(
        "Registries: {} block states, {} biomes",
        tables.blocks.state_count(),
        tables.biomes.biome_count()
    );

    let mut save = read_save(config)?;
    if save.y_pos != config.world.min_section_y {
        warn!(
            "Chunk yPos {} differs from configured min_section_y {}",
            save.y_pos, config.world.min_section_y
        );
    }
    let pos = ChunkPos::new(save.x_pos, save.z_pos);
    let chunk = chunk_from_save(&save, config.world.section_count, &tables.registries())?;
    let non_air: i32 = chunk
        .sections()
        .iter()
        .map(|s| i32::from(s.block_count()))
        .sum();
    info!(
        "Loaded chunk [{}, {}] (status: {}, {} non-air blocks, {} block entities)",
        pos.x,
        pos.z,
        chunk.status,
        non_air,
        chunk.block_entities.len()
    );

    let len = wire_roundtrip(&chunk, pos)?;
    info!("Wire round trip ok ({len} bytes)");

    if let Some(path) = &config.output.path {
        chunk_to_save(&chunk, &mut save, &tables.registries())?;
        write_save(config, path, &save)?;
        info!("Wrote chunk to {path}");
    }
    Ok(())
}

fn main() {
    let path = std::env::args().nth(1).unwrap_or_else(|| "level.toml".into());
    let config = match LevelConfig::load(&path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load {path}: {e}");
            std::process::exit(1);
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    info!("mc-level v{} reading {}", env!("CARGO_PKG_VERSION"), config.input.path);

    if let Err(e) = run(&config) {
        error!("{e}");
        std::process::exit(1);
    }
}
