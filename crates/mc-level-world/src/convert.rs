//! Conversion between the persisted chunk layout and [`Chunk`].

use std::collections::BTreeMap;

use tracing::{debug, trace};

use crate::block_entity::{BlockEntity, BlockEntityBase};
use crate::chunk::Chunk;
use crate::error::WorldError;
use crate::heightmap::{HeightMap, HeightMapKind};
use crate::palette::PaletteContainer;
use crate::registry::{BiomeId, BlockStateId, Properties, Registries};
use crate::save::{SaveBlockState, SaveChunk, SavePalette, SaveSection};
use crate::section::{Section, SectionConfig};
use crate::status::ChunkStatus;

/// Build a chunk of `section_count` sections from its persisted form.
///
/// Sections missing from the save stay empty. Sections outside the column
/// are rejected, except light-only sections directly below or above it.
pub fn chunk_from_save(
    save: &SaveChunk,
    section_count: usize,
    registries: &Registries<'_>,
) -> Result<Chunk, WorldError> {
    let mut chunk = Chunk::empty(section_count);

    for saved in &save.sections {
        let y = i32::from(saved.y) - save.y_pos;
        let index = match usize::try_from(y) {
            Ok(index) if index < section_count => index,
            _ if is_edge_light(saved, y, section_count) => {
                trace!(y = saved.y, "skipping edge light section");
                continue;
            }
            _ => {
                return Err(WorldError::SectionOutOfBounds {
                    y,
                    count: section_count,
                })
            }
        };
        chunk.sections[index] = section_from_save(saved, registries)?;
    }

    for data in &save.block_entities {
        let base = BlockEntityBase::from_nbt(data)?;
        let kind = registries
            .block_entities
            .type_id(&base.id)
            .ok_or_else(|| WorldError::UnknownBlockEntityType(base.id.clone()))?;
        let y = i16::try_from(base.y).map_err(|_| WorldError::BlockEntityYOutOfRange(base.y))?;
        let mut be = BlockEntity {
            xz: 0,
            y,
            kind,
            data: data.clone(),
        };
        be.pack_xz(
            base.x.wrapping_sub(save.x_pos.wrapping_mul(16)),
            base.z.wrapping_sub(save.z_pos.wrapping_mul(16)),
        )?;
        chunk.block_entities.push(be);
    }

    for (key, data) in &save.heightmaps {
        match HeightMapKind::from_disk_key(key) {
            Some(kind) => chunk.height_maps.push(HeightMap {
                kind,
                data: data.iter().map(|&w| w as i64).collect(),
            }),
            None => trace!(key = %key, "skipping unknown heightmap"),
        }
    }

    chunk.status = ChunkStatus::from(save.status.as_str());
    debug!(
        x = save.x_pos,
        z = save.z_pos,
        sections = save.sections.len(),
        block_entities = chunk.block_entities.len(),
        "loaded chunk from save"
    );
    Ok(chunk)
}

/// Vanilla stores light for one slot below and one above the column.
fn is_edge_light(saved: &SaveSection, y: i32, section_count: usize) -> bool {
    (y == -1 || y == section_count as i32) && saved.is_light_only()
}

fn section_from_save(saved: &SaveSection, registries: &Registries<'_>) -> Result<Section, WorldError> {
    let config = SectionConfig::default();

    let states = match &saved.block_states {
        Some(states) => {
            let palette = states
                .palette
                .iter()
                .map(|state| resolve_state(state, registries))
                .collect::<Result<Vec<_>, _>>()?;
            PaletteContainer::from_raw(config.states, palette, states.data.clone())?
        }
        None => PaletteContainer::new(config.states, BlockStateId::AIR),
    };

    let biomes = match &saved.biomes {
        Some(biomes) => {
            let palette = biomes
                .palette
                .iter()
                .map(|name| {
                    registries
                        .biomes
                        .biome_id(name)
                        .ok_or_else(|| WorldError::UnknownBiome(name.clone()))
                })
                .collect::<Result<Vec<_>, _>>()?;
            PaletteContainer::from_raw(config.biomes, palette, biomes.data.clone())?
        }
        None => PaletteContainer::new(config.biomes, BiomeId(0)),
    };

    let mut section = Section::from_containers(states, biomes, registries.blocks);
    section.set_sky_light(saved.sky_light.clone())?;
    section.set_block_light(saved.block_light.clone())?;
    Ok(section)
}

fn resolve_state(
    state: &SaveBlockState,
    registries: &Registries<'_>,
) -> Result<BlockStateId, WorldError> {
    if let Some(id) = registries.blocks.state_id(&state.name, &state.properties) {
        return Ok(id);
    }
    if !registries.blocks.has_block(&state.name) {
        return Err(WorldError::UnknownBlock(state.name.clone()));
    }
    Err(WorldError::UnknownBlockState {
        name: state.name.clone(),
        properties: format_properties(&state.properties),
    })
}

fn format_properties(properties: &Properties) -> String {
    let pairs: Vec<String> = properties.iter().map(|(k, v)| format!("{k}={v}")).collect();
    format!("[{}]", pairs.join(","))
}

/// Write `chunk` into `save`, keeping its position, data version and any
/// keys the chunk does not model. `save` is unchanged on error.
///
/// Light-only sections of `save` directly below or above the column are kept.
pub fn chunk_to_save(
    chunk: &Chunk,
    save: &mut SaveChunk,
    registries: &Registries<'_>,
) -> Result<(), WorldError> {
    let count = chunk.sections.len();
    let mut sections: Vec<SaveSection> = save
        .sections
        .iter()
        .filter(|s| is_edge_light(s, i32::from(s.y) - save.y_pos, count))
        .cloned()
        .collect();
    for (i, section) in chunk.sections.iter().enumerate() {
        let y = i8::try_from(i as i32 + save.y_pos).map_err(|_| {
            WorldError::invalid("Y", format!("section {i} above yPos {} does not fit a byte", save.y_pos))
        })?;
        sections.push(section_to_save(section, y, registries)?);
    }
    sections.sort_by_key(|s| s.y);

    let mut block_entities = Vec::with_capacity(chunk.block_entities.len());
    for be in &chunk.block_entities {
        let id = registries
            .block_entities
            .type_name(be.kind)
            .ok_or_else(|| WorldError::UnknownBlockEntityType(be.kind.to_string()))?;
        let (x, z) = be.unpack_xz();
        let mut data = be.data.clone();
        BlockEntityBase {
            id: id.to_owned(),
            x: save.x_pos.wrapping_mul(16).wrapping_add(i32::from(x)),
            y: i32::from(be.y),
            z: save.z_pos.wrapping_mul(16).wrapping_add(i32::from(z)),
            keep_packed: data
                .get("keep_packed")
                .and_then(|tag| tag.as_bool())
                .unwrap_or(false),
        }
        .write_to(&mut data);
        block_entities.push(data);
    }

    let heightmaps: BTreeMap<String, Vec<u64>> = chunk
        .height_maps
        .iter()
        .map(|map| {
            (
                map.kind.disk_key().to_owned(),
                map.data.iter().map(|&w| w as u64).collect(),
            )
        })
        .collect();

    save.sections = sections;
    save.block_entities = block_entities;
    save.heightmaps = heightmaps;
    save.status = chunk.status.as_str();
    debug!(x = save.x_pos, z = save.z_pos, "stored chunk to save");
    Ok(())
}

fn section_to_save(
    section: &Section,
    y: i8,
    registries: &Registries<'_>,
) -> Result<SaveSection, WorldError> {
    let (states, data) = section.states().to_persisted();
    let palette = states
        .into_iter()
        .map(|id| {
            registries
                .blocks
                .state(id)
                .map(|state| SaveBlockState {
                    name: state.name,
                    properties: state.properties,
                })
                .ok_or(WorldError::UnknownBlockStateId(id.0))
        })
        .collect::<Result<_, _>>()?;
    let block_states = SavePalette { palette, data };

    let (biomes, data) = section.biomes().to_persisted();
    let palette = biomes
        .into_iter()
        .map(|id| {
            registries
                .biomes
                .biome_name(id)
                .map(str::to_owned)
                .ok_or(WorldError::UnknownBiomeId(id.0))
        })
        .collect::<Result<_, _>>()?;

    Ok(SaveSection {
        y,
        block_states: Some(block_states),
        biomes: Some(SavePalette { palette, data }),
        sky_light: section.sky_light().map(<[u8]>::to_vec),
        block_light: section.block_light().map(<[u8]>::to_vec),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::tests::{test_biomes, test_block_entities, test_blocks};
    use crate::registry::{BiomeTable, BlockEntityTypeTable, BlockStateTable};
    use crate::section::LIGHT_LEN;
    use bytes::BytesMut;
    use mc_level_nbt::{NbtCompound, NbtTag};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    struct Tables {
        blocks: BlockStateTable,
        biomes: BiomeTable,
        block_entities: BlockEntityTypeTable,
    }

    impl Tables {
        fn new() -> Self {
            Self {
                blocks: test_blocks(),
                biomes: test_biomes(),
                block_entities: test_block_entities(),
            }
        }

        fn registries(&self) -> Registries<'_> {
            Registries {
                blocks: &self.blocks,
                biomes: &self.biomes,
                block_entities: &self.block_entities,
            }
        }
    }

    fn empty_save() -> SaveChunk {
        SaveChunk {
            data_version: 3465,
            x_pos: 2,
            z_pos: -1,
            y_pos: -4,
            status: "minecraft:empty".into(),
            ..Default::default()
        }
    }

    fn state(name: &str, props: &[(&str, &str)]) -> SaveBlockState {
        SaveBlockState {
            name: name.into(),
            properties: props
                .iter()
                .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
                .collect(),
        }
    }

    fn section_with(y: i8, palette: Vec<SaveBlockState>) -> SaveSection {
        SaveSection {
            y,
            block_states: Some(SavePalette {
                palette,
                data: Vec::new(),
            }),
            biomes: Some(SavePalette {
                palette: vec!["minecraft:plains".into()],
                data: Vec::new(),
            }),
            ..Default::default()
        }
    }

    fn chest_at(x: i32, y: i32, z: i32) -> NbtCompound {
        let mut data = NbtCompound::new();
        BlockEntityBase {
            id: "minecraft:chest".into(),
            x,
            y,
            z,
            keep_packed: false,
        }
        .write_to(&mut data);
        data
    }

    #[test]
    fn disk_roundtrip() {
        let tables = Tables::new();
        let registries = tables.registries();
        let mut rng = StdRng::seed_from_u64(7);

        let mut chunk = Chunk::empty(8);
        for _ in 0..3000 {
            let (x, y, z) = (rng.gen_range(0..16), rng.gen_range(0..64), rng.gen_range(0..16));
            chunk
                .set_block(x, y, z, BlockStateId(rng.gen_range(0..31)), &tables.blocks)
                .unwrap();
            let (bx, by, bz) = (rng.gen_range(0..4), rng.gen_range(0..16), rng.gen_range(0..4));
            chunk.set_biome(bx, by, bz, BiomeId(rng.gen_range(0..3))).unwrap();
        }
        chunk.sections[0]
            .set_sky_light(Some(vec![0xAB; LIGHT_LEN]))
            .unwrap();
        chunk.sections[7]
            .set_block_light(Some(vec![0x12; LIGHT_LEN]))
            .unwrap();
        chunk.height_maps.push(HeightMap {
            kind: HeightMapKind::WorldSurface,
            data: vec![-1; 37],
        });
        let mut data = chest_at(2 * 16 + 4, -60, -16 + 9);
        data.insert("Lock".into(), NbtTag::String("key".into()));
        let mut chest = BlockEntity {
            xz: 0,
            y: -60,
            kind: 1,
            data,
        };
        chest.pack_xz(4, 9).unwrap();
        chunk.block_entities.push(chest);
        chunk.status = ChunkStatus::Full;

        let mut save = empty_save();
        chunk_to_save(&chunk, &mut save, &registries).unwrap();
        assert_eq!(save.sections.len(), 8);
        assert_eq!(save.sections[0].y, -4);
        assert_eq!(save.status, "minecraft:full");

        let mut buf = BytesMut::new();
        save.write(&mut buf);
        let reread = SaveChunk::read(&mut buf.freeze()).unwrap();
        let loaded = chunk_from_save(&reread, 8, &registries).unwrap();
        assert_eq!(loaded, chunk);
    }

    #[test]
    fn import_resolves_palettes_and_counts() {
        let tables = Tables::new();
        let mut save = empty_save();
        let mut section = section_with(
            -3,
            vec![
                state("minecraft:air", &[]),
                state("minecraft:oak_log", &[("axis", "z")]),
            ],
        );
        // Offset 1 at index 0 and index 4095, 4 bits per entry.
        let mut data = vec![0u64; 256];
        data[0] = 1;
        data[255] = 1 << 60;
        section.block_states.as_mut().unwrap().data = data;
        save.sections.push(section);

        let chunk = chunk_from_save(&save, 4, &tables.registries()).unwrap();
        let loaded = chunk.section(1).unwrap();
        assert_eq!(loaded.block_count(), 2);
        assert_eq!(loaded.get_block(0), BlockStateId(4));
        assert_eq!(loaded.get_block(4095), BlockStateId(4));
        assert_eq!(loaded.get_biome(0), BiomeId(1));
        assert_eq!(chunk.section(0).unwrap().block_count(), 0);
    }

    #[test]
    fn section_outside_column_fails() {
        let tables = Tables::new();
        let mut save = empty_save();
        save.sections
            .push(section_with(20, vec![state("minecraft:stone", &[])]));
        let err = chunk_from_save(&save, 24, &tables.registries()).unwrap_err();
        assert!(err.is_out_of_range());
        assert!(matches!(
            err,
            WorldError::SectionOutOfBounds { y: 24, count: 24 }
        ));
    }

    #[test]
    fn section_above_single_slot_column_fails() {
        let tables = Tables::new();
        let bare = SaveSection {
            y: 5,
            ..Default::default()
        };
        let with_palettes = section_with(5, vec![state("minecraft:stone", &[])]);
        for section in [bare, with_palettes] {
            let save = SaveChunk {
                y_pos: 0,
                sections: vec![section],
                ..empty_save()
            };
            let err = chunk_from_save(&save, 1, &tables.registries()).unwrap_err();
            assert!(err.is_out_of_range());
            assert!(matches!(
                err,
                WorldError::SectionOutOfBounds { y: 5, count: 1 }
            ));
        }
    }

    #[test]
    fn only_lit_edge_sections_are_skipped() {
        let tables = Tables::new();
        let lit = |y| SaveSection {
            y,
            block_light: Some(vec![0; LIGHT_LEN]),
            ..Default::default()
        };

        // One slot below and one above a two-section column.
        let mut save = empty_save();
        save.sections = vec![lit(-5), lit(-2)];
        assert!(chunk_from_save(&save, 2, &tables.registries()).is_ok());

        for section in [
            lit(-6),
            lit(0),
            SaveSection {
                y: -5,
                ..Default::default()
            },
        ] {
            let mut save = empty_save();
            save.sections = vec![section];
            assert!(chunk_from_save(&save, 2, &tables.registries())
                .unwrap_err()
                .is_out_of_range());
        }
    }

    #[test]
    fn light_only_sections_outside_column_are_kept_on_export() {
        let tables = Tables::new();
        let registries = tables.registries();
        let mut save = empty_save();
        let edge = SaveSection {
            y: -5,
            sky_light: Some(vec![0xFF; LIGHT_LEN]),
            ..Default::default()
        };
        save.sections.push(edge.clone());

        let chunk = chunk_from_save(&save, 2, &registries).unwrap();
        assert!(chunk.sections().iter().all(|s| s.sky_light().is_none()));

        chunk_to_save(&chunk, &mut save, &registries).unwrap();
        assert_eq!(save.sections.len(), 3);
        assert_eq!(save.sections[0], edge);
        assert_eq!(save.sections[1].y, -4);
        assert_eq!(save.sections[2].y, -3);
    }

    #[test]
    fn unknown_block_and_state() {
        let tables = Tables::new();
        let registries = tables.registries();

        let mut save = empty_save();
        save.sections
            .push(section_with(-4, vec![state("minecraft:unobtainium", &[])]));
        let err = chunk_from_save(&save, 24, &registries).unwrap_err();
        assert!(err.is_unknown_identifier());
        assert!(matches!(err, WorldError::UnknownBlock(ref name) if name == "minecraft:unobtainium"));

        let mut save = empty_save();
        save.sections.push(section_with(
            -4,
            vec![state("minecraft:oak_log", &[("axis", "w")])],
        ));
        let err = chunk_from_save(&save, 24, &registries).unwrap_err();
        assert!(matches!(err, WorldError::UnknownBlockState { ref properties, .. } if properties == "[axis=w]"));
    }

    #[test]
    fn missing_properties_use_defaults() {
        let tables = Tables::new();
        let mut save = empty_save();
        save.sections
            .push(section_with(-4, vec![state("minecraft:oak_log", &[])]));
        let chunk = chunk_from_save(&save, 1, &tables.registries()).unwrap();
        assert_eq!(
            chunk.get_block(0, 0, 0),
            tables.blocks.default_state("minecraft:oak_log")
        );
    }

    #[test]
    fn unknown_biome() {
        let tables = Tables::new();
        let mut save = empty_save();
        let mut section = section_with(-4, vec![state("minecraft:air", &[])]);
        section.biomes.as_mut().unwrap().palette = vec!["minecraft:nowhere".into()];
        save.sections.push(section);
        assert!(matches!(
            chunk_from_save(&save, 1, &tables.registries()),
            Err(WorldError::UnknownBiome(_))
        ));
    }

    #[test]
    fn bad_light_length() {
        let tables = Tables::new();
        let mut save = empty_save();
        let mut section = section_with(-4, vec![state("minecraft:air", &[])]);
        section.block_light = Some(vec![0; 100]);
        save.sections.push(section);
        assert!(matches!(
            chunk_from_save(&save, 1, &tables.registries()),
            Err(WorldError::InvalidLightLength(100))
        ));
    }

    #[test]
    fn block_entity_checks() {
        let tables = Tables::new();
        let registries = tables.registries();

        let mut save = empty_save();
        save.block_entities.push(chest_at(2 * 16 + 15, 70, -16));
        let chunk = chunk_from_save(&save, 1, &registries).unwrap();
        assert_eq!(chunk.block_entities[0].unpack_xz(), (15, 0));
        assert_eq!(chunk.block_entities[0].kind, 1);
        assert_eq!(chunk.block_entities[0].y, 70);

        let mut save = empty_save();
        save.block_entities.push(chest_at(2 * 16 + 16, 70, -16));
        assert!(matches!(
            chunk_from_save(&save, 1, &registries),
            Err(WorldError::XzOutOfRange { x: 16, z: 0 })
        ));

        let mut save = empty_save();
        save.block_entities.push(chest_at(32, 40_000, -16));
        assert!(matches!(
            chunk_from_save(&save, 1, &registries),
            Err(WorldError::BlockEntityYOutOfRange(40_000))
        ));

        let mut save = empty_save();
        let mut data = chest_at(32, 0, -16);
        data.insert("id".into(), NbtTag::String("minecraft:jukebox".into()));
        save.block_entities.push(data);
        assert!(matches!(
            chunk_from_save(&save, 1, &registries),
            Err(WorldError::UnknownBlockEntityType(_))
        ));
    }

    #[test]
    fn unknown_heightmaps_are_skipped() {
        let tables = Tables::new();
        let mut save = empty_save();
        save.heightmaps.insert("LIGHT_BLOCKING".into(), vec![1]);
        save.heightmaps.insert("OCEAN_FLOOR".into(), vec![u64::MAX]);
        let chunk = chunk_from_save(&save, 1, &tables.registries()).unwrap();
        assert_eq!(
            chunk.height_maps,
            vec![HeightMap {
                kind: HeightMapKind::OceanFloor,
                data: vec![-1],
            }]
        );
    }

    #[test]
    fn export_rejects_unregistered_ids() {
        let tables = Tables::new();
        let registries = tables.registries();

        let mut chunk = Chunk::empty(1);
        chunk.set_block(0, 0, 0, BlockStateId(999), &tables.blocks).unwrap();
        let mut save = empty_save();
        let before = save.clone();
        assert!(matches!(
            chunk_to_save(&chunk, &mut save, &registries),
            Err(WorldError::UnknownBlockStateId(999))
        ));
        assert_eq!(save, before);

        let mut chunk = Chunk::empty(1);
        chunk.set_biome(0, 0, 0, BiomeId(9)).unwrap();
        assert!(matches!(
            chunk_to_save(&chunk, &mut save, &registries),
            Err(WorldError::UnknownBiomeId(9))
        ));
    }

    #[test]
    fn export_refreshes_block_entity_position() {
        let tables = Tables::new();
        let mut chunk = Chunk::empty(1);
        let mut be = BlockEntity {
            xz: 0,
            y: 5,
            kind: 0,
            data: NbtCompound::new(),
        };
        be.pack_xz(1, 2).unwrap();
        chunk.block_entities.push(be);

        let mut save = empty_save();
        chunk_to_save(&chunk, &mut save, &tables.registries()).unwrap();
        let base = BlockEntityBase::from_nbt(&save.block_entities[0]).unwrap();
        assert_eq!(base.id, "minecraft:furnace");
        assert_eq!((base.x, base.y, base.z), (33, 5, -14));
    }
}
