//! Persisted chunk layout (Anvil, 1.18+), mapped to and from the NBT tree.
//!
//! Top-level keys this module does not model are kept in [`SaveChunk::extra`]
//! and written back unchanged.

use std::collections::BTreeMap;

use bytes::{Buf, BufMut};
use mc_level_nbt::{read_nbt, write_nbt, NbtCompound, NbtRoot, NbtTag};

use crate::error::WorldError;
use crate::registry::Properties;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct SaveChunk {
    pub data_version: i32,
    pub x_pos: i32,
    pub z_pos: i32,
    /// Lowest section Y of the column.
    pub y_pos: i32,
    pub status: String,
    pub sections: Vec<SaveSection>,
    pub block_entities: Vec<NbtCompound>,
    /// Packed heights by heightmap key.
    pub heightmaps: BTreeMap<String, Vec<u64>>,
    pub extra: NbtCompound,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct SaveSection {
    pub y: i8,
    /// Absent on light-only sections.
    pub block_states: Option<SavePalette<SaveBlockState>>,
    pub biomes: Option<SavePalette<String>>,
    pub sky_light: Option<Vec<u8>>,
    pub block_light: Option<Vec<u8>>,
}

/// A palette and the packed offsets into it. `data` is empty for single-entry palettes.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SavePalette<T> {
    pub palette: Vec<T>,
    pub data: Vec<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SaveBlockState {
    pub name: String,
    pub properties: Properties,
}

const KEYS: [&str; 8] = [
    "DataVersion",
    "xPos",
    "zPos",
    "yPos",
    "Status",
    "sections",
    "block_entities",
    "Heightmaps",
];

impl SaveChunk {
    /// Read a chunk from a named-root NBT stream (already decompressed).
    pub fn read(buf: &mut impl Buf) -> Result<Self, WorldError> {
        let root = read_nbt(buf)?;
        Self::from_nbt(&root.compound)
    }

    pub fn write(&self, buf: &mut impl BufMut) {
        write_nbt(buf, &NbtRoot::new("", self.to_nbt()));
    }

    pub fn from_nbt(nbt: &NbtCompound) -> Result<Self, WorldError> {
        let sections = match nbt.get("sections") {
            Some(tag) => list(tag, "sections")?
                .iter()
                .map(|t| SaveSection::from_nbt(compound(t, "sections")?))
                .collect::<Result<_, _>>()?,
            None => Vec::new(),
        };
        let block_entities = match nbt.get("block_entities") {
            Some(tag) => list(tag, "block_entities")?
                .iter()
                .map(|t| compound(t, "block_entities").cloned())
                .collect::<Result<_, _>>()?,
            None => Vec::new(),
        };
        let mut heightmaps = BTreeMap::new();
        if let Some(tag) = nbt.get("Heightmaps") {
            for (key, value) in compound(tag, "Heightmaps")? {
                heightmaps.insert(key.clone(), long_array(value, "Heightmaps")?);
            }
        }
        let extra = nbt
            .iter()
            .filter(|(key, _)| !KEYS.contains(&key.as_str()))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();

        Ok(Self {
            data_version: int(nbt, "DataVersion")?,
            x_pos: int(nbt, "xPos")?,
            z_pos: int(nbt, "zPos")?,
            y_pos: opt_int(nbt, "yPos")?.unwrap_or(0),
            status: match nbt.get("Status") {
                Some(tag) => string(tag, "Status")?.to_owned(),
                None => "minecraft:empty".to_owned(),
            },
            sections,
            block_entities,
            heightmaps,
            extra,
        })
    }

    pub fn to_nbt(&self) -> NbtCompound {
        let mut nbt = self.extra.clone();
        nbt.insert("DataVersion".into(), NbtTag::Int(self.data_version));
        nbt.insert("xPos".into(), NbtTag::Int(self.x_pos));
        nbt.insert("zPos".into(), NbtTag::Int(self.z_pos));
        nbt.insert("yPos".into(), NbtTag::Int(self.y_pos));
        nbt.insert("Status".into(), NbtTag::String(self.status.clone()));
        nbt.insert(
            "sections".into(),
            NbtTag::List(self.sections.iter().map(|s| NbtTag::Compound(s.to_nbt())).collect()),
        );
        nbt.insert(
            "block_entities".into(),
            NbtTag::List(
                self.block_entities
                    .iter()
                    .cloned()
                    .map(NbtTag::Compound)
                    .collect(),
            ),
        );
        nbt.insert(
            "Heightmaps".into(),
            NbtTag::Compound(
                self.heightmaps
                    .iter()
                    .map(|(key, data)| (key.clone(), to_long_array(data)))
                    .collect(),
            ),
        );
        nbt
    }
}

impl SaveSection {
    pub fn from_nbt(nbt: &NbtCompound) -> Result<Self, WorldError> {
        let y = match nbt.get("Y").ok_or(WorldError::MissingField("Y"))? {
            NbtTag::Byte(v) => *v,
            NbtTag::Int(v) => i8::try_from(*v)
                .map_err(|_| WorldError::invalid("Y", format!("{v} does not fit a byte")))?,
            _ => return Err(WorldError::invalid("Y", "expected TAG_Byte")),
        };
        let block_states = match nbt.get("block_states") {
            Some(tag) => {
                let c = compound(tag, "block_states")?;
                let palette = match c.get("palette") {
                    Some(tag) => list(tag, "block_states")?
                        .iter()
                        .map(SaveBlockState::from_nbt)
                        .collect::<Result<_, _>>()?,
                    None => return Err(WorldError::MissingField("palette")),
                };
                Some(SavePalette {
                    palette,
                    data: opt_long_array(c, "data")?,
                })
            }
            None => None,
        };
        let biomes = match nbt.get("biomes") {
            Some(tag) => {
                let c = compound(tag, "biomes")?;
                let palette = match c.get("palette") {
                    Some(tag) => list(tag, "biomes")?
                        .iter()
                        .map(|t| string(t, "biomes").map(str::to_owned))
                        .collect::<Result<_, _>>()?,
                    None => return Err(WorldError::MissingField("palette")),
                };
                Some(SavePalette {
                    palette,
                    data: opt_long_array(c, "data")?,
                })
            }
            None => None,
        };
        Ok(Self {
            y,
            block_states,
            biomes,
            sky_light: opt_byte_array(nbt, "SkyLight")?,
            block_light: opt_byte_array(nbt, "BlockLight")?,
        })
    }

    pub fn to_nbt(&self) -> NbtCompound {
        let mut nbt = NbtCompound::new();
        nbt.insert("Y".into(), NbtTag::Byte(self.y));
        if let Some(states) = &self.block_states {
            let palette = states
                .palette
                .iter()
                .map(|s| NbtTag::Compound(s.to_nbt()))
                .collect();
            nbt.insert(
                "block_states".into(),
                NbtTag::Compound(palette_nbt(palette, &states.data)),
            );
        }
        if let Some(biomes) = &self.biomes {
            let palette = biomes
                .palette
                .iter()
                .map(|b| NbtTag::String(b.clone()))
                .collect();
            nbt.insert(
                "biomes".into(),
                NbtTag::Compound(palette_nbt(palette, &biomes.data)),
            );
        }
        if let Some(light) = &self.sky_light {
            nbt.insert("SkyLight".into(), to_byte_array(light));
        }
        if let Some(light) = &self.block_light {
            nbt.insert("BlockLight".into(), to_byte_array(light));
        }
        nbt
    }

    /// Whether the section carries light and nothing else.
    pub fn is_light_only(&self) -> bool {
        self.block_states.is_none()
            && self.biomes.is_none()
            && (self.sky_light.is_some() || self.block_light.is_some())
    }
}

impl SaveBlockState {
    fn from_nbt(tag: &NbtTag) -> Result<Self, WorldError> {
        let c = compound(tag, "block_states")?;
        let name = string(
            c.get("Name").ok_or(WorldError::MissingField("Name"))?,
            "Name",
        )?
        .to_owned();
        let mut properties = Properties::new();
        if let Some(tag) = c.get("Properties") {
            for (key, value) in compound(tag, "Properties")? {
                properties.insert(key.clone(), string(value, "Properties")?.to_owned());
            }
        }
        Ok(Self { name, properties })
    }

    fn to_nbt(&self) -> NbtCompound {
        let mut nbt = NbtCompound::new();
        nbt.insert("Name".into(), NbtTag::String(self.name.clone()));
        if !self.properties.is_empty() {
            let props = self
                .properties
                .iter()
                .map(|(k, v)| (k.clone(), NbtTag::String(v.clone())))
                .collect();
            nbt.insert("Properties".into(), NbtTag::Compound(props));
        }
        nbt
    }
}

fn palette_nbt(palette: Vec<NbtTag>, data: &[u64]) -> NbtCompound {
    let mut nbt = NbtCompound::new();
    nbt.insert("palette".into(), NbtTag::List(palette));
    if !data.is_empty() {
        nbt.insert("data".into(), to_long_array(data));
    }
    nbt
}

// -----------------------------------------------------------------------
// Typed field access
// -----------------------------------------------------------------------

fn int(nbt: &NbtCompound, key: &'static str) -> Result<i32, WorldError> {
    opt_int(nbt, key)?.ok_or(WorldError::MissingField(key))
}

fn opt_int(nbt: &NbtCompound, key: &'static str) -> Result<Option<i32>, WorldError> {
    nbt.get(key)
        .map(|tag| {
            tag.as_int()
                .ok_or_else(|| WorldError::invalid(key, format!("expected TAG_Int, got {}", tag.type_name())))
        })
        .transpose()
}

fn string<'a>(tag: &'a NbtTag, field: &'static str) -> Result<&'a str, WorldError> {
    tag.as_string()
        .ok_or_else(|| WorldError::invalid(field, format!("expected TAG_String, got {}", tag.type_name())))
}

fn compound<'a>(tag: &'a NbtTag, field: &'static str) -> Result<&'a NbtCompound, WorldError> {
    tag.as_compound().ok_or_else(|| {
        WorldError::invalid(field, format!("expected TAG_Compound, got {}", tag.type_name()))
    })
}

fn list<'a>(tag: &'a NbtTag, field: &'static str) -> Result<&'a [NbtTag], WorldError> {
    tag.as_list()
        .ok_or_else(|| WorldError::invalid(field, format!("expected TAG_List, got {}", tag.type_name())))
}

/// Longs are carried as signed on disk; convert each element.
fn long_array(tag: &NbtTag, field: &'static str) -> Result<Vec<u64>, WorldError> {
    tag.as_long_array()
        .map(|longs| longs.iter().map(|&v| v as u64).collect())
        .ok_or_else(|| {
            WorldError::invalid(field, format!("expected TAG_Long_Array, got {}", tag.type_name()))
        })
}

fn opt_long_array(nbt: &NbtCompound, key: &'static str) -> Result<Vec<u64>, WorldError> {
    match nbt.get(key) {
        Some(tag) => long_array(tag, key),
        None => Ok(Vec::new()),
    }
}

fn opt_byte_array(nbt: &NbtCompound, key: &'static str) -> Result<Option<Vec<u8>>, WorldError> {
    nbt.get(key)
        .map(|tag| {
            tag.as_byte_array()
                .map(|bytes| bytes.iter().map(|&b| b as u8).collect())
                .ok_or_else(|| {
                    WorldError::invalid(key, format!("expected TAG_Byte_Array, got {}", tag.type_name()))
                })
        })
        .transpose()
}

fn to_long_array(data: &[u64]) -> NbtTag {
    NbtTag::LongArray(data.iter().map(|&v| v as i64).collect())
}

fn to_byte_array(data: &[u8]) -> NbtTag {
    NbtTag::ByteArray(data.iter().map(|&b| b as i8).collect())
}
