//! Block state, biome and block-entity type registries.
//!
//! The chunk layer only sees the traits. Tables backed by the prismarine-style
//! JSON data files are provided for tools and tests.

use std::collections::{BTreeMap, HashMap};

use serde::Deserialize;

use crate::error::WorldError;
use crate::palette::PaletteValue;

/// Global block state ID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct BlockStateId(pub u32);

impl BlockStateId {
    pub const AIR: Self = BlockStateId(0);
}

impl PaletteValue for BlockStateId {
    fn to_id(self) -> u32 {
        self.0
    }

    fn from_id(id: u32) -> Self {
        BlockStateId(id)
    }
}

/// Global biome ID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct BiomeId(pub u32);

impl PaletteValue for BiomeId {
    fn to_id(self) -> u32 {
        self.0
    }

    fn from_id(id: u32) -> Self {
        BiomeId(id)
    }
}

/// Block state property values by property name.
pub type Properties = BTreeMap<String, String>;

/// A block name together with the full set of its property values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockState {
    pub name: String,
    pub properties: Properties,
}

pub trait BlockRegistry {
    /// Resolve a block and its properties. Properties left out take the values
    /// of the block's default state.
    fn state_id(&self, name: &str, properties: &Properties) -> Option<BlockStateId>;
    fn has_block(&self, name: &str) -> bool;
    fn state(&self, id: BlockStateId) -> Option<BlockState>;
    fn is_air(&self, id: BlockStateId) -> bool;
    fn state_count(&self) -> usize;
}

pub trait BiomeRegistry {
    fn biome_id(&self, name: &str) -> Option<BiomeId>;
    fn biome_name(&self, id: BiomeId) -> Option<&str>;
    fn biome_count(&self) -> usize;
}

pub trait BlockEntityTypeRegistry {
    fn type_id(&self, name: &str) -> Option<i32>;
    fn type_name(&self, id: i32) -> Option<&str>;
}

/// The registries a conversion needs, passed together.
#[derive(Clone, Copy)]
pub struct Registries<'a> {
    pub blocks: &'a dyn BlockRegistry,
    pub biomes: &'a dyn BiomeRegistry,
    pub block_entities: &'a dyn BlockEntityTypeRegistry,
}

/// Prefix bare identifiers with `minecraft:`.
pub fn namespaced(name: &str) -> String {
    if name.contains(':') {
        name.to_owned()
    } else {
        format!("minecraft:{name}")
    }
}

// ---------------------------------------------------------------------------
// Block states
// ---------------------------------------------------------------------------

const AIR_BLOCKS: [&str; 3] = ["minecraft:air", "minecraft:cave_air", "minecraft:void_air"];

#[derive(Debug, Clone)]
struct BlockDef {
    name: String,
    min_state_id: u32,
    default_state: u32,
    properties: Vec<(String, Vec<String>)>,
}

impl BlockDef {
    fn state_count(&self) -> u32 {
        self.properties
            .iter()
            .map(|(_, values)| values.len() as u32)
            .product()
    }

    /// Property value offsets of a state, in declaration order.
    fn offsets(&self, id: u32) -> Vec<usize> {
        let mut rest = (id - self.min_state_id) as usize;
        let mut offsets = vec![0; self.properties.len()];
        for (slot, (_, values)) in offsets.iter_mut().zip(&self.properties).rev() {
            *slot = rest % values.len();
            rest /= values.len();
        }
        offsets
    }
}

/// Block states numbered contiguously per block, last property varying fastest.
#[derive(Debug, Clone, Default)]
pub struct BlockStateTable {
    blocks: Vec<BlockDef>,
    by_name: HashMap<String, usize>,
    /// Block index for every state ID.
    owners: Vec<usize>,
}

#[derive(Deserialize)]
struct JsonBlock {
    name: String,
    #[serde(rename = "minStateId")]
    min_state_id: u32,
    #[serde(rename = "maxStateId")]
    max_state_id: u32,
    #[serde(rename = "defaultState")]
    default_state: u32,
    #[serde(default)]
    states: Vec<JsonProperty>,
}

#[derive(Deserialize)]
struct JsonProperty {
    name: String,
    #[serde(rename = "type")]
    kind: String,
    num_values: usize,
    #[serde(default)]
    values: Vec<String>,
}

impl JsonProperty {
    fn into_values(self) -> Vec<String> {
        if !self.values.is_empty() {
            return self.values;
        }
        match self.kind.as_str() {
            "bool" => vec!["true".to_owned(), "false".to_owned()],
            _ => (0..self.num_values).map(|v| v.to_string()).collect(),
        }
    }
}

impl BlockStateTable {
    pub fn builder() -> BlockStateTableBuilder {
        BlockStateTableBuilder::default()
    }

    /// Load a `blocks.json` list in the prismarine data layout.
    pub fn from_json(json: &str) -> Result<Self, WorldError> {
        let blocks: Vec<JsonBlock> = serde_json::from_str(json)?;
        let mut table = Self::default();
        for block in blocks {
            let properties: Vec<(String, Vec<String>)> = block
                .states
                .into_iter()
                .map(|p| (p.name.clone(), p.into_values()))
                .collect();
            let def = BlockDef {
                name: namespaced(&block.name),
                min_state_id: block.min_state_id,
                default_state: block.default_state,
                properties,
            };
            let count = def.state_count();
            if count == 0
                || def.min_state_id as usize != table.owners.len()
                || def.min_state_id + count - 1 != block.max_state_id
                || !(block.min_state_id..=block.max_state_id).contains(&block.default_state)
            {
                return Err(WorldError::invalid(
                    "blocks.json",
                    format!("inconsistent state range for {}", def.name),
                ));
            }
            table.push(def);
        }
        Ok(table)
    }

    fn push(&mut self, def: BlockDef) {
        let index = self.blocks.len();
        let count = def.state_count() as usize;
        self.by_name.insert(def.name.clone(), index);
        self.owners.extend(std::iter::repeat(index).take(count));
        self.blocks.push(def);
    }

    fn block(&self, name: &str) -> Option<&BlockDef> {
        let index = match self.by_name.get(name) {
            Some(index) => *index,
            None => *self.by_name.get(&namespaced(name))?,
        };
        self.blocks.get(index)
    }

    /// Default state of a block, if the block exists.
    pub fn default_state(&self, name: &str) -> Option<BlockStateId> {
        self.block(name).map(|b| BlockStateId(b.default_state))
    }
}

impl BlockRegistry for BlockStateTable {
    fn state_id(&self, name: &str, properties: &Properties) -> Option<BlockStateId> {
        let block = self.block(name)?;
        if properties
            .keys()
            .any(|key| !block.properties.iter().any(|(name, _)| name == key))
        {
            return None;
        }
        let defaults = block.offsets(block.default_state);
        let mut id = 0usize;
        for ((prop, values), default) in block.properties.iter().zip(defaults) {
            let offset = match properties.get(prop) {
                Some(value) => values.iter().position(|v| v == value)?,
                None => default,
            };
            id = id * values.len() + offset;
        }
        Some(BlockStateId(block.min_state_id + id as u32))
    }

    fn has_block(&self, name: &str) -> bool {
        self.block(name).is_some()
    }

    fn state(&self, id: BlockStateId) -> Option<BlockState> {
        let block = &self.blocks[*self.owners.get(id.0 as usize)?];
        let properties = block
            .properties
            .iter()
            .zip(block.offsets(id.0))
            .map(|((name, values), offset)| (name.clone(), values[offset].clone()))
            .collect();
        Some(BlockState {
            name: block.name.clone(),
            properties,
        })
    }

    fn is_air(&self, id: BlockStateId) -> bool {
        self.owners
            .get(id.0 as usize)
            .is_some_and(|&index| AIR_BLOCKS.contains(&self.blocks[index].name.as_str()))
    }

    fn state_count(&self) -> usize {
        self.owners.len()
    }
}

/// Assembles a [`BlockStateTable`] by hand, assigning state IDs in call order.
#[derive(Debug, Default)]
pub struct BlockStateTableBuilder {
    table: BlockStateTable,
}

impl BlockStateTableBuilder {
    /// Add a block whose default state is its first state.
    pub fn block(mut self, name: &str, properties: &[(&str, &[&str])]) -> Self {
        let min_state_id = self.table.owners.len() as u32;
        self.table.push(BlockDef {
            name: namespaced(name),
            min_state_id,
            default_state: min_state_id,
            properties: properties
                .iter()
                .map(|(prop, values)| {
                    (
                        (*prop).to_owned(),
                        values.iter().map(|v| (*v).to_owned()).collect(),
                    )
                })
                .collect(),
        });
        self
    }

    pub fn build(self) -> BlockStateTable {
        self.table
    }
}

// ---------------------------------------------------------------------------
// Biomes and block-entity types
// ---------------------------------------------------------------------------

/// Identifier list where the position is the numeric ID.
#[derive(Debug, Clone, Default)]
struct IdList {
    names: Vec<String>,
    by_name: HashMap<String, usize>,
}

impl IdList {
    fn new<S: AsRef<str>>(names: &[S]) -> Self {
        let names: Vec<String> = names.iter().map(|n| namespaced(n.as_ref())).collect();
        let by_name = names
            .iter()
            .enumerate()
            .map(|(i, n)| (n.clone(), i))
            .collect();
        Self { names, by_name }
    }

    fn id(&self, name: &str) -> Option<usize> {
        match self.by_name.get(name) {
            Some(id) => Some(*id),
            None => self.by_name.get(&namespaced(name)).copied(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct BiomeTable {
    list: IdList,
}

impl BiomeTable {
    pub fn new<S: AsRef<str>>(names: &[S]) -> Self {
        Self {
            list: IdList::new(names),
        }
    }

    /// Load a JSON array of biome identifiers.
    pub fn from_json(json: &str) -> Result<Self, WorldError> {
        let names: Vec<String> = serde_json::from_str(json)?;
        Ok(Self::new(&names))
    }
}

impl BiomeRegistry for BiomeTable {
    fn biome_id(&self, name: &str) -> Option<BiomeId> {
        self.list.id(name).map(|id| BiomeId(id as u32))
    }

    fn biome_name(&self, id: BiomeId) -> Option<&str> {
        self.list.names.get(id.0 as usize).map(String::as_str)
    }

    fn biome_count(&self) -> usize {
        self.list.names.len()
    }
}

#[derive(Debug, Clone, Default)]
pub struct BlockEntityTypeTable {
    list: IdList,
}

impl BlockEntityTypeTable {
    pub fn new<S: AsRef<str>>(names: &[S]) -> Self {
        Self {
            list: IdList::new(names),
        }
    }

    /// Load a JSON array of block-entity type identifiers.
    pub fn from_json(json: &str) -> Result<Self, WorldError> {
        let names: Vec<String> = serde_json::from_str(json)?;
        Ok(Self::new(&names))
    }
}

impl BlockEntityTypeRegistry for BlockEntityTypeTable {
    fn type_id(&self, name: &str) -> Option<i32> {
        self.list.id(name).map(|id| id as i32)
    }

    fn type_name(&self, id: i32) -> Option<&str> {
        usize::try_from(id)
            .ok()
            .and_then(|id| self.list.names.get(id))
            .map(String::as_str)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// A small block table used across the crate's tests.
    ///
    /// IDs: air 0, stone 1, oak_log 2..=4 (axis x/y/z), cave_air 5,
    /// lever 6..=29, dirt 30.
    pub(crate) fn test_blocks() -> BlockStateTable {
        BlockStateTable::builder()
            .block("minecraft:air", &[])
            .block("minecraft:stone", &[])
            .block("minecraft:oak_log", &[("axis", &["x", "y", "z"])])
            .block("minecraft:cave_air", &[])
            .block(
                "minecraft:lever",
                &[
                    ("face", &["floor", "wall", "ceiling"]),
                    ("facing", &["north", "south", "west", "east"]),
                    ("powered", &["true", "false"]),
                ],
            )
            .block("minecraft:dirt", &[])
            .build()
    }

    pub(crate) fn test_biomes() -> BiomeTable {
        BiomeTable::new(&["minecraft:the_void", "minecraft:plains", "minecraft:desert"])
    }

    pub(crate) fn test_block_entities() -> BlockEntityTypeTable {
        BlockEntityTypeTable::new(&["minecraft:furnace", "minecraft:chest", "minecraft:sign"])
    }

    fn props(pairs: &[(&str, &str)]) -> Properties {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect()
    }

    #[test]
    fn builder_numbers_states() {
        let blocks = test_blocks();
        assert_eq!(blocks.state_count(), 31);
        assert_eq!(
            blocks.state_id("minecraft:stone", &Properties::new()),
            Some(BlockStateId(1))
        );
        assert_eq!(
            blocks.state_id("minecraft:oak_log", &props(&[("axis", "z")])),
            Some(BlockStateId(4))
        );
        assert_eq!(
            blocks.state_id("dirt", &Properties::new()),
            Some(BlockStateId(30))
        );
    }

    #[test]
    fn last_property_varies_fastest() {
        let blocks = test_blocks();
        let id = blocks
            .state_id(
                "minecraft:lever",
                &props(&[("face", "wall"), ("facing", "south"), ("powered", "false")]),
            )
            .unwrap();
        // 6 + face(1) * 8 + facing(1) * 2 + powered(1)
        assert_eq!(id, BlockStateId(6 + 8 + 2 + 1));
        let state = blocks.state(id).unwrap();
        assert_eq!(state.name, "minecraft:lever");
        assert_eq!(state.properties["face"], "wall");
        assert_eq!(state.properties["facing"], "south");
        assert_eq!(state.properties["powered"], "false");
    }

    #[test]
    fn missing_properties_use_default() {
        let blocks = test_blocks();
        assert_eq!(
            blocks.state_id("minecraft:oak_log", &Properties::new()),
            Some(BlockStateId(2))
        );
    }

    #[test]
    fn unknown_values_are_rejected() {
        let blocks = test_blocks();
        assert!(blocks.has_block("minecraft:oak_log"));
        assert!(!blocks.has_block("minecraft:nope"));
        assert_eq!(
            blocks.state_id("minecraft:oak_log", &props(&[("axis", "w")])),
            None
        );
        assert_eq!(
            blocks.state_id("minecraft:stone", &props(&[("axis", "x")])),
            None
        );
        assert_eq!(blocks.state(BlockStateId(31)), None);
    }

    #[test]
    fn air_variants() {
        let blocks = test_blocks();
        assert!(blocks.is_air(BlockStateId(0)));
        assert!(blocks.is_air(BlockStateId(5)));
        assert!(!blocks.is_air(BlockStateId(1)));
        assert!(!blocks.is_air(BlockStateId(1000)));
    }

    #[test]
    fn blocks_json() {
        let json = r#"[
            {"id": 0, "name": "air", "minStateId": 0, "maxStateId": 0, "defaultState": 0, "states": []},
            {"id": 1, "name": "oak_log", "minStateId": 1, "maxStateId": 3, "defaultState": 2,
             "states": [{"name": "axis", "type": "enum", "num_values": 3, "values": ["x", "y", "z"]}]},
            {"id": 2, "name": "farmland", "minStateId": 4, "maxStateId": 11, "defaultState": 4,
             "states": [{"name": "moisture", "type": "int", "num_values": 8}]},
            {"id": 3, "name": "tnt", "minStateId": 12, "maxStateId": 13, "defaultState": 13,
             "states": [{"name": "unstable", "type": "bool", "num_values": 2}]}
        ]"#;
        let blocks = BlockStateTable::from_json(json).unwrap();
        assert_eq!(blocks.state_count(), 14);
        assert_eq!(
            blocks.state_id("minecraft:oak_log", &Properties::new()),
            Some(BlockStateId(2))
        );
        assert_eq!(
            blocks.state_id("minecraft:farmland", &props(&[("moisture", "7")])),
            Some(BlockStateId(11))
        );
        assert_eq!(
            blocks.state(BlockStateId(12)).unwrap().properties["unstable"],
            "true"
        );
        assert_eq!(blocks.default_state("tnt"), Some(BlockStateId(13)));
    }

    #[test]
    fn blocks_json_gap_is_rejected() {
        let json = r#"[
            {"id": 0, "name": "air", "minStateId": 0, "maxStateId": 0, "defaultState": 0, "states": []},
            {"id": 1, "name": "stone", "minStateId": 2, "maxStateId": 2, "defaultState": 2, "states": []}
        ]"#;
        assert!(BlockStateTable::from_json(json).is_err());
    }

    #[test]
    fn biome_and_block_entity_lists() {
        let biomes = test_biomes();
        assert_eq!(biomes.biome_id("minecraft:plains"), Some(BiomeId(1)));
        assert_eq!(biomes.biome_id("desert"), Some(BiomeId(2)));
        assert_eq!(biomes.biome_name(BiomeId(0)), Some("minecraft:the_void"));
        assert_eq!(biomes.biome_name(BiomeId(3)), None);
        assert_eq!(biomes.biome_count(), 3);

        let types = BlockEntityTypeTable::from_json(r#"["furnace", "minecraft:chest"]"#).unwrap();
        assert_eq!(types.type_id("minecraft:chest"), Some(1));
        assert_eq!(types.type_name(0), Some("minecraft:furnace"));
        assert_eq!(types.type_name(-1), None);
    }
}
