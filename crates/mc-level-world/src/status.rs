//! Chunk generation status, persisted as the `Status` string.

use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum ChunkStatus {
    #[default]
    Empty,
    StructureStarts,
    StructureReferences,
    Biomes,
    Noise,
    Surface,
    Carvers,
    Features,
    InitializeLight,
    Light,
    Spawn,
    Full,
    /// Anything this crate does not know, kept verbatim.
    Other(String),
}

const KNOWN: [(ChunkStatus, &str); 12] = [
    (ChunkStatus::Empty, "empty"),
    (ChunkStatus::StructureStarts, "structure_starts"),
    (ChunkStatus::StructureReferences, "structure_references"),
    (ChunkStatus::Biomes, "biomes"),
    (ChunkStatus::Noise, "noise"),
    (ChunkStatus::Surface, "surface"),
    (ChunkStatus::Carvers, "carvers"),
    (ChunkStatus::Features, "features"),
    (ChunkStatus::InitializeLight, "initialize_light"),
    (ChunkStatus::Light, "light"),
    (ChunkStatus::Spawn, "spawn"),
    (ChunkStatus::Full, "full"),
];

impl ChunkStatus {
    /// Namespaced form written to disk, e.g. `minecraft:full`.
    pub fn as_str(&self) -> String {
        match self {
            ChunkStatus::Other(raw) => raw.clone(),
            known => KNOWN
                .iter()
                .find(|(status, _)| status == known)
                .map(|(_, name)| format!("minecraft:{name}"))
                .unwrap_or_default(),
        }
    }

    /// Whether the chunk finished generating.
    pub fn is_full(&self) -> bool {
        matches!(self, ChunkStatus::Full)
    }
}

impl FromStr for ChunkStatus {
    type Err = std::convert::Infallible;

    /// Accepts both `minecraft:noise` and bare `noise`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bare = s.strip_prefix("minecraft:").unwrap_or(s);
        Ok(KNOWN
            .iter()
            .find(|(_, name)| *name == bare)
            .map(|(status, _)| status.clone())
            .unwrap_or_else(|| ChunkStatus::Other(s.to_owned())))
    }
}

impl From<&str> for ChunkStatus {
    fn from(s: &str) -> Self {
        match s.parse() {
            Ok(status) => status,
            Err(never) => match never {},
        }
    }
}

impl fmt::Display for ChunkStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_str())
    }
}
