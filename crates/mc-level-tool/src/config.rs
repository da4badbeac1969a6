use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize)]
pub struct LevelConfig {
    #[serde(default)]
    pub world: WorldSection,
    pub registry: RegistrySection,
    pub input: InputSection,
    #[serde(default)]
    pub output: OutputSection,
    #[serde(default)]
    pub logging: LoggingSection,
}

#[derive(Debug, Deserialize)]
pub struct WorldSection {
    /// Sections per column. Default: 24 (overworld, Y -64..320).
    #[serde(default = "default_section_count")]
    pub section_count: usize,
    /// Expected `yPos` of stored chunks. Default: -4.
    #[serde(default = "default_min_section_y")]
    pub min_section_y: i32,
}

fn default_section_count() -> usize {
    24
}

fn default_min_section_y() -> i32 {
    -4
}

impl Default for WorldSection {
    fn default() -> Self {
        Self {
            section_count: default_section_count(),
            min_section_y: default_min_section_y(),
        }
    }
}

/// JSON files describing the global ID spaces.
#[derive(Debug, Deserialize)]
pub struct RegistrySection {
    pub blocks: String,
    pub biomes: String,
    pub block_entities: String,
}

#[derive(Debug, Deserialize)]
pub struct InputSection {
    pub path: String,
    #[serde(default = "default_gzip")]
    pub gzip: bool,
}

fn default_gzip() -> bool {
    true
}

#[derive(Debug, Deserialize)]
pub struct OutputSection {
    /// Where to write the chunk back. Nothing is written when absent.
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default = "default_gzip")]
    pub gzip: bool,
}

impl Default for OutputSection {
    fn default() -> Self {
        Self {
            path: None,
            gzip: default_gzip(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct LoggingSection {
    #[serde(default = "default_level")]
    pub level: String,
}

fn default_level() -> String {
    "info".into()
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: default_level(),
        }
    }
}

impl LevelConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, Box<dyn std::error::Error>> {
        let contents = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)?;
        Ok(config)
    }
}
