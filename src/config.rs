use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Engine-wide tunables. Every field has a default, so a config file only
/// needs to list what it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Edge length of one grid cell in pixels.
    pub tile_size: u32,
    /// Edge length of a texture atlas page in pixels.
    pub atlas_page_size: u32,
    /// Edge length of a transition cache page in pixels.
    pub transition_page_size: u32,
    /// ID-table entries each layer starts with (index 0 included).
    pub initial_id_capacity: usize,
    /// Number of precomputed integers used to pick tile variations.
    pub variation_table_size: usize,
    pub variation_seed: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            tile_size: 16,
            atlas_page_size: 1024,
            transition_page_size: 256,
            initial_id_capacity: 8,
            variation_table_size: 256,
            variation_seed: 0x7173_6C65,
        }
    }
}

impl EngineConfig {
    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let txt = std::fs::read_to_string(path)
            .with_context(|| format!("Reading engine config {}", path.display()))?;
        let config = Self::from_json_str(&txt)
            .with_context(|| format!("Parsing engine config {}", path.display()))?;
        Ok(config)
    }
}
