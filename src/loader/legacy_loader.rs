//! Pre-versioning map format: a tile palette per layer, row-major index
//! arrays, and metadata kept in a separate list.
use crate::error::{MapError, ReadStage};
use crate::info::{Environment, MapInfo};
use crate::ir_map::{IrCell, IrMap};
use crate::layer::Layer;
use crate::metadata::TileMetadata;
use crate::registry::EMPTY_TILE_ID;
use serde::Deserialize;
use serde_json::Value as JsonValue;

#[derive(Debug, Deserialize)]
struct LegacyMap {
    name: String,
    #[serde(default)]
    environment: Environment,
    width: u32,
    height: u32,
    #[serde(default)]
    palettes: LegacyPalettes,
    #[serde(default)]
    terrain: Vec<u32>,
    #[serde(default)]
    decoration: Vec<u32>,
    #[serde(default)]
    npc: Vec<u32>,
    #[serde(default)]
    control: Vec<u32>,
    #[serde(default)]
    metadata: Vec<LegacyMetadata>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct LegacyPalettes {
    terrain: Vec<String>,
    decoration: Vec<String>,
    npc: Vec<String>,
    control: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct LegacyMetadata {
    layer: Layer,
    x: u32,
    y: u32,
    values: TileMetadata,
}

impl LegacyMap {
    fn layer(&self, layer: Layer) -> (&[String], &[u32]) {
        match layer {
            Layer::Terrain => (&self.palettes.terrain, &self.terrain),
            Layer::Decoration => (&self.palettes.decoration, &self.decoration),
            Layer::Npc => (&self.palettes.npc, &self.npc),
            Layer::Control => (&self.palettes.control, &self.control),
        }
    }
}

/// Decodes a legacy document into the canonical column-major layout.
pub fn decode_legacy(doc: &JsonValue) -> Result<IrMap, MapError> {
    let legacy = LegacyMap::deserialize(doc).map_err(|e| MapError::Malformed {
        stage: ReadStage::Header,
        reason: e.to_string(),
    })?;
    let (width, height) = (legacy.width, legacy.height);
    if width == 0 || height == 0 {
        return Err(MapError::Malformed {
            stage: ReadStage::Header,
            reason: format!("invalid map size {width}x{height}"),
        });
    }
    let (w, h) = (width as usize, height as usize);
    let expected = w * h;

    let mut layers: [Vec<IrCell>; 4] = Default::default();
    for layer in Layer::ALL {
        let (palette, indices) = legacy.layer(layer);
        if indices.is_empty() {
            continue;
        }
        if indices.len() != expected {
            return Err(MapError::InvalidLayerSize {
                layer,
                expected,
                found: indices.len(),
            });
        }

        let mut cells = vec![IrCell::bare(EMPTY_TILE_ID); expected];
        for (row_major, &p) in indices.iter().enumerate() {
            let id = palette.get(p as usize).ok_or_else(|| MapError::Malformed {
                stage: ReadStage::Layers,
                reason: format!(
                    "{layer}: palette index {p} out of range ({} entries)",
                    palette.len()
                ),
            })?;
            let (x, y) = (row_major % w, row_major / w);
            cells[x * h + y].id.clone_from(id);
        }
        layers[layer.index()] = cells;
    }

    for entry in legacy.metadata {
        let (x, y) = (entry.x as usize, entry.y as usize);
        if x >= w || y >= h {
            log::warn!(
                "legacy metadata at ({x}, {y}) on the {} layer is outside the map; dropped",
                entry.layer
            );
            continue;
        }
        let cells = &mut layers[entry.layer.index()];
        if cells.is_empty() {
            *cells = vec![IrCell::bare(EMPTY_TILE_ID); expected];
        }
        cells[x * h + y].metadata = Some(entry.values).filter(TileMetadata::has_values_set);
    }

    Ok(IrMap {
        info: MapInfo::new(legacy.name, legacy.environment),
        width,
        height,
        layers,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::info::Weather;
    use serde_json::json;

    #[test]
    fn converts_row_major_palette_arrays() {
        let doc = json!({
            "name": "Old", "environment": 1, "width": 3, "height": 2,
            "palettes": { "terrain": ["grass", "stone"] },
            "terrain": [0, 1, 0,
                        0, 0, 1]
        });
        let ir = decode_legacy(&doc).unwrap();
        assert_eq!(ir.info.environment, Environment::SnowMountain);
        assert_eq!(ir.info.weather, Weather::Sunny);
        let t = ir.layer(Layer::Terrain);
        // column-major: index = x * height + y
        assert_eq!(t[1 * 2].id, "stone"); // (1, 0)
        assert_eq!(t[2 * 2 + 1].id, "stone"); // (2, 1)
        assert_eq!(t[0].id, "grass");
        assert!(ir.layer(Layer::Npc).is_empty());
    }

    #[test]
    fn metadata_list_is_attached_to_cells() {
        let doc = json!({
            "name": "Old", "width": 2, "height": 2,
            "metadata": [
                { "layer": "decoration", "x": 1, "y": 0, "values": { "text": "hello" } },
                { "layer": "terrain", "x": 9, "y": 9, "values": { "k": "v" } }
            ]
        });
        let ir = decode_legacy(&doc).unwrap();
        let deco = ir.layer(Layer::Decoration);
        assert_eq!(deco[2].id, EMPTY_TILE_ID);
        assert_eq!(deco[2].metadata.as_ref().unwrap().get("text"), Some("hello"));
        assert!(ir.layer(Layer::Terrain).is_empty());
    }

    #[test]
    fn bad_palette_index_is_malformed() {
        let doc = json!({
            "name": "Old", "width": 1, "height": 1,
            "palettes": { "terrain": ["grass"] },
            "terrain": [4]
        });
        assert!(matches!(
            decode_legacy(&doc),
            Err(MapError::Malformed { stage: ReadStage::Layers, .. })
        ));
    }

    #[test]
    fn current_format_documents_are_not_legacy() {
        let doc = json!({
            "version": 9,
            "info": { "name": "x" },
            "width": 1,
            "height": 1,
            "layers": {}
        });
        assert!(decode_legacy(&doc).is_err());
    }
}
