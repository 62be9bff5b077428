//! Current (versioned) map format.
//!
//! ```json
//! { "version": 3,
//!   "info": { "name": "Town", "environment": 0, "weather": 0 },
//!   "width": 2, "height": 1,
//!   "layers": { "terrain": ["grass", { "id": "stone", "metadata": { "k": "v" } }],
//!               "decoration": [...], "npc": [...], "control": [...] } }
//! ```
use crate::error::{MapError, ReadStage};
use crate::info::MapInfo;
use crate::ir_map::{IrCell, IrMap};
use crate::layer::Layer;
use crate::map::MapGrid;
use crate::metadata::TileMetadata;
use serde::{Deserialize, Serialize};
use serde_json::{Map as JsonObject, Value as JsonValue};

/// Format version written by this engine. Anything else goes to the legacy
/// reader.
pub const MAP_FORMAT_VERSION: u64 = 3;

/// A bare id for plain cells, the object form only when metadata is set.
#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
enum JsonCell {
    Id(String),
    Tile {
        id: String,
        #[serde(default)]
        metadata: TileMetadata,
    },
}

impl From<JsonCell> for IrCell {
    fn from(cell: JsonCell) -> Self {
        match cell {
            JsonCell::Id(id) => IrCell::bare(id),
            JsonCell::Tile { id, metadata } => IrCell {
                id,
                metadata: Some(metadata).filter(TileMetadata::has_values_set),
            },
        }
    }
}

#[derive(Serialize)]
struct JsonMapOut<'a> {
    version: u64,
    info: &'a MapInfo,
    width: u32,
    height: u32,
    layers: JsonObject<String, JsonValue>,
}

/// Reads the current format stage by stage: header, info, layers.
struct CurrentReader<'a> {
    doc: &'a JsonObject<String, JsonValue>,
}

impl<'a> CurrentReader<'a> {
    fn read_header(&self) -> Result<(u32, u32), MapError> {
        let version = self.doc.get("version").and_then(JsonValue::as_u64);
        if version != Some(MAP_FORMAT_VERSION) {
            return Err(MapError::FormatVersionMismatch {
                found: version,
                expected: MAP_FORMAT_VERSION,
            });
        }
        let width = self.dimension("width")?;
        let height = self.dimension("height")?;
        Ok((width, height))
    }

    fn dimension(&self, key: &str) -> Result<u32, MapError> {
        self.doc
            .get(key)
            .and_then(JsonValue::as_u64)
            .and_then(|v| u32::try_from(v).ok())
            .filter(|v| *v > 0)
            .ok_or_else(|| MapError::Malformed {
                stage: ReadStage::Header,
                reason: format!("'{key}' must be a positive integer"),
            })
    }

    fn read_info(&self) -> Result<MapInfo, MapError> {
        let value = self.doc.get("info").ok_or_else(|| MapError::Malformed {
            stage: ReadStage::Info,
            reason: "missing 'info'".into(),
        })?;
        MapInfo::deserialize(value).map_err(|e| MapError::Malformed {
            stage: ReadStage::Info,
            reason: e.to_string(),
        })
    }

    fn read_layers(&self, width: u32, height: u32) -> Result<[Vec<IrCell>; 4], MapError> {
        let layers = self
            .doc
            .get("layers")
            .and_then(JsonValue::as_object)
            .ok_or_else(|| MapError::Malformed {
                stage: ReadStage::Layers,
                reason: "missing 'layers' object".into(),
            })?;

        let expected = width as usize * height as usize;
        let mut out: [Vec<IrCell>; 4] = Default::default();
        for layer in Layer::ALL {
            out[layer.index()] = match layers.get(layer.as_str()) {
                Some(value) => read_layer(layer, value, expected)?,
                None => {
                    log::debug!("map has no {layer} layer; leaving it empty");
                    Vec::new()
                }
            };
        }
        Ok(out)
    }
}

fn read_layer(layer: Layer, value: &JsonValue, expected: usize) -> Result<Vec<IrCell>, MapError> {
    let cells = Vec::<JsonCell>::deserialize(value).map_err(|e| MapError::Malformed {
        stage: ReadStage::Layers,
        reason: format!("{layer}: {e}"),
    })?;
    if cells.len() != expected {
        return Err(MapError::InvalidLayerSize {
            layer,
            expected,
            found: cells.len(),
        });
    }
    Ok(cells.into_iter().map(IrCell::from).collect())
}

/// Decodes a parsed document in the current format. A missing or different
/// `version` is [`MapError::FormatVersionMismatch`].
pub fn decode_current(doc: &JsonValue) -> Result<IrMap, MapError> {
    let doc = doc.as_object().ok_or_else(|| MapError::Malformed {
        stage: ReadStage::Header,
        reason: "map is not a JSON object".into(),
    })?;
    let reader = CurrentReader { doc };

    let (width, height) = reader.read_header()?;
    let info = reader.read_info()?;
    let layers = reader.read_layers(width, height)?;

    Ok(IrMap {
        info,
        width,
        height,
        layers,
    })
}

/// Encodes `grid` in the current format.
pub fn encode_current(grid: &MapGrid) -> Result<JsonValue, MapError> {
    let mut layers = JsonObject::new();
    for layer in Layer::ALL {
        let cells: Vec<JsonValue> = grid
            .cells(layer)
            .map(|(_, tile, metadata)| match metadata.filter(|m| m.has_values_set()) {
                Some(metadata) => serde_json::json!({ "id": tile.id(), "metadata": metadata }),
                None => JsonValue::String(tile.id().to_owned()),
            })
            .collect();
        layers.insert(layer.as_str().to_owned(), JsonValue::Array(cells));
    }

    let out = JsonMapOut {
        version: MAP_FORMAT_VERSION,
        info: grid.info(),
        width: grid.width(),
        height: grid.height(),
        layers,
    };
    Ok(serde_json::to_value(out)?)
}
