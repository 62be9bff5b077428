pub mod json_loader;
pub mod legacy_loader;

use crate::error::MapError;
use crate::ir_map::{IrMap, LoadReport, MapFormat, UnknownTile};
use crate::layer::Layer;
use crate::map::MapGrid;
use crate::registry::TileRegistry;
use serde_json::Value as JsonValue;
use std::path::Path;

pub use json_loader::MAP_FORMAT_VERSION;

/// Decodes a parsed map document, falling back to the legacy reader when the
/// version does not match.
pub fn decode_map_value(doc: &JsonValue) -> Result<(IrMap, MapFormat), MapError> {
    match json_loader::decode_current(doc) {
        Ok(ir) => Ok((ir, MapFormat::Current)),
        Err(MapError::FormatVersionMismatch { found, expected }) => {
            log::info!("map version {found:?} is not {expected}; trying the legacy reader");
            legacy_loader::decode_legacy(doc)
                .map(|ir| (ir, MapFormat::Legacy))
                .map_err(|e| MapError::LegacyFallbackFailed {
                    version: found,
                    source: Box::new(e),
                })
        }
        Err(e) => Err(e),
    }
}

/// Builds a grid from a decoded map. Cells whose id the registry does not
/// know stay empty and are listed in the report.
pub fn grid_from_ir(
    ir: IrMap,
    registry: &TileRegistry,
    format: MapFormat,
) -> Result<(MapGrid, LoadReport), MapError> {
    let mut grid = MapGrid::new(ir.width, ir.height, ir.info, registry)?;
    let h = ir.height as usize;
    let mut unknown_tiles = Vec::new();

    for (layer, cells) in Layer::ALL.into_iter().zip(ir.layers) {
        for (i, cell) in cells.into_iter().enumerate() {
            let (x, y) = ((i / h) as i32, (i % h) as i32);
            let Some(tile) = registry.find(layer, &cell.id) else {
                log::warn!(
                    "unknown {layer} tile '{}' at ({x}, {y}); leaving the cell empty",
                    cell.id
                );
                unknown_tiles.push(UnknownTile {
                    layer,
                    x: x as u32,
                    y: y as u32,
                    id: cell.id,
                });
                continue;
            };
            grid.set(layer, x, y, tile)?;
            if cell.metadata.is_some() {
                grid.set_metadata(layer, x, y, cell.metadata)?;
            }
        }
    }

    Ok((grid, LoadReport { format, unknown_tiles }))
}

pub fn load_map_str(
    json: &str,
    registry: &TileRegistry,
) -> Result<(MapGrid, LoadReport), MapError> {
    let doc: JsonValue = serde_json::from_str(json)?;
    let (ir, format) = decode_map_value(&doc)?;
    grid_from_ir(ir, registry, format)
}

pub fn save_map_string(grid: &MapGrid) -> Result<String, MapError> {
    let doc = json_loader::encode_current(grid)?;
    Ok(serde_json::to_string_pretty(&doc)?)
}

fn check_extension(p: &Path) -> Result<(), MapError> {
    if p.extension().and_then(|e| e.to_str()) != Some("json") {
        return Err(MapError::UnsupportedFormat(p.display().to_string()));
    }
    Ok(())
}

pub fn load_map_file<P: AsRef<Path>>(
    path: P,
    registry: &TileRegistry,
) -> Result<(MapGrid, LoadReport), MapError> {
    let p = path.as_ref();
    check_extension(p)?;

    let txt = std::fs::read_to_string(p).map_err(|source| MapError::Io {
        path: p.to_path_buf(),
        source,
    })?;
    let doc: JsonValue = serde_json::from_str(&txt).map_err(|source| MapError::Json {
        path: p.to_path_buf(),
        source,
    })?;

    let (ir, format) = decode_map_value(&doc)?;
    let loaded = grid_from_ir(ir, registry, format)?;
    log::debug!(
        "loaded {}x{} map from {} ({:?} format)",
        loaded.0.width(),
        loaded.0.height(),
        p.display(),
        format
    );
    Ok(loaded)
}

pub fn save_map_file<P: AsRef<Path>>(grid: &MapGrid, path: P) -> Result<(), MapError> {
    let p = path.as_ref();
    check_extension(p)?;
    let txt = save_map_string(grid)?;
    std::fs::write(p, txt).map_err(|source| MapError::Io {
        path: p.to_path_buf(),
        source,
    })
}

impl MapGrid {
    pub fn load_from_str(
        json: &str,
        registry: &TileRegistry,
    ) -> Result<(Self, LoadReport), MapError> {
        load_map_str(json, registry)
    }

    pub fn load_from_file<P: AsRef<Path>>(
        path: P,
        registry: &TileRegistry,
    ) -> Result<(Self, LoadReport), MapError> {
        load_map_file(path, registry)
    }

    pub fn to_json_string(&self) -> Result<String, MapError> {
        save_map_string(self)
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), MapError> {
        save_map_file(self, path)
    }
}
