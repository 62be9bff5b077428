//! Format-agnostic map, produced by every reader and consumed by
//! [`grid_from_ir`](crate::loader::grid_from_ir).

use crate::info::MapInfo;
use crate::layer::Layer;
use crate::metadata::TileMetadata;

/// Canonical stored map. Layer vectors are column-major (x outer, y inner)
/// and hold `width * height` cells each.
#[derive(Debug, Clone, PartialEq)]
pub struct IrMap {
    pub info: MapInfo,
    pub width: u32,
    pub height: u32,
    pub layers: [Vec<IrCell>; 4], // indexed by Layer::index()
}

#[derive(Debug, Clone, PartialEq)]
pub struct IrCell {
    pub id: String,
    pub metadata: Option<TileMetadata>,
}

impl IrCell {
    pub fn bare(id: impl Into<String>) -> Self {
        IrCell {
            id: id.into(),
            metadata: None,
        }
    }
}

impl IrMap {
    pub fn layer(&self, layer: Layer) -> &[IrCell] {
        &self.layers[layer.index()]
    }
}

/// Which reader produced a map.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapFormat {
    Current,
    Legacy,
}

/// A stored cell whose tile id the registry does not know. The cell is left
/// empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownTile {
    pub layer: Layer,
    pub x: u32,
    pub y: u32,
    pub id: String,
}

/// What happened while turning a stored map into a grid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadReport {
    pub format: MapFormat,
    pub unknown_tiles: Vec<UnknownTile>,
}
