use crate::config::EngineConfig;
use crate::error::GridError;
use crate::info::{Environment, MapInfo};
use crate::layer::{Layer, LayerData};
use crate::metadata::TileMetadata;
use crate::registry::TileRegistry;
use crate::spatial::{CellPos, PackedCell};
use crate::tile::TileType;
use std::sync::Arc;

/// A four-layer tile grid.
///
/// Each layer stores one [`PackedCell`] per cell, column-major
/// (`x * height + y`). The low half of a cell indexes the layer's ID table,
/// the high half is a 1-based slot into the layer's metadata list.
///
/// The grid does no locking. Whoever owns it must not read it while a
/// background save holds it (see [`MapDocument`](crate::MapDocument)).
#[derive(Debug, Clone)]
pub struct MapGrid {
    width: u32,
    height: u32,
    info: MapInfo,
    layers: [LayerData; 4],
}

impl MapGrid {
    /// A `width` x `height` map with every layer set to its empty tile.
    pub fn new(
        width: u32,
        height: u32,
        info: MapInfo,
        registry: &TileRegistry,
    ) -> Result<Self, GridError> {
        Self::with_config(width, height, info, registry, &EngineConfig::default())
    }

    pub fn with_config(
        width: u32,
        height: u32,
        info: MapInfo,
        registry: &TileRegistry,
        config: &EngineConfig,
    ) -> Result<Self, GridError> {
        check_size(width, height)?;
        let len = width as usize * height as usize;
        let layers = Layer::ALL.map(|layer| {
            LayerData::new(len, registry.empty(layer).clone(), config.initial_id_capacity)
        });
        Ok(MapGrid {
            width,
            height,
            info,
            layers,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn info(&self) -> &MapInfo {
        &self.info
    }

    pub fn info_mut(&mut self) -> &mut MapInfo {
        &mut self.info
    }

    pub fn environment(&self) -> Environment {
        self.info.environment
    }

    #[inline]
    pub fn in_bounds(&self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && (x as u32) < self.width && (y as u32) < self.height
    }

    #[inline]
    fn cell_index(&self, x: i32, y: i32) -> Option<usize> {
        if self.in_bounds(x, y) {
            Some(x as usize * self.height as usize + y as usize)
        } else {
            None
        }
    }

    fn checked_index(&self, x: i32, y: i32) -> Result<usize, GridError> {
        self.cell_index(x, y).ok_or(GridError::OutOfBounds {
            x,
            y,
            width: self.width,
            height: self.height,
        })
    }

    #[inline]
    fn layer(&self, layer: Layer) -> &LayerData {
        &self.layers[layer.index()]
    }

    #[inline]
    fn layer_mut(&mut self, layer: Layer) -> &mut LayerData {
        &mut self.layers[layer.index()]
    }

    /// Tile at `(x, y)`, `None` only off the map.
    #[inline]
    pub fn get(&self, layer: Layer, x: i32, y: i32) -> Option<&Arc<TileType>> {
        let i = self.cell_index(x, y)?;
        Some(self.layer(layer).tile(i))
    }

    /// Raw packed value of a cell.
    pub fn packed(&self, layer: Layer, x: i32, y: i32) -> Option<PackedCell> {
        let i = self.cell_index(x, y)?;
        Some(self.layer(layer).cells[i])
    }

    /// Places `tile`, dropping whatever metadata the cell had.
    pub fn set(
        &mut self,
        layer: Layer,
        x: i32,
        y: i32,
        tile: &Arc<TileType>,
    ) -> Result<(), GridError> {
        check_layer(layer, tile)?;
        let i = self.checked_index(x, y)?;
        let data = self.layer_mut(layer);
        let index = data.ids.index_of(tile).map_err(|e| e.at(layer, tile))?;
        let slot = data.cells[i].slot();
        data.remove_slot(slot);
        data.cells[i] = PackedCell::new(index, 0);
        Ok(())
    }

    /// Sets every cell of `layer` to `tile` and drops all of its metadata.
    pub fn fill(&mut self, layer: Layer, tile: &Arc<TileType>) -> Result<(), GridError> {
        check_layer(layer, tile)?;
        let data = self.layer_mut(layer);
        let index = data.ids.index_of(tile).map_err(|e| e.at(layer, tile))?;
        data.metadata.clear();
        data.cells.fill(PackedCell::new(index, 0));
        Ok(())
    }

    /// Metadata of a cell. A slot that points past the metadata list is
    /// treated as "no metadata"; [`validate`](Self::validate) reports it.
    pub fn metadata(&self, layer: Layer, x: i32, y: i32) -> Option<&TileMetadata> {
        let i = self.cell_index(x, y)?;
        let data = self.layer(layer);
        let slot = data.cells[i].slot();
        let found = data.slot_metadata(slot);
        if slot != 0 && found.is_none() {
            log::warn!("stale metadata slot {slot} at ({x}, {y}) on the {layer} layer");
        }
        found
    }

    /// Replaces the metadata of a cell. `None`, or metadata without any value
    /// set, clears it.
    ///
    /// Removing an entry renumbers every higher slot of the layer, which is a
    /// scan over the whole layer.
    pub fn set_metadata(
        &mut self,
        layer: Layer,
        x: i32,
        y: i32,
        metadata: Option<TileMetadata>,
    ) -> Result<(), GridError> {
        let i = self.checked_index(x, y)?;
        let data = self.layer_mut(layer);

        let old = data.cells[i].slot();
        data.remove_slot(old);

        if let Some(metadata) = metadata.filter(TileMetadata::has_values_set) {
            let slot = data
                .push_metadata(metadata)
                .ok_or(GridError::MetadataSlotsExhausted { layer })?;
            data.cells[i] = data.cells[i].with_slot(slot);
        }
        Ok(())
    }

    /// Number of metadata entries stored for `layer`.
    pub fn metadata_count(&self, layer: Layer) -> usize {
        self.layer(layer).metadata.len()
    }

    /// Number of distinct tiles `layer` references, the empty tile included.
    pub fn distinct_tiles(&self, layer: Layer) -> usize {
        self.layer(layer).ids.len()
    }

    pub fn id_table_capacity(&self, layer: Layer) -> usize {
        self.layer(layer).ids.capacity()
    }

    /// Changes the map size. Old cells inside `min(old, new)` bounds move by
    /// `offset` (centred when `None`) and are clamped to the new bounds; a
    /// later cell wins when two land on the same spot. Metadata slots move
    /// with their cells and are not renumbered.
    pub fn resize(
        &mut self,
        new_width: u32,
        new_height: u32,
        offset: Option<(i32, i32)>,
    ) -> Result<(), GridError> {
        check_size(new_width, new_height)?;
        let (ox, oy) = offset.unwrap_or((
            (new_width as i32 - self.width as i32) / 2,
            (new_height as i32 - self.height as i32) / 2,
        ));

        let copy_w = self.width.min(new_width) as i32;
        let copy_h = self.height.min(new_height) as i32;
        let (old_h, new_h) = (self.height as usize, new_height as usize);
        let len = new_width as usize * new_height as usize;

        for data in self.layers.iter_mut() {
            let mut cells = vec![PackedCell::EMPTY; len];
            for x in 0..copy_w {
                let dx = (x + ox).clamp(0, new_width as i32 - 1) as usize;
                for y in 0..copy_h {
                    let dy = (y + oy).clamp(0, new_height as i32 - 1) as usize;
                    cells[dx * new_h + dy] = data.cells[x as usize * old_h + y as usize];
                }
            }
            data.cells = cells;
        }

        log::debug!(
            "resized map from {}x{} to {new_width}x{new_height} (offset {ox}, {oy})",
            self.width,
            self.height
        );
        self.width = new_width;
        self.height = new_height;
        Ok(())
    }

    /// Whether any layer blocks movement at `(x, y)`. Off-map cells are solid.
    pub fn is_solid(&self, x: i32, y: i32) -> bool {
        let Some(i) = self.cell_index(x, y) else {
            return true;
        };
        self.layers.iter().any(|data| {
            let cell = data.cells[i];
            data.ids.get(cell.index()).solid(data.slot_metadata(cell.slot()))
        })
    }

    /// Cells of `layer` in storage order (x outer, y inner).
    pub fn cells(
        &self,
        layer: Layer,
    ) -> impl Iterator<Item = (CellPos, &Arc<TileType>, Option<&TileMetadata>)> + '_ {
        let data = self.layer(layer);
        let h = self.height as usize;
        data.cells.iter().enumerate().map(move |(i, cell)| {
            let pos = CellPos::new((i / h) as i32, (i % h) as i32);
            (pos, data.ids.get(cell.index()), data.slot_metadata(cell.slot()))
        })
    }

    /// Checks the cell invariants: every index has an ID-table entry and every
    /// slot has a metadata entry.
    pub fn validate(&self) -> Result<(), GridError> {
        let h = self.height as usize;
        for layer in Layer::ALL {
            let data = self.layer(layer);
            for (i, cell) in data.cells.iter().enumerate() {
                let (x, y) = ((i / h) as u32, (i % h) as u32);
                if !data.ids.contains_index(cell.index()) {
                    return Err(GridError::MissingTileEntry {
                        layer,
                        x,
                        y,
                        index: cell.index(),
                    });
                }
                let slot = cell.slot();
                if slot as usize > data.metadata.len() {
                    return Err(GridError::StaleMetadataSlot {
                        layer,
                        x,
                        y,
                        slot,
                        len: data.metadata.len(),
                    });
                }
            }
        }
        Ok(())
    }

    #[cfg(test)]
    fn set_packed(&mut self, layer: Layer, x: i32, y: i32, cell: PackedCell) {
        if let Some(i) = self.cell_index(x, y) {
            self.layer_mut(layer).cells[i] = cell;
        }
    }
}

fn check_size(width: u32, height: u32) -> Result<(), GridError> {
    if width == 0 || height == 0 || width > i32::MAX as u32 || height > i32::MAX as u32 {
        return Err(GridError::InvalidSize { width, height });
    }
    Ok(())
}

fn check_layer(layer: Layer, tile: &TileType) -> Result<(), GridError> {
    if tile.layer() != layer {
        return Err(GridError::WrongLayer {
            id: tile.id().to_owned(),
            tile_layer: tile.layer(),
            layer,
        });
    }
    Ok(())
}
