use crate::error::GridError;
use crate::metadata::TileMetadata;
use crate::spatial::cell::{PackedCell, MAX_SLOT, MAX_TABLE_INDEX};
use crate::tile::TileType;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// One of the four stacked grids that make up a map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Layer {
    Terrain,
    Decoration,
    Npc,
    Control,
}

impl Layer {
    /// Draw order.
    pub const ALL: [Layer; 4] = [Layer::Terrain, Layer::Decoration, Layer::Npc, Layer::Control];

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Key used for this layer in stored maps.
    pub fn as_str(self) -> &'static str {
        match self {
            Layer::Terrain => "terrain",
            Layer::Decoration => "decoration",
            Layer::Npc => "npc",
            Layer::Control => "control",
        }
    }
}

impl fmt::Display for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Maps small per-layer indices to shared tile types.
///
/// Entry 0 is always the layer's empty tile. Entries are never removed, so a
/// `None` only exists in the tail created by the last growth.
#[derive(Debug, Clone)]
pub(crate) struct IdTable {
    entries: Vec<Option<Arc<TileType>>>,
    lookup: FxHashMap<u32, u16>,
    free_hint: usize,
    empty: Arc<TileType>,
}

/// Why a tile could not get an ID-table entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum IdTableError {
    Full,
    /// The tile was registered in a different registry than the grid's.
    Foreign,
}

impl IdTableError {
    pub(crate) fn at(self, layer: Layer, tile: &TileType) -> GridError {
        match self {
            IdTableError::Full => GridError::IdTableFull { layer },
            IdTableError::Foreign => GridError::ForeignTile {
                layer,
                id: tile.id().to_owned(),
            },
        }
    }
}

impl IdTable {
    pub(crate) fn new(empty: Arc<TileType>, capacity: usize) -> Self {
        let capacity = capacity.clamp(1, MAX_TABLE_INDEX + 1);
        let mut entries = vec![None; capacity];
        entries[0] = Some(empty.clone());
        let mut lookup = FxHashMap::default();
        lookup.insert(empty.numeric_id(), 0);
        IdTable {
            entries,
            lookup,
            free_hint: 1,
            empty,
        }
    }

    #[inline]
    pub(crate) fn get(&self, index: u16) -> &Arc<TileType> {
        match self.entries.get(index as usize) {
            Some(Some(tile)) => tile,
            _ => &self.empty,
        }
    }

    pub(crate) fn contains_index(&self, index: u16) -> bool {
        matches!(self.entries.get(index as usize), Some(Some(_)))
    }

    pub(crate) fn capacity(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn len(&self) -> usize {
        self.lookup.len()
    }

    /// Index of `tile`, inserting it if this layer has not referenced it yet.
    pub(crate) fn index_of(&mut self, tile: &Arc<TileType>) -> Result<u16, IdTableError> {
        if tile.registry_id() != self.empty.registry_id() {
            return Err(IdTableError::Foreign);
        }
        if let Some(&i) = self.lookup.get(&tile.numeric_id()) {
            return Ok(i);
        }

        let free = match self.entries[self.free_hint.min(self.entries.len())..]
            .iter()
            .position(Option::is_none)
        {
            Some(offset) => self.free_hint + offset,
            None => {
                let old = self.entries.len();
                if old > MAX_TABLE_INDEX {
                    return Err(IdTableError::Full);
                }
                let grown = (old * 2).min(MAX_TABLE_INDEX + 1);
                log::debug!("growing tile id table from {old} to {grown} entries");
                self.entries.resize(grown, None);
                old
            }
        };

        self.entries[free] = Some(tile.clone());
        self.lookup.insert(tile.numeric_id(), free as u16);
        self.free_hint = free + 1;
        Ok(free as u16)
    }
}

/// Storage for one layer: packed cells, their ID table and the layer-global
/// metadata list that cell slots point into.
#[derive(Debug, Clone)]
pub(crate) struct LayerData {
    pub(crate) cells: Vec<PackedCell>,
    pub(crate) ids: IdTable,
    pub(crate) metadata: Vec<TileMetadata>,
}

impl LayerData {
    pub(crate) fn new(len: usize, empty: Arc<TileType>, id_capacity: usize) -> Self {
        LayerData {
            cells: vec![PackedCell::EMPTY; len],
            ids: IdTable::new(empty, id_capacity),
            metadata: Vec::new(),
        }
    }

    #[inline]
    pub(crate) fn tile(&self, i: usize) -> &Arc<TileType> {
        self.ids.get(self.cells[i].index())
    }

    /// Metadata behind a slot. A slot past the end of the list yields `None`.
    pub(crate) fn slot_metadata(&self, slot: u16) -> Option<&TileMetadata> {
        if slot == 0 {
            return None;
        }
        self.metadata.get(slot as usize - 1)
    }

    /// Drops the entry behind `slot` and shifts every higher slot in the layer
    /// down by one so that no cell points at a moved entry.
    pub(crate) fn remove_slot(&mut self, slot: u16) {
        if slot == 0 {
            return;
        }
        let pos = slot as usize - 1;
        if pos < self.metadata.len() {
            self.metadata.remove(pos);
        }
        for cell in self.cells.iter_mut() {
            let s = cell.slot();
            if s == slot {
                *cell = cell.with_slot(0);
            } else if s > slot {
                *cell = cell.with_slot(s - 1);
            }
        }
    }

    /// Appends `metadata` and returns its 1-based slot.
    pub(crate) fn push_metadata(&mut self, metadata: TileMetadata) -> Option<u16> {
        if self.metadata.len() >= MAX_SLOT {
            return None;
        }
        self.metadata.push(metadata);
        Some(self.metadata.len() as u16)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::TileRegistry;

    fn registry_with(n: usize) -> (TileRegistry, Vec<Arc<TileType>>) {
        let mut reg = TileRegistry::new();
        let tiles = (0..n)
            .map(|i| {
                reg.register(TileType::new(Layer::Decoration, format!("deco_{i}")))
                    .unwrap()
            })
            .collect();
        (reg, tiles)
    }

    #[test]
    fn table_grows_by_doubling() {
        let (reg, tiles) = registry_with(5);
        let mut t = IdTable::new(reg.empty(Layer::Decoration).clone(), 2);
        assert_eq!(t.capacity(), 2);
        assert_eq!(t.index_of(&tiles[0]), Ok(1));
        assert_eq!(t.capacity(), 2);
        assert_eq!(t.index_of(&tiles[1]), Ok(2));
        assert_eq!(t.capacity(), 4);
        assert_eq!(t.index_of(&tiles[2]), Ok(3));
        assert_eq!(t.index_of(&tiles[3]), Ok(4));
        assert_eq!(t.capacity(), 8);
        // Known tiles keep their index.
        assert_eq!(t.index_of(&tiles[1]), Ok(2));
        assert_eq!(t.len(), 5);
    }

    #[test]
    fn table_refuses_entry_past_u16_range() {
        let (reg, tiles) = registry_with(MAX_TABLE_INDEX + 1);
        let mut t = IdTable::new(reg.empty(Layer::Decoration).clone(), 8);
        for (i, tile) in tiles.iter().take(MAX_TABLE_INDEX).enumerate() {
            assert_eq!(t.index_of(tile), Ok(i as u16 + 1));
        }
        assert_eq!(t.capacity(), MAX_TABLE_INDEX + 1);
        assert_eq!(t.get(0xFFFF).id(), tiles[MAX_TABLE_INDEX - 1].id());
        assert_eq!(t.index_of(&tiles[MAX_TABLE_INDEX]), Err(IdTableError::Full));
    }

    #[test]
    fn table_refuses_tiles_of_another_registry() {
        let (reg, _) = registry_with(1);
        let (_, others) = registry_with(1);
        let mut t = IdTable::new(reg.empty(Layer::Decoration).clone(), 4);
        // Same numeric id as the table's own deco_0, different registry.
        assert_eq!(t.index_of(&others[0]), Err(IdTableError::Foreign));
        assert_eq!(t.len(), 1);
    }

    #[test]
    fn metadata_list_refuses_slot_past_u16_range() {
        let reg = TileRegistry::new();
        let mut l = LayerData::new(1, reg.empty(Layer::Terrain).clone(), 8);
        let m = TileMetadata::new().with("k", "v");
        for i in 0..MAX_SLOT {
            assert_eq!(l.push_metadata(m.clone()), Some(i as u16 + 1));
        }
        assert_eq!(l.push_metadata(m), None);
    }

    #[test]
    fn remove_slot_shifts_higher_slots_only() {
        let reg = TileRegistry::new();
        let mut l = LayerData::new(4, reg.empty(Layer::Terrain).clone(), 8);
        for (i, name) in ["a", "b", "c", "d"].iter().enumerate() {
            let slot = l.push_metadata(TileMetadata::new().with("n", *name)).unwrap();
            l.cells[i] = l.cells[i].with_slot(slot);
        }
        l.remove_slot(2);
        let slots: Vec<u16> = l.cells.iter().map(|c| c.slot()).collect();
        assert_eq!(slots, [1, 0, 2, 3]);
        assert_eq!(l.slot_metadata(2).and_then(|m| m.get("n")), Some("c"));
        assert_eq!(l.slot_metadata(3).and_then(|m| m.get("n")), Some("d"));
        assert!(l.slot_metadata(4).is_none());
    }
}
