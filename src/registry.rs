use crate::config::EngineConfig;
use crate::error::RegistryError;
use crate::info::Environment;
use crate::layer::Layer;
use crate::tile::{DrawBehavior, TileType, TransitionTexture};
use macroquad::prelude::vec2;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rustc_hash::FxHashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

static NEXT_REGISTRY_ID: AtomicU64 = AtomicU64::new(1);

/// Id of the tile every layer starts out filled with.
pub const EMPTY_TILE_ID: &str = "empty";

/// Precomputed random integers used to pick tile variations, so a cell keeps
/// its variant from frame to frame.
#[derive(Debug, Clone)]
pub struct VariationTable {
    values: Vec<u32>,
}

impl VariationTable {
    pub fn new(size: usize, seed: u64) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        VariationTable {
            values: (0..size.max(1)).map(|_| rng.gen()).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Variant in `0..count` for the cell at `(x, y)` of a map `width` wide.
    pub fn pick(&self, x: i32, y: i32, width: u32, count: u32) -> u32 {
        let i = (y.unsigned_abs() as usize * width as usize + x.unsigned_abs() as usize)
            % self.values.len();
        self.values[i] % count.max(1)
    }
}

#[derive(Debug, Default)]
struct LayerTiles {
    by_id: FxHashMap<String, Arc<TileType>>,
    order: Vec<Arc<TileType>>,
}

/// All tile types known to the process, per layer.
///
/// Built once at startup and then shared (usually behind an `Arc`) by every
/// map, renderer and loader.
#[derive(Debug)]
pub struct TileRegistry {
    layers: [LayerTiles; 4],
    registry_id: u64,
    next_numeric_id: u32,
    variations: VariationTable,
}

impl Default for TileRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl TileRegistry {
    pub fn new() -> Self {
        Self::with_config(&EngineConfig::default())
    }

    /// Empty registry holding only the per-layer empty tiles.
    pub fn with_config(config: &EngineConfig) -> Self {
        let mut registry = TileRegistry {
            layers: Default::default(),
            registry_id: NEXT_REGISTRY_ID.fetch_add(1, Ordering::Relaxed),
            next_numeric_id: 0,
            variations: VariationTable::new(config.variation_table_size, config.variation_seed),
        };
        for layer in Layer::ALL {
            let empty = TileType::new(layer, EMPTY_TILE_ID).untextured();
            // A fresh registry cannot already hold "empty".
            let _ = registry.register(empty);
        }
        registry
    }

    /// Adds `tile` and hands back the shared handle maps will reference.
    pub fn register(&mut self, tile: TileType) -> Result<Arc<TileType>, RegistryError> {
        let layer = tile.layer();
        let tiles = &mut self.layers[layer.index()];
        if tiles.by_id.contains_key(tile.id()) {
            return Err(RegistryError::DuplicateTileId {
                layer,
                id: tile.id().to_owned(),
            });
        }

        let tile = Arc::new(
            tile.in_registry(self.registry_id)
                .with_numeric_id(self.next_numeric_id),
        );
        self.next_numeric_id += 1;
        tiles.by_id.insert(tile.id().to_owned(), tile.clone());
        tiles.order.push(tile.clone());
        Ok(tile)
    }

    pub fn find(&self, layer: Layer, id: &str) -> Option<&Arc<TileType>> {
        self.layers[layer.index()].by_id.get(id)
    }

    /// Lookup by display name as shown in `env`.
    pub fn find_by_name(
        &self,
        layer: Layer,
        name: &str,
        env: Environment,
    ) -> Option<&Arc<TileType>> {
        self.layers[layer.index()]
            .order
            .iter()
            .find(|t| t.name(None, env) == name)
    }

    pub fn empty(&self, layer: Layer) -> &Arc<TileType> {
        &self.layers[layer.index()].order[0]
    }

    /// Tiles of `layer` in registration order, the empty tile first.
    pub fn tiles(&self, layer: Layer) -> &[Arc<TileType>] {
        &self.layers[layer.index()].order
    }

    /// Tiles an editor may offer for a map in `env`.
    pub fn selectable(
        &self,
        layer: Layer,
        env: Environment,
    ) -> impl Iterator<Item = &Arc<TileType>> {
        self.tiles(layer).iter().filter(move |t| t.filter(env))
    }

    pub fn len(&self) -> usize {
        self.layers.iter().map(|l| l.order.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn variations(&self) -> &VariationTable {
        &self.variations
    }

    /// Registry with the standard tile set.
    pub fn builtin() -> Self {
        Self::builtin_with_config(&EngineConfig::default())
    }

    pub fn builtin_with_config(config: &EngineConfig) -> Self {
        let mut r = Self::with_config(config);
        for tile in builtin_tiles() {
            // Ids in the builtin set are unique per layer.
            if let Err(e) = r.register(tile) {
                log::error!("builtin tile set is inconsistent: {e}");
            }
        }
        r
    }
}

fn builtin_tiles() -> Vec<TileType> {
    use Environment::*;
    use Layer::*;

    let soft = || TransitionTexture::Mask("transitions/soft".into());
    let rough = || TransitionTexture::Mask("transitions/rough".into());

    vec![
        // Terrain
        TileType::new(Terrain, "grass")
            .named("Grass")
            .transition(1, soft())
            .in_environment(SnowMountain, Some("Snow"), Some("snow"))
            .in_environment(Desert, Some("Dry Grass"), Some("dry_grass")),
        TileType::new(Terrain, "dirt").named("Dirt").transition(2, soft()),
        TileType::new(Terrain, "sand").named("Sand").transition(3, soft()),
        TileType::new(Terrain, "stone").named("Stone").transition(4, rough()),
        TileType::new(Terrain, "water")
            .named("Water")
            .with_solidity(true)
            .transition(0, TransitionTexture::Color("transitions/water_edge".into()))
            .behavior(DrawBehavior::Animated { fps: 2.0, frame_count: 4 }),
        TileType::new(Terrain, "wood_floor").named("Wooden Floor").only_in(&[Inside]),
        TileType::new(Terrain, "ice")
            .named("Ice")
            .transition(2, rough())
            .only_in(&[SnowMountain, Cave]),
        // Decoration
        TileType::new(Decoration, "flowers")
            .named("Flowers")
            .behavior(DrawBehavior::Variations { count: 4 })
            .except_in(&[Inside, Cave]),
        TileType::new(Decoration, "tree")
            .named("Tree")
            .with_solidity(true)
            .behavior(DrawBehavior::DoubleHeight)
            .in_environment(SnowMountain, Some("Pine"), Some("pine"))
            .except_in(&[Inside]),
        TileType::new(Decoration, "lamp_post")
            .named("Lamp Post")
            .with_solidity(true)
            .behavior(DrawBehavior::OffsetDrawn { offset: vec2(0.0, -1.0) }),
        TileType::new(Decoration, "rock").named("Rock").with_solidity(true),
        TileType::new(Decoration, "fence").named("Fence").with_solidity(true),
        TileType::new(Decoration, "door")
            .named("Door")
            .solid_from_metadata("locked", false),
        TileType::new(Decoration, "painting")
            .named("Painting")
            .metadata_texture("image")
            .only_in(&[Inside]),
        TileType::new(Decoration, "sign").named("Sign").with_solidity(true),
        // NPCs
        TileType::new(Npc, "villager")
            .named("Villager")
            .with_solidity(true)
            .behavior(DrawBehavior::DoubleHeight),
        TileType::new(Npc, "merchant")
            .named("Merchant")
            .with_solidity(true)
            .behavior(DrawBehavior::DoubleHeight),
        TileType::new(Npc, "slime")
            .named("Slime")
            .with_solidity(true)
            .behavior(DrawBehavior::Animated { fps: 4.0, frame_count: 2 }),
        // Control
        TileType::new(Control, "spawn").named("Player Spawn").textured("control/spawn"),
        TileType::new(Control, "waypoint").named("Waypoint").textured("control/waypoint"),
        TileType::new(Control, "portal").named("Portal").textured("control/portal"),
        TileType::new(Control, "blocker")
            .named("Invisible Wall")
            .textured("control/blocker")
            .with_solidity(true),
    ]
}
