//! Layered tile maps for Macroquad: packed four-layer grids, shared tile
//! types with per-cell metadata, generated terrain transitions, atlas-backed
//! rendering and a versioned JSON map format with background load/save.

mod command;
mod config;
mod error;
mod info;
mod ir_map;
mod layer;
pub mod loader;
mod map;
mod metadata;
mod registry;
pub mod render;
pub mod spatial;
mod tile;
mod worker;

pub use command::{CellRegion, DrawCommand, DrawKind, DrawQuad, TextureRef};
pub use config::EngineConfig;
pub use error::{GridError, MapError, ReadStage, RegistryError, TaskError};
pub use info::{Environment, MapInfo, UnknownVariant, Weather};
pub use ir_map::{IrCell, IrMap, LoadReport, MapFormat, UnknownTile};
pub use layer::Layer;
pub use loader::{load_map_file, load_map_str, save_map_file, save_map_string, MAP_FORMAT_VERSION};
pub use map::MapGrid;
pub use metadata::TileMetadata;
pub use registry::{TileRegistry, VariationTable, EMPTY_TILE_ID};
pub use render::atlas::{AtlasRegion, TextureAtlas};
pub use render::source::{DirectoryTextureSource, MemoryTextureSource, TextureSource};
pub use render::transition::{CachedTransition, TransitionCache};
pub use render::{
    build_draw_commands, render_map, submit, ContextId, MacroquadHost, RenderHost, RenderResources,
    TextureHandle,
};
pub use spatial::{CellPos, Direction, PackedCell};
pub use tile::{
    animation_frame, DrawBehavior, DrawContext, EnvironmentFilter, Solidity, TileDraw, TileType,
    TransitionTexture, NAME_KEY, TRANSITION_KEY,
};
pub use worker::{MapDocument, TaskKind, TaskOutcome, TaskStatus};
