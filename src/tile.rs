//! Tile types and their draw behaviours.
//!
//! A [`TileType`] is an immutable definition shared by every map through an
//! `Arc`. Behaviour that differs between kinds of tiles (animation, random
//! variations, tall sprites, offset sprites) is a closed [`DrawBehavior`] enum
//! handled in one place by [`TileType::draw`].

use crate::info::Environment;
use crate::layer::Layer;
use crate::map::MapGrid;
use crate::metadata::TileMetadata;
use crate::registry::VariationTable;
use crate::spatial::CellPos;
use macroquad::prelude::{vec2, Vec2};
use rustc_hash::FxHasher;
use std::borrow::Cow;
use std::hash::{Hash, Hasher};

/// Metadata key that lets a single cell opt out of terrain blending.
pub const TRANSITION_KEY: &str = "transition";
/// Metadata key that renames a single cell's tile.
pub const NAME_KEY: &str = "name";

#[derive(Debug, Clone, PartialEq)]
pub enum DrawBehavior {
    Default,
    /// Cycles through `frame_count` textures `"{key}.{frame}"`.
    Animated { fps: f32, frame_count: u32 },
    /// Picks one of `count` textures `"{key}.{variant}"` per cell.
    Variations { count: u32 },
    /// One tile wide, two tall, anchored at its base cell.
    DoubleHeight,
    /// Drawn shifted by `offset` tiles from its cell.
    OffsetDrawn { offset: Vec2 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Solidity {
    Fixed(bool),
    /// Solid according to a boolean metadata value, `default` when unset.
    Metadata { key: String, default: bool },
}

/// Texture used to build the edge this tile bleeds into its neighbours.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TransitionTexture {
    /// Black pixels of the mask keep the tile's own texture.
    Mask(String),
    /// Pre-drawn edge copied as is.
    Color(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum EnvironmentFilter {
    #[default]
    Any,
    Only(Vec<Environment>),
    Except(Vec<Environment>),
}

impl EnvironmentFilter {
    pub fn allows(&self, env: Environment) -> bool {
        match self {
            EnvironmentFilter::Any => true,
            EnvironmentFilter::Only(envs) => envs.contains(&env),
            EnvironmentFilter::Except(envs) => !envs.contains(&env),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
struct EnvironmentOverride {
    environment: Environment,
    name: Option<String>,
    texture: Option<String>,
}

/// Everything a tile needs to plan its draw for one cell.
pub struct DrawContext<'a> {
    pub pos: CellPos,
    pub grid: &'a MapGrid,
    pub metadata: Option<&'a TileMetadata>,
    pub environment: Environment,
    /// Host clock in seconds, shared by every cell in a frame.
    pub time: f64,
    pub variations: &'a VariationTable,
}

/// A planned tile draw, in tile units relative to the cell's top-left.
#[derive(Debug, Clone, PartialEq)]
pub struct TileDraw {
    pub texture_key: String,
    pub offset: Vec2,
    /// `None` draws the texture at its natural pixel size.
    pub size: Option<Vec2>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TileType {
    id: String,
    layer: Layer,
    registry_id: u64,
    numeric_id: u32,
    name: String,
    texture: Option<String>,
    metadata_texture: Option<String>,
    solidity: Solidity,
    transition_priority: i32,
    transition_texture: Option<TransitionTexture>,
    filter: EnvironmentFilter,
    overrides: Vec<EnvironmentOverride>,
    behavior: DrawBehavior,
}

impl TileType {
    /// New non-solid, non-transitioning tile drawn from texture `id`.
    pub fn new(layer: Layer, id: impl Into<String>) -> Self {
        let id = id.into();
        TileType {
            name: id.clone(),
            texture: Some(id.clone()),
            id,
            layer,
            registry_id: 0,
            numeric_id: 0,
            metadata_texture: None,
            solidity: Solidity::Fixed(false),
            transition_priority: -1,
            transition_texture: None,
            filter: EnvironmentFilter::Any,
            overrides: Vec::new(),
            behavior: DrawBehavior::Default,
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn textured(mut self, key: impl Into<String>) -> Self {
        self.texture = Some(key.into());
        self
    }

    pub fn untextured(mut self) -> Self {
        self.texture = None;
        self
    }

    /// Lets a cell replace the texture through metadata `key`. Transition
    /// images of such tiles are cached per metadata content.
    pub fn metadata_texture(mut self, key: impl Into<String>) -> Self {
        self.metadata_texture = Some(key.into());
        self
    }

    pub fn with_solidity(mut self, solid: bool) -> Self {
        self.solidity = Solidity::Fixed(solid);
        self
    }

    pub fn solid_from_metadata(mut self, key: impl Into<String>, default: bool) -> Self {
        self.solidity = Solidity::Metadata { key: key.into(), default };
        self
    }

    pub fn transition(mut self, priority: i32, texture: TransitionTexture) -> Self {
        self.transition_priority = priority;
        self.transition_texture = Some(texture);
        self
    }

    pub fn only_in(mut self, envs: &[Environment]) -> Self {
        self.filter = EnvironmentFilter::Only(envs.to_vec());
        self
    }

    pub fn except_in(mut self, envs: &[Environment]) -> Self {
        self.filter = EnvironmentFilter::Except(envs.to_vec());
        self
    }

    /// Different name and/or texture when the map is in `env`.
    pub fn in_environment(
        mut self,
        env: Environment,
        name: Option<&str>,
        texture: Option<&str>,
    ) -> Self {
        self.overrides.push(EnvironmentOverride {
            environment: env,
            name: name.map(str::to_owned),
            texture: texture.map(str::to_owned),
        });
        self
    }

    pub fn behavior(mut self, behavior: DrawBehavior) -> Self {
        self.behavior = behavior;
        self
    }

    pub(crate) fn with_numeric_id(mut self, numeric_id: u32) -> Self {
        self.numeric_id = numeric_id;
        self
    }

    pub(crate) fn in_registry(mut self, registry_id: u64) -> Self {
        self.registry_id = registry_id;
        self
    }

    /// Registry this tile was registered in; numeric ids only compare
    /// within one registry.
    pub(crate) fn registry_id(&self) -> u64 {
        self.registry_id
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn layer(&self) -> Layer {
        self.layer
    }

    /// Registration order; breaks transition priority ties.
    pub fn numeric_id(&self) -> u32 {
        self.numeric_id
    }

    pub fn draw_behavior(&self) -> &DrawBehavior {
        &self.behavior
    }

    pub fn transition_texture(&self) -> Option<&TransitionTexture> {
        self.transition_texture.as_ref()
    }

    fn env_override(&self, env: Environment) -> Option<&EnvironmentOverride> {
        self.overrides.iter().find(|o| o.environment == env)
    }

    /// Display name; a cell may rename its tile through the `name` metadata key.
    pub fn name<'a>(&'a self, metadata: Option<&'a TileMetadata>, env: Environment) -> &'a str {
        if let Some(name) = metadata.and_then(|m| m.get(NAME_KEY)).filter(|n| !n.is_empty()) {
            return name;
        }
        self.env_override(env)
            .and_then(|o| o.name.as_deref())
            .unwrap_or(&self.name)
    }

    /// Base texture key before any frame or variant suffix.
    pub fn texture_key(
        &self,
        metadata: Option<&TileMetadata>,
        env: Environment,
    ) -> Option<Cow<'_, str>> {
        if let (Some(key), Some(meta)) = (&self.metadata_texture, metadata) {
            if let Some(tex) = meta.get(key).filter(|t| !t.is_empty()) {
                return Some(Cow::Owned(tex.to_owned()));
            }
        }
        self.env_override(env)
            .and_then(|o| o.texture.as_deref())
            .or(self.texture.as_deref())
            .map(Cow::Borrowed)
    }

    pub fn solid(&self, metadata: Option<&TileMetadata>) -> bool {
        match &self.solidity {
            Solidity::Fixed(solid) => *solid,
            Solidity::Metadata { key, default } => metadata
                .and_then(|m| m.get_bool(key))
                .unwrap_or(*default),
        }
    }

    pub fn transition_priority(&self, metadata: Option<&TileMetadata>) -> i32 {
        if metadata.and_then(|m| m.get_bool(TRANSITION_KEY)) == Some(false) {
            return -1;
        }
        self.transition_priority
    }

    /// Whether this tile may appear (and be selected) in `env`.
    pub fn filter(&self, env: Environment) -> bool {
        self.filter.allows(env)
    }

    /// Whether this tile, sitting at `from`, bleeds into `other` at `to`.
    ///
    /// Only terrain transitions. Higher priority wins; equal priorities fall
    /// back to the higher numeric id, so for two different tiles at most one
    /// direction ever holds. `-1` on either side disables blending. The map's
    /// environment filter plays no part: a tile that got onto the map blends.
    pub fn use_transition(
        &self,
        from: CellPos,
        to: CellPos,
        _grid: &MapGrid,
        other: &TileType,
        metadata: Option<&TileMetadata>,
        other_metadata: Option<&TileMetadata>,
    ) -> bool {
        debug_assert_eq!((from.x - to.x).abs() + (from.y - to.y).abs(), 1);

        if self.layer != Layer::Terrain || other.layer != Layer::Terrain {
            return false;
        }
        if self.numeric_id == other.numeric_id || self.transition_texture.is_none() {
            return false;
        }
        let mine = self.transition_priority(metadata);
        let theirs = other.transition_priority(other_metadata);
        if mine < 0 || theirs < 0 {
            return false;
        }
        theirs < mine || (theirs == mine && other.numeric_id < self.numeric_id)
    }

    /// Key of the texture transition images are cut from: the first frame or
    /// variant for tiles that have several.
    pub fn transition_source_key(
        &self,
        metadata: Option<&TileMetadata>,
        env: Environment,
    ) -> Option<String> {
        let base = self.texture_key(metadata, env)?;
        Some(match self.behavior {
            DrawBehavior::Animated { .. } | DrawBehavior::Variations { .. } => format!("{base}.0"),
            _ => base.into_owned(),
        })
    }

    /// Cache identity of this tile's transition image. Metadata only takes
    /// part when it can change the texture.
    pub fn transition_identity(&self, metadata: Option<&TileMetadata>, env: Environment) -> u64 {
        let mut h = FxHasher::default();
        self.numeric_id.hash(&mut h);
        self.layer.hash(&mut h);
        env.hash(&mut h);
        if self.metadata_texture.is_some() {
            metadata.map(TileMetadata::content_hash).unwrap_or(0).hash(&mut h);
        }
        h.finish()
    }

    /// Plans how this tile is drawn at `ctx.pos`. `None` when there is
    /// nothing to draw.
    pub fn draw(&self, ctx: &DrawContext<'_>) -> Option<TileDraw> {
        let base = self.texture_key(ctx.metadata, ctx.environment)?;

        let (texture_key, offset, size) = match &self.behavior {
            DrawBehavior::Default => (base.into_owned(), Vec2::ZERO, None),
            DrawBehavior::Animated { fps, frame_count } => {
                let frame = animation_frame(ctx.time, *fps, *frame_count);
                (format!("{base}.{frame}"), Vec2::ZERO, None)
            }
            DrawBehavior::Variations { count } => {
                let variant = ctx
                    .variations
                    .pick(ctx.pos.x, ctx.pos.y, ctx.grid.width(), *count);
                (format!("{base}.{variant}"), Vec2::ZERO, None)
            }
            DrawBehavior::DoubleHeight => {
                (base.into_owned(), vec2(0.0, -1.0), Some(vec2(1.0, 2.0)))
            }
            DrawBehavior::OffsetDrawn { offset } => (base.into_owned(), *offset, None),
        };

        Some(TileDraw {
            texture_key,
            offset,
            size,
        })
    }
}

/// `floor(time * fps) mod frame_count`, the same for every caller sharing a
/// clock.
pub fn animation_frame(time: f64, fps: f32, frame_count: u32) -> u32 {
    let frames = frame_count.max(1) as i64;
    ((time * fps as f64).floor() as i64).rem_euclid(frames) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frames_advance_with_time_and_wrap() {
        assert_eq!(animation_frame(0.0, 4.0, 3), 0);
        assert_eq!(animation_frame(0.26, 4.0, 3), 1);
        assert_eq!(animation_frame(0.5, 4.0, 3), 2);
        assert_eq!(animation_frame(0.75, 4.0, 3), 0);
        assert_eq!(animation_frame(10.0, 2.0, 0), 0);
    }

    #[test]
    fn environment_override_changes_name_and_texture() {
        let t = TileType::new(Layer::Terrain, "grass")
            .named("Grass")
            .in_environment(Environment::SnowMountain, Some("Snow"), Some("snow"));
        assert_eq!(t.name(None, Environment::Forest), "Grass");
        assert_eq!(t.name(None, Environment::SnowMountain), "Snow");
        assert_eq!(t.texture_key(None, Environment::Forest).as_deref(), Some("grass"));
        assert_eq!(t.texture_key(None, Environment::SnowMountain).as_deref(), Some("snow"));
    }

    #[test]
    fn metadata_texture_wins_when_set() {
        let t = TileType::new(Layer::Decoration, "painting").metadata_texture("image");
        let m = TileMetadata::new().with("image", "sunset");
        assert_eq!(t.texture_key(Some(&m), Environment::Inside).as_deref(), Some("sunset"));
        let blank = TileMetadata::new().with("image", "");
        assert_eq!(t.texture_key(Some(&blank), Environment::Inside).as_deref(), Some("painting"));
    }

    #[test]
    fn solidity_can_follow_metadata() {
        let door = TileType::new(Layer::Decoration, "door").solid_from_metadata("locked", true);
        assert!(door.solid(None));
        assert!(!door.solid(Some(&TileMetadata::new().with("locked", "false"))));
        assert!(door.solid(Some(&TileMetadata::new().with("locked", "true"))));
    }

    #[test]
    fn metadata_can_opt_a_cell_out_of_blending() {
        let t = TileType::new(Layer::Terrain, "stone")
            .transition(3, TransitionTexture::Mask("m".into()));
        assert_eq!(t.transition_priority(None), 3);
        let off = TileMetadata::new().with(TRANSITION_KEY, "false");
        assert_eq!(t.transition_priority(Some(&off)), -1);
    }

    #[test]
    fn environment_filter() {
        let t = TileType::new(Layer::Decoration, "rug").only_in(&[Environment::Inside]);
        assert!(t.filter(Environment::Inside));
        assert!(!t.filter(Environment::Forest));
        let t = TileType::new(Layer::Decoration, "bush").except_in(&[Environment::Inside]);
        assert!(!t.filter(Environment::Inside));
        assert!(t.filter(Environment::Desert));
    }

    #[test]
    fn identity_depends_on_metadata_only_for_metadata_textures() {
        let plain = TileType::new(Layer::Terrain, "grass").with_numeric_id(5);
        let a = TileMetadata::new().with("k", "1");
        let b = TileMetadata::new().with("k", "2");
        let env = Environment::Forest;
        assert_eq!(
            plain.transition_identity(Some(&a), env),
            plain.transition_identity(Some(&b), env)
        );
        assert_ne!(
            plain.transition_identity(None, env),
            plain.transition_identity(None, Environment::Desert)
        );

        let painted = TileType::new(Layer::Terrain, "paint")
            .metadata_texture("k")
            .with_numeric_id(6);
        assert_ne!(
            painted.transition_identity(Some(&a), env),
            painted.transition_identity(Some(&b), env)
        );
    }

    #[test]
    fn transition_source_uses_first_frame() {
        let water = TileType::new(Layer::Terrain, "water")
            .behavior(DrawBehavior::Animated { fps: 2.0, frame_count: 4 });
        let key = water.transition_source_key(None, Environment::Forest);
        assert_eq!(key.as_deref(), Some("water.0"));
        let stone = TileType::new(Layer::Terrain, "stone");
        let key = stone.transition_source_key(None, Environment::Forest);
        assert_eq!(key.as_deref(), Some("stone"));
    }
}
