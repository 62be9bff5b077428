//! Turning a [`MapGrid`] into textured quads.
//!
//! The renderer never talks to the GPU directly: it plans [`DrawCommand`]s,
//! uploads changed atlas and transition pages through a [`RenderHost`], and
//! then submits one [`DrawQuad`] per command. [`MacroquadHost`] is the host
//! used in a running game; tests use a recording host.

pub mod atlas;
pub mod cull;
pub mod macroquad_host;
pub mod pixels;
pub mod source;
pub mod transition;

use crate::command::{CellRegion, DrawCommand, DrawKind, DrawQuad, TextureRef};
use crate::config::EngineConfig;
use crate::layer::Layer;
use crate::map::MapGrid;
use crate::registry::TileRegistry;
use crate::spatial::{CellPos, Direction};
use crate::tile::DrawContext;
use atlas::TextureAtlas;
use macroquad::prelude::{vec2, Image, Rect, WHITE};
use source::TextureSource;
use transition::TransitionCache;

pub use macroquad_host::MacroquadHost;

/// Opaque id of a texture owned by a [`RenderHost`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureHandle(pub u64);

/// Identifies the graphics context textures were created in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContextId(pub u64);

/// What the renderer needs from the platform.
pub trait RenderHost {
    fn upload_texture(&mut self, image: &Image) -> TextureHandle;
    fn update_texture(&mut self, handle: TextureHandle, image: &Image);
    fn free_texture(&mut self, handle: TextureHandle);
    fn draw_quad(&mut self, quad: &DrawQuad);
    /// Seconds since start; drives animations.
    fn current_time(&self) -> f64;
    fn context_id(&self) -> ContextId;
}

/// Atlas and transition cache of one graphics context.
pub struct RenderResources {
    tile_size: u32,
    context: Option<ContextId>,
    pub atlas: TextureAtlas,
    pub transitions: TransitionCache,
}

impl RenderResources {
    pub fn new(config: &EngineConfig) -> Self {
        RenderResources {
            tile_size: config.tile_size.max(1),
            context: None,
            atlas: TextureAtlas::new(config.atlas_page_size),
            transitions: TransitionCache::new(config.tile_size, config.transition_page_size),
        }
    }

    pub fn tile_size(&self) -> u32 {
        self.tile_size
    }

    pub fn context(&self) -> Option<ContextId> {
        self.context
    }

    /// Makes `context` current. Switching from another context drops every
    /// page, so textures are rebuilt in the new one.
    pub fn bind_context(&mut self, context: ContextId, host: &mut dyn RenderHost) {
        match self.context {
            Some(current) if current == context => {}
            Some(previous) => {
                log::info!(
                    "render context changed from {previous:?} to {context:?}; clearing caches"
                );
                self.clear(host);
                self.context = Some(context);
            }
            None => self.context = Some(context),
        }
    }

    pub fn clear(&mut self, host: &mut dyn RenderHost) {
        self.atlas.clear(host);
        self.transitions.clear(host);
    }

    /// Uploads new pages and re-uploads changed ones.
    pub fn flush(&mut self, host: &mut dyn RenderHost) {
        self.atlas.flush(host);
        self.transitions.flush(host);
    }

    pub fn handle(&self, texture: TextureRef) -> Option<TextureHandle> {
        match texture {
            TextureRef::Atlas(page) => self.atlas.page_handle(page),
            TextureRef::Transition(page) => self.transitions.page_handle(page),
        }
    }
}

/// Plans the draws of every layer inside `view` (world pixels, the whole map
/// when `None`), bottom layer first and row by row within a layer.
///
/// Terrain transitions into a cell follow that cell's own tile, weakest
/// first so the strongest neighbour ends up on top.
pub fn build_draw_commands(
    grid: &MapGrid,
    registry: &TileRegistry,
    res: &mut RenderResources,
    source: &mut dyn TextureSource,
    view: Option<Rect>,
    time: f64,
) -> Vec<DrawCommand> {
    let ts = res.tile_size as f32;
    let region = match view {
        Some(r) => cull::visible_cells_rect(
            r.point(),
            r.point() + r.size(),
            ts,
            grid.width(),
            grid.height(),
        ),
        None => CellRegion {
            x0: 0,
            y0: 0,
            x1: grid.width() as i32,
            y1: grid.height() as i32,
        },
    };

    let env = grid.environment();
    let mut commands = Vec::new();
    let mut pending = Vec::new();

    for layer in Layer::ALL {
        for (x, y) in region.iter() {
            let Some(tile) = grid.get(layer, x, y) else {
                continue;
            };
            let pos = CellPos::new(x, y);
            let metadata = grid.metadata(layer, x, y);

            let ctx = DrawContext {
                pos,
                grid,
                metadata,
                environment: env,
                time,
                variations: registry.variations(),
            };
            if let Some(draw) = tile.draw(&ctx) {
                if let Some(found) = res.atlas.region(&draw.texture_key, source) {
                    let size = draw
                        .size
                        .map(|s| s * ts)
                        .unwrap_or(vec2(found.rect.w, found.rect.h));
                    commands.push(DrawCommand {
                        layer,
                        kind: DrawKind::Tile,
                        texture: TextureRef::Atlas(found.page),
                        src: found.rect,
                        dest: Rect::new(
                            (x as f32 + draw.offset.x) * ts,
                            (y as f32 + draw.offset.y) * ts,
                            size.x,
                            size.y,
                        ),
                        rotation: 0.0,
                        flip_x: false,
                        flip_y: false,
                    });
                }
            }

            if layer != Layer::Terrain {
                continue;
            }
            for dir in Direction::ALL {
                let from = pos.step(dir);
                let Some(other) = grid.get(layer, from.x, from.y) else {
                    continue;
                };
                let other_metadata = grid.metadata(layer, from.x, from.y);
                if !other.use_transition(from, pos, grid, tile, other_metadata, metadata) {
                    continue;
                }
                let cached = res
                    .transitions
                    .texture_for(other, other_metadata, env, &mut res.atlas, source);
                let Some(cached) = cached else {
                    continue;
                };
                let (rotation, flip_x, flip_y) = dir.orientation();
                pending.push((
                    other.transition_priority(other_metadata),
                    other.numeric_id(),
                    DrawCommand {
                        layer,
                        kind: DrawKind::Transition,
                        texture: TextureRef::Transition(cached.page),
                        src: cached.rect,
                        dest: Rect::new(x as f32 * ts, y as f32 * ts, ts, ts),
                        rotation,
                        flip_x,
                        flip_y,
                    },
                ));
            }
            pending.sort_by_key(|(priority, id, _)| (*priority, *id));
            commands.extend(pending.drain(..).map(|(_, _, cmd)| cmd));
        }
    }
    commands
}

/// Hands planned commands to `host`. Returns how many quads were drawn.
pub fn submit(commands: &[DrawCommand], res: &RenderResources, host: &mut dyn RenderHost) -> usize {
    let mut drawn = 0;
    for cmd in commands {
        let Some(texture) = res.handle(cmd.texture) else {
            log::debug!("skipping draw from {:?}: page not uploaded", cmd.texture);
            continue;
        };
        host.draw_quad(&DrawQuad {
            texture,
            dest: cmd.dest,
            source: cmd.src,
            tint: WHITE,
            rotation: cmd.rotation,
            flip_x: cmd.flip_x,
            flip_y: cmd.flip_y,
        });
        drawn += 1;
    }
    drawn
}

/// One frame: bind the host's context, plan, upload pages, draw.
pub fn render_map(
    grid: &MapGrid,
    registry: &TileRegistry,
    res: &mut RenderResources,
    source: &mut dyn TextureSource,
    host: &mut dyn RenderHost,
    view: Option<Rect>,
) -> usize {
    res.bind_context(host.context_id(), host);
    let commands = build_draw_commands(grid, registry, res, source, view, host.current_time());
    res.flush(host);
    submit(&commands, res, host)
}
