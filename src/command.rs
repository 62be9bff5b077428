use crate::layer::Layer;
use crate::render::TextureHandle;
use macroquad::prelude::{Color, Rect};

/// Which page a command samples from, before pages have host textures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureRef {
    Atlas(usize),
    Transition(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawKind {
    Tile,
    Transition,
}

/// One planned quad of a frame, in world pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawCommand {
    pub layer: Layer,
    pub kind: DrawKind,
    pub texture: TextureRef,
    pub src: Rect,
    pub dest: Rect,
    /// Radians, around the centre of `dest`.
    pub rotation: f32,
    pub flip_x: bool,
    pub flip_y: bool,
}

/// A quad as handed to a [`RenderHost`](crate::render::RenderHost).
#[derive(Debug, Clone, PartialEq)]
pub struct DrawQuad {
    pub texture: TextureHandle,
    pub dest: Rect,
    pub source: Rect,
    pub tint: Color,
    pub rotation: f32,
    pub flip_x: bool,
    pub flip_y: bool,
}

/// Inclusive-exclusive range of cells, `x0..x1` by `y0..y1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellRegion {
    pub x0: i32,
    pub y0: i32,
    pub x1: i32,
    pub y1: i32,
}

impl CellRegion {
    pub fn is_empty(&self) -> bool {
        self.x0 >= self.x1 || self.y0 >= self.y1
    }

    /// Row by row, top to bottom.
    pub fn iter(&self) -> impl Iterator<Item = (i32, i32)> {
        let (x0, x1) = (self.x0, self.x1);
        (self.y0..self.y1).flat_map(move |y| (x0..x1).map(move |x| (x, y)))
    }
}
