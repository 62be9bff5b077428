use super::{ContextId, RenderHost, TextureHandle};
use crate::command::DrawQuad;
use macroquad::prelude::*;
use rustc_hash::FxHashMap;

/// [`RenderHost`] backed by the current macroquad window.
pub struct MacroquadHost {
    context: ContextId,
    next_handle: u64,
    textures: FxHashMap<TextureHandle, Texture2D>,
}

impl Default for MacroquadHost {
    fn default() -> Self {
        Self::new()
    }
}

impl MacroquadHost {
    pub fn new() -> Self {
        Self::with_context(ContextId(0))
    }

    /// Host for a context other than the first window, e.g. after the
    /// application recreated its window.
    pub fn with_context(context: ContextId) -> Self {
        MacroquadHost {
            context,
            next_handle: 0,
            textures: FxHashMap::default(),
        }
    }

    pub fn texture(&self, handle: TextureHandle) -> Option<&Texture2D> {
        self.textures.get(&handle)
    }
}

impl RenderHost for MacroquadHost {
    fn upload_texture(&mut self, image: &Image) -> TextureHandle {
        let tex = Texture2D::from_image(image);
        tex.set_filter(FilterMode::Nearest);
        let handle = TextureHandle(self.next_handle);
        self.next_handle += 1;
        self.textures.insert(handle, tex);
        handle
    }

    fn update_texture(&mut self, handle: TextureHandle, image: &Image) {
        match self.textures.get(&handle) {
            Some(tex) => tex.update(image),
            None => log::warn!("update of unknown texture {handle:?}"),
        }
    }

    fn free_texture(&mut self, handle: TextureHandle) {
        // Texture2D frees the GPU texture when the last clone drops.
        self.textures.remove(&handle);
    }

    fn draw_quad(&mut self, quad: &DrawQuad) {
        let Some(tex) = self.textures.get(&quad.texture) else {
            return;
        };
        draw_texture_ex(
            tex,
            quad.dest.x,
            quad.dest.y,
            quad.tint,
            DrawTextureParams {
                dest_size: Some(vec2(quad.dest.w, quad.dest.h)),
                source: Some(quad.source),
                rotation: quad.rotation,
                flip_x: quad.flip_x,
                flip_y: quad.flip_y,
                ..Default::default()
            },
        );
    }

    fn current_time(&self) -> f64 {
        get_time()
    }

    fn context_id(&self) -> ContextId {
        self.context
    }
}
