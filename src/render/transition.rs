//! Generated edge images for terrain blending.
//!
//! Every image is built once per transition identity, in the orientation
//! where the blending tile sits above the cell it bleeds into, and stored in
//! a tile-size slot of a shared page. The renderer rotates or flips it for
//! the other three sides.

use super::atlas::{Page, TextureAtlas};
use super::pixels::{self, MaskBits};
use super::source::TextureSource;
use super::{RenderHost, TextureHandle};
use crate::info::Environment;
use crate::metadata::TileMetadata;
use crate::tile::{TileType, TransitionTexture};
use macroquad::prelude::{Image, Rect};
use rustc_hash::FxHashMap;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CachedTransition {
    pub page: usize,
    pub rect: Rect,
}

pub struct TransitionCache {
    tile_size: u32,
    page_size: u32,
    pages: Vec<Page>,
    next_slot: usize,
    entries: FxHashMap<u64, Option<CachedTransition>>,
    masks: FxHashMap<String, Option<MaskBits>>,
}

impl TransitionCache {
    pub fn new(tile_size: u32, page_size: u32) -> Self {
        let tile_size = tile_size.max(1);
        TransitionCache {
            tile_size,
            page_size: page_size.max(tile_size),
            pages: Vec::new(),
            next_slot: 0,
            entries: FxHashMap::default(),
            masks: FxHashMap::default(),
        }
    }

    fn slots_per_row(&self) -> usize {
        (self.page_size / self.tile_size) as usize
    }

    fn slots_per_page(&self) -> usize {
        self.slots_per_row() * self.slots_per_row()
    }

    /// Identities seen so far, failures included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn page_handle(&self, page: usize) -> Option<TextureHandle> {
        self.pages.get(page).and_then(|p| p.handle)
    }

    /// Transition image of `tile` as seen with `metadata` in `env`, built on
    /// first request. `None` (also remembered) when the tile has no
    /// transition texture or its pixels cannot be found.
    pub fn texture_for(
        &mut self,
        tile: &TileType,
        metadata: Option<&TileMetadata>,
        env: Environment,
        atlas: &mut TextureAtlas,
        source: &mut dyn TextureSource,
    ) -> Option<CachedTransition> {
        let identity = tile.transition_identity(metadata, env);
        if let Some(found) = self.entries.get(&identity) {
            return *found;
        }

        let entry = self
            .synthesize(tile, metadata, env, atlas, source)
            .map(|image| self.store(&image));
        if entry.is_none() {
            log::warn!("no transition image for tile '{}' in {env:?}", tile.id());
        }
        self.entries.insert(identity, entry);
        entry
    }

    fn synthesize(
        &mut self,
        tile: &TileType,
        metadata: Option<&TileMetadata>,
        env: Environment,
        atlas: &mut TextureAtlas,
        source: &mut dyn TextureSource,
    ) -> Option<Image> {
        let ts = self.tile_size;
        match tile.transition_texture()? {
            TransitionTexture::Mask(mask_key) => {
                let key = tile.transition_source_key(metadata, env)?;
                let region = atlas.region(&key, source)?;
                let own = pixels::resized(&atlas.pixels(region)?, ts, ts);
                let mask = self.mask(mask_key, source)?;
                Some(pixels::apply_mask(&own, mask))
            }
            TransitionTexture::Color(key) => {
                let region = atlas.region(key, source)?;
                Some(pixels::resized(&atlas.pixels(region)?, ts, ts))
            }
        }
    }

    /// Mask bits for `key`. The source image is released once its bits are
    /// kept.
    fn mask(&mut self, key: &str, source: &mut dyn TextureSource) -> Option<&MaskBits> {
        if !self.masks.contains_key(key) {
            let bits = source.load(key).map(|image| {
                source.release(key);
                MaskBits::from_image(&image)
            });
            if bits.is_none() {
                log::warn!("transition mask '{key}' not found");
            }
            self.masks.insert(key.to_owned(), bits);
        }
        self.masks.get(key).and_then(Option::as_ref)
    }

    fn store(&mut self, image: &Image) -> CachedTransition {
        let per_page = self.slots_per_page();
        let per_row = self.slots_per_row();
        let page = self.next_slot / per_page;
        let in_page = self.next_slot % per_page;
        self.next_slot += 1;

        if page == self.pages.len() {
            self.pages.push(Page::new(self.page_size, self.page_size));
            log::debug!("allocated transition page {page}");
        }

        let ts = self.tile_size;
        let (x, y) = ((in_page % per_row) as u32 * ts, (in_page / per_row) as u32 * ts);
        let p = &mut self.pages[page];
        pixels::blit(&mut p.image, image, x, y);
        p.dirty = true;

        CachedTransition {
            page,
            rect: Rect::new(x as f32, y as f32, ts as f32, ts as f32),
        }
    }

    /// CPU copy of a cached image.
    pub fn pixels(&self, entry: CachedTransition) -> Option<Image> {
        let page = self.pages.get(entry.page)?;
        Some(pixels::crop(&page.image, entry.rect))
    }

    pub fn flush(&mut self, host: &mut dyn RenderHost) {
        for page in &mut self.pages {
            page.flush(host);
        }
    }

    /// Frees every page texture and forgets every cached image and mask.
    pub fn clear(&mut self, host: &mut dyn RenderHost) {
        for page in &mut self.pages {
            page.release(host);
        }
        self.pages.clear();
        self.next_slot = 0;
        self.entries.clear();
        self.masks.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layer::Layer;
    use crate::render::source::MemoryTextureSource;

    const RED: [u8; 4] = [255, 0, 0, 255];
    const BLACK: [u8; 4] = [0, 0, 0, 255];

    fn filled(w: u32, h: u32, px: [u8; 4]) -> Image {
        let mut img = pixels::blank(w, h);
        for y in 0..h {
            for x in 0..w {
                pixels::put_pixel(&mut img, x, y, px);
            }
        }
        img
    }

    /// 4x4 mask, top half black.
    fn top_mask() -> Image {
        let mut img = pixels::blank(4, 4);
        for y in 0..2 {
            for x in 0..4 {
                pixels::put_pixel(&mut img, x, y, BLACK);
            }
        }
        img
    }

    fn stone() -> TileType {
        TileType::new(Layer::Terrain, "stone").transition(4, TransitionTexture::Mask("mask".into()))
    }

    #[test]
    fn mask_keeps_own_pixels_where_black() {
        let mut src = MemoryTextureSource::new()
            .with("stone", filled(4, 4, RED))
            .with("mask", top_mask());
        let mut atlas = TextureAtlas::new(64);
        let mut cache = TransitionCache::new(4, 16);

        let entry = cache
            .texture_for(&stone(), None, Environment::Forest, &mut atlas, &mut src)
            .unwrap();
        let image = cache.pixels(entry).unwrap();
        assert_eq!(pixels::pixel(&image, 2, 1), RED);
        assert_eq!(pixels::pixel(&image, 2, 2), [0, 0, 0, 0]);
        assert_eq!(src.released(), ["stone".to_string(), "mask".to_string()]);
    }

    #[test]
    fn same_identity_is_built_once() {
        let mut src = MemoryTextureSource::new()
            .with("stone", filled(4, 4, RED))
            .with("mask", top_mask());
        let mut atlas = TextureAtlas::new(64);
        let mut cache = TransitionCache::new(4, 16);
        let tile = stone();

        let a = cache.texture_for(&tile, None, Environment::Forest, &mut atlas, &mut src);
        let b = cache.texture_for(&tile, None, Environment::Forest, &mut atlas, &mut src);
        assert_eq!(a, b);
        assert_eq!(cache.len(), 1);
        assert_eq!(src.load_count("mask"), 1);
    }

    #[test]
    fn slots_fill_row_major_then_spill_to_a_new_page() {
        let mut src = MemoryTextureSource::new().with("mask", top_mask());
        let mut atlas = TextureAtlas::new(64);
        // 8x8 page of 4px tiles: 4 slots.
        let mut cache = TransitionCache::new(4, 8);
        let mut rects = Vec::new();
        for i in 0..5 {
            let id = format!("t{i}");
            src.insert(id.clone(), filled(4, 4, RED));
            let tile = TileType::new(Layer::Terrain, id)
                .transition(1, TransitionTexture::Mask("mask".into()))
                .with_numeric_id(i + 10);
            let e = cache
                .texture_for(&tile, None, Environment::Forest, &mut atlas, &mut src)
                .unwrap();
            rects.push((e.page, e.rect.x, e.rect.y));
        }
        assert_eq!(
            rects,
            [(0, 0.0, 0.0), (0, 4.0, 0.0), (0, 0.0, 4.0), (0, 4.0, 4.0), (1, 0.0, 0.0)]
        );
        assert_eq!(cache.page_count(), 2);
    }

    #[test]
    fn failures_are_remembered() {
        let mut src = MemoryTextureSource::new().with("mask", top_mask());
        let mut atlas = TextureAtlas::new(64);
        let mut cache = TransitionCache::new(4, 16);
        let tile = stone();
        let env = Environment::Forest;
        assert!(cache.texture_for(&tile, None, env, &mut atlas, &mut src).is_none());
        assert!(cache.texture_for(&tile, None, env, &mut atlas, &mut src).is_none());
        assert_eq!(src.load_count("stone"), 1);
    }

    #[test]
    fn color_texture_is_copied_verbatim() {
        let water = TileType::new(Layer::Terrain, "water")
            .transition(0, TransitionTexture::Color("edge".into()));
        let mut src = MemoryTextureSource::new().with("edge", filled(4, 4, [1, 2, 3, 200]));
        let mut atlas = TextureAtlas::new(64);
        let mut cache = TransitionCache::new(4, 16);
        let e = cache
            .texture_for(&water, None, Environment::Forest, &mut atlas, &mut src)
            .unwrap();
        assert_eq!(pixels::pixel(&cache.pixels(e).unwrap(), 3, 3), [1, 2, 3, 200]);
    }
}
