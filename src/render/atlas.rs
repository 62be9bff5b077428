//! Shelf-packed texture pages.
//!
//! Textures are packed in the order they are first requested: left to right
//! along a shelf, a new shelf when the row is full, a new page when the page
//! is full. Regions never move once handed out.

use super::pixels;
use super::source::TextureSource;
use super::{RenderHost, TextureHandle};
use macroquad::prelude::{Image, Rect};
use rustc_hash::FxHashMap;

/// Where a texture lives: a page and a pixel rectangle on it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AtlasRegion {
    pub page: usize,
    pub rect: Rect,
}

pub(crate) struct Page {
    pub(crate) image: Image,
    pub(crate) handle: Option<TextureHandle>,
    pub(crate) dirty: bool,
}

impl Page {
    pub(crate) fn new(width: u32, height: u32) -> Self {
        Page {
            image: pixels::blank(width, height),
            handle: None,
            dirty: true,
        }
    }

    /// Uploads a new page or re-uploads a changed one.
    pub(crate) fn flush(&mut self, host: &mut dyn RenderHost) {
        if !self.dirty {
            return;
        }
        match self.handle {
            Some(handle) => host.update_texture(handle, &self.image),
            None => self.handle = Some(host.upload_texture(&self.image)),
        }
        self.dirty = false;
    }

    pub(crate) fn release(&mut self, host: &mut dyn RenderHost) {
        if let Some(handle) = self.handle.take() {
            host.free_texture(handle);
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct Shelf {
    page: usize,
    x: u32,
    y: u32,
    height: u32,
}

pub struct TextureAtlas {
    page_size: u32,
    pages: Vec<Page>,
    /// Open shelf of the last shared page, if any.
    shelf: Option<Shelf>,
    regions: FxHashMap<String, Option<AtlasRegion>>,
}

impl TextureAtlas {
    pub fn new(page_size: u32) -> Self {
        TextureAtlas {
            page_size: page_size.max(1),
            pages: Vec::new(),
            shelf: None,
            regions: FxHashMap::default(),
        }
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Number of keys looked up so far, misses included.
    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    /// Region of `key`, loading and packing the texture on first use. A
    /// missing texture is remembered and not asked for again. Once packed,
    /// the source is told to drop its copy.
    pub fn region(&mut self, key: &str, source: &mut dyn TextureSource) -> Option<AtlasRegion> {
        if let Some(found) = self.regions.get(key) {
            return *found;
        }
        let region = match source.load(key) {
            Some(image) => {
                let region = self.pack(&image);
                source.release(key);
                Some(region)
            }
            None => {
                log::warn!("texture '{key}' not found");
                None
            }
        };
        self.regions.insert(key.to_owned(), region);
        region
    }

    /// Region of `key` if it was already packed.
    pub fn cached(&self, key: &str) -> Option<AtlasRegion> {
        self.regions.get(key).copied().flatten()
    }

    /// Packs `image` under `key`, replacing nothing: a key that is already
    /// known keeps its old region.
    pub fn insert(&mut self, key: &str, image: &Image) -> Option<AtlasRegion> {
        if let Some(found) = self.regions.get(key) {
            return *found;
        }
        let region = self.pack(image);
        self.regions.insert(key.to_owned(), Some(region));
        Some(region)
    }

    fn pack(&mut self, image: &Image) -> AtlasRegion {
        let (w, h) = (image.width as u32, image.height as u32);
        let size = self.page_size;

        if w > size || h > size {
            let page = self.pages.len();
            let mut dedicated = Page::new(w, h);
            pixels::blit(&mut dedicated.image, image, 0, 0);
            self.pages.push(dedicated);
            log::debug!("texture of {w}x{h} gets its own atlas page {page}");
            return AtlasRegion {
                page,
                rect: Rect::new(0.0, 0.0, w as f32, h as f32),
            };
        }

        let mut shelf = match self.shelf {
            Some(s) => s,
            None => self.open_page(),
        };
        if shelf.x + w > size {
            shelf = Shelf {
                x: 0,
                y: shelf.y + shelf.height,
                height: 0,
                ..shelf
            };
        }
        if shelf.y + h > size {
            shelf = self.open_page();
        }

        let page = &mut self.pages[shelf.page];
        pixels::blit(&mut page.image, image, shelf.x, shelf.y);
        page.dirty = true;

        let region = AtlasRegion {
            page: shelf.page,
            rect: Rect::new(shelf.x as f32, shelf.y as f32, w as f32, h as f32),
        };
        shelf.x += w;
        shelf.height = shelf.height.max(h);
        self.shelf = Some(shelf);
        region
    }

    fn open_page(&mut self) -> Shelf {
        let page = self.pages.len();
        self.pages.push(Page::new(self.page_size, self.page_size));
        log::debug!("allocated atlas page {page} ({0}x{0})", self.page_size);
        Shelf {
            page,
            ..Shelf::default()
        }
    }

    /// CPU copy of a packed region.
    pub fn pixels(&self, region: AtlasRegion) -> Option<Image> {
        let page = self.pages.get(region.page)?;
        Some(pixels::crop(&page.image, region.rect))
    }

    pub fn page_handle(&self, page: usize) -> Option<TextureHandle> {
        self.pages.get(page).and_then(|p| p.handle)
    }

    pub fn flush(&mut self, host: &mut dyn RenderHost) {
        for page in &mut self.pages {
            page.flush(host);
        }
    }

    /// Frees every page texture and forgets every region.
    pub fn clear(&mut self, host: &mut dyn RenderHost) {
        for page in &mut self.pages {
            page.release(host);
        }
        self.pages.clear();
        self.shelf = None;
        self.regions.clear();
    }
}
