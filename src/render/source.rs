use anyhow::Context;
use macroquad::prelude::Image;
use rustc_hash::FxHashMap;
use std::path::{Path, PathBuf};

/// Where the atlas and transition cache get their pixels from.
pub trait TextureSource {
    /// Decoded image for `key`, `None` when there is none.
    fn load(&mut self, key: &str) -> Option<Image>;

    /// Tells the source that `key` will not be requested again, so it may drop
    /// any copy it keeps.
    fn release(&mut self, _key: &str) {}
}

/// Images supplied up front. Keeps everything it was given; releases are only
/// recorded.
#[derive(Default)]
pub struct MemoryTextureSource {
    images: FxHashMap<String, Image>,
    loads: FxHashMap<String, usize>,
    released: Vec<String>,
}

impl MemoryTextureSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, image: Image) {
        self.images.insert(key.into(), image);
    }

    pub fn with(mut self, key: impl Into<String>, image: Image) -> Self {
        self.insert(key, image);
        self
    }

    /// How many times `key` was requested.
    pub fn load_count(&self, key: &str) -> usize {
        self.loads.get(key).copied().unwrap_or(0)
    }

    pub fn released(&self) -> &[String] {
        &self.released
    }
}

impl TextureSource for MemoryTextureSource {
    fn load(&mut self, key: &str) -> Option<Image> {
        *self.loads.entry(key.to_owned()).or_default() += 1;
        self.images.get(key).cloned()
    }

    fn release(&mut self, key: &str) {
        self.released.push(key.to_owned());
    }
}

/// PNG files under a root directory, `<root>/<key>.png`.
pub struct DirectoryTextureSource {
    root: PathBuf,
    cache: FxHashMap<String, Image>,
}

impl DirectoryTextureSource {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        DirectoryTextureSource {
            root: root.as_ref().to_path_buf(),
            cache: FxHashMap::default(),
        }
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(format!("{key}.png"))
    }

    fn read_png(&self, key: &str) -> anyhow::Result<Image> {
        let path = self.path_for(key);
        let bytes = std::fs::read(&path)
            .with_context(|| format!("Reading texture {}", path.display()))?;
        let image = Image::from_file_with_format(&bytes, None)
            .with_context(|| format!("Decoding texture {}", path.display()))?;
        Ok(image)
    }
}

impl TextureSource for DirectoryTextureSource {
    fn load(&mut self, key: &str) -> Option<Image> {
        if let Some(image) = self.cache.get(key) {
            return Some(image.clone());
        }
        match self.read_png(key) {
            Ok(image) => {
                self.cache.insert(key.to_owned(), image.clone());
                Some(image)
            }
            Err(e) => {
                log::debug!("no texture for '{key}': {e:#}");
                None
            }
        }
    }

    fn release(&mut self, key: &str) {
        self.cache.remove(key);
    }
}
