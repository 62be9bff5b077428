//! CPU-side RGBA helpers over macroquad's `Image`.
use macroquad::prelude::{Image, Rect};

/// Fully transparent `width` x `height` image.
pub fn blank(width: u32, height: u32) -> Image {
    Image {
        bytes: vec![0; width as usize * height as usize * 4],
        width: width as u16,
        height: height as u16,
    }
}

#[inline]
fn offset(img: &Image, x: u32, y: u32) -> usize {
    (y as usize * img.width as usize + x as usize) * 4
}

#[inline]
pub fn pixel(img: &Image, x: u32, y: u32) -> [u8; 4] {
    let o = offset(img, x, y);
    [img.bytes[o], img.bytes[o + 1], img.bytes[o + 2], img.bytes[o + 3]]
}

#[inline]
pub fn put_pixel(img: &mut Image, x: u32, y: u32, px: [u8; 4]) {
    let o = offset(img, x, y);
    img.bytes[o..o + 4].copy_from_slice(&px);
}

/// Copies all of `src` into `dst` with its top-left at `(dx, dy)`. The caller
/// guarantees it fits.
pub fn blit(dst: &mut Image, src: &Image, dx: u32, dy: u32) {
    let row = src.width as usize * 4;
    for y in 0..src.height as u32 {
        let s = offset(src, 0, y);
        let d = offset(dst, dx, dy + y);
        dst.bytes[d..d + row].copy_from_slice(&src.bytes[s..s + row]);
    }
}

/// Copy of the `rect` part of `img`.
pub fn crop(img: &Image, rect: Rect) -> Image {
    let (x0, y0) = (rect.x as u32, rect.y as u32);
    let (w, h) = (rect.w as u32, rect.h as u32);
    let mut out = blank(w, h);
    let row = w as usize * 4;
    for y in 0..h {
        let s = offset(img, x0, y0 + y);
        let d = offset(&out, 0, y);
        out.bytes[d..d + row].copy_from_slice(&img.bytes[s..s + row]);
    }
    out
}

/// Nearest-neighbour rescale to `width` x `height`.
pub fn resized(img: &Image, width: u32, height: u32) -> Image {
    if img.width as u32 == width && img.height as u32 == height {
        return img.clone();
    }
    let mut out = blank(width, height);
    let (sw, sh) = (img.width.max(1) as u32, img.height.max(1) as u32);
    if img.bytes.is_empty() {
        return out;
    }
    for y in 0..height {
        for x in 0..width {
            put_pixel(&mut out, x, y, pixel(img, x * sw / width, y * sh / height));
        }
    }
    out
}

/// One bit per pixel of a monochrome mask.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaskBits {
    pub width: u32,
    pub height: u32,
    bits: Vec<u64>,
}

impl MaskBits {
    /// Set bits are the black (rgb 0, not fully transparent) pixels.
    pub fn from_image(img: &Image) -> Self {
        let (width, height) = (img.width as u32, img.height as u32);
        let len = width as usize * height as usize;
        let mut bits = vec![0u64; len.div_ceil(64)];
        for (i, px) in img.bytes.chunks_exact(4).enumerate() {
            if px[0] == 0 && px[1] == 0 && px[2] == 0 && px[3] > 0 {
                bits[i / 64] |= 1u64 << (i % 64);
            }
        }
        MaskBits { width, height, bits }
    }

    #[inline]
    pub fn get(&self, x: u32, y: u32) -> bool {
        let i = y as usize * self.width as usize + x as usize;
        self.bits[i / 64] & (1u64 << (i % 64)) != 0
    }

    /// Samples the mask as if it were `width` x `height`.
    #[inline]
    pub fn sample(&self, x: u32, y: u32, width: u32, height: u32) -> bool {
        if self.width == 0 || self.height == 0 {
            return false;
        }
        self.get(x * self.width / width, y * self.height / height)
    }
}

/// Keeps the pixels of `tile` where the mask is set, clears the rest.
pub fn apply_mask(tile: &Image, mask: &MaskBits) -> Image {
    let (w, h) = (tile.width as u32, tile.height as u32);
    let mut out = blank(w, h);
    for y in 0..h {
        for x in 0..w {
            if mask.sample(x, y, w, h) {
                put_pixel(&mut out, x, y, pixel(tile, x, y));
            }
        }
    }
    out
}
