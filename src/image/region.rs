//! Owned RGBA buffer for one assembled canvas region.

use crate::canvas::{RegionRect, Rgb};
use crate::util::{TileMatchError, TileMatchResult};
use image::{Rgba, RgbaImage};

/// Pixel buffer covering one [`RegionRect`].
///
/// Offsets passed to the paint operations are relative to the region origin
/// and may be negative or extend past the edges; writes are clipped.
#[derive(Clone, Debug, PartialEq)]
pub struct RegionImage {
    rect: RegionRect,
    pixels: RgbaImage,
}

impl RegionImage {
    /// Allocates a fully transparent buffer for `rect`.
    pub fn new(rect: RegionRect) -> Self {
        Self {
            rect,
            pixels: RgbaImage::new(rect.width, rect.height),
        }
    }

    /// Allocates a buffer filled with an opaque color.
    pub fn filled(rect: RegionRect, color: Rgb) -> Self {
        let [r, g, b] = color;
        Self {
            rect,
            pixels: RgbaImage::from_pixel(rect.width, rect.height, Rgba([r, g, b, 255])),
        }
    }

    /// Wraps existing pixels; the dimensions must match `rect`.
    pub fn from_pixels(rect: RegionRect, pixels: RgbaImage) -> TileMatchResult<Self> {
        if pixels.width() != rect.width || pixels.height() != rect.height {
            return Err(TileMatchError::InvalidDimensions {
                width: pixels.width() as usize,
                height: pixels.height() as usize,
            });
        }
        Ok(Self { rect, pixels })
    }

    pub fn rect(&self) -> RegionRect {
        self.rect
    }

    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }

    pub fn into_pixels(self) -> RgbaImage {
        self.pixels
    }

    /// Paints an opaque `size`×`size` block at `(dx, dy)`.
    pub fn fill_block(&mut self, dx: i64, dy: i64, size: u32, color: Rgb) {
        let [r, g, b] = color;
        let px = Rgba([r, g, b, 255]);
        for (x, y) in self.clip(dx, dy, size, size) {
            self.pixels.put_pixel(x, y, px);
        }
    }

    /// Pastes `src` at `(dx, dy)`, using its alpha channel as the paste mask.
    ///
    /// Fully transparent source pixels leave the destination untouched, fully
    /// opaque ones replace it, and partial alpha blends every channel.
    pub fn paste_masked(&mut self, src: &RgbaImage, dx: i64, dy: i64) {
        for (x, y) in self.clip(dx, dy, src.width(), src.height()) {
            let sx = (i64::from(x) - dx) as u32;
            let sy = (i64::from(y) - dy) as u32;
            let s = src.get_pixel(sx, sy);
            let alpha = u32::from(s[3]);
            match alpha {
                0 => {}
                255 => self.pixels.put_pixel(x, y, *s),
                _ => {
                    let d = self.pixels.get_pixel_mut(x, y);
                    for c in 0..4 {
                        let blended =
                            (u32::from(s[c]) * alpha + u32::from(d[c]) * (255 - alpha) + 127) / 255;
                        d[c] = blended as u8;
                    }
                }
            }
        }
    }

    /// Returns `true` when every pixel has the same RGBA value.
    ///
    /// This is how a day whose tiles all came back missing shows up.
    pub fn is_single_color(&self) -> bool {
        let mut pixels = self.pixels.pixels();
        match pixels.next() {
            Some(first) => pixels.all(|p| p == first),
            None => true,
        }
    }

    /// Destination pixel coordinates covered by a `w`×`h` block at `(dx, dy)`.
    fn clip(&self, dx: i64, dy: i64, w: u32, h: u32) -> impl Iterator<Item = (u32, u32)> {
        let x0 = dx.max(0);
        let y0 = dy.max(0);
        let x1 = (dx + i64::from(w)).min(i64::from(self.rect.width));
        let y1 = (dy + i64::from(h)).min(i64::from(self.rect.height));
        (y0..y1.max(y0)).flat_map(move |y| (x0..x1.max(x0)).map(move |x| (x as u32, y as u32)))
    }
}
